use serde::{Deserialize, Serialize};

/// Validated payload for a new salary entry. Storage assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSalary {
    pub amount: i64,
    pub month: i64,
    pub year: i64,
}

/// Partial replacement of a salary's fields. `None` leaves the stored value as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryPatch {
    pub amount: Option<i64>,
    pub month: Option<i64>,
    pub year: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub amount: i64,
    pub category: String,
    pub month: i64,
    pub year: i64,
}
