use serde::{Deserialize, Serialize};

/// One row of a municipality's accommodation tax schedule.
///
/// Amounts are whole currency units. `to_amount` of `None` means the bracket
/// has no upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub municipality: String,
    pub from_amount: i64,
    pub to_amount: Option<i64>,
    /// Tax per person per night.
    pub tax_amount: i64,
    pub sort_order: i32,
}

impl TaxBracket {
    /// True when `rate` (already truncated to whole units) falls inside the
    /// inclusive `[from_amount, to_amount]` range.
    pub fn contains(
        &self,
        rate: i64,
    ) -> bool {
        self.from_amount <= rate && self.to_amount.is_none_or(|to| rate <= to)
    }
}
