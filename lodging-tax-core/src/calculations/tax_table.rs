//! Accommodation tax bracket resolution.
//!
//! A [`TaxTable`] is an immutable snapshot of every municipality's bracket
//! schedule. Lookups scan the municipality's brackets in ascending
//! `sort_order` (ties keep load order) and the first bracket whose inclusive
//! range contains the truncated rate wins.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use lodging_tax_core::{TaxBracket, TaxTable};
//!
//! let bracket = |from, to, tax, sort_order| TaxBracket {
//!     municipality: "X".to_string(),
//!     from_amount: from,
//!     to_amount: to,
//!     tax_amount: tax,
//!     sort_order,
//! };
//! let table = TaxTable::new(vec![
//!     bracket(0, Some(19999), 300, 1),
//!     bracket(20000, Some(49999), 400, 2),
//!     bracket(50000, None, 1000, 3),
//! ]);
//!
//! assert_eq!(table.resolve("X", dec!(50000)), dec!(1000));
//! assert_eq!(table.resolve("X", dec!(19999.99)), dec!(300));
//! assert_eq!(table.resolve("Y", dec!(50000)), dec!(0));
//! ```

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

use crate::calculations::common::{rate_per_person_per_night, truncate_to_whole_units};
use crate::models::TaxBracket;

/// Problems found while validating a bracket set before it is saved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxTableError {
    #[error("invalid tax brackets: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxTable {
    /// Stable-sorted by `sort_order`.
    brackets: Vec<TaxBracket>,
    /// Distinct municipalities in load order.
    municipalities: Vec<String>,
}

impl TaxTable {
    /// Build a table from brackets in storage (insertion) order.
    pub fn new(brackets: Vec<TaxBracket>) -> Self {
        let mut municipalities: Vec<String> = Vec::new();
        for bracket in &brackets {
            if !municipalities.contains(&bracket.municipality) {
                municipalities.push(bracket.municipality.clone());
            }
        }

        let mut brackets = brackets;
        brackets.sort_by_key(|b| b.sort_order);

        Self {
            brackets,
            municipalities,
        }
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Municipalities in the order they first appear in the loaded data.
    pub fn municipalities(&self) -> &[String] {
        &self.municipalities
    }

    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }

    /// Brackets for one municipality, in evaluation order.
    pub fn brackets_for<'a>(
        &'a self,
        municipality: &'a str,
    ) -> impl Iterator<Item = &'a TaxBracket> + 'a {
        self.brackets
            .iter()
            .filter(move |b| b.municipality == municipality)
    }

    /// Tax per person per night for `rate_per_person_per_night` in
    /// `municipality`.
    ///
    /// The rate is truncated to whole units before matching. Returns zero
    /// when nothing matches; gaps in a schedule are legitimate.
    pub fn resolve(
        &self,
        municipality: &str,
        rate_per_person_per_night: Decimal,
    ) -> Decimal {
        let Some(rate) = truncate_to_whole_units(rate_per_person_per_night).to_i64() else {
            return Decimal::ZERO;
        };

        self.brackets_for(municipality)
            .find(|b| b.contains(rate))
            .map(|b| Decimal::from(b.tax_amount))
            .unwrap_or(Decimal::ZERO)
    }

    /// Total accommodation tax for a stay: the per-person-per-night amount
    /// for the stay's average rate, multiplied by persons and nights.
    pub fn accommodation_tax(
        &self,
        municipality: &str,
        total_fee: Decimal,
        persons: i32,
        nights: i32,
    ) -> Decimal {
        let rate = rate_per_person_per_night(total_fee, persons, nights);
        let per_person_per_night = self.resolve(municipality, rate);
        per_person_per_night * Decimal::from(persons) * Decimal::from(nights)
    }

    /// Check a bracket set before it replaces the stored table.
    ///
    /// Every problem is reported, tagged with the bracket's 1-based position.
    pub fn validate(brackets: &[TaxBracket]) -> Result<(), TaxTableError> {
        let mut problems = Vec::new();

        for (idx, bracket) in brackets.iter().enumerate() {
            let row = idx + 1;
            if bracket.municipality.trim().is_empty() {
                problems.push(format!("row {row}: municipality is empty"));
                continue;
            }
            if bracket.from_amount < 0 {
                problems.push(format!(
                    "row {row} ({}): lower bound must not be negative",
                    bracket.municipality
                ));
            }
            if let Some(to) = bracket.to_amount {
                if to < 0 || to < bracket.from_amount {
                    problems.push(format!(
                        "row {row} ({}): upper bound {to} is invalid",
                        bracket.municipality
                    ));
                }
            }
            if bracket.tax_amount < 0 {
                problems.push(format!(
                    "row {row} ({}): tax amount must not be negative",
                    bracket.municipality
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(TaxTableError::Invalid(problems))
        }
    }
}
