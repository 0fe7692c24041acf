//! Header-name resolution for reservation exports.
//!
//! Each booking channel names its columns differently, so every logical
//! column carries a list of accepted header names. Matching ignores case and
//! surrounding whitespace, and falls back to comparing with all whitespace
//! removed so `"Total Fee (Except tax )"` still finds
//! `"Total Fee (Except tax)"`.

use std::collections::HashMap;

use super::ImportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationColumn {
    ReservationNumber,
    GuestName,
    CheckinDate,
    CheckoutDate,
    NumPersons,
    NumNights,
    TotalFee,
}

impl ReservationColumn {
    pub const ALL: [ReservationColumn; 7] = [
        Self::ReservationNumber,
        Self::GuestName,
        Self::CheckinDate,
        Self::CheckoutDate,
        Self::NumPersons,
        Self::NumNights,
        Self::TotalFee,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ReservationNumber => "reservation number",
            Self::GuestName => "guest name",
            Self::CheckinDate => "arrival date",
            Self::CheckoutDate => "departure date",
            Self::NumPersons => "persons",
            Self::NumNights => "nights",
            Self::TotalFee => "total fee (pre-tax)",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::ReservationNumber => 0,
            Self::GuestName => 1,
            Self::CheckinDate => 2,
            Self::CheckoutDate => 3,
            Self::NumPersons => 4,
            Self::NumNights => 5,
            Self::TotalFee => 6,
        }
    }
}

/// Accepted header names per logical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderAliases {
    aliases: HashMap<ReservationColumn, Vec<String>>,
}

impl Default for HeaderAliases {
    /// English and Japanese names used by the common booking channels.
    fn default() -> Self {
        Self::empty()
            .with_aliases(ReservationColumn::ReservationNumber, ["Reservation number", "予約番号"])
            .with_aliases(ReservationColumn::GuestName, ["Guest name", "宿泊者名"])
            .with_aliases(ReservationColumn::CheckinDate, ["Arrival", "チェックイン日"])
            .with_aliases(ReservationColumn::CheckoutDate, ["Departure", "チェックアウト日"])
            .with_aliases(ReservationColumn::NumPersons, ["Persons", "宿泊人数"])
            .with_aliases(ReservationColumn::NumNights, ["Room nights", "宿泊泊数"])
            .with_aliases(
                ReservationColumn::TotalFee,
                ["Total Fee (Except tax)", "Total Fee", "宿泊料金合計"],
            )
    }
}

impl HeaderAliases {
    /// No aliases at all; every column must be added.
    pub fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    pub fn with_aliases<I, S>(
        mut self,
        column: ReservationColumn,
        names: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases
            .entry(column)
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn aliases(
        &self,
        column: ReservationColumn,
    ) -> &[String] {
        self.aliases.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Locate every column in `headers`.
    ///
    /// # Errors
    ///
    /// [`ImportError::MissingColumns`] naming each unresolved column and
    /// listing the headers that were present.
    pub fn resolve(
        &self,
        headers: &[String],
    ) -> Result<ColumnMap, ImportError> {
        let mut indices = [0usize; 7];
        let mut missing = Vec::new();

        for column in ReservationColumn::ALL {
            match self.find(column, headers) {
                Some(idx) => indices[column.index()] = idx,
                None => missing.push(format!(
                    "{} ({})",
                    column.label(),
                    self.aliases(column).join(" / ")
                )),
            }
        }

        if missing.is_empty() {
            Ok(ColumnMap { indices })
        } else {
            Err(ImportError::MissingColumns {
                required: missing,
                found: headers.iter().map(|h| h.trim().to_string()).collect(),
            })
        }
    }

    fn find(
        &self,
        column: ReservationColumn,
        headers: &[String],
    ) -> Option<usize> {
        let aliases = self.aliases(column);

        headers.iter().position(|header| {
            let header = header.trim().to_lowercase();
            let compact = without_whitespace(&header);
            aliases.iter().any(|alias| {
                let alias = alias.trim().to_lowercase();
                header == alias || compact == without_whitespace(&alias)
            })
        })
    }
}

fn without_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Field positions of each logical column within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    indices: [usize; 7],
}

impl ColumnMap {
    pub fn position(
        &self,
        column: ReservationColumn,
    ) -> usize {
        self.indices[column.index()]
    }

    /// Cell for `column`, or `None` when the row is too short.
    pub fn cell<'a>(
        &self,
        cells: &'a [String],
        column: ReservationColumn,
    ) -> Option<&'a str> {
        cells.get(self.position(column)).map(|c| c.trim())
    }
}
