//! Conversion of one data row into a [`NewReservation`].

use std::str::FromStr;

use chrono::NaiveDate;
use lodging_tax_core::{NewReservation, PaymentStatus, TaxTable};
use rust_decimal::Decimal;
use thiserror::Error;

use super::headers::{ColumnMap, ReservationColumn};

/// Why a single row was rejected. The importer prefixes the line number.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("missing field '{}'", .0.label())]
    MissingField(ReservationColumn),

    #[error("reservation number is empty")]
    EmptyReservationNumber,

    #[error("invalid {} '{value}'", .column.label())]
    InvalidNumber {
        column: ReservationColumn,
        value: String,
    },

    #[error("{} must not be negative, got {value}", .column.label())]
    Negative {
        column: ReservationColumn,
        value: String,
    },

    #[error("invalid {} '{value}'", .column.label())]
    InvalidDate {
        column: ReservationColumn,
        value: String,
    },
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

/// Parse a calendar date, ignoring any trailing time part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw
        .trim()
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()?;

    if date_part.len() == 8 && date_part.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(date_part, "%Y%m%d").ok();
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Parse a money amount after dropping thousands separators and currency
/// symbols.
pub fn parse_fee(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(*c, ',' | '¥' | '￥' | '$'))
        .collect();
    Decimal::from_str(cleaned.trim()).ok()
}

/// Build the reservation for one row, deriving its accommodation tax from
/// `table` for `municipality`.
pub fn build_reservation(
    cells: &[String],
    columns: &ColumnMap,
    table: &TaxTable,
    municipality: &str,
) -> Result<NewReservation, RowError> {
    let cell = |column| columns.cell(cells, column).ok_or(RowError::MissingField(column));

    let reservation_number = cell(ReservationColumn::ReservationNumber)?;
    if reservation_number.is_empty() {
        return Err(RowError::EmptyReservationNumber);
    }
    let guest_name = cell(ReservationColumn::GuestName)?;

    let num_persons = parse_count(ReservationColumn::NumPersons, cell(ReservationColumn::NumPersons)?)?;
    let num_nights = parse_count(ReservationColumn::NumNights, cell(ReservationColumn::NumNights)?)?;

    let fee_raw = cell(ReservationColumn::TotalFee)?;
    let total_fee = parse_fee(fee_raw).ok_or_else(|| RowError::InvalidNumber {
        column: ReservationColumn::TotalFee,
        value: fee_raw.to_string(),
    })?;
    if total_fee < Decimal::ZERO {
        return Err(RowError::Negative {
            column: ReservationColumn::TotalFee,
            value: fee_raw.to_string(),
        });
    }

    let checkin_date = date_cell(ReservationColumn::CheckinDate, cell(ReservationColumn::CheckinDate)?)?;
    let checkout_date = date_cell(ReservationColumn::CheckoutDate, cell(ReservationColumn::CheckoutDate)?)?;

    let accommodation_tax = table.accommodation_tax(municipality, total_fee, num_persons, num_nights);

    Ok(NewReservation {
        reservation_number: reservation_number.to_string(),
        guest_name: guest_name.to_string(),
        checkin_date,
        checkout_date,
        num_persons,
        num_nights,
        total_fee,
        accommodation_tax,
        payment_status: PaymentStatus::Unpaid,
    })
}

fn parse_count(
    column: ReservationColumn,
    raw: &str,
) -> Result<i32, RowError> {
    let value: i32 = raw.parse().map_err(|_| RowError::InvalidNumber {
        column,
        value: raw.to_string(),
    })?;
    if value < 0 {
        return Err(RowError::Negative {
            column,
            value: raw.to_string(),
        });
    }
    Ok(value)
}

fn date_cell(
    column: ReservationColumn,
    raw: &str,
) -> Result<NaiveDate, RowError> {
    parse_date(raw).ok_or_else(|| RowError::InvalidDate {
        column,
        value: raw.to_string(),
    })
}
