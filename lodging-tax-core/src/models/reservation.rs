use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PaymentStatus;
use crate::calculations::common::{rate_per_person_per_night, round_to_whole_units};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub reservation_number: String,
    pub guest_name: String,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub num_persons: i32,
    pub num_nights: i32,

    /// Lodging charge before tax, excluding cleaning and similar fees.
    pub total_fee: Decimal,

    /// Derived from `total_fee` and the tax table when the record is created.
    pub accommodation_tax: Decimal,

    pub payment_status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Average room rate per person per night, rounded to whole units for
    /// display. Zero when persons or nights is zero.
    pub fn room_rate_per_person_per_night(&self) -> Decimal {
        round_to_whole_units(rate_per_person_per_night(
            self.total_fee,
            self.num_persons,
            self.num_nights,
        ))
    }

    /// Tax charged per person per night, recovered from the stored total.
    pub fn tax_per_person_per_night(&self) -> Decimal {
        rate_per_person_per_night(self.accommodation_tax, self.num_persons, self.num_nights)
    }
}

/// For inserting new reservations (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    pub reservation_number: String,
    pub guest_name: String,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub num_persons: i32,
    pub num_nights: i32,
    pub total_fee: Decimal,
    pub accommodation_tax: Decimal,
    pub payment_status: PaymentStatus,
}

/// Criteria for listing reservations. Every field is optional; an empty
/// filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationFilter {
    /// Case-insensitive substring of the guest name.
    pub guest_name: Option<String>,
    pub status: Option<PaymentStatus>,
    pub checkin_from: Option<NaiveDate>,
    pub checkin_to: Option<NaiveDate>,
}
