//! Monthly accommodation tax report.
//!
//! The report is the data model behind the municipality's monthly filing
//! sheet: one row per calendar day, one column per report category, plus a
//! per-day tax total and a per-day guest total.
//!
//! # Night attribution
//!
//! A paid reservation contributes one entry per night it spans. Night `n`
//! (zero-based) falls on `checkin_date + n days`, so a stay that starts on
//! the 31st of one month and runs three nights puts one night in that month
//! and two in the next. Only nights inside the requested month count, and
//! each carries `accommodation_tax / num_nights` of tax.
//!
//! # Report categories
//!
//! The filing sheet has fixed columns keyed by tax per person per night. By
//! default every reservation goes into the column matching the configured
//! flat rate ([`CategoryAttribution::ConfiguredRate`]). This assumes one
//! municipality-wide rate for the whole report, even though each stay's tax
//! was derived from its own room rate. A stay taxed at a higher bracket is
//! still filed under the configured column. [`CategoryAttribution::PerReservation`]
//! classifies each stay by its own tax per person per night instead; it is
//! opt-in because it changes which columns existing reports show.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::truncate_to_whole_units;
use crate::models::{Reservation, Settings};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("invalid report month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
}

/// Fixed columns of the monthly filing sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportCategory {
    /// General guests, under ¥20,000 (or under ¥50,000).
    GeneralUnder20k,
    /// General guests, ¥20,000 and over (or under ¥100,000).
    General20kTo100k,
    /// General guests, ¥50,000 to under ¥100,000.
    General50kTo100k,
    /// General guests, ¥100,000 and over.
    General100kAndOver,
    /// Tournament and event participants, under ¥20,000.
    EventUnder20k,
    /// Tournament and event participants, ¥20,000 and over.
    Event20kAndOver,
    /// School trips and other exempt stays.
    Exempt,
}

impl ReportCategory {
    pub const COUNT: usize = 7;

    pub const ALL: [ReportCategory; Self::COUNT] = [
        Self::GeneralUnder20k,
        Self::General20kTo100k,
        Self::General50kTo100k,
        Self::General100kAndOver,
        Self::EventUnder20k,
        Self::Event20kAndOver,
        Self::Exempt,
    ];

    /// Column position on the filing sheet.
    pub fn index(&self) -> usize {
        match self {
            Self::GeneralUnder20k => 0,
            Self::General20kTo100k => 1,
            Self::General50kTo100k => 2,
            Self::General100kAndOver => 3,
            Self::EventUnder20k => 4,
            Self::Event20kAndOver => 5,
            Self::Exempt => 6,
        }
    }

    /// Tax per person per night printed under the column.
    pub fn rate(&self) -> i64 {
        match self {
            Self::GeneralUnder20k => 300,
            Self::General20kTo100k => 400,
            Self::General50kTo100k => 1000,
            Self::General100kAndOver => 2500,
            Self::EventUnder20k => 100,
            Self::Event20kAndOver => 200,
            Self::Exempt => 500,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::GeneralUnder20k => "General <20k/<50k",
            Self::General20kTo100k => "General 20k+/<100k",
            Self::General50kTo100k => "General 50k+/<100k",
            Self::General100kAndOver => "General 100k+",
            Self::EventUnder20k => "Event <20k/<50k",
            Self::Event20kAndOver => "Event 20k+/<100k",
            Self::Exempt => "Exempt",
        }
    }

    /// Category whose rate equals `tax_per_person_per_night` after dropping
    /// any fraction.
    pub fn from_rate(tax_per_person_per_night: Decimal) -> Option<Self> {
        let rate = truncate_to_whole_units(tax_per_person_per_night).to_i64()?;
        Self::ALL.into_iter().find(|c| c.rate() == rate)
    }

    /// Like [`from_rate`](Self::from_rate), falling back to the lowest
    /// general tier for rates that have no column.
    pub fn for_rate(tax_per_person_per_night: Decimal) -> Self {
        Self::from_rate(tax_per_person_per_night).unwrap_or(Self::GeneralUnder20k)
    }
}

/// How reservations are assigned to report columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryAttribution {
    /// Every reservation uses the column of the configured flat rate.
    #[default]
    ConfiguredRate,
    /// Each reservation uses the column of its own tax per person per night,
    /// or the configured column when that amount has no column.
    PerReservation,
}

/// Accumulated values for one (day, category) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBucket {
    pub person_nights: i64,
    pub tax: Decimal,
}

/// One calendar day of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub day: u32,
    /// Indexed by [`ReportCategory::index`].
    pub categories: [CategoryBucket; ReportCategory::COUNT],
    pub tax: Decimal,
    pub person_nights: i64,
}

impl DailyTotals {
    fn new(day: u32) -> Self {
        Self {
            day,
            categories: Default::default(),
            tax: Decimal::ZERO,
            person_nights: 0,
        }
    }

    pub fn category(
        &self,
        category: ReportCategory,
    ) -> &CategoryBucket {
        &self.categories[category.index()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    /// One entry per calendar day, day 1 first.
    pub days: Vec<DailyTotals>,
    /// Column totals, indexed by [`ReportCategory::index`].
    pub category_totals: [CategoryBucket; ReportCategory::COUNT],
    pub total_tax: Decimal,
    pub total_person_nights: i64,
}

impl MonthlyReport {
    pub fn day(
        &self,
        day: u32,
    ) -> Option<&DailyTotals> {
        day.checked_sub(1)
            .and_then(|idx| self.days.get(idx as usize))
    }

    pub fn category_total(
        &self,
        category: ReportCategory,
    ) -> &CategoryBucket {
        &self.category_totals[category.index()]
    }
}

/// Header block printed above the report table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportHeader {
    pub year: i32,
    pub month: u32,
    pub property_name: String,
    pub property_address: String,
    pub business_info: String,
    pub tax_number: String,
}

impl ReportHeader {
    pub fn from_settings(
        settings: &Settings,
        year: i32,
        month: u32,
    ) -> Self {
        Self {
            year,
            month,
            property_name: settings.property_name.clone(),
            property_address: settings.property_address.clone(),
            business_info: settings.business_info.clone(),
            tax_number: settings.tax_number.clone(),
        }
    }
}

/// Builds [`MonthlyReport`]s from reservation lists.
#[derive(Debug, Clone)]
pub struct MonthlyAggregator {
    report_rate: Decimal,
    attribution: CategoryAttribution,
}

impl MonthlyAggregator {
    /// `report_rate` is the tax per person per night that selects the report
    /// column (see [`Settings::report_tax_rate`]).
    pub fn new(report_rate: Decimal) -> Self {
        Self {
            report_rate,
            attribution: CategoryAttribution::default(),
        }
    }

    pub fn with_attribution(
        mut self,
        attribution: CategoryAttribution,
    ) -> Self {
        self.attribution = attribution;
        self
    }

    fn category_for(
        &self,
        reservation: &Reservation,
    ) -> ReportCategory {
        let configured = ReportCategory::for_rate(self.report_rate);
        match self.attribution {
            CategoryAttribution::ConfiguredRate => configured,
            CategoryAttribution::PerReservation => {
                ReportCategory::from_rate(reservation.tax_per_person_per_night())
                    .unwrap_or(configured)
            }
        }
    }

    /// Distribute every paid reservation's nights over `year`/`month`.
    ///
    /// Reservations outside the month simply contribute nothing, so the
    /// caller may pass a superset. Grand totals are summed from the daily
    /// rows.
    ///
    /// # Errors
    ///
    /// [`ReportError::InvalidMonth`] when `month` is not 1–12 or the year is
    /// out of the calendar's range.
    pub fn aggregate(
        &self,
        year: i32,
        month: u32,
        reservations: &[Reservation],
    ) -> Result<MonthlyReport, ReportError> {
        let (first_day, days_in_month) = month_span(year, month)?;
        let mut days: Vec<DailyTotals> = (1..=days_in_month).map(DailyTotals::new).collect();

        for reservation in reservations.iter().filter(|r| r.is_paid()) {
            let category = self.category_for(reservation);
            let tax_per_night = if reservation.num_nights > 0 {
                reservation.accommodation_tax / Decimal::from(reservation.num_nights)
            } else {
                Decimal::ZERO
            };
            let persons = i64::from(reservation.num_persons);

            // Night n lands on day index n - offset; only the nights that
            // fall inside the month are visited.
            let offset = first_day
                .signed_duration_since(reservation.checkin_date)
                .num_days();
            let start = offset.max(0);
            let end = offset
                .saturating_add(i64::from(days_in_month))
                .min(i64::from(reservation.num_nights));

            for n in start..end {
                let daily = &mut days[(n - offset) as usize];
                let bucket = &mut daily.categories[category.index()];
                bucket.person_nights += persons;
                bucket.tax += tax_per_night;
                daily.tax += tax_per_night;
                daily.person_nights += persons;
            }
            let counted = (end - start).max(0);

            debug!(
                reservation = %reservation.reservation_number,
                ?category,
                nights_in_month = counted,
                "attributed reservation nights"
            );
        }

        let mut category_totals: [CategoryBucket; ReportCategory::COUNT] = Default::default();
        let mut total_tax = Decimal::ZERO;
        let mut total_person_nights = 0;
        for daily in &days {
            for (total, bucket) in category_totals.iter_mut().zip(daily.categories.iter()) {
                total.person_nights += bucket.person_nights;
                total.tax += bucket.tax;
            }
            total_tax += daily.tax;
            total_person_nights += daily.person_nights;
        }

        Ok(MonthlyReport {
            year,
            month,
            days,
            category_totals,
            total_tax,
            total_person_nights,
        })
    }
}

/// First day of the month and its length in days.
fn month_span(
    year: i32,
    month: u32,
) -> Result<(NaiveDate, u32), ReportError> {
    let invalid = || ReportError::InvalidMonth { year, month };
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = first
        .checked_add_months(chrono::Months::new(1))
        .ok_or_else(invalid)?;
    Ok((first, next.signed_duration_since(first).num_days() as u32))
}

/// Counts shown above the report: how many reservations the month has and
/// how much tax the paid ones carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthOverview {
    pub reservations: usize,
    pub paid: usize,
    pub unpaid: usize,
    pub paid_tax: Decimal,
}

impl MonthOverview {
    pub fn from_reservations(reservations: &[Reservation]) -> Self {
        reservations
            .iter()
            .fold(Self::default(), |mut overview, r| {
                overview.reservations += 1;
                if r.is_paid() {
                    overview.paid += 1;
                    overview.paid_tax += r.accommodation_tax;
                } else {
                    overview.unpaid += 1;
                }
                overview
            })
    }
}
