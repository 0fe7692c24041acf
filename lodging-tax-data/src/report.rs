//! Plain-text rendering of the monthly filing sheet.

use std::fmt;

use lodging_tax_core::calculations::common::round_to_whole_units;
use lodging_tax_core::{MonthOverview, MonthlyReport, ReportCategory, ReportHeader};
use rust_decimal::Decimal;

const DAY_WIDTH: usize = 4;
const CELL_WIDTH: usize = 8;
const TAX_WIDTH: usize = 12;

/// Header block, reservation counts and the per-day table for one month.
///
/// Category cells hold person-nights; the rightmost columns hold the day's
/// person-nights and tax. Tax is rounded to whole yen for display only.
pub struct ReportSheet<'a> {
    pub header: &'a ReportHeader,
    pub overview: &'a MonthOverview,
    pub report: &'a MonthlyReport,
}

pub fn render_report(
    header: &ReportHeader,
    overview: &MonthOverview,
    report: &MonthlyReport,
) -> String {
    ReportSheet {
        header,
        overview,
        report,
    }
    .to_string()
}

fn yen(amount: Decimal) -> String {
    round_to_whole_units(amount).to_string()
}

impl ReportSheet<'_> {
    fn write_row(
        f: &mut fmt::Formatter<'_>,
        label: &str,
        cells: impl Iterator<Item = String>,
        person_nights: &str,
        tax: &str,
    ) -> fmt::Result {
        write!(f, "{label:>DAY_WIDTH$}")?;
        for cell in cells {
            write!(f, " {cell:>CELL_WIDTH$}")?;
        }
        writeln!(f, " {person_nights:>CELL_WIDTH$} {tax:>TAX_WIDTH$}")
    }
}

impl fmt::Display for ReportSheet<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let header = self.header;
        writeln!(f, "Lodging tax report {}-{:02}", header.year, header.month)?;
        writeln!(f, "Property:   {}", header.property_name)?;
        writeln!(f, "Address:    {}", header.property_address)?;
        if !header.business_info.is_empty() {
            writeln!(f, "Business:   {}", header.business_info)?;
        }
        if !header.tax_number.is_empty() {
            writeln!(f, "Tax number: {}", header.tax_number)?;
        }
        writeln!(
            f,
            "Reservations: {} (paid {}, unpaid {}), paid tax {}",
            self.overview.reservations,
            self.overview.paid,
            self.overview.unpaid,
            yen(self.overview.paid_tax)
        )?;
        writeln!(f)?;

        Self::write_row(
            f,
            "Day",
            ReportCategory::ALL.iter().map(|c| format!("¥{}", c.rate())),
            "P-nights",
            "Tax",
        )?;

        for day in &self.report.days {
            Self::write_row(
                f,
                &day.day.to_string(),
                day.categories.iter().map(|b| b.person_nights.to_string()),
                &day.person_nights.to_string(),
                &yen(day.tax),
            )?;
        }

        Self::write_row(
            f,
            "All",
            self.report
                .category_totals
                .iter()
                .map(|b| b.person_nights.to_string()),
            &self.report.total_person_nights.to_string(),
            &yen(self.report.total_tax),
        )?;

        writeln!(f)?;
        for category in ReportCategory::ALL {
            let total = self.report.category_total(category);
            writeln!(
                f,
                "¥{:<5} {:<20} {:>8} person-nights {:>12}",
                category.rate(),
                category.label(),
                total.person_nights,
                yen(total.tax)
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use lodging_tax_core::{MonthlyAggregator, PaymentStatus, Reservation, Settings};
    use rust_decimal_macros::dec;

    use super::*;

    fn paid(
        number: &str,
        checkin: NaiveDate,
        persons: i32,
        nights: i32,
        tax: Decimal,
    ) -> Reservation {
        Reservation {
            id: 0,
            reservation_number: number.to_string(),
            guest_name: "Guest".to_string(),
            checkin_date: checkin,
            checkout_date: checkin,
            num_persons: persons,
            num_nights: nights,
            total_fee: dec!(10000),
            accommodation_tax: tax,
            payment_status: PaymentStatus::Paid,
            payment_date: None,
            payment_reference: None,
            created_at: Utc::now(),
        }
    }

    fn sheet() -> String {
        let reservations = vec![paid(
            "R-1",
            NaiveDate::from_ymd_opt(2025, 2, 27).unwrap(),
            2,
            2,
            dec!(1200),
        )];
        let report = MonthlyAggregator::new(dec!(300))
            .aggregate(2025, 2, &reservations)
            .unwrap();
        let settings = Settings {
            property_name: "Lodge Hokkaido".to_string(),
            tax_number: "T-42".to_string(),
            ..Settings::default()
        };
        let header = ReportHeader::from_settings(&settings, 2025, 2);

        render_report(&header, &MonthOverview::from_reservations(&reservations), &report)
    }

    #[test]
    fn header_block_names_property_and_month() {
        let text = sheet();

        assert!(text.starts_with("Lodging tax report 2025-02\n"));
        assert!(text.contains("Property:   Lodge Hokkaido"));
        assert!(text.contains("Tax number: T-42"));
        assert!(!text.contains("Business:"));
        assert!(text.contains("Reservations: 1 (paid 1, unpaid 0), paid tax 1200"));
    }

    #[test]
    fn one_row_per_day_plus_totals() {
        let text = sheet();
        let table: Vec<&str> = text
            .lines()
            .skip_while(|l| !l.trim_start().starts_with("Day"))
            .take_while(|l| !l.is_empty())
            .collect();

        // header, 28 days, totals
        assert_eq!(table.len(), 30);
        assert!(table[27].trim_start().starts_with("27 "));
        assert!(table[27].trim_end().ends_with(" 600"));
        assert!(table[29].trim_start().starts_with("All"));
        assert!(table[29].trim_end().ends_with(" 1200"));
    }

    #[test]
    fn category_summary_lists_every_column() {
        let text = sheet();

        for category in ReportCategory::ALL {
            assert!(text.contains(category.label()), "{}", category.label());
        }
        assert!(text.contains(&format!("¥300   {:<20} {:>8}", ReportCategory::GeneralUnder20k.label(), 4)));
    }
}
