pub mod common;
mod monthly_report;
mod tax_table;

pub use monthly_report::{
    CategoryAttribution, CategoryBucket, DailyTotals, MonthOverview, MonthlyAggregator,
    MonthlyReport, ReportCategory, ReportError, ReportHeader,
};
pub use tax_table::{TaxTable, TaxTableError};
