pub mod calculations;
pub mod db;
pub mod defaults;
pub mod models;

pub use calculations::{
    CategoryAttribution, DailyTotals, MonthOverview, MonthlyAggregator, MonthlyReport,
    ReportCategory, ReportError, ReportHeader, TaxTable, TaxTableError,
};
pub use db::{DbConfig, LodgingTaxRepository, RepositoryError, RepositoryFactory, RepositoryRegistry};
pub use models::*;
