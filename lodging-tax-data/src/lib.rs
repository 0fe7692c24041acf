pub mod config;
pub mod import;
pub mod loader;
pub mod logging;
pub mod report;

pub use config::{AppConfig, LoggingConfig};
pub use import::{
    HeaderAliases, ImportError, ImportSummary, ParsedImport, ReservationColumn,
    ReservationImporter, parse_reservations,
};
pub use loader::{TaxBracketLoader, TaxBracketLoaderError, TaxBracketRecord};
pub use report::{ReportSheet, render_report};
