//! Reservation import from booking-channel exports.
//!
//! Import runs in two phases. [`parse_reservations`] is pure: it decodes the
//! bytes, finds the columns and turns every data row into a
//! [`NewReservation`] with its tax already derived, collecting per-row
//! problems instead of stopping. [`ReservationImporter::import`] then stores
//! the parsed rows, skipping reservation numbers that already exist.
//!
//! | failure                         | effect                                  |
//! |---------------------------------|-----------------------------------------|
//! | undecodable bytes, no data line | whole import fails                      |
//! | required column not found       | whole import fails, headers listed      |
//! | malformed row                   | row skipped with a line-numbered message |
//! | reservation number exists       | row skipped silently                    |

pub mod delimited;
pub mod encoding;
pub mod headers;
pub mod row;

use lodging_tax_core::{LodgingTaxRepository, NewReservation, RepositoryError, Settings, TaxTable};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use headers::{ColumnMap, HeaderAliases, ReservationColumn};

use delimited::{Separator, numbered_lines, split_line};

/// Audit event recorded after each import.
pub const IMPORT_EVENT: &str = "csv_import";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("could not decode file: {0}")]
    Decode(String),

    #[error("file has no lines after the header")]
    NoData,

    #[error(
        "required columns not found: {}; headers in file: {}",
        .required.join(", "),
        .found.join(", ")
    )]
    MissingColumns {
        required: Vec<String>,
        found: Vec<String>,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A data row that parsed cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    /// 1-based line number in the decoded file; the header is line 1.
    pub line: usize,
    pub reservation: NewReservation,
}

/// Result of the pure parsing phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedImport {
    pub rows: Vec<ParsedRow>,
    /// One message per rejected row, prefixed with its line number.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Rejected rows plus duplicates.
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Parse an export with the default header aliases.
pub fn parse_reservations(
    bytes: &[u8],
    table: &TaxTable,
    settings: &Settings,
) -> Result<ParsedImport, ImportError> {
    ReservationImporter::default().parse(bytes, table, settings)
}

#[derive(Debug, Clone, Default)]
pub struct ReservationImporter {
    aliases: HeaderAliases,
}

impl ReservationImporter {
    pub fn new(aliases: HeaderAliases) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &HeaderAliases {
        &self.aliases
    }

    /// Decode and parse `bytes` without touching storage.
    ///
    /// Tax is derived from `table` for the settings' municipality.
    ///
    /// # Errors
    ///
    /// [`ImportError::Decode`], [`ImportError::NoData`] and
    /// [`ImportError::MissingColumns`]. Bad rows are not errors; they land in
    /// [`ParsedImport::errors`].
    pub fn parse(
        &self,
        bytes: &[u8],
        table: &TaxTable,
        settings: &Settings,
    ) -> Result<ParsedImport, ImportError> {
        let decoded = encoding::decode(bytes)?;
        let mut lines = numbered_lines(&decoded.text);

        let Some((_, header_line)) = lines.next() else {
            return Err(ImportError::NoData);
        };
        let separator = Separator::detect(header_line);
        let headers = split_line(header_line, separator);
        let columns = self.aliases.resolve(&headers)?;

        debug!(
            encoding = decoded.encoding.name(),
            ?separator,
            "resolved import columns"
        );

        let mut lines = lines.peekable();
        if lines.peek().is_none() {
            return Err(ImportError::NoData);
        }

        let mut parsed = ParsedImport::default();
        for (line, text) in lines {
            if text.trim().is_empty() {
                continue;
            }

            let cells = split_line(text, separator);
            match row::build_reservation(&cells, &columns, table, &settings.municipality) {
                Ok(reservation) => {
                    debug!(
                        line,
                        reservation = %reservation.reservation_number,
                        tax = %reservation.accommodation_tax,
                        "parsed row"
                    );
                    parsed.rows.push(ParsedRow { line, reservation });
                }
                Err(error) => {
                    warn!(line, %error, "skipping row");
                    parsed.errors.push(format!("line {line}: {error}"));
                }
            }
        }

        Ok(parsed)
    }

    /// Parse `bytes` and store every new reservation.
    ///
    /// Settings and tax brackets are read from `repo` once, before any row is
    /// processed. Existing reservation numbers are skipped without a message,
    /// including ones that appear while the import runs.
    ///
    /// # Errors
    ///
    /// Everything [`parse`](Self::parse) returns, plus
    /// [`ImportError::Repository`] for storage failures other than duplicates.
    pub async fn import<R>(
        &self,
        repo: &R,
        bytes: &[u8],
    ) -> Result<ImportSummary, ImportError>
    where
        R: LodgingTaxRepository + ?Sized,
    {
        let settings = repo.get_settings().await?;
        let table = repo.load_tax_table().await?;
        let parsed = self.parse(bytes, &table, &settings)?;

        let mut summary = ImportSummary {
            imported: 0,
            skipped: parsed.errors.len(),
            errors: parsed.errors,
        };

        for row in parsed.rows {
            let number = &row.reservation.reservation_number;
            if repo.reservation_exists(number).await? {
                debug!(line = row.line, reservation = %number, "duplicate reservation skipped");
                summary.skipped += 1;
                continue;
            }

            match repo.insert_reservation(&row.reservation).await {
                Ok(_) => summary.imported += 1,
                Err(RepositoryError::Duplicate(_)) => {
                    debug!(line = row.line, reservation = %number, "duplicate reservation skipped");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            municipality = %settings.municipality,
            "reservation import finished"
        );

        // Rows are already stored, so an audit failure only warns.
        if let Err(error) = repo
            .log_event(
                IMPORT_EVENT,
                &format!(
                    "imported {} reservations, skipped {}",
                    summary.imported, summary.skipped
                ),
            )
            .await
        {
            warn!(%error, "failed to record import in audit log");
        }

        Ok(summary)
    }
}
