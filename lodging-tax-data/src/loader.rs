use std::io::Read;

use lodging_tax_core::{LodgingTaxRepository, RepositoryError, TaxBracket, TaxTable, TaxTableError};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Audit event recorded when a bracket file replaces the table.
pub const TAX_MASTER_UPDATE_EVENT: &str = "tax_master_update";

/// Errors that can occur when loading tax bracket data.
#[derive(Debug, Error)]
pub enum TaxBracketLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error(transparent)]
    Invalid(#[from] TaxTableError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for TaxBracketLoaderError {
    fn from(err: csv::Error) -> Self {
        TaxBracketLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from a tax bracket CSV file.
///
/// - `municipality`: the municipality the bracket belongs to
/// - `from_amount`: lowest room rate per person per night, inclusive
/// - `to_amount`: highest rate, inclusive; empty for no upper bound
/// - `tax_amount`: tax per person per night
/// - `sort_order`: evaluation order within the municipality; optional, file
///   order when absent
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxBracketRecord {
    pub municipality: String,
    pub from_amount: i64,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub to_amount: Option<i64>,
    pub tax_amount: i64,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub sort_order: Option<i64>,
}

fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Loader for tax bracket schedules in CSV form.
///
/// Loading replaces the whole stored table through the
/// [`LodgingTaxRepository`] trait, so it works with any backend.
pub struct TaxBracketLoader;

impl TaxBracketLoader {
    /// Parse tax bracket records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxBracketRecord>, TaxBracketLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TaxBracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Turn records into brackets. Records without a sort order are numbered
    /// by their position within their municipality.
    pub fn to_brackets(records: &[TaxBracketRecord]) -> Vec<TaxBracket> {
        let mut positions: Vec<(&str, i32)> = Vec::new();

        records
            .iter()
            .map(|record| {
                let position = match positions
                    .iter_mut()
                    .find(|(m, _)| *m == record.municipality)
                {
                    Some((_, n)) => {
                        *n += 1;
                        *n
                    }
                    None => {
                        positions.push((record.municipality.as_str(), 1));
                        1
                    }
                };

                TaxBracket {
                    municipality: record.municipality.clone(),
                    from_amount: record.from_amount,
                    to_amount: record.to_amount,
                    tax_amount: record.tax_amount,
                    sort_order: record
                        .sort_order
                        .and_then(|s| i32::try_from(s).ok())
                        .unwrap_or(position),
                }
            })
            .collect()
    }

    /// Validate the records and replace the stored table with them.
    ///
    /// Nothing is written when validation fails. Returns the number of
    /// brackets stored.
    pub async fn load<R>(
        repo: &R,
        records: &[TaxBracketRecord],
    ) -> Result<usize, TaxBracketLoaderError>
    where
        R: LodgingTaxRepository + ?Sized,
    {
        let brackets = Self::to_brackets(records);
        TaxTable::validate(&brackets)?;

        repo.save_tax_brackets(&brackets).await?;

        let municipalities = TaxTable::new(brackets.clone()).municipalities().len();
        info!(brackets = brackets.len(), municipalities, "loaded tax brackets");
        repo.log_event(
            TAX_MASTER_UPDATE_EVENT,
            &format!("loaded {} brackets for {municipalities} municipalities", brackets.len()),
        )
        .await?;

        Ok(brackets.len())
    }
}
