//! Key/value system settings and the resolver built on top of them.
//!
//! Storage keeps settings as plain strings. [`Settings::from_pairs`] turns a
//! snapshot of those pairs into typed values, substituting the seed default
//! for anything missing or unparsable so callers never have to handle a
//! partially configured installation.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calculations::TaxTable;

/// Setting keys understood by the engine.
pub mod keys {
    pub const MUNICIPALITY: &str = "municipality";
    pub const TAX_RATE_PER_PERSON_PER_NIGHT: &str = "tax_rate_per_person_per_night";
    pub const DEFAULT_ROOM_RATE_PER_PERSON: &str = "default_room_rate_per_person";
    pub const PROPERTY_NAME: &str = "property_name";
    pub const PROPERTY_ADDRESS: &str = "property_address";
    pub const BUSINESS_INFO: &str = "business_info";
    pub const TAX_NUMBER: &str = "tax_number";
}

const DEFAULT_MUNICIPALITY: &str = "札幌市";
const DEFAULT_TAX_RATE: i64 = 300;
const DEFAULT_ROOM_RATE: i64 = 10000;
const DEFAULT_PROPERTY_NAME: &str = "宿泊施設名";
const DEFAULT_PROPERTY_ADDRESS: &str = "住所を設定してください";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Municipality whose brackets are used to derive reservation tax.
    pub municipality: String,

    /// Flat tax per person per night used to pick the monthly report column.
    pub tax_rate_per_person_per_night: Decimal,

    /// Room rate assumed when no flat rate is configured.
    pub default_room_rate_per_person: Decimal,

    pub property_name: String,
    pub property_address: String,
    pub business_info: String,
    pub tax_number: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            municipality: DEFAULT_MUNICIPALITY.to_string(),
            tax_rate_per_person_per_night: Decimal::from(DEFAULT_TAX_RATE),
            default_room_rate_per_person: Decimal::from(DEFAULT_ROOM_RATE),
            property_name: DEFAULT_PROPERTY_NAME.to_string(),
            property_address: DEFAULT_PROPERTY_ADDRESS.to_string(),
            business_info: String::new(),
            tax_number: String::new(),
        }
    }
}

impl Settings {
    /// Build settings from stored key/value pairs. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut settings = Self::default();

        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref() {
                keys::MUNICIPALITY if !value.trim().is_empty() => {
                    settings.municipality = value.trim().to_string();
                }
                keys::TAX_RATE_PER_PERSON_PER_NIGHT => {
                    if let Some(rate) = parse_decimal_setting(keys::TAX_RATE_PER_PERSON_PER_NIGHT, &value) {
                        settings.tax_rate_per_person_per_night = rate;
                    }
                }
                keys::DEFAULT_ROOM_RATE_PER_PERSON => {
                    if let Some(rate) = parse_decimal_setting(keys::DEFAULT_ROOM_RATE_PER_PERSON, &value) {
                        settings.default_room_rate_per_person = rate;
                    }
                }
                keys::PROPERTY_NAME => settings.property_name = value,
                keys::PROPERTY_ADDRESS => settings.property_address = value,
                keys::BUSINESS_INFO => settings.business_info = value,
                keys::TAX_NUMBER => settings.tax_number = value,
                _ => {}
            }
        }

        settings
    }

    /// Tax per person per night the monthly report classifies against.
    ///
    /// The configured flat rate wins when it is positive. Otherwise the
    /// default room rate is run through the active municipality's brackets.
    pub fn report_tax_rate(
        &self,
        table: &TaxTable,
    ) -> Decimal {
        if self.tax_rate_per_person_per_night > Decimal::ZERO {
            return self.tax_rate_per_person_per_night;
        }
        table.resolve(&self.municipality, self.default_room_rate_per_person)
    }
}

fn parse_decimal_setting(
    key: &str,
    value: &str,
) -> Option<Decimal> {
    match Decimal::from_str(value.trim().replace(',', "").as_str()) {
        Ok(d) => Some(d),
        Err(error) => {
            warn!(key, value, %error, "ignoring unparsable setting, using default");
            None
        }
    }
}
