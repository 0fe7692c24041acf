use async_trait::async_trait;
use thiserror::Error;

use crate::calculations::TaxTable;
use crate::models::{
    AuditEvent, NewReservation, Reservation, ReservationFilter, Settings, TaxBracket,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait LodgingTaxRepository: Send + Sync {
    // Tax brackets
    async fn list_municipalities(&self) -> Result<Vec<String>, RepositoryError>;
    async fn get_tax_brackets(&self) -> Result<Vec<TaxBracket>, RepositoryError>;

    /// Replace every stored bracket with `brackets`. All-or-nothing.
    async fn save_tax_brackets(
        &self,
        brackets: &[TaxBracket],
    ) -> Result<(), RepositoryError>;

    /// Replace every stored bracket with the built-in defaults.
    async fn reset_tax_brackets(&self) -> Result<(), RepositoryError>;

    // Reservations
    async fn reservation_exists(
        &self,
        reservation_number: &str,
    ) -> Result<bool, RepositoryError>;

    /// Fails with [`RepositoryError::Duplicate`] when the reservation number
    /// is already stored.
    async fn insert_reservation(
        &self,
        reservation: &NewReservation,
    ) -> Result<Reservation, RepositoryError>;

    async fn get_reservation(
        &self,
        reservation_number: &str,
    ) -> Result<Reservation, RepositoryError>;

    async fn list_reservations(
        &self,
        filter: &ReservationFilter,
    ) -> Result<Vec<Reservation>, RepositoryError>;

    async fn search_reservations(
        &self,
        query: &str,
    ) -> Result<Vec<Reservation>, RepositoryError>;

    /// Paid reservations with at least one night in the month, including
    /// stays that check in during the previous month.
    async fn get_paid_reservations_for_month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<Reservation>, RepositoryError>;

    async fn mark_paid(
        &self,
        reservation_number: &str,
        payment_reference: &str,
    ) -> Result<Reservation, RepositoryError>;

    // Settings
    async fn get_setting(
        &self,
        key: &str,
    ) -> Result<Option<String>, RepositoryError>;
    async fn list_settings(&self) -> Result<Vec<(String, String)>, RepositoryError>;
    async fn save_setting(
        &self,
        key: &str,
        value: &str,
    ) -> Result<(), RepositoryError>;

    // Audit log
    async fn log_event(
        &self,
        event_type: &str,
        description: &str,
    ) -> Result<(), RepositoryError>;
    async fn recent_events(
        &self,
        limit: u32,
    ) -> Result<Vec<AuditEvent>, RepositoryError>;

    /// Typed settings snapshot with defaults filled in.
    async fn get_settings(&self) -> Result<Settings, RepositoryError> {
        Ok(Settings::from_pairs(self.list_settings().await?))
    }

    /// Every stored bracket as a lookup table.
    async fn load_tax_table(&self) -> Result<TaxTable, RepositoryError> {
        Ok(TaxTable::new(self.get_tax_brackets().await?))
    }
}
