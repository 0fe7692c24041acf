use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::repository::{LodgingTaxRepository, RepositoryError};

/// Which storage backend to open and how to reach it.
///
/// `backend` names a registered [`RepositoryFactory`]. The factory alone
/// interprets `connection_string`.
///
/// | backend    | connection_string examples              |
/// |------------|-----------------------------------------|
/// | `sqlite`   | `lodging_tax.db`, `:memory:`            |
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: "lodging_tax.db".to_string(),
        }
    }
}

impl DbConfig {
    /// Ephemeral SQLite database, mostly for tests.
    pub fn in_memory() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens repositories for one storage backend.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Unique, lowercase identifier for this backend.
    fn backend_name(&self) -> &'static str;

    /// Open (or create) the store and return a ready-to-use repository,
    /// migrated and seeded.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn LodgingTaxRepository>, RepositoryError>;
}

/// Backend factories keyed by [`RepositoryFactory::backend_name`].
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory, replacing any previous factory with the
    /// same name.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Registered backend names, sorted.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Open a repository with the factory named by `config.backend`.
    ///
    /// # Errors
    /// * [`RepositoryError::Configuration`] when no such backend is
    ///   registered.
    /// * Whatever the factory itself returns.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn LodgingTaxRepository>, RepositoryError> {
        let factory = self
            .factories
            .get(config.backend.as_str())
            .ok_or_else(|| {
                RepositoryError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    config.backend,
                    self.available_backends()
                ))
            })?;

        factory.create(config).await
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::{
        DbConfig, LodgingTaxRepository, RepositoryError, RepositoryFactory, RepositoryRegistry,
    };
    use crate::models::{
        AuditEvent, NewReservation, Reservation, ReservationFilter, TaxBracket,
    };

    // ── stub repository ──────────────────────────────────────────────────
    // Only routing is under test, so nothing here is ever called.
    struct StubRepository;

    #[async_trait]
    impl LodgingTaxRepository for StubRepository {
        async fn list_municipalities(&self) -> Result<Vec<String>, RepositoryError> {
            unimplemented!()
        }
        async fn get_tax_brackets(&self) -> Result<Vec<TaxBracket>, RepositoryError> {
            unimplemented!()
        }
        async fn save_tax_brackets(
            &self,
            _brackets: &[TaxBracket],
        ) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn reset_tax_brackets(&self) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn reservation_exists(
            &self,
            _reservation_number: &str,
        ) -> Result<bool, RepositoryError> {
            unimplemented!()
        }
        async fn insert_reservation(
            &self,
            _reservation: &NewReservation,
        ) -> Result<Reservation, RepositoryError> {
            unimplemented!()
        }
        async fn get_reservation(
            &self,
            _reservation_number: &str,
        ) -> Result<Reservation, RepositoryError> {
            unimplemented!()
        }
        async fn list_reservations(
            &self,
            _filter: &ReservationFilter,
        ) -> Result<Vec<Reservation>, RepositoryError> {
            unimplemented!()
        }
        async fn search_reservations(
            &self,
            _query: &str,
        ) -> Result<Vec<Reservation>, RepositoryError> {
            unimplemented!()
        }
        async fn get_paid_reservations_for_month(
            &self,
            _year: i32,
            _month: u32,
        ) -> Result<Vec<Reservation>, RepositoryError> {
            unimplemented!()
        }
        async fn mark_paid(
            &self,
            _reservation_number: &str,
            _payment_reference: &str,
        ) -> Result<Reservation, RepositoryError> {
            unimplemented!()
        }
        async fn get_setting(
            &self,
            _key: &str,
        ) -> Result<Option<String>, RepositoryError> {
            unimplemented!()
        }
        async fn list_settings(&self) -> Result<Vec<(String, String)>, RepositoryError> {
            unimplemented!()
        }
        async fn save_setting(
            &self,
            _key: &str,
            _value: &str,
        ) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn log_event(
            &self,
            _event_type: &str,
            _description: &str,
        ) -> Result<(), RepositoryError> {
            unimplemented!()
        }
        async fn recent_events(
            &self,
            _limit: u32,
        ) -> Result<Vec<AuditEvent>, RepositoryError> {
            unimplemented!()
        }
    }

    // ── stub factories ───────────────────────────────────────────────────
    struct StubFactory {
        name: &'static str,
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl RepositoryFactory for StubFactory {
        fn backend_name(&self) -> &'static str {
            self.name
        }
        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn LodgingTaxRepository>, RepositoryError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(Box::new(StubRepository))
        }
    }

    struct FailingFactory;

    #[async_trait]
    impl RepositoryFactory for FailingFactory {
        fn backend_name(&self) -> &'static str {
            "failing"
        }
        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn LodgingTaxRepository>, RepositoryError> {
            Err(RepositoryError::Connection("intentional failure".to_string()))
        }
    }

    fn stub_factory(name: &'static str) -> (Box<dyn RepositoryFactory>, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (
            Box::new(StubFactory {
                name,
                called: flag.clone(),
            }),
            flag,
        )
    }

    fn config(backend: &str) -> DbConfig {
        DbConfig {
            backend: backend.to_string(),
            connection_string: ":memory:".to_string(),
        }
    }

    // ── DbConfig ─────────────────────────────────────────────────────────
    #[test]
    fn dbconfig_default_is_sqlite_file() {
        let cfg = DbConfig::default();
        assert_eq!(cfg.backend, "sqlite");
        assert_eq!(cfg.connection_string, "lodging_tax.db");
    }

    #[test]
    fn in_memory_config_uses_sqlite() {
        assert_eq!(DbConfig::in_memory(), config("sqlite"));
    }

    // ── registration ─────────────────────────────────────────────────────
    #[test]
    fn new_registry_has_no_backends() {
        assert!(RepositoryRegistry::new().available_backends().is_empty());
        assert!(RepositoryRegistry::default().available_backends().is_empty());
    }

    #[test]
    fn available_backends_is_sorted() {
        let mut reg = RepositoryRegistry::new();
        let (f1, _) = stub_factory("sqlite");
        let (f2, _) = stub_factory("postgres");
        reg.register(f1);
        reg.register(f2);
        assert_eq!(reg.available_backends(), vec!["postgres", "sqlite"]);
    }

    #[test]
    fn duplicate_registration_replaces_previous() {
        let mut reg = RepositoryRegistry::new();
        let (old, _) = stub_factory("sqlite");
        let (new, _) = stub_factory("sqlite");
        reg.register(old);
        reg.register(new);
        assert_eq!(reg.available_backends(), vec!["sqlite"]);
    }

    // ── dispatch ─────────────────────────────────────────────────────────
    #[tokio::test]
    async fn create_calls_only_the_matching_factory() {
        let mut reg = RepositoryRegistry::new();
        let (sqlite_factory, sqlite_called) = stub_factory("sqlite");
        let (postgres_factory, postgres_called) = stub_factory("postgres");
        reg.register(sqlite_factory);
        reg.register(postgres_factory);

        let result = reg.create(&config("sqlite")).await;

        assert!(result.is_ok(), "expected Ok, got {:#?}", result.err());
        assert!(sqlite_called.load(Ordering::SeqCst));
        assert!(!postgres_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unknown_backend_names_requested_and_available() {
        let mut reg = RepositoryRegistry::new();
        let (f, _) = stub_factory("sqlite");
        reg.register(f);

        match reg.create(&config("postgres")).await {
            Err(RepositoryError::Configuration(msg)) => {
                assert!(msg.contains("postgres"), "error should name the requested backend");
                assert!(msg.contains("sqlite"), "error should list available backends");
            }
            Err(other) => panic!("expected Configuration error, got {other:#?}"),
            Ok(_) => panic!("expected Configuration error, got a repository"),
        }
    }

    #[tokio::test]
    async fn create_propagates_factory_error() {
        let mut reg = RepositoryRegistry::new();
        reg.register(Box::new(FailingFactory));

        let result = reg.create(&config("failing")).await;

        assert!(matches!(
            result,
            Err(RepositoryError::Connection(msg)) if msg == "intentional failure"
        ));
    }
}
