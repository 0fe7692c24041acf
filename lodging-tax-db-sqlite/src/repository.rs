use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Months, NaiveDate, Utc};
use lodging_tax_core::defaults::default_tax_brackets;
use lodging_tax_core::{
    AuditEvent, LodgingTaxRepository, NewReservation, PaymentStatus, RepositoryError, Reservation,
    ReservationFilter, TaxBracket,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Decode, Row, Sqlite, Type};
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal};

const RESERVATION_COLUMNS: &str = "id, reservation_number, guest_name, checkin_date, checkout_date,
    num_persons, num_nights, total_fee, accommodation_tax, payment_status, payment_date,
    payment_reference, created_at";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open a database file, creating it if needed. `:memory:` opens a
    /// private in-memory database; `sqlite:` URLs are passed through.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let in_memory = matches!(connection_string, ":memory:" | "sqlite::memory:");

        let base = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else if connection_string.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(connection_string)
                .with_context(|| format!("Invalid database URL: {connection_string}"))?
        } else {
            SqliteConnectOptions::new().filename(connection_string)
        };
        let options = base.create_if_missing(true).foreign_keys(true);

        // Every in-memory connection is its own database, so keep exactly
        // one and never let it expire.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {connection_string}"))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "applied seed file");
        }

        Ok(())
    }

    /// Install the built-in tax schedules when the bracket table is empty.
    /// Returns whether anything was written.
    pub async fn seed_default_brackets(&self) -> Result<bool, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tax_brackets")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if count > 0 {
            return Ok(false);
        }

        self.replace_brackets(&default_tax_brackets()).await?;
        info!("seeded default tax brackets");
        Ok(true)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn replace_brackets(
        &self,
        brackets: &[TaxBracket],
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        sqlx::query("DELETE FROM tax_brackets")
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        for bracket in brackets {
            sqlx::query(
                "INSERT INTO tax_brackets (municipality, from_amount, to_amount, tax_amount, sort_order)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&bracket.municipality)
            .bind(bracket.from_amount)
            .bind(bracket.to_amount)
            .bind(bracket.tax_amount)
            .bind(bracket.sort_order)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        debug!(count = brackets.len(), "replaced tax brackets");
        Ok(())
    }

    async fn fetch_reservations(
        &self,
        sql: &str,
        binds: &[Option<String>],
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(value.clone());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_reservation).collect()
    }
}

fn column<'r, T>(
    row: &'r SqliteRow,
    name: &str,
) -> Result<T, RepositoryError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| RepositoryError::Database(e.to_string()))
}

fn row_to_reservation(row: &SqliteRow) -> Result<Reservation, RepositoryError> {
    let status: String = column(row, "payment_status")?;
    let payment_status = PaymentStatus::parse(&status)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid payment status: {status}")))?;

    Ok(Reservation {
        id: column(row, "id")?,
        reservation_number: column(row, "reservation_number")?,
        guest_name: column(row, "guest_name")?,
        checkin_date: column(row, "checkin_date")?,
        checkout_date: column(row, "checkout_date")?,
        num_persons: column(row, "num_persons")?,
        num_nights: column(row, "num_nights")?,
        total_fee: get_decimal(row, "total_fee")?,
        accommodation_tax: get_decimal(row, "accommodation_tax")?,
        payment_status,
        payment_date: column(row, "payment_date")?,
        payment_reference: column(row, "payment_reference")?,
        created_at: column(row, "created_at")?,
    })
}

fn row_to_tax_bracket(row: &SqliteRow) -> Result<TaxBracket, RepositoryError> {
    Ok(TaxBracket {
        municipality: column(row, "municipality")?,
        from_amount: column(row, "from_amount")?,
        to_amount: column(row, "to_amount")?,
        tax_amount: column(row, "tax_amount")?,
        sort_order: column(row, "sort_order")?,
    })
}

fn row_to_audit_event(row: &SqliteRow) -> Result<AuditEvent, RepositoryError> {
    Ok(AuditEvent {
        id: column(row, "id")?,
        event_type: column(row, "event_type")?,
        description: column(row, "description")?,
        created_at: column(row, "created_at")?,
    })
}

/// `LIKE` pattern matching `text` anywhere, with `%`, `_` and the escape
/// character itself taken literally. Use with `ESCAPE '\'`.
fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// First and last day of a calendar month.
fn month_bounds(
    year: i32,
    month: u32,
) -> Result<(NaiveDate, NaiveDate), RepositoryError> {
    let invalid = || RepositoryError::Configuration(format!("invalid month {year}-{month:02}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;
    Ok((first, last))
}

#[async_trait]
impl LodgingTaxRepository for SqliteRepository {
    async fn list_municipalities(&self) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT municipality FROM tax_brackets
             GROUP BY municipality
             ORDER BY MIN(id)",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn get_tax_brackets(&self) -> Result<Vec<TaxBracket>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT municipality, from_amount, to_amount, tax_amount, sort_order
             FROM tax_brackets
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_tax_bracket).collect()
    }

    async fn save_tax_brackets(
        &self,
        brackets: &[TaxBracket],
    ) -> Result<(), RepositoryError> {
        self.replace_brackets(brackets).await?;
        info!(count = brackets.len(), "saved tax brackets");
        Ok(())
    }

    async fn reset_tax_brackets(&self) -> Result<(), RepositoryError> {
        self.replace_brackets(&default_tax_brackets()).await?;
        info!("reset tax brackets to defaults");
        Ok(())
    }

    async fn reservation_exists(
        &self,
        reservation_number: &str,
    ) -> Result<bool, RepositoryError> {
        let (exists,): (i64,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM reservations WHERE reservation_number = ?)",
        )
        .bind(reservation_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(exists != 0)
    }

    async fn insert_reservation(
        &self,
        reservation: &NewReservation,
    ) -> Result<Reservation, RepositoryError> {
        sqlx::query(
            "INSERT INTO reservations (
                reservation_number, guest_name, checkin_date, checkout_date,
                num_persons, num_nights, total_fee, accommodation_tax,
                payment_status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&reservation.reservation_number)
        .bind(&reservation.guest_name)
        .bind(reservation.checkin_date)
        .bind(reservation.checkout_date)
        .bind(reservation.num_persons)
        .bind(reservation.num_nights)
        .bind(decimal_to_text(reservation.total_fee))
        .bind(decimal_to_text(reservation.accommodation_tax))
        .bind(reservation.payment_status.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RepositoryError::Duplicate(reservation.reservation_number.clone())
            }
            _ => RepositoryError::Database(e.to_string()),
        })?;

        self.get_reservation(&reservation.reservation_number).await
    }

    async fn get_reservation(
        &self,
        reservation_number: &str,
    ) -> Result<Reservation, RepositoryError> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE reservation_number = ?");
        let row = sqlx::query(&sql)
            .bind(reservation_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?
            .ok_or(RepositoryError::NotFound)?;

        row_to_reservation(&row)
    }

    async fn list_reservations(
        &self,
        filter: &ReservationFilter,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        // Each criterion is skipped when its parameter is NULL.
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE (?1 IS NULL OR guest_name LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR payment_status = ?2)
               AND (?3 IS NULL OR checkin_date >= ?3)
               AND (?4 IS NULL OR checkin_date <= ?4)
             ORDER BY checkin_date DESC, id DESC"
        );
        let binds = [
            filter
                .guest_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(contains_pattern),
            filter.status.map(|s| s.as_str().to_string()),
            filter.checkin_from.map(|d| d.to_string()),
            filter.checkin_to.map(|d| d.to_string()),
        ];

        self.fetch_reservations(&sql, &binds).await
    }

    async fn search_reservations(
        &self,
        query: &str,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE reservation_number = ?1 OR guest_name LIKE ?2 ESCAPE '\\'
             ORDER BY checkin_date DESC, id DESC"
        );

        self.fetch_reservations(&sql, &[Some(query.to_string()), Some(contains_pattern(query))])
            .await
    }

    async fn get_paid_reservations_for_month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let (first, last) = month_bounds(year, month)?;

        // A stay overlaps the month when it checks in on or before the last
        // day and its final night falls on or after the first day.
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE payment_status = 'paid'
               AND num_nights > 0
               AND checkin_date <= ?2
               AND date(checkin_date, '+' || (num_nights - 1) || ' days') >= ?1
             ORDER BY checkin_date, id"
        );

        let reservations = self
            .fetch_reservations(&sql, &[Some(first.to_string()), Some(last.to_string())])
            .await?;
        debug!(year, month, count = reservations.len(), "loaded paid reservations for month");
        Ok(reservations)
    }

    async fn mark_paid(
        &self,
        reservation_number: &str,
        payment_reference: &str,
    ) -> Result<Reservation, RepositoryError> {
        let result = sqlx::query(
            "UPDATE reservations
             SET payment_status = 'paid', payment_date = ?, payment_reference = ?
             WHERE reservation_number = ?",
        )
        .bind(Utc::now())
        .bind(payment_reference)
        .bind(reservation_number)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get_reservation(reservation_number).await
    }

    async fn get_setting(
        &self,
        key: &str,
    ) -> Result<Option<String>, RepositoryError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM system_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|(value,)| value))
    }

    async fn list_settings(&self) -> Result<Vec<(String, String)>, RepositoryError> {
        sqlx::query_as("SELECT key, value FROM system_settings ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    async fn save_setting(
        &self,
        key: &str,
        value: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO system_settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn log_event(
        &self,
        event_type: &str,
        description: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO audit_log (event_type, description, created_at) VALUES (?, ?, ?)")
            .bind(event_type)
            .bind(description)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn recent_events(
        &self,
        limit: u32,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, event_type, description, created_at
             FROM audit_log
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_audit_event).collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let repo = SqliteRepository::new(":memory:")
            .await
            .expect("Failed to create in-memory database");
        repo.run_migrations().await.expect("Failed to run migrations");
        repo
    }

    fn date(
        y: i32,
        m: u32,
        d: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_reservation(
        number: &str,
        guest: &str,
        checkin: NaiveDate,
        nights: i32,
    ) -> NewReservation {
        NewReservation {
            reservation_number: number.to_string(),
            guest_name: guest.to_string(),
            checkin_date: checkin,
            checkout_date: checkin + chrono::Days::new(nights as u64),
            num_persons: 2,
            num_nights: nights,
            total_fee: dec!(30000.50),
            accommodation_tax: Decimal::from(600 * nights),
            payment_status: PaymentStatus::Unpaid,
        }
    }

    fn bracket(
        municipality: &str,
        from: i64,
        to: Option<i64>,
        tax: i64,
        sort_order: i32,
    ) -> TaxBracket {
        TaxBracket {
            municipality: municipality.to_string(),
            from_amount: from,
            to_amount: to,
            tax_amount: tax,
            sort_order,
        }
    }

    // =========================================================================
    // Tax brackets
    // =========================================================================

    #[tokio::test]
    async fn test_seed_default_brackets_only_when_empty() {
        let repo = setup_test_db().await;

        assert!(repo.seed_default_brackets().await.unwrap());
        assert!(!repo.seed_default_brackets().await.unwrap());

        let brackets = repo.get_tax_brackets().await.unwrap();
        assert_eq!(brackets, default_tax_brackets());
    }

    #[tokio::test]
    async fn test_save_tax_brackets_replaces_everything() {
        let repo = setup_test_db().await;
        repo.seed_default_brackets().await.unwrap();

        let replacement = vec![
            bracket("X", 0, Some(19999), 300, 1),
            bracket("X", 20000, None, 400, 2),
        ];
        repo.save_tax_brackets(&replacement).await.unwrap();

        assert_eq!(repo.get_tax_brackets().await.unwrap(), replacement);
        assert_eq!(repo.list_municipalities().await.unwrap(), vec!["X"]);
    }

    #[tokio::test]
    async fn test_list_municipalities_uses_insertion_order() {
        let repo = setup_test_db().await;
        repo.save_tax_brackets(&[
            bracket("函館市", 0, None, 200, 1),
            bracket("Abashiri", 0, None, 100, 1),
            bracket("函館市", 100, None, 300, 2),
        ])
        .await
        .unwrap();

        assert_eq!(
            repo.list_municipalities().await.unwrap(),
            vec!["函館市", "Abashiri"]
        );
    }

    #[tokio::test]
    async fn test_reset_tax_brackets_restores_defaults() {
        let repo = setup_test_db().await;
        repo.save_tax_brackets(&[bracket("X", 0, None, 1, 1)])
            .await
            .unwrap();

        repo.reset_tax_brackets().await.unwrap();

        let table = repo.load_tax_table().await.unwrap();
        assert_eq!(table.municipalities().len(), 7);
        assert_eq!(table.resolve("札幌市", dec!(20000)), dec!(400));
    }

    // =========================================================================
    // Reservations
    // =========================================================================

    #[tokio::test]
    async fn test_insert_and_get_reservation() {
        let repo = setup_test_db().await;
        let new = new_reservation("R-1", "Yamada Taro", date(2025, 3, 1), 2);

        let created = repo.insert_reservation(&new).await.unwrap();

        assert!(created.id > 0);
        assert_eq!(created.total_fee, dec!(30000.50));
        assert_eq!(created.accommodation_tax, dec!(1200));
        assert_eq!(created.checkout_date, date(2025, 3, 3));
        assert_eq!(created.payment_status, PaymentStatus::Unpaid);
        assert_eq!(created.payment_date, None);

        let fetched = repo.get_reservation("R-1").await.unwrap();
        assert_eq!(fetched, created);
        assert!(repo.reservation_exists("R-1").await.unwrap());
        assert!(!repo.reservation_exists("R-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_duplicate_number_is_rejected() {
        let repo = setup_test_db().await;
        let new = new_reservation("R-1", "Guest", date(2025, 3, 1), 1);
        repo.insert_reservation(&new).await.unwrap();

        let mut again = new.clone();
        again.guest_name = "Someone else".to_string();
        let result = repo.insert_reservation(&again).await;

        assert_eq!(result, Err(RepositoryError::Duplicate("R-1".to_string())));
        assert_eq!(repo.get_reservation("R-1").await.unwrap().guest_name, "Guest");
    }

    #[tokio::test]
    async fn test_get_missing_reservation_is_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_reservation("nope").await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_mark_paid_sets_status_date_and_reference() {
        let repo = setup_test_db().await;
        repo.insert_reservation(&new_reservation("R-1", "Guest", date(2025, 3, 1), 1))
            .await
            .unwrap();

        let paid = repo.mark_paid("R-1", "pi_123").await.unwrap();

        assert!(paid.is_paid());
        assert!(paid.payment_date.is_some());
        assert_eq!(paid.payment_reference.as_deref(), Some("pi_123"));
        assert_eq!(repo.mark_paid("R-404", "x").await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_reservations_filters_and_orders() {
        let repo = setup_test_db().await;
        repo.insert_reservation(&new_reservation("R-1", "Yamada Taro", date(2025, 3, 1), 1))
            .await
            .unwrap();
        repo.insert_reservation(&new_reservation("R-2", "Suzuki Hanako", date(2025, 3, 10), 1))
            .await
            .unwrap();
        repo.insert_reservation(&new_reservation("R-3", "yamada jiro", date(2025, 4, 2), 1))
            .await
            .unwrap();
        repo.mark_paid("R-3", "ref").await.unwrap();

        let all = repo.list_reservations(&ReservationFilter::default()).await.unwrap();
        let numbers: Vec<_> = all.iter().map(|r| r.reservation_number.as_str()).collect();
        assert_eq!(numbers, vec!["R-3", "R-2", "R-1"]);

        let yamadas = repo
            .list_reservations(&ReservationFilter {
                guest_name: Some("YAMADA".to_string()),
                ..ReservationFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(yamadas.len(), 2);

        let unpaid_in_march = repo
            .list_reservations(&ReservationFilter {
                status: Some(PaymentStatus::Unpaid),
                checkin_from: Some(date(2025, 3, 5)),
                checkin_to: Some(date(2025, 3, 31)),
                ..ReservationFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(unpaid_in_march.len(), 1);
        assert_eq!(unpaid_in_march[0].reservation_number, "R-2");
    }

    #[tokio::test]
    async fn test_search_by_number_or_name() {
        let repo = setup_test_db().await;
        repo.insert_reservation(&new_reservation("ABC-1", "Tanaka", date(2025, 3, 1), 1))
            .await
            .unwrap();
        repo.insert_reservation(&new_reservation("ABC-2", "Sato", date(2025, 3, 2), 1))
            .await
            .unwrap();

        let by_number = repo.search_reservations("ABC-2").await.unwrap();
        assert_eq!(by_number.len(), 1);
        assert_eq!(by_number[0].guest_name, "Sato");

        let by_name = repo.search_reservations("tana").await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].reservation_number, "ABC-1");

        assert!(repo.search_reservations("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_name_search_treats_wildcards_literally() {
        let repo = setup_test_db().await;
        repo.insert_reservation(&new_reservation("W-1", "100% Tours", date(2025, 3, 1), 1))
            .await
            .unwrap();
        repo.insert_reservation(&new_reservation("W-2", "A_B Travel", date(2025, 3, 2), 1))
            .await
            .unwrap();
        repo.insert_reservation(&new_reservation("W-3", "AXB Travel", date(2025, 3, 3), 1))
            .await
            .unwrap();

        assert_eq!(repo.search_reservations("%").await.unwrap().len(), 1);
        let underscore = repo.search_reservations("a_b").await.unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].reservation_number, "W-2");

        let filter = ReservationFilter {
            guest_name: Some("_".to_string()),
            ..ReservationFilter::default()
        };
        let listed = repo.list_reservations(&filter).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].reservation_number, "W-2");
    }

    #[tokio::test]
    async fn test_paid_reservations_for_month_include_overlapping_stays() {
        let repo = setup_test_db().await;
        let stays = [
            ("IN-MONTH", date(2025, 2, 10), 2),
            ("FROM-JAN", date(2025, 1, 30), 3),  // nights 30, 31 Jan, 1 Feb
            ("ENDS-JAN", date(2025, 1, 30), 2),  // nights 30, 31 Jan
            ("INTO-MAR", date(2025, 2, 28), 3),
            ("MARCH", date(2025, 3, 1), 1),
        ];
        for (number, checkin, nights) in stays {
            repo.insert_reservation(&new_reservation(number, "Guest", checkin, nights))
                .await
                .unwrap();
            repo.mark_paid(number, "ref").await.unwrap();
        }
        repo.insert_reservation(&new_reservation("UNPAID", "Guest", date(2025, 2, 5), 1))
            .await
            .unwrap();

        let february = repo.get_paid_reservations_for_month(2025, 2).await.unwrap();

        let numbers: Vec<_> = february.iter().map(|r| r.reservation_number.as_str()).collect();
        assert_eq!(numbers, vec!["FROM-JAN", "IN-MONTH", "INTO-MAR"]);
    }

    #[tokio::test]
    async fn test_paid_reservations_rejects_invalid_month() {
        let repo = setup_test_db().await;

        assert!(matches!(
            repo.get_paid_reservations_for_month(2025, 13).await,
            Err(RepositoryError::Configuration(_))
        ));
    }

    // =========================================================================
    // Settings and audit log
    // =========================================================================

    #[tokio::test]
    async fn test_settings_round_trip() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_setting("municipality").await.unwrap(), None);

        repo.save_setting("municipality", "小樽市").await.unwrap();
        repo.save_setting("municipality", "函館市").await.unwrap();
        repo.save_setting("tax_number", "T-9").await.unwrap();

        assert_eq!(
            repo.get_setting("municipality").await.unwrap(),
            Some("函館市".to_string())
        );
        let settings = repo.get_settings().await.unwrap();
        assert_eq!(settings.municipality, "函館市");
        assert_eq!(settings.tax_number, "T-9");
        assert_eq!(settings.tax_rate_per_person_per_night, dec!(300));
    }

    #[tokio::test]
    async fn test_audit_log_newest_first() {
        let repo = setup_test_db().await;
        repo.log_event("csv_import", "imported 3").await.unwrap();
        repo.log_event("tax_master_reset", "reset").await.unwrap();

        let events = repo.recent_events(10).await.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "tax_master_reset");
        assert_eq!(events[1].description, "imported 3");
        assert_eq!(repo.recent_events(1).await.unwrap().len(), 1);
    }
}
