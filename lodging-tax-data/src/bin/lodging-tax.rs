use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Months, NaiveDate};
use clap::{Parser, Subcommand};
use lodging_tax_core::{
    CategoryAttribution, LodgingTaxRepository, MonthOverview, MonthlyAggregator, PaymentStatus,
    RepositoryRegistry, Reservation, ReservationFilter, ReportHeader, TaxTable,
};
use lodging_tax_data::{
    AppConfig, ImportError, ReservationImporter, TaxBracketLoader, logging, render_report,
};
use lodging_tax_db_sqlite::SqliteRepositoryFactory;
use tracing::info;

const TAX_MASTER_RESET_EVENT: &str = "tax_master_reset";
const PAYMENT_EVENT: &str = "payment";
const SETTINGS_UPDATE_EVENT: &str = "settings_update";

/// Accommodation tax bookkeeping for small lodging businesses.
///
/// Imports booking-channel reservation exports, derives each stay's tax from
/// the municipality's bracket table and prints the monthly filing sheet.
#[derive(Parser, Debug)]
#[command(name = "lodging-tax")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (default: ./lodging-tax.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend, overriding the configuration file
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database location, e.g. lodging_tax.db or :memory:
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log filter when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import reservations from a CSV or TSV export
    Import { file: PathBuf },

    /// Print the monthly report
    Report {
        year: i32,
        month: u32,

        /// Place each reservation under the column of its own tax per
        /// person per night instead of the configured rate
        #[arg(long, default_value_t = false)]
        per_reservation: bool,
    },

    /// Show or replace the tax bracket table
    Brackets {
        #[command(subcommand)]
        action: BracketsAction,
    },

    /// List reservations, newest check-in first
    List {
        /// Guest name substring
        #[arg(long)]
        guest: Option<String>,

        /// paid or unpaid
        #[arg(long, value_parser = parse_status)]
        status: Option<PaymentStatus>,

        /// Earliest check-in date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Latest check-in date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Find reservations by exact number or guest name substring
    Search { query: String },

    /// Record a reservation's tax as paid
    Pay {
        reservation_number: String,
        reference: String,
    },

    /// Show or change system settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Show recent audit log entries
    Events {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Subcommand, Debug)]
enum BracketsAction {
    /// Print every municipality's brackets
    List,
    /// Replace the table with a CSV file
    /// (municipality,from_amount,to_amount,tax_amount[,sort_order])
    Load { file: PathBuf },
    /// Restore the built-in schedules
    Reset,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    List,
    Set { key: String, value: String },
}

fn parse_status(s: &str) -> Result<PaymentStatus, String> {
    PaymentStatus::parse(s).ok_or_else(|| format!("expected 'paid' or 'unpaid', got '{s}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(backend) = args.backend {
        config.database.backend = backend;
    }
    if let Some(db) = args.db {
        config.database.connection_string = db;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    logging::init_logging(&config.logging)?;

    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));

    let repo = registry.create(&config.database).await.with_context(|| {
        format!(
            "Failed to open {} database: {}",
            config.database.backend, config.database.connection_string
        )
    })?;
    let repo = repo.as_ref();

    match args.command {
        Command::Import { file } => import(repo, &file).await,
        Command::Report {
            year,
            month,
            per_reservation,
        } => report(repo, year, month, per_reservation).await,
        Command::Brackets { action } => brackets(repo, action).await,
        Command::List {
            guest,
            status,
            from,
            to,
        } => {
            let filter = ReservationFilter {
                guest_name: guest,
                status,
                checkin_from: from,
                checkin_to: to,
            };
            let reservations = repo.list_reservations(&filter).await?;
            print_reservations(&reservations);
            Ok(())
        }
        Command::Search { query } => {
            let reservations = repo.search_reservations(&query).await?;
            print_reservations(&reservations);
            Ok(())
        }
        Command::Pay {
            reservation_number,
            reference,
        } => pay(repo, &reservation_number, &reference).await,
        Command::Settings { action } => settings(repo, action).await,
        Command::Events { limit } => {
            for event in repo.recent_events(limit).await? {
                println!(
                    "{}  {:<18} {}",
                    event.created_at.format("%Y-%m-%d %H:%M:%S"),
                    event.event_type,
                    event.description
                );
            }
            Ok(())
        }
    }
}

async fn import(
    repo: &dyn LodgingTaxRepository,
    file: &Path,
) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read: {}", file.display()))?;

    let summary = match ReservationImporter::default().import(repo, &bytes).await {
        Ok(summary) => summary,
        Err(e @ ImportError::MissingColumns { .. }) => {
            println!("Imported 0, skipped 0");
            return Err(e).with_context(|| format!("Cannot import {}", file.display()));
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to import {}", file.display())),
    };

    println!("Imported {}, skipped {}", summary.imported, summary.skipped);
    for error in &summary.errors {
        println!("  {error}");
    }
    Ok(())
}

async fn report(
    repo: &dyn LodgingTaxRepository,
    year: i32,
    month: u32,
    per_reservation: bool,
) -> Result<()> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        bail!("invalid month {year}-{month:02}");
    };
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .context("month out of range")?;

    let settings = repo.get_settings().await?;
    let table = repo.load_tax_table().await?;
    let attribution = if per_reservation {
        CategoryAttribution::PerReservation
    } else {
        CategoryAttribution::ConfiguredRate
    };

    let paid = repo.get_paid_reservations_for_month(year, month).await?;
    let report = MonthlyAggregator::new(settings.report_tax_rate(&table))
        .with_attribution(attribution)
        .aggregate(year, month, &paid)?;

    let checked_in = repo
        .list_reservations(&ReservationFilter {
            checkin_from: Some(first),
            checkin_to: Some(last),
            ..ReservationFilter::default()
        })
        .await?;
    let overview = MonthOverview::from_reservations(&checked_in);

    info!(year, month, paid = paid.len(), total_tax = %report.total_tax, "monthly report built");
    print!(
        "{}",
        render_report(&ReportHeader::from_settings(&settings, year, month), &overview, &report)
    );
    Ok(())
}

async fn brackets(
    repo: &dyn LodgingTaxRepository,
    action: BracketsAction,
) -> Result<()> {
    match action {
        BracketsAction::List => {
            let table = TaxTable::new(repo.get_tax_brackets().await?);
            for municipality in table.municipalities() {
                println!("{municipality}");
                for bracket in table.brackets_for(municipality) {
                    let to = bracket
                        .to_amount
                        .map(|t| t.to_string())
                        .unwrap_or_default();
                    println!(
                        "  {:>3}  {:>9} - {:<9}  {:>6}",
                        bracket.sort_order, bracket.from_amount, to, bracket.tax_amount
                    );
                }
            }
        }
        BracketsAction::Load { file } => {
            let reader = File::open(&file)
                .with_context(|| format!("Failed to open: {}", file.display()))?;
            let records = TaxBracketLoader::parse(reader)
                .with_context(|| format!("Failed to parse CSV: {}", file.display()))?;
            let loaded = TaxBracketLoader::load(repo, &records)
                .await
                .context("Failed to load tax brackets")?;
            println!("Loaded {loaded} tax brackets from {}", file.display());
        }
        BracketsAction::Reset => {
            repo.reset_tax_brackets().await?;
            repo.log_event(TAX_MASTER_RESET_EVENT, "restored default tax brackets")
                .await?;
            println!("Restored default tax brackets");
        }
    }
    Ok(())
}

async fn pay(
    repo: &dyn LodgingTaxRepository,
    reservation_number: &str,
    reference: &str,
) -> Result<()> {
    let reservation = repo
        .mark_paid(reservation_number, reference)
        .await
        .with_context(|| format!("Failed to mark {reservation_number} as paid"))?;
    repo.log_event(
        PAYMENT_EVENT,
        &format!(
            "{} paid {} (ref {reference})",
            reservation.reservation_number, reservation.accommodation_tax
        ),
    )
    .await?;

    println!(
        "{} marked paid, tax {}",
        reservation.reservation_number, reservation.accommodation_tax
    );
    Ok(())
}

async fn settings(
    repo: &dyn LodgingTaxRepository,
    action: SettingsAction,
) -> Result<()> {
    match action {
        SettingsAction::List => {
            for (key, value) in repo.list_settings().await? {
                println!("{key} = {value}");
            }
        }
        SettingsAction::Set { key, value } => {
            repo.save_setting(&key, &value).await?;
            repo.log_event(SETTINGS_UPDATE_EVENT, &format!("{key} = {value}"))
                .await?;
            println!("{key} = {value}");
        }
    }
    Ok(())
}

fn print_reservations(reservations: &[Reservation]) {
    if reservations.is_empty() {
        println!("No reservations found");
        return;
    }

    for r in reservations {
        println!(
            "{:<14} {:<20} {} - {}  {:>2}p {:>2}n  fee {:>10}  tax {:>7}  {}",
            r.reservation_number,
            r.guest_name,
            r.checkin_date,
            r.checkout_date,
            r.num_persons,
            r.num_nights,
            r.total_fee,
            r.accommodation_tax,
            r.payment_status
        );
    }
}
