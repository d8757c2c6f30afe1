use std::sync::Arc;

use clap::{Parser, Subcommand};
use kpi_engine::{
    Clock, DetailRow, KpiEngine, KpiReport, KpiTarget, KpiType, LogSink, NotificationSink,
    OutboxSink, Period, ReportingPeriod, Scorecard, SystemClock,
};

#[derive(Parser)]
#[command(name = "kpi", about = "KPI calculation and daily reporting")]
struct Cli {
    /// Database path (default: ~/.kpi-engine/kpi.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show record counts in the warehouse
    Info,
    /// Calculate indicators for a period (e.g. 2024-01, 2024-Q1, mtd, 30d)
    Calculate {
        period: String,
        /// Only this indicator (e.g. ccti, pca_conversion)
        #[arg(long)]
        kpi: Option<String>,
        /// Include per-record details
        #[arg(long)]
        details: bool,
        #[arg(long)]
        json: bool,
    },
    /// Calculate a period and store one snapshot per indicator
    Snapshot {
        period: String,
        /// Recorded as the snapshot author
        #[arg(long)]
        by: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show stored snapshots for an indicator
    History {
        kpi: String,
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Manage indicator targets
    Target {
        #[command(subcommand)]
        action: TargetAction,
    },
    /// Classify a period's indicators against their targets
    Status {
        #[arg(default_value = "mtd")]
        period: String,
        #[arg(long)]
        json: bool,
    },
    /// Run the daily report (at most once per recipient per day)
    Daily {
        /// Recipient (default: configured default_recipient)
        #[arg(long)]
        recipient: Option<String>,
        /// Write the notification as JSON into this directory instead of logging it
        #[arg(long)]
        outbox: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show the notification log
    Notifications {
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TargetAction {
    /// Set the active target for an indicator over a period
    Set {
        kpi: String,
        period: String,
        value: f64,
        /// Good at or above this value (default: the target)
        #[arg(long)]
        green: Option<f64>,
        /// Warning at or above this value (default: 80% of the target)
        #[arg(long)]
        yellow: Option<f64>,
    },
    /// List active targets
    List {
        #[arg(long)]
        kpi: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => kpi_engine::Database::open_at(path).await?,
        None => kpi_engine::Database::open().await?,
    };
    let engine = KpiEngine::new(db);

    match cli.command {
        Commands::Info => print_info(&engine).await?,
        Commands::Calculate {
            period,
            kpi,
            details,
            json,
        } => {
            let p = resolve_period(&period)?;
            match kpi {
                Some(k) => {
                    let kpi: KpiType = k.parse()?;
                    let result = engine.calculate_one(kpi, p).await?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&result)?);
                    } else {
                        println!("{} ({})", kpi.label(), p);
                        println!("  Value:  {}", format_value(kpi, result.value));
                        println!("  Sample: {}", result.sample_size);
                        if let (Some(n), Some(d)) = (result.numerator, result.denominator) {
                            println!("  Ratio:  {n} / {d}");
                        }
                        print_details(&result.details);
                    }
                }
                None => {
                    let report = engine.calculate(p).await?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        print_report(&report, details);
                    }
                }
            }
        }
        Commands::Snapshot { period, by, json } => {
            let p = resolve_period(&period)?;
            let stored = engine.calculate_and_store(p, by).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stored)?);
            } else {
                println!("Stored {} snapshots for {p}", stored.len());
            }
        }
        Commands::History { kpi, limit, json } => {
            let kpi: KpiType = kpi.parse()?;
            let snapshots = engine.snapshot_history(kpi, limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshots)?);
            } else if snapshots.is_empty() {
                println!("No snapshots for {}.", kpi.label());
            } else {
                println!("{} history", kpi.label());
                for s in &snapshots {
                    let target = s
                        .target_value
                        .map_or_else(|| "-".to_string(), |t| format_value(kpi, t));
                    println!(
                        "  {}..{}  {:>12}  target {:>10}  n={:<5} {} by {}",
                        s.period_start,
                        s.period_end,
                        format_value(kpi, s.value),
                        target,
                        s.sample_size,
                        s.calculated_at.format("%Y-%m-%d %H:%M:%S"),
                        s.calculated_by
                    );
                }
            }
        }
        Commands::Target { action } => handle_target(&engine, action).await?,
        Commands::Status { period, json } => {
            let p = resolve_period(&period)?;
            let card = engine.evaluate(p).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&card)?);
            } else {
                print_scorecard(&card);
            }
        }
        Commands::Daily {
            recipient,
            outbox,
            json,
        } => {
            let sink: Arc<dyn NotificationSink> = match outbox {
                Some(dir) => Arc::new(OutboxSink::new(dir)),
                None => Arc::new(LogSink),
            };
            let outcome = engine.run_daily_report(recipient, sink).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                let status = outcome
                    .status
                    .map_or_else(|| "-".to_string(), |s| s.headline().to_string());
                println!(
                    "{} {} ({}): {}",
                    outcome.date, outcome.recipient, status, outcome.message
                );
            }
            if !outcome.success && !outcome.is_suppressed() {
                anyhow::bail!("daily report for {} failed: {}", outcome.recipient, outcome.message);
            }
        }
        Commands::Notifications { limit, json } => {
            let entries = engine.notifications(limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No notifications logged.");
            } else {
                for e in &entries {
                    println!(
                        "  {}  {:<10} {:<6} {}{}",
                        e.notification_date,
                        e.notification_type,
                        e.status,
                        e.recipient,
                        e.error
                            .as_deref()
                            .map(|err| format!("  ({err})"))
                            .unwrap_or_default()
                    );
                }
            }
        }
        Commands::Config { action } => handle_config(&engine, action).await?,
    }

    Ok(())
}

fn resolve_period(s: &str) -> anyhow::Result<ReportingPeriod> {
    let today = SystemClock.today();
    Ok(Period::parse(s, today)?.resolve(today)?)
}

fn format_value(kpi: KpiType, value: f64) -> String {
    let places = kpi.precision() as usize;
    format!("{value:.places$}{}", kpi.unit())
}

async fn print_info(engine: &KpiEngine) -> anyhow::Result<()> {
    let counts = engine
        .db()
        .reader()
        .call(|conn| {
            let mut out = Vec::new();
            for table in [
                "work_orders",
                "vendor_productivity",
                "kpi_targets",
                "kpi_snapshots",
                "notification_log",
            ] {
                let n: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
                out.push((table, n));
            }
            Ok::<_, rusqlite::Error>(out)
        })
        .await?;

    println!("Warehouse Status");
    for (table, n) in counts {
        println!("  {table:<20} {n}");
    }
    Ok(())
}

fn print_details(details: &[DetailRow]) {
    for row in details {
        match row {
            DetailRow::Timeliness {
                wo_no,
                duration_days,
                spt_hours,
                spt_load,
                component,
            } => println!(
                "    {wo_no:<16} {duration_days:>4}d  SPT(h) {spt_hours:>4}  SPT(kW) {spt_load:>4}  {component:.4}"
            ),
            DetailRow::ProcessingTime {
                wo_no,
                processing_days,
            } => println!("    {wo_no:<16} {processing_days:>4}d"),
            DetailRow::Resolution {
                wo_no,
                duration_days,
                component,
            } => println!("    {wo_no:<16} {duration_days:>4}d  {component:.4}"),
            DetailRow::Breakdown { label, value } => println!("    {label:<16} {value}"),
            DetailRow::Vendor {
                vendor_name,
                accomplishment,
                capability,
                utilization,
                ..
            } => println!(
                "    {vendor_name:<20} {accomplishment:>10} / {capability:<10} {utilization:.2}%"
            ),
        }
    }
}

fn print_report(report: &KpiReport, details: bool) {
    println!("KPI Report ({})", report.period);
    for (kpi, result) in &report.results {
        println!(
            "  {:<20} {:>12}  (n={})",
            kpi.label(),
            format_value(*kpi, result.value),
            result.sample_size
        );
        if details {
            print_details(&result.details);
        }
    }
}

fn print_scorecard(card: &Scorecard) {
    println!("KPI Status ({}): {}", card.period, card.overall.headline());
    for entry in &card.entries {
        let target = entry
            .target
            .as_ref()
            .map_or_else(|| "-".to_string(), |t| format_value(entry.kpi_type, t.target_value));
        println!(
            "  {}{:<20} {:>12}  target {:>10}  {}",
            if entry.is_headline() { "*" } else { " " },
            entry.kpi_type.label(),
            format_value(entry.kpi_type, entry.value),
            target,
            entry.status
        );
    }
}

async fn handle_target(engine: &KpiEngine, action: TargetAction) -> anyhow::Result<()> {
    match action {
        TargetAction::Set {
            kpi,
            period,
            value,
            green,
            yellow,
        } => {
            let kpi: KpiType = kpi.parse()?;
            let p = resolve_period(&period)?;
            let target = KpiTarget::new(kpi, p.start, p.end, value).with_thresholds(green, yellow);
            engine.set_target(target).await?;
            println!("Target for {} over {p} set to {value}.", kpi.label());
        }
        TargetAction::List { kpi, json } => {
            let kpi = kpi.map(|k| k.parse::<KpiType>()).transpose()?;
            let targets = engine.list_targets(kpi).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&targets)?);
            } else if targets.is_empty() {
                println!("No targets set.");
            } else {
                for t in &targets {
                    println!(
                        "  {:<20} {}..{}  target {}  green {:.2}  yellow {:.2}",
                        t.kpi_type.label(),
                        t.period_start,
                        t.period_end,
                        t.target_value,
                        t.green(),
                        t.yellow()
                    );
                }
            }
        }
    }
    Ok(())
}

async fn handle_config(engine: &KpiEngine, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match engine.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            engine.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = engine.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
            let effective = engine.config().await?;
            println!("\nEffective:\n{}", serde_json::to_string_pretty(&effective)?);
        }
    }
    Ok(())
}
