use analytics::{AnalysisPayload, AnalyticsError, AnalyticsService, ReportPayload};
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{LoggingSettings, ServerArgs, Settings};
use core_types::RangeHint;
use database::{DbRepository, connect, run_migrations};
use futures::future::join_all;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// The main entry point for the Coinscope analytics application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut settings = configuration::load_config()?;
    // Held for the whole run so buffered file logs are flushed on exit.
    let _guard = init_tracing(&settings.logging)?;

    match cli.command {
        Commands::Serve(args) => {
            settings.server.apply_args(&args);
            web_server::run_server(settings).await?;
        }
        Commands::Analyze(args) => handle_analyze(args, settings).await?,
    }
    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Technical and statistical analytics over stored crypto price history.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API consumed by the dashboard.
    Serve(ServerArgs),
    /// Print a summary of one or more coins to the terminal.
    Analyze(AnalyzeArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// Coin identifier as stored in `market_data`.
    /// Repeatable, e.g. `--coin bitcoin --coin ethereum`.
    #[arg(long = "coin", required = true)]
    coins: Vec<String>,

    /// Only use the last N days of history.
    #[arg(long)]
    days: Option<u32>,

    /// Print the full report payloads as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

// ==============================================================================
// Logging
// ==============================================================================

/// Stdout logging filtered by `RUST_LOG` (falling back to the configured level),
/// plus a daily rolling file when a log directory is configured.
fn init_tracing(logging: &LoggingSettings) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let stdout_layer = tracing_subscriber::fmt::layer().with_filter(filter());

    let (file_layer, guard) = match &logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "coinscope.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;
    Ok(guard)
}

// ==============================================================================
// Analyze Command Logic
// ==============================================================================

async fn handle_analyze(args: AnalyzeArgs, settings: Settings) -> anyhow::Result<()> {
    let db_pool = connect(&settings.database).await?;
    run_migrations(&db_pool).await?;
    let service = AnalyticsService::new(
        Arc::new(DbRepository::new(db_pool)),
        &settings.loader,
        settings.analysis,
    );
    let range = RangeHint::from_days(args.days);

    // Each coin loads and computes independently.
    let tasks = args.coins.iter().map(|coin| {
        let service = service.clone();
        async move {
            let analysis = service.analysis(coin, range).await?;
            let report = service.report(coin, range).await?;
            Ok::<_, AnalyticsError>((analysis, report))
        }
    });
    let rows = successful(&args.coins, join_all(tasks).await)?;

    if args.json {
        let reports: Vec<&ReportPayload> = rows.iter().map(|(_, report)| report).collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("{}", summary_table(&rows));
    }
    Ok(())
}

/// Keeps the coins that succeeded, reporting the rest. Fails when none did.
fn successful<T>(
    coins: &[String],
    results: Vec<Result<T, AnalyticsError>>,
) -> anyhow::Result<Vec<T>> {
    let mut rows = Vec::new();
    for (coin, result) in coins.iter().zip(results) {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                tracing::error!(coin = coin.as_str(), error = %e, "Analysis failed.");
                eprintln!("{coin}: {e}");
            }
        }
    }
    if rows.is_empty() {
        anyhow::bail!("analysis failed for every requested coin");
    }
    Ok(rows)
}

fn summary_table(rows: &[(AnalysisPayload, ReportPayload)]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Coin",
        "Price",
        "RSI",
        "MACD",
        "Trend",
        "Cum. Return %",
        "Sharpe",
        "Max DD %",
        "VaR 95 %",
        "Anomalies",
        "Complete %",
    ]);

    for (analysis, report) in rows {
        let rsi = match (analysis.indicators.rsi, analysis.indicators.rsi_signal) {
            (Some(v), Some(signal)) => format!("{v:.1} ({signal:?})"),
            _ => "-".to_string(),
        };
        table.add_row(vec![
            analysis.coin.clone(),
            analysis.current_price.to_string(),
            rsi,
            analysis
                .indicators
                .macd_trend
                .map_or("-".to_string(), |t| format!("{t:?}")),
            analysis.trend.direction.to_string(),
            fmt_opt(report.returns_analysis.cumulative_return),
            fmt_opt(report.risk_analysis.sharpe_ratio),
            fmt_opt(report.risk_analysis.max_drawdown),
            fmt_opt(report.risk_analysis.var_historic_95),
            report.anomaly_detection.total_anomalies.to_string(),
            format!("{:.2}", report.data_quality.data_completeness),
        ]);
    }
    table
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}
