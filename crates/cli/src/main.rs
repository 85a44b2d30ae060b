use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use moneyfi_core::advisor::http::HttpAdvisorBackend;
use moneyfi_core::advisor::poller::PollConfig;
use moneyfi_core::advisor::error::AdvisorError;
use moneyfi_core::advisor::Advisor;
use moneyfi_core::cache::LocalStore;
use moneyfi_core::domain::{Objective, Report, RiskAppetite, UserProfile};
use moneyfi_core::projection::{self, ProjectionRates};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod render;

#[derive(Debug, Parser)]
#[command(name = "moneyfi", about = "Investment advisory client")]
struct Cli {
    /// Backend base URL. Overrides ADVISOR_BASE_URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory for the local result cache. Overrides MONEYFI_CACHE_DIR.
    #[arg(long, global = true)]
    cache_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a questionnaire and wait for the portfolio report.
    Analyze(AnalyzeArgs),
    /// Show the last cached report.
    Last,
    /// Project SIP growth against FD and LIC-style plans.
    Project(ProjectArgs),
    /// Store the api token used for backend requests.
    Login {
        token: String,
    },
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Amount invested every month.
    #[arg(long)]
    monthly: f64,

    /// Years to reach the goal (1-40).
    #[arg(long)]
    years: u32,

    #[arg(long)]
    age: u32,

    /// e.g. "Marriage", "child-education", "retirement".
    #[arg(long)]
    objective: Objective,

    /// Conservative, Moderate or Aggressive.
    #[arg(long)]
    risk: RiskAppetite,

    #[arg(long)]
    max_attempts: Option<u32>,

    #[arg(long)]
    interval_secs: Option<u64>,

    /// Do not write the result or profile to the local cache.
    #[arg(long)]
    no_cache: bool,

    /// Print the raw result payload as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ProjectArgs {
    #[arg(long)]
    monthly: f64,

    #[arg(long, default_value_t = 10)]
    years: u32,

    #[arg(long, default_value = "Moderate")]
    risk: RiskAppetite,

    /// Expected strategy return, e.g. "12%" or "10-12% p.a.".
    #[arg(long)]
    rate: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = moneyfi_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let cli = Cli::parse();
    if let Some(url) = cli.base_url {
        settings.advisor_base_url = url;
    }
    if let Some(dir) = cli.cache_dir {
        settings.cache_dir = dir;
    }
    let store = LocalStore::new(&settings.cache_dir);

    match cli.command {
        Command::Analyze(args) => analyze(&settings, &store, args).await,
        Command::Last => show_last(&store),
        Command::Project(args) => project(args),
        Command::Login { token } => {
            store.save_token(&token)?;
            tracing::info!(cache_dir = %store.dir().display(), "api token stored");
            Ok(())
        }
    }
}

async fn analyze(
    settings: &moneyfi_core::config::Settings,
    store: &LocalStore,
    args: AnalyzeArgs,
) -> anyhow::Result<()> {
    let profile = UserProfile::try_new(args.monthly, args.years, args.age, args.objective, args.risk)?;

    let poll_config = PollConfig::new(
        args.max_attempts.unwrap_or(settings.poll_max_attempts),
        Duration::from_secs(args.interval_secs.unwrap_or(settings.poll_interval_secs)),
    )?;
    let backend = HttpAdvisorBackend::from_settings(settings, Some(store))?;
    if !backend.has_token() {
        tracing::debug!("no api token configured; sending unauthenticated requests");
    }
    let advisor = Advisor::new(backend, poll_config);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    eprintln!("Analyzing your profile, this can take a few minutes...");
    let analysis = match advisor.analyze(profile.clone(), &cancel).await {
        Ok(analysis) => analysis,
        Err(err) => {
            let (err_msg, incident) = classify_failure(err);
            if let Some(err) = incident {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "analysis failed");
            }
            anyhow::bail!("{err_msg}");
        }
    };
    tracing::info!(
        task_id = %analysis.task_id,
        attempts = analysis.attempts,
        "analysis completed"
    );

    if !args.no_cache {
        // Cache writes are best-effort; a failure must not lose the report.
        if let Err(err) = store
            .save_last_result(&analysis.task_id, &analysis.result)
            .and_then(|_| store.save_profile(&profile))
        {
            tracing::warn!(error = %err, "failed to cache analysis result");
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis.result)?);
        return Ok(());
    }

    print!("{}", render::profile(&profile));
    print_result(&analysis.result)
}

/// Banner text for a failed analysis, plus the error to report when it is an
/// incident. A user cancelling is not one.
fn classify_failure(err: AdvisorError) -> (String, Option<anyhow::Error>) {
    let msg = err.user_message();
    if err.is_cancelled() {
        tracing::info!(error = %err, "analysis cancelled by user");
        return (msg, None);
    }
    (msg, Some(anyhow::Error::new(err)))
}

fn show_last(store: &LocalStore) -> anyhow::Result<()> {
    let cached = store
        .load_last_result()?
        .context("no cached report; run `moneyfi analyze` first")?;

    if let Some(profile) = store.load_profile()? {
        print!("{}", render::profile(&profile));
    }
    println!(
        "Task {} (saved {})\n",
        cached.task_id,
        cached.saved_at.format("%Y-%m-%d %H:%M UTC")
    );
    print_result(&cached.result)
}

fn print_result(result: &serde_json::Value) -> anyhow::Result<()> {
    match Report::from_result(result) {
        Ok(report) => {
            let today = chrono::Utc::now().date_naive();
            print!("{}", render::report(&report, today));
        }
        Err(err) => {
            // Older backends answer with free text instead of a report object.
            tracing::debug!(error = %err, "result is not a structured report");
            println!("{}", render::raw_result(result));
        }
    }
    Ok(())
}

fn project(args: ProjectArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.monthly.is_finite() && args.monthly > 0.0,
        "monthly amount must be positive (got {})",
        args.monthly
    );
    anyhow::ensure!(
        (1..=40).contains(&args.years),
        "years must be 1..=40 (got {})",
        args.years
    );

    let mut rates = ProjectionRates::for_risk(args.risk);
    if let Some(text) = args.rate.as_deref() {
        rates.strategy = projection::parse_expected_return(text)
            .with_context(|| format!("could not read a return rate from {text:?}"))?;
    }

    let points = projection::compare_strategies(args.monthly, args.years, rates);
    print!("{}", render::projection(&points, rates));
    Ok(())
}

fn init_sentry(settings: &moneyfi_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
