use anyhow::Context;
use api_client::BacktestApi;
use backtest_console::output::{describe_route, history_table, print_json, print_value, rows_table, user_table};
use backtest_console::AppContext;
use browser::Document;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use configuration::{init_tracing, load_config, load_config_from};
use core_types::{BacktestRequest, HistoryItem, HistoryQuery, OptimizeRequest, StrategyType, ThemeMode};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use router::View;
use rust_decimal::Decimal;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The main entry point for the backtest console.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // BACKTEST_* overrides may live in a .env file.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    let _log_guard = init_tracing(&config.logging)?;

    let app = AppContext::from_config(config).context("Failed to start the client")?;

    match cli.command {
        Commands::Open { path } => handle_open(&app, &path).await,
        Commands::Login(args) => handle_login(&app, args),
        Commands::Callback { token } => handle_callback(&app, &token).await,
        Commands::Logout => handle_logout(&app).await,
        Commands::Whoami => handle_whoami(&app).await,
        Commands::Theme { action } => handle_theme(&app, action),
        Commands::Health => handle_health(&app).await,
        Commands::Dashboard => handle_dashboard(&app).await,
        Commands::History(args) => handle_history(&app, args).await,
        Commands::Result { ids } => handle_result(&app, &ids).await,
        Commands::DeleteHistory { id } => handle_delete_history(&app, id).await,
        Commands::Run(args) => handle_run(&app, args).await,
        Commands::Compare { ids } => handle_compare(&app, &ids).await,
        Commands::Optimize { request } => handle_optimize(&app, &request).await,
        Commands::Items { action } => handle_items(&app, action).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Console client for the stock backtest service.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file to read instead of ./config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Navigate to an application path (e.g. "/history?page=2").
    Open { path: String },
    /// Sign in with Google.
    Login(LoginArgs),
    /// Finish signing in with the token from the OAuth callback URL.
    Callback { token: String },
    /// Sign out.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Show or change the colour theme.
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
    /// Check that the API is reachable.
    Health,
    /// Show the dashboard summary.
    Dashboard,
    /// List past backtests.
    History(HistoryArgs),
    /// Show one or more backtest results.
    Result {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Delete a backtest from the history.
    DeleteHistory { id: i64 },
    /// Run a backtest.
    Run(RunArgs),
    /// Compare the metrics of two or more past backtests.
    Compare {
        #[arg(required = true, num_args = 2..)]
        ids: Vec<i64>,
    },
    /// Grid-search strategy parameters, reading the request from a JSON file.
    Optimize { request: PathBuf },
    /// Manage generic items.
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },
}

#[derive(Parser)]
struct LoginArgs {
    /// Application path to open once signed in.
    #[arg(long)]
    return_to: Option<String>,
}

#[derive(Subcommand, Clone, Copy)]
enum ThemeAction {
    Show,
    Toggle,
    Light,
    Dark,
}

#[derive(Parser)]
struct HistoryArgs {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
    /// Only show this strategy.
    #[arg(long)]
    strategy: Option<String>,
    /// Only show this stock symbol.
    #[arg(long)]
    stock: Option<String>,
}

#[derive(Parser)]
struct RunArgs {
    /// Read the full request from a JSON file instead of the flags below.
    #[arg(long, conflicts_with_all = ["name", "symbol", "from", "to", "strategy", "capital"])]
    request: Option<PathBuf>,

    /// A name for this run.
    #[arg(long, required_unless_present = "request")]
    name: Option<String>,

    /// The stock symbol to test (e.g., "2330.TW", "AAPL").
    #[arg(long, required_unless_present = "request")]
    symbol: Option<String>,

    /// The start date (format: YYYY-MM-DD).
    #[arg(long, required_unless_present = "request")]
    from: Option<NaiveDate>,

    /// The end date (format: YYYY-MM-DD).
    #[arg(long, required_unless_present = "request")]
    to: Option<NaiveDate>,

    /// The strategy (e.g., "MA_CROSS", "RSI", "DCA").
    #[arg(long)]
    strategy: Option<StrategyType>,

    /// Initial capital.
    #[arg(long)]
    capital: Option<Decimal>,
}

#[derive(Subcommand)]
enum ItemsAction {
    List,
    Get { id: i64 },
    /// Create an item from a JSON document.
    Create { json: String },
    Delete { id: i64 },
}

// ==============================================================================
// Session Commands
// ==============================================================================

async fn handle_open(app: &AppContext, path: &str) -> anyhow::Result<()> {
    let landed = app.router().navigate(path).await?;
    println!("{}  {}", app.window().title(), describe_route(&landed));
    Ok(())
}

fn handle_login(app: &AppContext, args: LoginArgs) -> anyhow::Result<()> {
    app.begin_login(args.return_to.as_deref())?;
    println!("Open this URL in your browser to sign in:");
    println!("  {}", app.session().oauth_entry());
    println!("Then run `backtest-console callback <token>` with the token from the callback URL.");
    Ok(())
}

async fn handle_callback(app: &AppContext, token: &str) -> anyhow::Result<()> {
    let landed = app.finish_login(token).await?;
    match app.session().user() {
        Some(user) => println!("Signed in as {} <{}>.", user.name, user.email),
        None => println!("The token was not accepted."),
    }
    println!("Now at {}", describe_route(&landed));
    Ok(())
}

async fn handle_logout(app: &AppContext) -> anyhow::Result<()> {
    app.logout().await?;
    println!("Signed out.");
    Ok(())
}

async fn handle_whoami(app: &AppContext) -> anyhow::Result<()> {
    match app.whoami().await? {
        Some(user) => println!("{}", user_table(&user)),
        None => println!("Not signed in."),
    }
    Ok(())
}

fn handle_theme(app: &AppContext, action: Option<ThemeAction>) -> anyhow::Result<()> {
    let theme = app.theme();
    match action.unwrap_or(ThemeAction::Show) {
        ThemeAction::Show => {}
        ThemeAction::Toggle => {
            theme.toggle();
        }
        ThemeAction::Light => theme.set(ThemeMode::Light),
        ThemeAction::Dark => theme.set(ThemeMode::Dark),
    }
    println!("Theme: {}", theme.mode().as_str());
    Ok(())
}

// ==============================================================================
// Backtest Commands
// ==============================================================================

/// Opens the view a command belongs to. Returns `false` when the guard sent
/// us to the login page instead.
async fn enter(app: &AppContext, path: &str) -> anyhow::Result<bool> {
    let landed = app.router().navigate(path).await?;
    if landed.route.view == View::Login {
        println!("Not signed in. Run `backtest-console login` first.");
        return Ok(false);
    }
    Ok(true)
}

fn spinner(message: &str) -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

async fn handle_health(app: &AppContext) -> anyhow::Result<()> {
    let response = app.api().health_check().await?;
    print_value(&response.body);
    Ok(())
}

async fn handle_dashboard(app: &AppContext) -> anyhow::Result<()> {
    if !enter(app, "/").await? {
        return Ok(());
    }
    let response = app.api().get_dashboard().await?;
    print_value(&response.body);
    Ok(())
}

async fn handle_history(app: &AppContext, args: HistoryArgs) -> anyhow::Result<()> {
    if !enter(app, "/history").await? {
        return Ok(());
    }
    let query = HistoryQuery {
        page: args.page,
        limit: args.limit,
        strategy: args.strategy,
        stock: args.stock,
    };
    let items: Vec<HistoryItem> = app.api().get_history(&query).await?.json()?;
    if items.is_empty() {
        println!("No backtests yet.");
    } else {
        println!("{}", history_table(&items));
    }
    Ok(())
}

async fn handle_result(app: &AppContext, ids: &[i64]) -> anyhow::Result<()> {
    if !enter(app, "/history").await? {
        return Ok(());
    }
    let api = app.api();
    let results = join_all(ids.iter().map(|id| api.get_backtest_result(*id))).await;

    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok(response) => {
                println!("Backtest #{id}");
                print_summary(&response.body);
            }
            Err(e) => eprintln!("Backtest #{id}: {e}"),
        }
    }
    Ok(())
}

async fn handle_delete_history(app: &AppContext, id: i64) -> anyhow::Result<()> {
    if !enter(app, "/history").await? {
        return Ok(());
    }
    app.api().delete_history(id).await?;
    println!("Deleted backtest #{id}.");
    Ok(())
}

async fn handle_run(app: &AppContext, args: RunArgs) -> anyhow::Result<()> {
    let request = match &args.request {
        Some(path) => read_json::<BacktestRequest>(path)?,
        None => build_request(args)?,
    };
    request.validate()?;

    if !enter(app, "/backtest").await? {
        return Ok(());
    }
    let progress = spinner(&format!("Backtesting {} on {}...", request.strategy_type, request.stock_symbol))?;
    let result = app.api().run_backtest(&request).await;
    progress.finish_and_clear();

    print_summary(&result?.body);
    Ok(())
}

async fn handle_compare(app: &AppContext, ids: &[i64]) -> anyhow::Result<()> {
    if !enter(app, "/compare").await? {
        return Ok(());
    }
    let body = app.api().compare_strategies(ids).await?.body;
    match body.get("metrics").and_then(Value::as_array).and_then(|rows| rows_table(rows)) {
        Some(table) => println!("{table}"),
        None => print_json(&body),
    }
    Ok(())
}

async fn handle_optimize(app: &AppContext, path: &Path) -> anyhow::Result<()> {
    let request = read_json::<OptimizeRequest>(path)?;
    request.validate()?;

    if !enter(app, "/optimize").await? {
        return Ok(());
    }
    let progress = spinner(&format!("Optimizing {} on {}...", request.strategy_type, request.stock_symbol))?;
    let result = app.api().optimize_strategy(&request).await;
    progress.finish_and_clear();

    print_json(&result?.body);
    Ok(())
}

async fn handle_items(app: &AppContext, action: ItemsAction) -> anyhow::Result<()> {
    let response = match action {
        ItemsAction::List => app.api().get_items().await?,
        ItemsAction::Get { id } => app.api().get_item(id).await?,
        ItemsAction::Create { json } => {
            let item: Value = serde_json::from_str(&json).context("Item must be a JSON document")?;
            app.api().create_item(&item).await?
        }
        ItemsAction::Delete { id } => app.api().delete_item(id).await?,
    };
    print_value(&response.body);
    Ok(())
}

// ==============================================================================
// Helpers
// ==============================================================================

fn build_request(args: RunArgs) -> anyhow::Result<BacktestRequest> {
    let (Some(name), Some(symbol), Some(from), Some(to)) = (args.name, args.symbol, args.from, args.to) else {
        anyhow::bail!("--name, --symbol, --from and --to are required without --request");
    };
    let mut request = BacktestRequest::new(name, symbol, from, to);
    if let Some(strategy) = args.strategy {
        request.strategy_type = strategy;
    }
    if let Some(capital) = args.capital {
        request.initial_capital = capital;
    }
    Ok(request)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Backtest results carry a flat `summary` of metrics next to large series;
/// only the summary is worth a table.
fn print_summary(body: &Value) {
    match body.get("summary") {
        Some(summary) => print_value(summary),
        None => print_json(body),
    }
}
