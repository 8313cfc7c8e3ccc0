mod auth;
mod error;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hakbot_core::config::HakbotConfig;
use hakbot_core::data::DataSource;
use hakbot_core::interpret::Interpreter;
use hakbot_core::model::{validate_email, User};
use hakbot_core::storage::{self, ChatStore, SqliteStorage};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub store: SqliteStorage,
    pub data: DataSource,
    pub interpreter: Interpreter,
    pub config: HakbotConfig,
}

impl AppState {
    pub fn new(config: HakbotConfig, store: SqliteStorage) -> Result<Self> {
        let interpreter = Interpreter::new(config.school.timezone()?);
        let data = DataSource::from_config(&config.data);
        Ok(Self {
            store,
            data,
            interpreter,
            config,
        })
    }
}

#[derive(Parser)]
#[command(
    name = "hakbot-web",
    about = "Hakbot: school meals, timetables and events over chat",
    version
)]
struct Cli {
    /// Project directory holding `.hakbot/config.toml` (defaults to cwd)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server (default)
    Serve,
    /// Create or update a user and print a new session token
    IssueSession {
        /// Account email
        #[arg(long)]
        email: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Grade of the student's home class
        #[arg(long, requires = "class_num")]
        grade: Option<u32>,
        /// Class number within the grade
        #[arg(long, requires = "grade")]
        class_num: Option<u32>,
    },
    /// Revoke a session token
    RevokeSession {
        /// Token printed by `issue-session`
        token: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hakbot_web=info,hakbot_core=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let project_dir = cli.project_dir.or_else(|| std::env::current_dir().ok());
    let config =
        HakbotConfig::load(project_dir.as_deref()).context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::IssueSession {
            email,
            name,
            grade,
            class_num,
        } => issue_session(config, email, name, grade, class_num).await,
        Command::RevokeSession { token } => revoke_session(config, &token).await,
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn serve(config: HakbotConfig) -> Result<()> {
    config.check_startup().context("startup check failed")?;

    let store = storage::open_store(&config).context("failed to open chat store")?;
    let purged = store.purge_expired_sessions().await?;
    if purged > 0 {
        tracing::info!("removed {purged} expired sessions");
    }

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let data_dir = config.data.dir.clone();
    let state = Arc::new(AppState::new(config, store)?);

    let app = routes::router()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!(data_dir = %data_dir, "hakbot-web listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn issue_session(
    config: HakbotConfig,
    email: String,
    name: Option<String>,
    grade: Option<u32>,
    class_num: Option<u32>,
) -> Result<()> {
    if let Err(e) = validate_email(&email) {
        bail!(e);
    }

    let store = storage::open_store(&config)?;

    let mut user = User::new(email.trim());
    if let Some(name) = name {
        user = user.with_name(name);
    }
    if let (Some(grade), Some(class_num)) = (grade, class_num) {
        user = user.with_class(grade, class_num);
    }
    let user = store.upsert_user(&user).await?;

    // Capped at ten years.
    let ttl_hours = config.auth.session_ttl_hours.min(24 * 365 * 10) as i64;
    let session = store
        .create_session(&user.id, chrono::Duration::hours(ttl_hours))
        .await?;

    tracing::info!(user_id = %user.id, "issued session");
    println!("{}", session.token);
    eprintln!(
        "user {} ({}) session valid until {}",
        user.id,
        user.email,
        session.expires_at.to_rfc3339()
    );
    Ok(())
}

async fn revoke_session(config: HakbotConfig, token: &str) -> Result<()> {
    let store = storage::open_store(&config)?;
    if store.revoke_session(token).await? {
        println!("session revoked");
    } else {
        println!("no such session");
    }
    Ok(())
}
