use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
mod error;
mod filters;
mod jwt;
mod middleware;
mod models;
mod permissions;
mod rating;
mod repositories;
mod routes;
mod state;

use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};

use crate::{config::Settings, jwt::JwtService, state::AppState};

/// Book catalog service
#[derive(Debug, Parser)]
#[command(name = "store", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Print an access token for an existing user
    Token {
        #[arg(long)]
        user: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    let jwt_service = JwtService::new(&settings.jwt)?;

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        bail!("Failed to connect to database");
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            run_migrations(&pool).await?;

            let app = routes::create_router(AppState::postgres(pool, jwt_service));

            let address = settings.server.address();
            let listener = TcpListener::bind(&address).await?;
            info!("Store service listening on {}", address);

            axum::serve(listener, app).await?;
        }
        Command::Token { user } => {
            let state = AppState::postgres(pool, jwt_service);
            if state.users.find_by_id(user).await?.is_none() {
                bail!("No user with id {user}");
            }

            println!("{}", state.jwt_service.issue_access_token(user)?);
        }
    }

    Ok(())
}
