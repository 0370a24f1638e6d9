//! bookinfo-api server entry point.

use bookinfo_api::{
    auth::AuthService,
    config::{Cli, Command, Config, UserCommand},
    db::Database,
    library::Catalog,
    server,
};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Some(Command::Init { force }) => cmd_init(force).await,
        Some(Command::User { action }) => cmd_user(action, &config).await,
        Some(Command::Serve { bind, catalog }) => cmd_serve(config, bind, catalog).await,
        None => cmd_serve(config, None, None).await,
    }
}

/// Initialize config and database.
async fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    let config = Config::default();
    let _db = Database::open(&config.database.path)?;
    println!("Initialized database: {}", config.database.path.display());

    println!("\nEdit config.toml to point [catalog] path at your Calibre metadata.db.");
    println!("Then run: bookinfo-api user add <username> --password <password>");

    Ok(())
}

/// User management commands.
async fn cmd_user(action: UserCommand, config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;
    let auth = AuthService::new(db, config.auth.session_days);

    match action {
        UserCommand::Add { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password("Password: ")?,
            };

            let user = auth.create_user(&username, &password)?;
            println!("Created user: {} (id: {})", user.username, user.id);
        }

        UserCommand::Del { username } => {
            if auth.delete_user(&username)? {
                println!("Deleted user: {}", username);
            } else {
                println!("User not found: {}", username);
            }
        }

        UserCommand::List => {
            let users = auth.list_users()?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<20} {:<8} LAST LOGIN", "USERNAME", "ID");
                println!("{}", "-".repeat(50));
                for user in users {
                    let last_login = user
                        .last_login
                        .map(|ts| {
                            chrono::DateTime::from_timestamp(ts, 0)
                                .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                                .unwrap_or_else(|| "unknown".to_string())
                        })
                        .unwrap_or_else(|| "never".to_string());
                    println!("{:<20} {:<8} {}", user.username, user.id, last_login);
                }
            }
        }

        UserCommand::Passwd { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password("New password: ")?,
            };

            if auth.change_password(&username, &password)? {
                println!("Password changed for: {}", username);
            } else {
                println!("User not found: {}", username);
            }
        }
    }

    Ok(())
}

/// Start the server.
async fn cmd_serve(
    mut config: Config,
    bind: Option<std::net::SocketAddr>,
    catalog: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(addr) = bind {
        config.server.bind = addr;
    }
    if let Some(path) = catalog {
        config.catalog.path = path;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookinfo_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let catalog = Catalog::open(&config.catalog.path)?;
    let db = Database::open(&config.database.path)?;

    match db.cleanup_expired_sessions() {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, "Removed expired sessions"),
        Err(e) => tracing::warn!(error = %e, "Failed to remove expired sessions"),
    }

    let auth = AuthService::new(db.clone(), config.auth.session_days);

    tracing::info!(
        bind = %config.server.bind,
        catalog = %config.catalog.path.display(),
        database = %config.database.path.display(),
        "Starting bookinfo-api server"
    );

    let state = server::AppState::new(config.clone(), catalog, db, auth);
    let app = server::create_router(state);

    let listener = TcpListener::bind(config.server.bind).await?;
    tracing::info!(address = %config.server.bind, prefix = server::API_PREFIX, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Prompt for password input.
fn prompt_password(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;

    Ok(password.trim().to_string())
}
