// src/main.rs

use blog_store::config::Config;
use blog_store::db::{self, Filter, Registry};
use blog_store::error::AppError;
use blog_store::models::user::{Role, SiteUser};
use dotenvy::dotenv;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "blog-store.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let pool = connect_with_retry(&config).await?;
    tracing::info!("Database connected...");

    // Defines every collection with its constraints
    let registry = Registry::open(pool).await?;

    if let Err(e) = seed_admin_user(&registry, &config).await {
        tracing::error!("Failed to seed admin user: {}", e);
    }

    if let Some(wx) = config.wx.clone() {
        registry.wx_configs().upsert(wx).await?;
        tracing::info!("WeChat configuration stored.");
    }

    if config.issue_invite_codes > 0 {
        for code in registry.invite_codes().issue(config.issue_invite_codes).await? {
            tracing::info!("Invite code: {}", code.code);
        }
    }

    tracing::info!(
        "Collections ready: {} users, {} articles, {} readers, {} invite codes, {} auto replies",
        registry.users().count(&Filter::All).await?,
        registry.articles().count(&Filter::All).await?,
        registry.readers().count(&Filter::All).await?,
        registry.invite_codes().count(&Filter::All).await?,
        registry.auto_replies().count(&Filter::All).await?,
    );

    Ok(())
}

async fn connect_with_retry(config: &Config) -> Result<SqlitePool, AppError> {
    let mut retry_count = 0;
    loop {
        match db::connect(&config.database_url).await {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to connect to database after 5 retries: {}", e);
                    return Err(AppError::from(e));
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

async fn seed_admin_user(registry: &Registry, config: &Config) -> Result<(), AppError> {
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        let users = registry.users();

        if users.find_by_username(username).await?.is_none() {
            tracing::info!("Seeding admin user: {}", username);
            let admin = SiteUser::new(username.as_str(), password)?.with_role(Role::Admin);
            users.create(admin).await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}
