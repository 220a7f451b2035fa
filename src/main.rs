use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use registry_core::config::{
    database_url_from_env_value, db_max_connections_from_env_value,
    max_document_bytes_from_env_value, smtp_config_from_env_values, uploads_dir_from_env_value,
    SmtpEnvValues,
};
use registry_core::{db, CoreConfig, NotificationDispatcher, PatientService};
use registry_files::LocalFileStorage;
use registry_notify::notifier_from_config;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_LOG_FILTER: &str =
    "patient_registry=info,registry_core=info,api_rest=info,tower_http=info";

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Resolves every setting from the environment. Called once, before anything else starts.
fn load_config() -> anyhow::Result<CoreConfig> {
    let smtp = smtp_config_from_env_values(SmtpEnvValues {
        host: env("MAIL_HOST"),
        port: env("MAIL_PORT"),
        username: env("MAIL_USERNAME"),
        password: env("MAIL_PASSWORD"),
        from_email: env("MAIL_FROM_EMAIL"),
        from_name: env("MAIL_FROM_NAME"),
    })?;

    Ok(CoreConfig::new(
        database_url_from_env_value(env("DATABASE_URL")),
        uploads_dir_from_env_value(env("UPLOADS_DIR")),
        max_document_bytes_from_env_value(env("MAX_DOCUMENT_BYTES"))?,
        db_max_connections_from_env_value(env("DB_MAX_CONNECTIONS"))?,
        smtp,
    )?)
}

/// Main entry point for the patient registry
///
/// Loads `.env`, resolves configuration, prepares the database and the uploads directory, then
/// serves the REST API until Ctrl-C or SIGTERM.
///
/// # Environment Variables
/// - `REGISTRY_ADDR`: listen address (default: "0.0.0.0:3000")
/// - `DATABASE_URL`, `UPLOADS_DIR`, `MAX_DOCUMENT_BYTES`, `DB_MAX_CONNECTIONS`
/// - `MAIL_HOST`, `MAIL_PORT`, `MAIL_USERNAME`, `MAIL_PASSWORD`, `MAIL_FROM_EMAIL`,
///   `MAIL_FROM_NAME`: all required for SMTP; otherwise emails are skipped
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = env("REGISTRY_ADDR").unwrap_or_else(|| DEFAULT_ADDR.into());
    let cfg = Arc::new(load_config()?);

    let pool = db::connect(cfg.database_url(), cfg.db_max_connections()).await?;
    db::migrate(&pool).await?;
    tracing::info!(database = cfg.database_url(), "database ready");

    let storage = Arc::new(LocalFileStorage::new(
        cfg.uploads_dir(),
        cfg.max_document_bytes(),
    )?);
    tracing::info!(uploads = %storage.root_directory().display(), "document storage ready");

    let notifications = NotificationDispatcher::new(notifier_from_config(cfg.smtp()));
    let patients = PatientService::new(
        pool.clone(),
        storage,
        notifications,
        cfg.max_document_bytes(),
    );
    tracing::info!(notifier = patients.notifier_kind(), "notifications ready");

    let app = api_rest::router(AppState { patients });

    tracing::info!("++ Starting patient registry on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("-- Patient registry stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
