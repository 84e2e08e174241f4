use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dance_library::{
    api,
    config::{Config, TableBackend, UploadBackend},
    google_auth::{GoogleAuth, SCOPE_DRIVE_FILE, SCOPE_SPREADSHEETS},
    table_store::{LocalTableStore, SheetsStore, TableStore},
    upload::{DriveUploader, ImageUploader, LocalUploader, ProxyUploader},
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "dance-library starting");

    let config = Config::load()?;

    // One token provider shared by the Sheets and Drive backends
    let google_auth = if config.needs_google_auth() {
        let auth = GoogleAuth::new(
            config.google_credentials_file.as_deref(),
            &[SCOPE_SPREADSHEETS, SCOPE_DRIVE_FILE],
        )
        .await?;
        info!("Authenticated with Google APIs");
        Some(Arc::new(auth))
    } else {
        None
    };

    // Initialize table store backend
    let store: Arc<dyn TableStore> = match (&config.table.backend, &google_auth) {
        (TableBackend::Sheets, Some(auth)) => {
            let spreadsheet_id = config
                .table
                .spreadsheet_id
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("SPREADSHEET_ID is not set"))?;
            let store = SheetsStore::new(spreadsheet_id, &config.table.sheet_range, Arc::clone(auth))?;
            info!(
                spreadsheet_id,
                range = %config.table.sheet_range,
                "Using Google Sheets table backend"
            );
            Arc::new(store)
        }
        _ => {
            let store = LocalTableStore::open(&config.table.data_dir)?;
            info!("Using local table backend at: {}", config.table.data_dir);
            Arc::new(store)
        }
    };

    // Initialize upload backend
    let mut local_uploads = None;
    let uploader: Arc<dyn ImageUploader> = match (&config.upload.backend, &google_auth) {
        (UploadBackend::Drive, Some(auth)) => {
            info!("Using Google Drive upload backend");
            Arc::new(DriveUploader::new(Arc::clone(auth))?)
        }
        (UploadBackend::Proxy, _) => {
            let endpoint = config
                .upload
                .proxy_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("UPLOAD_PROXY_URL is not set"))?;
            info!(endpoint, "Using proxy upload backend");
            Arc::new(ProxyUploader::new(endpoint)?)
        }
        _ => {
            let uploader = Arc::new(LocalUploader::new(
                &config.upload.local_upload_path,
                &config.upload.public_base_url,
            )?);
            info!(
                "Using local upload backend at: {}",
                config.upload.local_upload_path
            );
            local_uploads = Some(Arc::clone(&uploader));
            uploader
        }
    };

    // Create shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        uploader,
        local_uploads,
    ));

    // Warm the display cache; a broken sheet is reported but does not stop startup.
    if let Err(e) = state.catalog.catalog().await {
        tracing::error!(error = %e, "Initial catalog load failed");
    }

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on: {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, draining connections");
}
