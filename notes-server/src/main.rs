use std::{process, sync::Arc};

use notes_server::{
    config::Config,
    error::ErrorPolicy,
    repository::{MemoryNoteStore, NoteStore, PgNoteStore},
    router,
    service::NoteService,
};

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt::init();

    // Fetch env variables
    let cfg = Config::from_env().unwrap_or_else(|e| {
        tracing::error!("Invalid server configuration: {e}");
        process::exit(1);
    });

    // Store creation and migration
    let store: Arc<dyn NoteStore> = match &cfg.pg_dsn {
        Some(dsn) => {
            let mut store = PgNoteStore::connect(dsn).await.unwrap_or_else(|e| {
                tracing::error!("Failed to establish database connection: {e}");
                process::exit(1);
            });
            store.migrate().await.unwrap_or_else(|e| {
                tracing::error!("Failed to migrate database: {e}");
                process::exit(1);
            });
            Arc::new(store)
        }
        None => {
            tracing::warn!("PG_DSN is not set, notes will be kept in memory only");
            Arc::new(MemoryNoteStore::new())
        }
    };

    // Service creation
    let service = Arc::new(NoteService::new(store));
    let app = router(service, ErrorPolicy { debug: cfg.app_debug });

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind to {}: {e}", cfg.bind_addr);
            process::exit(1);
        });

    match listener.local_addr() {
        Ok(addr) => tracing::info!("REST server starting, listening on {}", addr),
        Err(e) => tracing::warn!("REST server starting, local address unavailable: {e}"),
    }
    if cfg.app_debug {
        tracing::warn!("Debug mode is on, internal error messages are exposed");
    }

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("HTTP server error: {e}");
        process::exit(1);
    }
}
