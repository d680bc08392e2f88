pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod notify;
pub mod state;

use std::sync::{Arc, Mutex};

use inventaire_store::Database;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::backend::memory::MemoryBackend;
use crate::backend::supabase::SupabaseBackend;
use crate::backend::Backend;
use crate::commands::App;
use crate::config::ClientConfig;

pub async fn run() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("inventaire_client_lib=info,inventaire_store=info,warn")
    });

    // stdout belongs to the terminal front end.
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting inventory client v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(
        url = %config.supabase_url,
        email_domain = %config.email_domain,
        demo = config.use_demo_backend(),
        "Loaded configuration"
    );

    let db = match &config.data_dir {
        Some(dir) => Database::open_in_dir(dir)?,
        None => Database::new()?,
    };
    let store = Arc::new(Mutex::new(db));

    if config.use_demo_backend() {
        info!("No backend URL configured, using the demo backend");
        let backend = MemoryBackend::with_demo_data(&config.email_domain);
        serve(App::new(backend, store, config)).await
    } else {
        let backend = SupabaseBackend::new(&config, Arc::clone(&store))?;
        serve(App::new(backend, store, config)).await
    }
}

async fn serve<B: Backend>(mut app: App<B>) -> anyhow::Result<()> {
    let outcome = app.bootstrap().await;
    info!(?outcome, "Startup finished");
    cli::run(&mut app).await?;
    info!("Inventory client stopped");
    Ok(())
}
