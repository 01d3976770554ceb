use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use coursegate::config::GateConfig;
use coursegate::identity::{spawn_hydration, AuthService, FileSessionStorage, HttpAuthBackend, SessionStorage, SessionStore};
use coursegate::navigator::Navigator;
use coursegate::router::Router;
use coursegate::shell::{self, Shell};

fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("building log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cfg = GateConfig::from_env()?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "startup",
        "coursegate starting: RUST_LOG='{}', api_url={}, session_file='{}', max_redirects={}",
        rust_log, cfg.api_url, cfg.session_file.display(), cfg.max_redirects
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let store = SessionStore::new();
    let storage: Arc<dyn SessionStorage> = Arc::new(FileSessionStorage::new(cfg.session_file.clone()));
    let navigator = Navigator::new(Router::default(), store.clone(), "/", cfg.max_redirects);

    // Hydration runs in the background; the navigator re-evaluates when it lands.
    let hydration = {
        let _guard = rt.enter();
        spawn_hydration(store.clone(), storage.clone())
    };

    let backend = HttpAuthBackend::new(&cfg)?;
    let shell = Shell::new(AuthService::new(backend, store, storage), navigator);
    shell::run(&rt, &shell)?;

    hydration.abort();
    Ok(())
}
