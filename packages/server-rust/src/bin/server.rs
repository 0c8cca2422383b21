use std::sync::Arc;

use clap::Parser;
use lcadash_server::telemetry::init_tracing;
use lcadash_server::{open_store, ListQueryService, NetworkModule, ResourceCatalog, ServerArgs};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    init_tracing(args.log_format)?;
    args.validate()?;

    let store = open_store(&args.store_config()).await?;
    store.initialize().await?;

    let lists = Arc::new(ListQueryService::new(
        Arc::new(ResourceCatalog::lca()),
        Arc::clone(&store),
        args.service_config(),
    ));

    let mut module = NetworkModule::new(args.network_config(), lists);
    let port = module.start().await?;
    info!(port, "lcadash server started");

    module.serve(shutdown_signal()).await?;

    store.close().await?;
    info!("lcadash server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
