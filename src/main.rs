use key_lease_server::config::Config;
use key_lease_server::lease::KeyLeaseManager;
use key_lease_server::logging;
use key_lease_server::workers::WorkerManager;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config);

    let (store, backend) = match key_lease_server::connect_store(config.redis_url.as_deref()).await {
        Ok(pair) => pair,
        Err(err) => {
            tracing::error!(error = %err, "failed to connect to store");
            std::process::exit(1);
        }
    };
    logging::log_startup(&config, backend);
    let manager = KeyLeaseManager::new(store);

    let workers = WorkerManager::new(manager.clone());
    if config.reclaimer_enabled {
        workers.start().await;
    }

    let app = key_lease_server::create_app(manager, backend);

    let addr = config.bind_addr();
    tracing::info!(%addr, backend, "key-lease-server listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "bind listener failed");
            workers.stop().await;
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped, initiating graceful shutdown sequence");
    workers.stop().await;
    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
