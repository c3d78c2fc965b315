use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use findit_core::SessionCleanup;
use findit_persistence::{
    connection::connect_and_migrate,
    repositories::{ChallengeRepository, CredentialRepository, MatchRepository, UserRepository},
};
use findit_server::{
    auth::AuthService,
    blob_store::LocalBlobStore,
    challenge_seed::load_challenges,
    config::Config,
    create_routes,
    label_detection::HttpLabelDetector,
    session_manager::{Collaborators, SessionManager},
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting FindIt server...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize database connection and run migrations
    let db = match connect_and_migrate().await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };

    let profiles = Arc::new(UserRepository::new(db.clone()));
    let history = Arc::new(MatchRepository::new(db.clone()));
    let challenges = Arc::new(ChallengeRepository::new(db.clone()));
    let credentials = Arc::new(CredentialRepository::new(db));

    info!("Loading challenge seed from {}", config.challenges_file.display());
    match load_challenges(&config.challenges_file).await {
        Ok(seed) => {
            if let Err(e) = challenges.seed_if_empty(&seed).await {
                tracing::error!("Failed to seed challenges: {}", e);
            }
        }
        Err(e) => tracing::warn!("No challenge seed loaded: {:#}", e),
    }

    let blob_store = Arc::new(LocalBlobStore::new(
        config.blob_directory.clone(),
        &config.public_base_url,
    ));
    let session_manager = Arc::new(SessionManager::new(
        Collaborators {
            profiles: profiles.clone(),
            history: history.clone(),
            challenges,
            blobs: blob_store,
            detector: Arc::new(HttpLabelDetector::new(config.label_detection_url.clone())),
        },
        config.round_seconds,
        SessionCleanup::new(config.session_retention(), config.session_idle_timeout()),
    ));
    let auth_service = Arc::new(AuthService::new(
        credentials,
        profiles.clone(),
        &config.jwt_secret,
        config.token_ttl_seconds,
    ));

    let routes = create_routes(
        session_manager.clone(),
        auth_service,
        profiles,
        history,
        config.blob_directory.clone(),
    );

    // Countdown ticker
    let ticker_session_manager = session_manager.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            ticker_session_manager.tick_all().await;
        }
    });

    // Start cleanup task
    let cleanup_session_manager = session_manager.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let removed = cleanup_session_manager.cleanup_sessions();
            if removed > 0 {
                info!(
                    "Evicted {} sessions, {} still active",
                    removed,
                    cleanup_session_manager.active_session_count()
                );
            }
        }
    });

    let host = match config.host.parse::<std::net::IpAddr>() {
        Ok(host) => host,
        Err(e) => {
            tracing::error!("Invalid HOST {:?}: {}", config.host, e);
            std::process::exit(1);
        }
    };

    info!("Server starting on {}:{}", config.host, config.port);

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown((host, config.port), async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let mut sigint = match signal::unix::signal(signal::unix::SignalKind::interrupt()) {
                Ok(sigint) => sigint,
                Err(e) => {
                    tracing::error!("Failed to listen for SIGINT: {}", e);
                    std::future::pending().await
                }
            };
            let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::error!("Failed to listen for SIGTERM: {}", e);
                    std::future::pending().await
                }
            };

            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl+c: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}
