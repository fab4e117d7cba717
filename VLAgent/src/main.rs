use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use utoipa::OpenApi;
use vlconfig::Config;
use vldevice::{DeviceClient, DeviceInfo, SystemdUnit, run_heartbeat};
use vlserver::ServerBuilder;
use vlsync::api::{SyncApiState, sync_api_router};
use vlsync::openapi::ApiDoc;
use vlsync::{PlayerControl, SyncConfigExt, SyncOrchestrator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ========== PHASE 1 : Infrastructure ==========

    vlserver::init_logging();

    let config = Arc::new(Config::load_config("")?);

    // ========== PHASE 2 : Coeur de synchronisation ==========

    info!("📦 Initializing video cache synchronization...");
    let settings = config.sync_settings()?;
    let catalog = Arc::new(config.create_catalog_client()?);
    let orchestrator = Arc::new(SyncOrchestrator::new(settings, catalog).await);

    let player = Arc::new(SystemdUnit::new(config.get_player_unit()));

    // ========== PHASE 3 : Enregistrement auprès du service distant ==========

    info!("📡 Registering device...");
    let device_client = DeviceClient::new(config.get_remote_base_url())?;
    let device_info = DeviceInfo::collect(config.get_device_id()?, config.get_device_name());
    if let Err(e) = device_client.register(&device_info).await {
        warn!("⚠️ Registration failed, the heartbeat will retry: {}", e);
    }

    let heartbeat = Duration::from_secs(config.get_heartbeat_secs()? as u64);
    tokio::spawn(run_heartbeat(
        device_client,
        device_info,
        player.as_ref().clone(),
        heartbeat,
    ));

    // ========== PHASE 4 : Boucle de synchronisation ==========

    let period = Duration::from_secs(config.get_sync_interval_mins()? as u64 * 60);
    info!("🔄 Sync loop every {} seconds", period.as_secs());
    tokio::spawn(run_sync_loop(
        orchestrator.clone(),
        player.clone(),
        period,
    ));

    // ========== PHASE 5 : Serveur HTTP ==========

    info!("🌐 Starting HTTP server...");
    let mut server = ServerBuilder::from_config(&config).build();

    server
        .add_route("/info", || async {
            serde_json::json!({"version": env!("CARGO_PKG_VERSION")})
        })
        .await;

    let api_state = SyncApiState {
        orchestrator,
        player: Some(player as Arc<dyn PlayerControl>),
    };
    server
        .add_openapi(sync_api_router(api_state), ApiDoc::openapi(), "sync")
        .await;

    server.start().await;

    info!("✅ VLAgent is ready!");
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    Ok(())
}

/// Boucle périodique de synchronisation
///
/// Le premier tick est immédiat : le contenu est vérifié dès le
/// démarrage. Un cycle déjà en vol fait sauter le tick, le catalogue
/// sera revu au suivant.
async fn run_sync_loop(
    orchestrator: Arc<SyncOrchestrator>,
    player: Arc<SystemdUnit>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match orchestrator.try_sync().await {
            None => tracing::debug!("Sync cycle already running, tick skipped"),
            Some(Err(err)) => tracing::error!("Sync cycle failed: {}", err),
            Some(Ok(report)) => {
                if report.changed {
                    info!("Content changed, restarting playback");
                    if let Err(err) = player.restart().await {
                        warn!("Cannot restart playback unit: {}", err);
                    }
                } else {
                    tracing::debug!("No content changes");
                }
            }
        }
    }
}
