//! Tests d'intégration du cycle de synchronisation
//!
//! Un vrai serveur axum joue le rôle du catalogue distant ; les
//! scénarios couvrent le premier démarrage, le cycle sans changement,
//! l'ajout et le retrait de playlists, l'indisponibilité du service et
//! la reprise d'un téléchargement en échec.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tempfile::TempDir;
use tokio::sync::RwLock;

use vlsync::{
    is_present, m3u_path, merged_path, sidecar_path, video_path, CatalogClient, SyncOrchestrator,
    SyncSettings, STATE_FILE,
};

/// Catalogue contrôlé par les tests
#[derive(Clone)]
struct RemoteState {
    manifest: Arc<RwLock<serde_json::Value>>,
    available: Arc<RwLock<bool>>,
    broken_videos: Arc<RwLock<HashSet<String>>>,
    download_calls: Arc<AtomicUsize>,
}

impl RemoteState {
    fn new(manifest: serde_json::Value) -> Self {
        Self {
            manifest: Arc::new(RwLock::new(manifest)),
            available: Arc::new(RwLock::new(true)),
            broken_videos: Arc::new(RwLock::new(HashSet::new())),
            download_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    async fn set_manifest(&self, manifest: serde_json::Value) {
        *self.manifest.write().await = manifest;
    }

    async fn set_available(&self, available: bool) {
        *self.available.write().await = available;
    }

    async fn break_video(&self, video_id: &str) {
        self.broken_videos.write().await.insert(video_id.to_string());
    }

    async fn repair_video(&self, video_id: &str) {
        self.broken_videos.write().await.remove(video_id);
    }

    fn downloads(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

async fn active_playlists(
    State(state): State<RemoteState>,
    UrlPath(_device_id): UrlPath<String>,
) -> Response {
    if !*state.available.read().await {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(state.manifest.read().await.clone()).into_response()
}

async fn download_video(
    State(state): State<RemoteState>,
    UrlPath(video_id): UrlPath<String>,
) -> Response {
    state.download_calls.fetch_add(1, Ordering::SeqCst);
    if state.broken_videos.read().await.contains(&video_id) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    format!("content of video {video_id}").into_response()
}

/// Démarre le catalogue de test et retourne son URL de base
async fn spawn_remote(state: RemoteState) -> String {
    let app = Router::new()
        .route("/playlists/active/{device_id}", get(active_playlists))
        .route("/videos/{video_id}/download", get(download_video))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn playlist_json(id: &str, title: &str, video_ids: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "videos": video_ids
            .iter()
            .map(|v| serde_json::json!({"id": v, "title": format!("Video {v}")}))
            .collect::<Vec<_>>(),
    })
}

async fn orchestrator(base_url: &str, cache_dir: &TempDir) -> SyncOrchestrator {
    let catalog = CatalogClient::builder().base_url(base_url).build().unwrap();
    SyncOrchestrator::new(
        SyncSettings {
            device_id: "itest-player".to_string(),
            cache_dir: cache_dir.path().to_path_buf(),
        },
        Arc::new(catalog),
    )
    .await
}

#[tokio::test]
async fn test_first_start_downloads_and_materializes() {
    let remote = RemoteState::new(serde_json::json!([
        playlist_json("1", "Accueil", &["10", "11"]),
        playlist_json("2", "Cafeteria", &["11", "12"]),
    ]));
    let base_url = spawn_remote(remote.clone()).await;
    let cache = tempfile::tempdir().unwrap();

    let orch = orchestrator(&base_url, &cache).await;
    let report = orch.sync().await.unwrap();

    assert!(report.changed);
    assert_eq!(report.added, 2);
    // la vidéo 11 est partagée, trois téléchargements et pas quatre
    assert_eq!(report.downloaded, 3);
    assert_eq!(remote.downloads(), 3);
    assert_eq!(report.failed, 0);

    for id in ["10", "11", "12"] {
        let path = video_path(cache.path(), id);
        assert!(is_present(&path).await, "video {id} missing");
        let data = std::fs::read(&path).unwrap();
        assert_eq!(data, format!("content of video {id}").as_bytes());
    }

    // état et manifestes sur disque
    assert!(cache.path().join(STATE_FILE).exists());
    assert!(sidecar_path(cache.path(), "1").exists());
    assert!(m3u_path(cache.path(), "2").exists());

    let merged = std::fs::read_to_string(merged_path(cache.path())).unwrap();
    let lines: Vec<&str> = merged.lines().collect();
    // dédupliqué entre playlists, chemins absolus
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| std::path::Path::new(l).is_absolute()));
    assert!(!merged.ends_with('\n'));
}

#[tokio::test]
async fn test_unchanged_cycle_downloads_and_writes_nothing() {
    let remote = RemoteState::new(serde_json::json!([
        playlist_json("1", "Accueil", &["10"]),
    ]));
    let base_url = spawn_remote(remote.clone()).await;
    let cache = tempfile::tempdir().unwrap();

    let orch = orchestrator(&base_url, &cache).await;
    let first = orch.sync().await.unwrap();
    assert!(first.changed);
    let downloads_after_first = remote.downloads();

    let merged_before = std::fs::read(merged_path(cache.path())).unwrap();

    let second = orch.sync().await.unwrap();
    assert!(!second.changed);
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.materialized, 0);
    // aucun appel réseau de téléchargement au second cycle
    assert_eq!(remote.downloads(), downloads_after_first);

    let merged_after = std::fs::read(merged_path(cache.path())).unwrap();
    assert_eq!(merged_before, merged_after);
}

#[tokio::test]
async fn test_assignment_changes_are_applied() {
    let remote = RemoteState::new(serde_json::json!([
        playlist_json("1", "Accueil", &["10"]),
    ]));
    let base_url = spawn_remote(remote.clone()).await;
    let cache = tempfile::tempdir().unwrap();

    let orch = orchestrator(&base_url, &cache).await;
    orch.sync().await.unwrap();

    // une playlist arrive
    remote
        .set_manifest(serde_json::json!([
            playlist_json("1", "Accueil", &["10"]),
            playlist_json("2", "Cafeteria", &["20"]),
        ]))
        .await;
    let report = orch.sync().await.unwrap();
    assert!(report.changed);
    assert_eq!(report.added, 1);
    assert_eq!(report.removed, 0);
    assert!(is_present(&video_path(cache.path(), "20")).await);

    // la première repart
    remote
        .set_manifest(serde_json::json!([
            playlist_json("2", "Cafeteria", &["20"]),
        ]))
        .await;
    let report = orch.sync().await.unwrap();
    assert!(report.changed);
    assert_eq!(report.removed, 1);

    // les manifestes de la playlist retirée disparaissent, pas ses vidéos
    assert!(!sidecar_path(cache.path(), "1").exists());
    assert!(!m3u_path(cache.path(), "1").exists());
    assert!(is_present(&video_path(cache.path(), "10")).await);

    let merged = std::fs::read_to_string(merged_path(cache.path())).unwrap();
    assert!(merged.contains("20.mp4"));
    assert!(!merged.contains("10.mp4"));
}

#[tokio::test]
async fn test_remote_outage_keeps_previous_content() {
    let remote = RemoteState::new(serde_json::json!([
        playlist_json("1", "Accueil", &["10"]),
    ]));
    let base_url = spawn_remote(remote.clone()).await;
    let cache = tempfile::tempdir().unwrap();

    let orch = orchestrator(&base_url, &cache).await;
    orch.sync().await.unwrap();
    let state_before = orch.state_snapshot().await;
    let merged_before = std::fs::read(merged_path(cache.path())).unwrap();

    remote.set_available(false).await;
    let err = orch.sync().await.unwrap_err();
    assert!(matches!(err, vlsync::Error::Remote(_)));

    // le contenu du cycle précédent reste servi tel quel
    assert_eq!(
        std::fs::read(merged_path(cache.path())).unwrap(),
        merged_before
    );
    assert_eq!(
        orch.state_snapshot().await.last_update,
        state_before.last_update
    );

    // le service revient, le tick suivant reprend sans rien retélécharger
    remote.set_available(true).await;
    let report = orch.sync().await.unwrap();
    assert!(!report.changed);
    assert_eq!(report.downloaded, 0);
}

#[tokio::test]
async fn test_failed_download_is_retried_next_cycle() {
    let remote = RemoteState::new(serde_json::json!([
        playlist_json("1", "Accueil", &["10", "11"]),
    ]));
    let base_url = spawn_remote(remote.clone()).await;
    let cache = tempfile::tempdir().unwrap();
    remote.break_video("11").await;

    let orch = orchestrator(&base_url, &cache).await;
    let report = orch.sync().await.unwrap();
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.failed, 1);
    assert!(is_present(&video_path(cache.path(), "10")).await);
    assert!(!video_path(cache.path(), "11").exists());

    // le serveur se rétablit, le cycle suivant ne reprend que la manquante
    remote.repair_video("11").await;
    let report = orch.sync().await.unwrap();
    assert!(report.changed);
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.failed, 0);
    assert!(is_present(&video_path(cache.path(), "11")).await);

    let report = orch.sync().await.unwrap();
    assert!(!report.changed);
    assert_eq!(report.downloaded, 0);
}

#[tokio::test]
async fn test_malformed_catalog_payload_is_a_remote_error() {
    let remote = RemoteState::new(serde_json::json!({"unexpected": "object"}));
    let base_url = spawn_remote(remote).await;
    let cache = tempfile::tempdir().unwrap();

    let orch = orchestrator(&base_url, &cache).await;
    let err = orch.sync().await.unwrap_err();
    assert!(matches!(err, vlsync::Error::Remote(_)));
    assert!(!cache.path().join(STATE_FILE).exists());
}
