//! API REST pour le suivi et le déclenchement de la synchronisation.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::fetcher::video_path;
use crate::orchestrator::{PlayerControl, SyncOrchestrator};
use crate::Error;

/// État partagé des handlers REST
///
/// Le contrôle du service de lecture est optionnel : sans lui, un
/// force-update applique les changements sans redémarrer la lecture.
#[derive(Clone)]
pub struct SyncApiState {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub player: Option<Arc<dyn PlayerControl>>,
}

/// Router `/api/sync` combinant les différents endpoints REST.
pub fn sync_api_router(state: SyncApiState) -> Router {
    Router::new()
        .route("/status", get(sync_status))
        .route("/force-update", post(force_update))
        .route("/list-playlists", get(list_playlists))
        .with_state(state)
}

/// État courant de la synchronisation.
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncStatusResponse {
    /// Phase du cycle en cours (`idle` hors cycle)
    pub status: String,
    pub active_playlists: usize,
    pub videos: usize,
    pub last_update: Option<DateTime<Utc>>,
    pub cache_dir: String,
}

/// Résultat d'une mise à jour forcée.
#[derive(Debug, Serialize, ToSchema)]
pub struct ForceUpdateResponse {
    #[schema(example = "updated")]
    pub status: String,
    pub message: String,
}

/// Vidéo d'une playlist avec sa présence sur disque.
#[derive(Debug, Serialize, ToSchema)]
pub struct VideoStatusResponse {
    pub id: String,
    pub title: String,
    pub downloaded: bool,
    pub size: u64,
}

/// Playlist active avec l'état de ses vidéos.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlaylistStatusResponse {
    pub id: String,
    pub title: String,
    pub videos: Vec<VideoStatusResponse>,
}

/// Réponse d'erreur REST générique.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/sync/status",
    tag = "sync",
    responses(
        (status = 200, description = "État courant de la synchronisation", body = SyncStatusResponse)
    )
)]
pub async fn sync_status(State(state): State<SyncApiState>) -> Response {
    let snapshot = state.orchestrator.state_snapshot().await;
    let phase = state.orchestrator.phase().await;
    let payload = SyncStatusResponse {
        status: phase.as_str().to_string(),
        active_playlists: snapshot.active_playlists.len(),
        videos: snapshot.video_count(),
        last_update: snapshot.last_update,
        cache_dir: state
            .orchestrator
            .settings()
            .cache_dir
            .display()
            .to_string(),
    };
    (StatusCode::OK, Json(payload)).into_response()
}

#[utoipa::path(
    post,
    path = "/api/sync/force-update",
    tag = "sync",
    responses(
        (status = 200, description = "Cycle exécuté", body = ForceUpdateResponse),
        (status = 502, description = "Service distant injoignable", body = ErrorResponse),
        (status = 500, description = "Erreur interne", body = ErrorResponse)
    )
)]
pub async fn force_update(State(state): State<SyncApiState>) -> Response {
    match state.orchestrator.sync().await {
        Ok(report) => {
            if report.changed {
                if let Some(player) = &state.player {
                    if let Err(err) = player.reload().await {
                        tracing::warn!("Playback reload after sync failed: {}", err);
                    }
                }
            }
            let payload = if report.changed {
                ForceUpdateResponse {
                    status: "updated".to_string(),
                    message: format!(
                        "{} added, {} removed, {} modified, {} downloaded",
                        report.added, report.removed, report.modified, report.downloaded
                    ),
                }
            } else {
                ForceUpdateResponse {
                    status: "no_changes".to_string(),
                    message: "Content is already up to date".to_string(),
                }
            };
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/sync/list-playlists",
    tag = "sync",
    responses(
        (status = 200, description = "Playlists actives et présence des vidéos", body = [PlaylistStatusResponse])
    )
)]
pub async fn list_playlists(State(state): State<SyncApiState>) -> Response {
    let snapshot = state.orchestrator.state_snapshot().await;
    let cache_dir = &state.orchestrator.settings().cache_dir;

    let mut payload = Vec::with_capacity(snapshot.active_playlists.len());
    for playlist in snapshot.active_playlists.values() {
        let mut videos = Vec::with_capacity(playlist.videos.len());
        for video in &playlist.videos {
            let size = tokio::fs::metadata(video_path(cache_dir, &video.id))
                .await
                .map(|m| m.len())
                .unwrap_or(0);
            videos.push(VideoStatusResponse {
                id: video.id.clone(),
                title: video.title.clone(),
                downloaded: size > 0,
                size,
            });
        }
        payload.push(PlaylistStatusResponse {
            id: playlist.id.clone(),
            title: playlist.title.clone(),
            videos,
        });
    }

    (StatusCode::OK, Json(payload)).into_response()
}

fn map_error(err: Error) -> Response {
    match err {
        Error::Remote(message) => map_status(StatusCode::BAD_GATEWAY, "REMOTE_ERROR", &message),
        Error::Data(message) => map_status(StatusCode::BAD_GATEWAY, "DATA_ERROR", &message),
        Error::Storage(message) => {
            map_status(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", &message)
        }
        Error::Other(err) => map_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            &err.to_string(),
        ),
    }
}

fn map_status(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}
