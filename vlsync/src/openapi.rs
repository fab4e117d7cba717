//! Documentation OpenAPI pour les endpoints de synchronisation.

use utoipa::OpenApi;

/// Documentation OpenAPI pour l'API sync.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::sync_status,
        crate::api::force_update,
        crate::api::list_playlists,
    ),
    components(
        schemas(
            crate::api::SyncStatusResponse,
            crate::api::ForceUpdateResponse,
            crate::api::PlaylistStatusResponse,
            crate::api::VideoStatusResponse,
            crate::api::ErrorResponse,
        )
    ),
    tags(
        (name = "sync", description = "Réconciliation du cache vidéo avec le catalogue distant")
    ),
    info(
        title = "VLAgent Sync API",
        version = "0.1.0",
        description = r#"
# Synchronisation du contenu

Endpoints de suivi et de pilotage du cycle de réconciliation :
- `GET /api/sync/status` : phase courante, playlists actives, dernier cycle appliqué
- `POST /api/sync/force-update` : exécute un cycle immédiatement (mis en file derrière un cycle en vol)
- `GET /api/sync/list-playlists` : playlists actives avec la présence de chaque vidéo sur disque
        "#,
    )
)]
pub struct ApiDoc;
