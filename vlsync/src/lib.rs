//! # vlsync - Réconciliation du cache vidéo avec le catalogue distant
//!
//! Cette crate implémente le cycle de synchronisation d'un player de
//! signalétique : elle compare le contenu assigné par le service distant
//! à ce qui est présent dans le cache local, télécharge les vidéos
//! manquantes, reconstruit les manifestes de lecture et persiste l'état
//! entre deux cycles.
//!
//! ## Architecture
//!
//! - **StateStore** : persistance de `client_state.json` entre cycles
//! - **CatalogClient** : accès HTTP au catalogue (trait [`Catalog`])
//! - **diff** : comparaison ensembliste ancien/nouveau manifeste
//! - **fetcher** : téléchargements atomiques (`.mp4.tmp` puis renommage)
//! - **materialize** : sidecars JSON, m3u par playlist et m3u fusionné
//! - **reconcile** : retrait ciblé des artefacts désassignés
//! - **SyncOrchestrator** : un seul cycle en vol, retry au tick suivant
//!
//! ## Exemple
//!
//! ```no_run
//! use std::sync::Arc;
//! use vlsync::{CatalogClient, SyncOrchestrator, SyncSettings};
//!
//! # #[tokio::main]
//! # async fn main() -> vlsync::Result<()> {
//! let catalog = CatalogClient::builder()
//!     .base_url("http://remote:8000")
//!     .build()?;
//!
//! let orchestrator = SyncOrchestrator::new(
//!     SyncSettings {
//!         device_id: "player-42".to_string(),
//!         cache_dir: "/var/lib/vlagent/videos".into(),
//!     },
//!     Arc::new(catalog),
//! )
//! .await;
//!
//! let report = orchestrator.sync().await?;
//! if report.changed {
//!     println!("Content changed, playback service should reload");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod diff;
mod error;
mod fetcher;
mod materialize;
mod model;
mod orchestrator;
mod reconcile;
mod state;

#[cfg(feature = "vlconfig")]
mod config_ext;

#[cfg(feature = "vlserver")]
pub mod api;

#[cfg(feature = "openapi")]
pub mod openapi;

// Réexports publics
pub use client::{
    Catalog, CatalogClient, ClientBuilder, SyncHints, DEFAULT_BASE_URL,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
pub use diff::{diff_manifests, SyncDiff};
pub use error::{Error, Result};
pub use fetcher::{fetch_playlist_videos, is_present, temp_path, video_path, FetchReport};
pub use materialize::{
    m3u_path, materialize_manifest, merged_path, sidecar_path, write_if_changed,
    write_merged_manifest, write_playlist_files, MERGED_PLAYLIST,
};
pub use model::{decode_manifest, ClientState, Manifest, Playlist, Video};
pub use orchestrator::{
    PlayerControl, SyncOrchestrator, SyncPhase, SyncReport, SyncSettings,
};
pub use reconcile::{reconcile_removed, remove_playlist_artifacts};
pub use state::{StateStore, STATE_FILE};

#[cfg(feature = "vlconfig")]
pub use config_ext::SyncConfigExt;
