//! Orchestration d'un cycle de réconciliation
//!
//! L'orchestrateur est le seul composant autorisé à modifier le cache
//! et le fichier d'état. Un verrou garantit au plus un cycle en vol,
//! qu'il soit déclenché par le timer ou par une demande explicite de
//! mise à jour. Toute la politique de retry tient dans le tick suivant
//! du timer, aucun composant ne reboucle de lui-même.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::client::{Catalog, SyncHints};
use crate::diff::{diff_manifests, SyncDiff};
use crate::fetcher::fetch_playlist_videos;
use crate::materialize::materialize_manifest;
use crate::model::{ClientState, Playlist};
use crate::reconcile::reconcile_removed;
use crate::state::StateStore;
use crate::Result;

/// Contrôle du service de lecture, implémenté hors de ce crate
///
/// L'orchestrateur ne redémarre jamais la lecture lui-même ; c'est
/// l'appelant qui décide, sur la foi de `SyncReport::changed`.
#[async_trait]
pub trait PlayerControl: Send + Sync {
    /// Demande au service de lecture de recharger son contenu
    async fn reload(&self) -> anyhow::Result<()>;
}

/// Phase courante du cycle de synchronisation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Fetching,
    Reconciling,
    Materializing,
    Persisting,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Fetching => "fetching",
            SyncPhase::Reconciling => "reconciling",
            SyncPhase::Materializing => "materializing",
            SyncPhase::Persisting => "persisting",
        }
    }
}

/// Réglages d'un orchestrateur
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Identifiant du player auprès du catalogue
    pub device_id: String,
    /// Répertoire du cache vidéo
    pub cache_dir: PathBuf,
}

/// Bilan d'un cycle de réconciliation
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Vrai si le contenu de lecture a changé depuis le cycle précédent
    pub changed: bool,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Fichiers sidecar/m3u effectivement réécrits
    pub materialized: usize,
    pub completed_at: DateTime<Utc>,
}

/// Pilote les cycles de réconciliation du cache
pub struct SyncOrchestrator {
    settings: SyncSettings,
    catalog: Arc<dyn Catalog>,
    store: StateStore,
    state: RwLock<ClientState>,
    phase: RwLock<SyncPhase>,
    cycle_lock: Mutex<()>,
}

impl SyncOrchestrator {
    /// Crée l'orchestrateur et charge l'état persisté
    pub async fn new(settings: SyncSettings, catalog: Arc<dyn Catalog>) -> Self {
        let store = StateStore::new(&settings.cache_dir);
        let state = store.load().await;
        Self {
            settings,
            catalog,
            store,
            state: RwLock::new(state),
            phase: RwLock::new(SyncPhase::Idle),
            cycle_lock: Mutex::new(()),
        }
    }

    /// Réglages de l'orchestrateur
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Phase courante, pour les endpoints de statut
    pub async fn phase(&self) -> SyncPhase {
        *self.phase.read().await
    }

    /// Copie du dernier état persisté, sans déclencher de cycle
    pub async fn state_snapshot(&self) -> ClientState {
        self.state.read().await.clone()
    }

    /// Exécute un cycle, en attendant la fin d'un cycle déjà en vol
    ///
    /// Utilisé par la demande explicite de mise à jour : elle se met en
    /// file derrière le cycle en cours plutôt que d'échouer.
    pub async fn sync(&self) -> Result<SyncReport> {
        let _guard = self.cycle_lock.lock().await;
        let result = self.run_cycle().await;
        *self.phase.write().await = SyncPhase::Idle;
        result
    }

    /// Exécute un cycle seulement si aucun n'est en vol
    ///
    /// Utilisé par le timer : un tick qui tombe pendant un cycle lent
    /// ne fait rien, le travail sera repris au tick suivant.
    pub async fn try_sync(&self) -> Option<Result<SyncReport>> {
        let guard = self.cycle_lock.try_lock().ok()?;
        let result = self.run_cycle().await;
        *self.phase.write().await = SyncPhase::Idle;
        drop(guard);
        Some(result)
    }

    async fn set_phase(&self, phase: SyncPhase) {
        *self.phase.write().await = phase;
    }

    /// Un cycle complet : fetch, diff, téléchargements, retrait,
    /// matérialisation, persistance
    ///
    /// Une erreur distante sur le fetch du catalogue abandonne le cycle
    /// sans toucher à l'état ; le tick suivant retentera.
    async fn run_cycle(&self) -> Result<SyncReport> {
        let previous = self.state.read().await.clone();

        self.set_phase(SyncPhase::Fetching).await;
        let hints = SyncHints {
            last_update: previous.last_update,
            playlist_ids: previous.active_playlists.keys().cloned().collect(),
        };
        let current = self
            .catalog
            .active_playlists(&self.settings.device_id, &hints)
            .await?;

        let diff = diff_manifests(&previous.active_playlists, &current);

        // Toutes les playlists actives passent par le fetcher : les
        // fichiers présents sont ignorés sans appel réseau, et les
        // vidéos en échec au cycle précédent sont retentées ici.
        let playlists: Vec<&Playlist> = current.values().collect();
        let fetch = fetch_playlist_videos(self.catalog.as_ref(), &self.settings.cache_dir, &playlists).await;

        self.set_phase(SyncPhase::Reconciling).await;
        reconcile_removed(&self.settings.cache_dir, &diff.removed).await;

        self.set_phase(SyncPhase::Materializing).await;
        let materialized = materialize_manifest(&self.settings.cache_dir, &current).await?;

        let changed = diff.changed() || fetch.downloaded > 0;

        self.set_phase(SyncPhase::Persisting).await;
        let completed_at = Utc::now();
        if changed {
            let new_state = ClientState {
                active_playlists: current,
                last_update: Some(completed_at),
            };
            self.store.save(&new_state).await?;
            *self.state.write().await = new_state;
        }

        let report = self.build_report(&diff, changed, &fetch, materialized, completed_at);
        if changed {
            tracing::info!(
                "Sync cycle applied changes: {} added, {} removed, {} modified, {} downloaded, {} failed",
                report.added,
                report.removed,
                report.modified,
                report.downloaded,
                report.failed
            );
        } else {
            tracing::debug!("Sync cycle found no changes");
        }
        Ok(report)
    }

    fn build_report(
        &self,
        diff: &SyncDiff,
        changed: bool,
        fetch: &crate::fetcher::FetchReport,
        materialized: usize,
        completed_at: DateTime<Utc>,
    ) -> SyncReport {
        SyncReport {
            changed,
            added: diff.added.len(),
            removed: diff.removed.len(),
            modified: diff.modified.len(),
            downloaded: fetch.downloaded,
            skipped: fetch.skipped,
            failed: fetch.failed,
            materialized,
            completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{Manifest, Video};
    use crate::state::STATE_FILE;
    use std::path::Path;

    struct StaticCatalog {
        manifest: std::result::Result<Manifest, String>,
    }

    #[async_trait]
    impl Catalog for StaticCatalog {
        async fn active_playlists(&self, _device_id: &str, _hints: &SyncHints) -> Result<Manifest> {
            self.manifest
                .clone()
                .map_err(Error::Remote)
        }

        async fn download_video(&self, _video_id: &str, dest: &Path) -> Result<u64> {
            tokio::fs::write(dest, b"video bytes").await?;
            Ok(11)
        }
    }

    fn manifest_with_one_playlist() -> Manifest {
        let playlist = Playlist {
            id: "1".to_string(),
            title: "Accueil".to_string(),
            videos: vec![Video {
                id: "10".to_string(),
                title: "Intro".to_string(),
                expiration_date: None,
            }],
        };
        [(playlist.id.clone(), playlist)].into()
    }

    async fn orchestrator(dir: &Path, catalog: StaticCatalog) -> SyncOrchestrator {
        SyncOrchestrator::new(
            SyncSettings {
                device_id: "dev-1".to_string(),
                cache_dir: dir.to_path_buf(),
            },
            Arc::new(catalog),
        )
        .await
    }

    #[tokio::test]
    async fn test_successful_cycle_persists_state() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            dir.path(),
            StaticCatalog {
                manifest: Ok(manifest_with_one_playlist()),
            },
        )
        .await;

        let report = orch.sync().await.unwrap();
        assert!(report.changed);
        assert_eq!(report.added, 1);
        assert_eq!(report.downloaded, 1);
        assert!(dir.path().join(STATE_FILE).exists());
        assert_eq!(orch.phase().await, SyncPhase::Idle);

        let state = orch.state_snapshot().await;
        assert!(state.active_playlists.contains_key("1"));
        assert!(state.last_update.is_some());
    }

    #[tokio::test]
    async fn test_remote_failure_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            dir.path(),
            StaticCatalog {
                manifest: Err("connection refused".to_string()),
            },
        )
        .await;

        let err = orch.sync().await.unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
        assert!(!dir.path().join(STATE_FILE).exists());
        assert!(orch.state_snapshot().await.active_playlists.is_empty());
        assert_eq!(orch.phase().await, SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_unchanged_manifest_reports_no_change() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            dir.path(),
            StaticCatalog {
                manifest: Ok(manifest_with_one_playlist()),
            },
        )
        .await;

        let first = orch.sync().await.unwrap();
        assert!(first.changed);
        let second = orch.sync().await.unwrap();
        assert!(!second.changed);
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.materialized, 0);
    }
}
