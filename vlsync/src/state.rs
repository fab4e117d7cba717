//! Persistance de l'état client entre deux cycles
//!
//! `client_state.json` est la seule source de vérité sur "ce que l'on
//! croit avoir sur disque". Le fichier est réécrit une fois par cycle,
//! uniquement si le cycle s'est terminé sans erreur fatale.

use std::path::{Path, PathBuf};

use crate::model::ClientState;
use crate::{Error, Result};

/// Nom du fichier d'état dans le répertoire de cache
pub const STATE_FILE: &str = "client_state.json";

/// Lecture et écriture durables de [`ClientState`]
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Crée un store pointant sur `<cache_dir>/client_state.json`
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            path: cache_dir.as_ref().join(STATE_FILE),
        }
    }

    /// Chemin du fichier d'état
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Charge l'état persisté, ou un état vide au premier démarrage
    ///
    /// Un fichier illisible ou corrompu est journalisé et remplacé par
    /// un état vide : le cycle suivant re-réconcilie tout le contenu
    /// plutôt que d'empêcher le démarrage.
    pub async fn load(&self) -> ClientState {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<ClientState>(&bytes) {
                Ok(state) => {
                    tracing::debug!(
                        "Loaded client state: {} playlists, last_update={:?}",
                        state.active_playlists.len(),
                        state.last_update
                    );
                    state
                }
                Err(err) => {
                    tracing::warn!(
                        "Corrupt state file {}, starting from empty state: {}",
                        self.path.display(),
                        err
                    );
                    ClientState::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No state file at {}, first run", self.path.display());
                ClientState::default()
            }
            Err(err) => {
                tracing::warn!(
                    "Cannot read state file {}, starting from empty state: {}",
                    self.path.display(),
                    err
                );
                ClientState::default()
            }
        }
    }

    /// Persiste l'état via un fichier temporaire puis un renommage
    ///
    /// Un crash pendant l'écriture laisse au pire un `.tmp` orphelin ;
    /// le fichier final n'est jamais visible dans un état partiel.
    pub async fn save(&self, state: &ClientState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| Error::Storage(format!("cannot serialize client state: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json.as_bytes()).await.map_err(|e| {
            Error::Storage(format!("cannot write {}: {e}", tmp_path.display()))
        })?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            Error::Storage(format!(
                "cannot rename {} to {}: {e}",
                tmp_path.display(),
                self.path.display()
            ))
        })?;

        tracing::debug!(
            "Persisted client state: {} playlists",
            state.active_playlists.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Playlist, Video};
    use chrono::Utc;

    fn sample_state() -> ClientState {
        let mut state = ClientState::default();
        state.active_playlists.insert(
            "1".to_string(),
            Playlist {
                id: "1".to_string(),
                title: "Accueil".to_string(),
                videos: vec![Video {
                    id: "10".to_string(),
                    title: "Intro".to_string(),
                    expiration_date: None,
                }],
            },
        );
        state.last_update = Some(Utc::now());
        state
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let state = store.load().await;
        assert!(state.active_playlists.is_empty());
        assert!(state.last_update.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let state = sample_state();

        store.save(&state).await.unwrap();
        let loaded = store.load().await;
        assert_eq!(loaded.active_playlists.len(), 1);
        assert_eq!(loaded.active_playlists["1"].videos[0].id, "10");
        assert_eq!(loaded.last_update, state.last_update);
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.save(&sample_state()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec![STATE_FILE.to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        std::fs::write(store.path(), b"not json at all").unwrap();

        let state = store.load().await;
        assert!(state.active_playlists.is_empty());
    }
}
