//! Retrait ciblé des artefacts de playlists désassignées
//!
//! Seuls le sidecar JSON et le m3u de la playlist sont supprimés. Les
//! fichiers vidéo ne sont jamais effacés ici : une vidéo peut être
//! référencée par une autre playlist active et la re-télécharger
//! coûterait cher sur un lien contraint.

use std::collections::BTreeSet;
use std::path::Path;

use crate::materialize::{m3u_path, sidecar_path};
use crate::Result;

/// Supprime le sidecar et le m3u d'une playlist
pub async fn remove_playlist_artifacts(cache_dir: &Path, playlist_id: &str) -> Result<()> {
    for path in [
        sidecar_path(cache_dir, playlist_id),
        m3u_path(cache_dir, playlist_id),
    ] {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!("Removed {}", path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Retire les artefacts de toutes les playlists désassignées
///
/// Une erreur sur une playlist est journalisée et n'empêche pas le
/// retrait des autres. Retourne le nombre de playlists nettoyées.
pub async fn reconcile_removed(cache_dir: &Path, removed: &BTreeSet<String>) -> usize {
    let mut cleaned = 0;
    for playlist_id in removed {
        match remove_playlist_artifacts(cache_dir, playlist_id).await {
            Ok(()) => {
                tracing::info!("Removed artifacts of unassigned playlist {}", playlist_id);
                cleaned += 1;
            }
            Err(err) => {
                tracing::warn!(
                    "Cannot remove artifacts of playlist {}: {}",
                    playlist_id,
                    err
                );
            }
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::video_path;

    #[tokio::test]
    async fn test_removes_sidecar_and_m3u_but_not_videos() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(sidecar_path(dir.path(), "2"), b"{}").unwrap();
        std::fs::write(m3u_path(dir.path(), "2"), b"/tmp/20.mp4").unwrap();
        std::fs::write(video_path(dir.path(), "20"), b"binary").unwrap();

        let removed: BTreeSet<String> = ["2".to_string()].into();
        let cleaned = reconcile_removed(dir.path(), &removed).await;

        assert_eq!(cleaned, 1);
        assert!(!sidecar_path(dir.path(), "2").exists());
        assert!(!m3u_path(dir.path(), "2").exists());
        assert!(video_path(dir.path(), "20").exists());
    }

    #[tokio::test]
    async fn test_missing_artifacts_are_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let removed: BTreeSet<String> = ["absent".to_string()].into();
        let cleaned = reconcile_removed(dir.path(), &removed).await;
        assert_eq!(cleaned, 1);
    }
}
