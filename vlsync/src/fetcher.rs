//! Téléchargement des vidéos vers le cache local
//!
//! Discipline fichier temporaire puis renommage : le chemin final
//! `<id>.mp4` n'existe jamais dans un état partiel. Les téléchargements
//! d'un cycle sont séquentiels et l'échec d'une vidéo n'interrompt pas
//! les suivantes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::client::Catalog;
use crate::model::Playlist;

/// Chemin du fichier vidéo final dans le cache
pub fn video_path(cache_dir: &Path, video_id: &str) -> PathBuf {
    cache_dir.join(format!("{video_id}.mp4"))
}

/// Chemin du fichier temporaire de téléchargement
pub fn temp_path(cache_dir: &Path, video_id: &str) -> PathBuf {
    cache_dir.join(format!("{video_id}.mp4.tmp"))
}

/// Vrai si le fichier existe avec une taille non nulle
///
/// C'est le seul critère de présence ; aucun hash de contenu n'est
/// vérifié.
pub async fn is_present(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len() > 0,
        Err(_) => false,
    }
}

/// Bilan d'une passe de téléchargement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchReport {
    /// Vidéos effectivement téléchargées
    pub downloaded: usize,
    /// Vidéos déjà présentes, aucun appel réseau
    pub skipped: usize,
    /// Vidéos en échec, à retenter au prochain cycle
    pub failed: usize,
}

/// Télécharge les vidéos manquantes des playlists données
///
/// Les vidéos partagées entre plusieurs playlists ne sont considérées
/// qu'une seule fois. Une erreur de téléchargement est journalisée et
/// comptée puis la passe continue avec la vidéo suivante.
pub async fn fetch_playlist_videos(
    catalog: &dyn Catalog,
    cache_dir: &Path,
    playlists: &[&Playlist],
) -> FetchReport {
    let mut report = FetchReport::default();
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    for playlist in playlists {
        for video in &playlist.videos {
            if !seen.insert(video.id.as_str()) {
                continue;
            }

            let final_path = video_path(cache_dir, &video.id);
            if is_present(&final_path).await {
                tracing::debug!("Video {} already in cache, skipping", video.id);
                report.skipped += 1;
                continue;
            }

            let tmp = temp_path(cache_dir, &video.id);
            match catalog.download_video(&video.id, &tmp).await {
                Ok(bytes) => match tokio::fs::rename(&tmp, &final_path).await {
                    Ok(()) => {
                        tracing::info!("Downloaded video {} ({} bytes)", video.id, bytes);
                        report.downloaded += 1;
                    }
                    Err(err) => {
                        tracing::warn!(
                            "Cannot move video {} into place: {}",
                            video.id,
                            err
                        );
                        remove_if_present(&tmp).await;
                        report.failed += 1;
                    }
                },
                Err(err) => {
                    tracing::warn!("Download of video {} failed: {}", video.id, err);
                    remove_if_present(&tmp).await;
                    report.failed += 1;
                }
            }
        }
    }

    report
}

async fn remove_if_present(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Cannot remove temp file {}: {}", path.display(), err);
        }
    }
}
