//! Écriture des sidecars et des manifestes m3u
//!
//! Produit pour chaque playlist active un sidecar JSON et un m3u, plus
//! un m3u fusionné consommé par le service de lecture. Chaque fichier
//! n'est réécrit que si son contenu calculé diffère octet à octet de
//! l'existant, pour éviter les écritures disque parasites.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::fetcher::{is_present, video_path};
use crate::model::{Manifest, Playlist};
use crate::{Error, Result};

/// Nom du manifeste fusionné lu par le service de lecture
pub const MERGED_PLAYLIST: &str = "playlist.m3u";

/// Chemin du sidecar JSON d'une playlist
pub fn sidecar_path(cache_dir: &Path, playlist_id: &str) -> PathBuf {
    cache_dir.join(format!("playlist_{playlist_id}.json"))
}

/// Chemin du m3u d'une playlist
pub fn m3u_path(cache_dir: &Path, playlist_id: &str) -> PathBuf {
    cache_dir.join(format!("playlist_{playlist_id}.m3u"))
}

/// Chemin du manifeste fusionné
pub fn merged_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(MERGED_PLAYLIST)
}

/// Écrit `content` dans `path` seulement si le contenu diffère
///
/// Retourne `true` si le fichier a été écrit.
pub async fn write_if_changed(path: &Path, content: &[u8]) -> Result<bool> {
    if let Ok(existing) = tokio::fs::read(path).await {
        if existing == content {
            tracing::debug!("{} unchanged, not rewritten", path.display());
            return Ok(false);
        }
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|e| Error::Storage(format!("cannot write {}: {e}", path.display())))?;
    Ok(true)
}

/// Lignes du m3u d'une playlist : chemins absolus des vidéos présentes
///
/// L'ordre du serveur est conservé ; les vidéos pas encore téléchargées
/// sont omises silencieusement, jamais référencées.
async fn m3u_lines(cache_dir: &Path, playlist: &Playlist) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for video in &playlist.videos {
        let path = video_path(cache_dir, &video.id);
        if is_present(&path).await {
            let absolute = std::path::absolute(&path)?;
            lines.push(absolute.to_string_lossy().into_owned());
        }
    }
    Ok(lines)
}

/// Écrit le sidecar et le m3u d'une playlist
///
/// Retourne le nombre de fichiers effectivement écrits (0, 1 ou 2).
pub async fn write_playlist_files(cache_dir: &Path, playlist: &Playlist) -> Result<usize> {
    let mut written = 0;

    let sidecar = serde_json::to_vec_pretty(playlist)
        .map_err(|e| Error::Data(format!("cannot serialize playlist {}: {e}", playlist.id)))?;
    if write_if_changed(&sidecar_path(cache_dir, &playlist.id), &sidecar).await? {
        written += 1;
    }

    let m3u = m3u_lines(cache_dir, playlist).await?.join("\n");
    if write_if_changed(&m3u_path(cache_dir, &playlist.id), m3u.as_bytes()).await? {
        written += 1;
    }

    Ok(written)
}

/// Reconstruit le manifeste fusionné de toutes les playlists actives
///
/// Union des vidéos présentes, dédupliquée par identifiant de vidéo.
/// Retourne `true` si le fichier a été réécrit.
pub async fn write_merged_manifest(cache_dir: &Path, manifest: &Manifest) -> Result<bool> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut lines = Vec::new();

    for playlist in manifest.values() {
        for video in &playlist.videos {
            if !seen.insert(video.id.as_str()) {
                continue;
            }
            let path = video_path(cache_dir, &video.id);
            if is_present(&path).await {
                let absolute = std::path::absolute(&path)?;
                lines.push(absolute.to_string_lossy().into_owned());
            }
        }
    }

    let content = lines.join("\n");
    write_if_changed(&merged_path(cache_dir), content.as_bytes()).await
}

/// Matérialise toutes les playlists actives plus le manifeste fusionné
///
/// Retourne le nombre total de fichiers écrits. Une playlist en erreur
/// est journalisée et n'empêche pas la matérialisation des autres.
pub async fn materialize_manifest(cache_dir: &Path, manifest: &Manifest) -> Result<usize> {
    let mut written = 0;
    for playlist in manifest.values() {
        match write_playlist_files(cache_dir, playlist).await {
            Ok(count) => written += count,
            Err(err) => {
                tracing::warn!("Cannot materialize playlist {}: {}", playlist.id, err);
            }
        }
    }
    if write_merged_manifest(cache_dir, manifest).await? {
        written += 1;
    }
    Ok(written)
}
