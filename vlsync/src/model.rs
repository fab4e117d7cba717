//! Modèle de données : vidéos, playlists, manifeste et état client
//!
//! Les instances sont éphémères, reconstruites à chaque cycle depuis la
//! réponse du catalogue distant. Seul `ClientState` est persisté entre
//! deux cycles (voir [`crate::state`]).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Une vidéo assignée au player
///
/// L'identité est portée par `id` ; le contenu est stocké sous
/// `<id>.mp4` dans le répertoire de cache une fois téléchargé.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    /// Date d'expiration fournie par le catalogue, absente si la vidéo
    /// n'expire pas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
}

impl Video {
    /// Nom du fichier vidéo dans le cache
    pub fn file_name(&self) -> String {
        format!("{}.mp4", self.id)
    }
}

/// Une playlist assignée au player
///
/// L'ordre de `videos` est l'ordre de lecture et doit être conservé
/// tel que fourni par le serveur.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub videos: Vec<Video>,
}

impl Playlist {
    /// Ensemble des identifiants de vidéos de la playlist
    pub fn video_ids(&self) -> BTreeSet<&str> {
        self.videos.iter().map(|v| v.id.as_str()).collect()
    }
}

/// Contenu actuellement assigné au player : playlist id → playlist
pub type Manifest = BTreeMap<String, Playlist>;

/// État durable entre deux cycles, persisté dans `client_state.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientState {
    /// Playlists réconciliées avec succès lors du dernier cycle
    #[serde(default)]
    pub active_playlists: Manifest,
    /// Horodatage du dernier cycle ayant appliqué des changements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl ClientState {
    /// Nombre total de vidéos référencées par les playlists actives
    pub fn video_count(&self) -> usize {
        self.active_playlists.values().map(|p| p.videos.len()).sum()
    }
}

/// Décode la réponse du catalogue en manifeste validé
///
/// Chaque enregistrement est validé individuellement : une playlist mal
/// formée est journalisée et ignorée sans faire échouer les autres. Un
/// corps qui n'est pas un tableau JSON est une erreur distante qui fait
/// échouer le cycle.
pub fn decode_manifest(payload: serde_json::Value) -> Result<Manifest> {
    let items = payload
        .as_array()
        .ok_or_else(|| Error::Remote("expected a JSON array of playlists".to_string()))?;

    let mut manifest = Manifest::new();
    for item in items {
        match serde_json::from_value::<Playlist>(item.clone()) {
            Ok(playlist) => {
                if let Some(previous) = manifest.insert(playlist.id.clone(), playlist) {
                    tracing::warn!("Duplicate playlist id {} in catalog response", previous.id);
                }
            }
            Err(err) => {
                tracing::warn!("Skipping malformed playlist record: {}", Error::Data(err.to_string()));
            }
        }
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_valid_manifest() {
        let payload = json!([
            {
                "id": "1",
                "title": "Hall d'accueil",
                "videos": [
                    {"id": "10", "title": "Intro", "expiration_date": "2026-12-31T00:00:00Z"},
                    {"id": "11", "title": "Boucle"}
                ]
            }
        ]);

        let manifest = decode_manifest(payload).unwrap();
        assert_eq!(manifest.len(), 1);
        let playlist = &manifest["1"];
        assert_eq!(playlist.title, "Hall d'accueil");
        assert_eq!(playlist.videos.len(), 2);
        assert!(playlist.videos[0].expiration_date.is_some());
        assert!(playlist.videos[1].expiration_date.is_none());
    }

    #[test]
    fn test_decode_skips_malformed_record() {
        let payload = json!([
            {"id": "1", "title": "Valide", "videos": []},
            {"title": "Sans id", "videos": []},
            {"id": "3", "title": "Aussi valide", "videos": []}
        ]);

        let manifest = decode_manifest(payload).unwrap();
        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains_key("1"));
        assert!(manifest.contains_key("3"));
    }

    #[test]
    fn test_decode_rejects_non_array_body() {
        let payload = json!({"detail": "Not found"});
        let err = decode_manifest(payload).unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
    }

    #[test]
    fn test_client_state_roundtrip() {
        let mut state = ClientState::default();
        state.active_playlists.insert(
            "1".to_string(),
            Playlist {
                id: "1".to_string(),
                title: "Test".to_string(),
                videos: vec![Video {
                    id: "10".to_string(),
                    title: "Clip".to_string(),
                    expiration_date: None,
                }],
            },
        );
        state.last_update = Some(Utc::now());

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("active_playlists"));
        let decoded: ClientState = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.active_playlists.len(), 1);
        assert_eq!(decoded.video_count(), 1);
        assert_eq!(decoded.last_update, state.last_update);
    }

    #[test]
    fn test_empty_state_decodes_from_empty_object() {
        let decoded: ClientState = serde_json::from_str("{}").unwrap();
        assert!(decoded.active_playlists.is_empty());
        assert!(decoded.last_update.is_none());
    }
}
