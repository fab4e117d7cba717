//! Comparaison du manifeste distant avec l'état persisté
//!
//! La comparaison est ensembliste, jamais positionnelle : réordonner les
//! vidéos d'une playlist par ailleurs identique ne déclenche pas de
//! changement.

use std::collections::{BTreeSet, HashMap};

use crate::model::{Manifest, Playlist};

/// Changements détectés entre deux manifestes
///
/// Les trois ensembles sont disjoints : une playlist est ajoutée,
/// supprimée ou modifiée, jamais deux à la fois.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncDiff {
    /// Playlists présentes dans le nouveau manifeste uniquement
    pub added: BTreeSet<String>,
    /// Playlists présentes dans l'état persisté uniquement
    pub removed: BTreeSet<String>,
    /// Playlists communes dont le contenu a changé
    pub modified: BTreeSet<String>,
}

impl SyncDiff {
    /// Vrai si au moins une playlist a changé
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.modified.is_empty()
    }

    /// Identifiants des playlists dont les vidéos doivent être
    /// téléchargées, ajoutées puis modifiées
    pub fn to_fetch(&self) -> impl Iterator<Item = &str> {
        self.added
            .iter()
            .chain(self.modified.iter())
            .map(String::as_str)
    }
}

/// Compare l'état persisté au manifeste distant
pub fn diff_manifests(previous: &Manifest, current: &Manifest) -> SyncDiff {
    let previous_ids: BTreeSet<&str> = previous.keys().map(String::as_str).collect();
    let current_ids: BTreeSet<&str> = current.keys().map(String::as_str).collect();

    let mut diff = SyncDiff::default();
    for id in current_ids.difference(&previous_ids) {
        diff.added.insert((*id).to_string());
    }
    for id in previous_ids.difference(&current_ids) {
        diff.removed.insert((*id).to_string());
    }
    for id in current_ids.intersection(&previous_ids) {
        if playlist_modified(&previous[*id], &current[*id]) {
            diff.modified.insert((*id).to_string());
        }
    }

    tracing::debug!(
        "Diff: {} added, {} removed, {} modified",
        diff.added.len(),
        diff.removed.len(),
        diff.modified.len()
    );
    diff
}

/// Vrai si le contenu vidéo d'une playlist a changé
///
/// D'abord les ensembles d'identifiants de vidéos, puis, s'ils sont
/// identiques, la date d'expiration de chaque vidéo.
fn playlist_modified(previous: &Playlist, current: &Playlist) -> bool {
    if previous.video_ids() != current.video_ids() {
        return true;
    }

    let previous_expirations: HashMap<&str, _> = previous
        .videos
        .iter()
        .map(|v| (v.id.as_str(), v.expiration_date))
        .collect();
    current
        .videos
        .iter()
        .any(|v| previous_expirations.get(v.id.as_str()) != Some(&v.expiration_date))
}
