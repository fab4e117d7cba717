//! # vldevice - Identité du player et contrôle du service de lecture
//!
//! Cette crate couvre les échanges « device » avec le service distant
//! et le pilotage local de la lecture :
//! - enregistrement du player au démarrage ([`DeviceClient::register`])
//! - heartbeat périodique avec ré-enregistrement après échecs répétés
//!   ([`run_heartbeat`])
//! - redémarrage de l'unité systemd de lecture ([`SystemdUnit`]),
//!   exposé au coeur de synchronisation via `vlsync::PlayerControl`

mod client;
mod error;
mod service;

// Réexports publics
pub use client::{
    run_heartbeat, DeviceClient, DeviceInfo, DeviceStatus, HeartbeatMonitor,
    DEFAULT_REQUEST_TIMEOUT_SECS, MAX_HEARTBEAT_FAILURES,
};
pub use error::{Error, Result};
pub use service::SystemdUnit;
