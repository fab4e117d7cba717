//! Initialisation du système de logging
//!
//! Le binaire appelle [`init_logging`] une seule fois au démarrage ; le
//! niveau par défaut est `info` et peut être ajusté via la variable
//! d'environnement `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Niveau de log par défaut quand `RUST_LOG` est absent
const DEFAULT_LOG_FILTER: &str = "info";

/// Initialise le subscriber tracing global
///
/// # Exemple
///
/// ```rust,no_run
/// vlserver::init_logging();
/// tracing::info!("player starting");
/// ```
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_ansi(true)
        .init();
}
