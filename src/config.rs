// ============================================================================
// Configuration utilisateur
// ============================================================================
// Fichier TOML optionnel : <config_dir>/lazyrates/config.toml
//
//   feed_url = "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1/currencies"
//   base_currency = "USD"
//   state_file = "/home/me/.local/share/lazyrates/currency-store.json"
//   request_timeout_secs = 10
//
// Chaque champ absent prend sa valeur par défaut.
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::DEFAULT_FEED_URL;
use crate::store::model::DEFAULT_BASE_CURRENCY;
use crate::store::JsonFileStorage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Racine du flux de taux
    pub feed_url: String,

    /// Devise de référence du flux
    pub base_currency: String,

    /// Fichier d'état ; emplacement par défaut si absent
    pub state_file: Option<PathBuf>,

    /// Délai maximum d'une requête HTTP, en secondes
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            state_file: None,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Emplacement du fichier de configuration
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lazyrates").join("config.toml"))
    }

    /// Lit un fichier de configuration
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Échec de la lecture de {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Configuration invalide dans {}", path.display()))
    }

    /// Charge la configuration, ou les valeurs par défaut
    ///
    /// Un fichier absent est normal ; un fichier illisible est signalé
    /// dans les logs puis ignoré.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        Self::load_from(&path).unwrap_or_else(|e| {
            warn!(error = ?e, "Ignoring invalid config file");
            Self::default()
        })
    }

    /// Fichier d'état effectif
    pub fn state_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(JsonFileStorage::default_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
