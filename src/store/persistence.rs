// ============================================================================
// Persistance de l'état
// ============================================================================
// Un seul enregistrement sérialisé en JSON :
//   { rates, baseCurrency, userCurrencies, activeCurrency, activeAmount,
//     lastUpdated }
//
// CONCEPTS RUST :
// 1. Trait StateStorage : le modèle ne sait pas OÙ l'état est stocké
// 2. Box<dyn Trait> : fichier en production, mémoire dans les tests
// 3. Lecture champ par champ : un champ corrompu n'invalide pas les autres
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{canonical_code, RateTable};
use crate::store::model::DEFAULT_BASE_CURRENCY;

/// Devise active par défaut
pub const DEFAULT_ACTIVE_CURRENCY: &str = "USD";

/// Montant actif par défaut
pub const DEFAULT_ACTIVE_AMOUNT: f64 = 1000.0;

/// Nom du fichier d'état (la "clé" fixe de l'enregistrement)
pub const STATE_FILE_NAME: &str = "currency-store.json";

// ============================================================================
// Trait StateStorage
// ============================================================================

/// Emplacement de l'enregistrement persisté
///
/// CONCEPT RUST : Send
/// - Le modèle est partagé entre l'UI et le worker (Arc<Mutex<..>>)
/// - Son stockage doit donc pouvoir changer de thread
pub trait StateStorage: Send {
    /// Lit l'enregistrement brut, `None` s'il n'a jamais été écrit
    fn read(&self) -> Result<Option<String>>;

    /// Remplace l'enregistrement
    fn write(&self, contents: &str) -> Result<()>;
}

// ============================================================================
// Stockage fichier
// ============================================================================

/// Stockage dans un fichier JSON
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Emplacement par défaut : <data_local_dir>/lazyrates/currency-store.json
    ///
    /// Si le répertoire de données n'est pas déterminable, on utilise
    /// le répertoire courant.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join("lazyrates"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(STATE_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStorage for JsonFileStorage {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Échec de la lecture de {}", self.path.display()))?;
        Ok(Some(contents))
    }

    fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Échec de la création du répertoire {}", parent.display())
            })?;
        }

        fs::write(&self.path, contents)
            .with_context(|| format!("Échec de l'écriture de {}", self.path.display()))?;
        debug!(path = %self.path.display(), "State written");
        Ok(())
    }
}

// ============================================================================
// Stockage mémoire
// ============================================================================

/// Stockage en mémoire, partagé entre ses clones
///
/// Utile pour les tests et pour une session sans disque : un clone
/// conservé par l'appelant permet d'inspecter ce que le modèle a écrit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<String>>>,
    writes: Arc<Mutex<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Crée un stockage pré-rempli avec un enregistrement brut
    pub fn with_contents(contents: impl Into<String>) -> Self {
        let storage = Self::new();
        *storage.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(contents.into());
        storage
    }

    /// Contenu actuel de l'enregistrement
    pub fn contents(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Nombre d'écritures effectuées
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.contents())
    }

    fn write(&self, contents: &str) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(contents.to_string());
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

// ============================================================================
// Enregistrement persisté
// ============================================================================

/// Partie persistée de l'état (isLoading et error sont exclus)
///
/// CONCEPT RUST : #[serde(rename_all = "camelCase")]
/// - user_currencies (Rust) <-> userCurrencies (JSON)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub rates: RateTable,
    /// Devise de base dans laquelle `rates` est exprimée
    pub base_currency: String,
    pub user_currencies: Vec<String>,
    pub active_currency: String,
    pub active_amount: f64,
    /// Timestamp Unix en millisecondes
    pub last_updated: Option<i64>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            rates: RateTable::new(),
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            user_currencies: Vec::new(),
            active_currency: DEFAULT_ACTIVE_CURRENCY.to_string(),
            active_amount: DEFAULT_ACTIVE_AMOUNT,
            last_updated: None,
        }
    }
}

impl PersistedState {
    /// Sérialise l'enregistrement
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Échec de la sérialisation de l'état")
    }

    /// Parse un enregistrement brut
    ///
    /// Le JSON lui-même doit être valide ; ensuite chaque champ absent ou
    /// d'un type inattendu retombe sur sa valeur par défaut.
    pub fn from_json(contents: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(contents).context("Enregistrement d'état illisible")?;
        Ok(Self::from_value(&value))
    }

    fn from_value(value: &Value) -> Self {
        let defaults = Self::default();

        let rates = value
            .get("rates")
            .and_then(|v| serde_json::from_value::<RateTable>(v.clone()).ok())
            .unwrap_or(defaults.rates);

        // Absent des anciens enregistrements : le flux était coté en USD
        let base_currency = value
            .get("baseCurrency")
            .and_then(Value::as_str)
            .map(canonical_code)
            .filter(|code| !code.is_empty())
            .unwrap_or(defaults.base_currency);

        // Codes canonicalisés et dédoublonnés, ordre conservé
        let user_currencies = value
            .get("userCurrencies")
            .and_then(Value::as_array)
            .map(|codes| {
                let mut unique: Vec<String> = Vec::new();
                for code in codes.iter().filter_map(Value::as_str).map(canonical_code) {
                    if !code.is_empty() && !unique.contains(&code) {
                        unique.push(code);
                    }
                }
                unique
            })
            .unwrap_or(defaults.user_currencies);

        let active_currency = value
            .get("activeCurrency")
            .and_then(Value::as_str)
            .map(canonical_code)
            .filter(|code| !code.is_empty())
            .unwrap_or(defaults.active_currency);

        let active_amount = value
            .get("activeAmount")
            .and_then(Value::as_f64)
            .filter(|amount| amount.is_finite())
            .unwrap_or(defaults.active_amount);

        let last_updated = value.get("lastUpdated").and_then(Value::as_i64);

        Self {
            rates,
            base_currency,
            user_currencies,
            active_currency,
            active_amount,
            last_updated,
        }
    }

    /// Convertit le timestamp persisté en DateTime
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated.and_then(DateTime::from_timestamp_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = PersistedState::default();
        assert_eq!(state.active_currency, "USD");
        assert_eq!(state.active_amount, 1000.0);
        assert!(state.user_currencies.is_empty());
        assert!(state.rates.is_empty());
        assert!(state.last_updated.is_none());
    }

    #[test]
    fn test_json_uses_camel_case_keys() {
        let mut state = PersistedState::default();
        state.rates.insert("usd", 1.0);
        state.last_updated = Some(1234567890);

        let json = state.to_json().unwrap();
        assert!(json.contains("\"userCurrencies\""));
        assert!(json.contains("\"activeCurrency\":\"USD\""));
        assert!(json.contains("\"lastUpdated\":1234567890"));
        assert!(json.contains("\"usd\":1"));
        assert!(!json.contains("isLoading"));
    }

    #[test]
    fn test_load_full_record() {
        let json = r#"{
            "rates": {"usd": 1, "eur": 0.92},
            "userCurrencies": ["USD", "EUR"],
            "activeCurrency": "EUR",
            "activeAmount": 500,
            "lastUpdated": 1234567890
        }"#;

        let state = PersistedState::from_json(json).unwrap();
        assert_eq!(state.rates.get("eur"), Some(0.92));
        assert_eq!(state.user_currencies, vec!["USD", "EUR"]);
        assert_eq!(state.active_currency, "EUR");
        assert_eq!(state.active_amount, 500.0);
        assert_eq!(state.last_updated, Some(1234567890));
        assert!(state.last_updated_at().is_some());
    }

    #[test]
    fn test_corrupt_fields_fall_back_individually() {
        let json = r#"{
            "rates": "oops",
            "userCurrencies": ["usd", "EUR", "Usd", 42],
            "activeCurrency": 7,
            "activeAmount": "lots"
        }"#;

        let state = PersistedState::from_json(json).unwrap();
        assert!(state.rates.is_empty());
        assert_eq!(state.user_currencies, vec!["USD", "EUR"]);
        assert_eq!(state.active_currency, "USD");
        assert_eq!(state.active_amount, 1000.0);
        assert!(state.last_updated.is_none());
    }

    #[test]
    fn test_uppercase_rate_keys_are_normalized() {
        let json = r#"{"rates": {"USD": 1, "EUR": 0.92}, "userCurrencies": ["USD", "EUR"]}"#;

        let state = PersistedState::from_json(json).unwrap();
        assert_eq!(state.rates.get("eur"), Some(0.92));
        assert!(state.rates.contains("USD"));
        approx::assert_relative_eq!(
            crate::models::convert(&state.rates, "USD", "USD", "EUR", 100.0),
            92.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_base_currency_defaults_to_usd() {
        let state = PersistedState::from_json(r#"{"rates": {"usd": 1}}"#).unwrap();
        assert_eq!(state.base_currency, "USD");

        let state = PersistedState::from_json(r#"{"baseCurrency": "eur"}"#).unwrap();
        assert_eq!(state.base_currency, "EUR");
        assert!(state.to_json().unwrap().contains("\"baseCurrency\":\"EUR\""));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(PersistedState::from_json("{not json").is_err());
    }

    #[test]
    fn test_memory_storage_counts_writes() {
        let storage = MemoryStorage::new();
        assert!(storage.read().unwrap().is_none());

        storage.write("{}").unwrap();
        storage.write("{\"a\":1}").unwrap();

        assert_eq!(storage.write_count(), 2);
        assert_eq!(storage.contents().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_json_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("nested").join(STATE_FILE_NAME));

        assert!(storage.read().unwrap().is_none());

        storage.write("{\"activeAmount\":42}").unwrap();
        let contents = storage.read().unwrap().unwrap();
        assert_eq!(PersistedState::from_json(&contents).unwrap().active_amount, 42.0);
    }
}
