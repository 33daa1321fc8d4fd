// ============================================================================
// Structure : ConversionModel
// ============================================================================
// Source unique de vérité du convertisseur :
// - taux de change en cache et date de mise à jour
// - liste ordonnée des devises de l'utilisateur
// - devise active (en cours d'édition) et son montant
//
// PATTERN : comme l'état d'application du TUI
// - Toutes les vues lisent depuis le modèle
// - Toutes les modifications passent par ses méthodes
// - Chaque mutation notifie les abonnés (et persiste l'état si besoin)
//
// Seul le montant de la devise active est stocké ; les montants des
// autres devises sont recalculés à chaque lecture.
// ============================================================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::models::{canonical_code, convert, IntoAmount, RateTable, DEFAULT_CURRENCIES, MAJOR_CURRENCIES};
use crate::store::persistence::{PersistedState, StateStorage};
use crate::store::subscribers::{ListenerRegistry, Subscription};

/// Devise de base par défaut du flux de taux
pub const DEFAULT_BASE_CURRENCY: &str = "USD";

/// Au-delà de cette durée, les taux en cache sont considérés périmés
pub fn stale_threshold() -> Duration {
    Duration::hours(24)
}

/// Horloge injectable (Utc::now en production)
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Modèle partagé entre les vues et l'adaptateur de taux
///
/// CONCEPT RUST : Arc<Mutex<>> pour partage entre threads
/// - le worker de rafraîchissement et l'UI accèdent au même modèle
pub type SharedModel = Arc<Mutex<ConversionModel>>;

/// Verrouille le modèle partagé
///
/// Un abonné qui panique est isolé par le registre ; si le verrou est
/// malgré tout empoisonné, on récupère l'état tel quel.
pub fn lock_model(model: &SharedModel) -> MutexGuard<'_, ConversionModel> {
    model.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Structure : ConversionState
// ============================================================================

/// État complet transmis aux abonnés
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionState {
    /// Dernière table de taux chargée (peut être vide)
    pub rates: RateTable,

    /// Date de la dernière mise à jour des taux (None = jamais)
    pub last_updated: Option<DateTime<Utc>>,

    /// Devises de l'utilisateur, dans l'ordre d'affichage (majuscules, uniques)
    pub user_currencies: Vec<String>,

    /// Devise en cours d'édition
    pub active_currency: String,

    /// Montant saisi, exprimé dans la devise active
    pub active_amount: f64,

    /// Chargement en cours (non persisté)
    pub is_loading: bool,

    /// Message d'erreur à afficher (non persisté)
    pub error: Option<String>,
}

impl ConversionState {
    fn from_persisted(persisted: PersistedState) -> Self {
        let last_updated = persisted.last_updated_at();
        Self {
            rates: persisted.rates,
            last_updated,
            user_currencies: persisted.user_currencies,
            active_currency: persisted.active_currency,
            active_amount: persisted.active_amount,
            is_loading: false,
            error: None,
        }
    }

    fn to_persisted(&self, base_currency: &str) -> PersistedState {
        PersistedState {
            rates: self.rates.clone(),
            base_currency: base_currency.to_string(),
            user_currencies: self.user_currencies.clone(),
            active_currency: self.active_currency.clone(),
            active_amount: self.active_amount,
            last_updated: self.last_updated.map(|at| at.timestamp_millis()),
        }
    }
}

impl Default for ConversionState {
    fn default() -> Self {
        Self::from_persisted(PersistedState::default())
    }
}

// ============================================================================
// ConversionModel
// ============================================================================

pub struct ConversionModel {
    state: ConversionState,
    base_currency: String,
    storage: Box<dyn StateStorage>,
    listeners: ListenerRegistry<ConversionState>,
    clock: Clock,
}

impl ConversionModel {
    /// Crée le modèle et l'hydrate depuis le stockage
    ///
    /// Un stockage illisible ou corrompu n'est jamais une erreur :
    /// on log un avertissement et on garde les valeurs par défaut.
    pub fn load(storage: Box<dyn StateStorage>) -> Self {
        Self::load_with_clock(storage, Arc::new(Utc::now))
    }

    /// Comme `load`, avec une horloge fournie par l'appelant
    pub fn load_with_clock(storage: Box<dyn StateStorage>, clock: Clock) -> Self {
        let persisted = match storage.read() {
            Ok(Some(contents)) => match PersistedState::from_json(&contents) {
                Ok(persisted) => {
                    info!(
                        currencies = persisted.user_currencies.len(),
                        rates = persisted.rates.len(),
                        "Loaded persisted state"
                    );
                    persisted
                }
                Err(e) => {
                    warn!(error = ?e, "Failed to parse persisted state, using defaults");
                    PersistedState::default()
                }
            },
            Ok(None) => {
                debug!("No persisted state, using defaults");
                PersistedState::default()
            }
            Err(e) => {
                warn!(error = ?e, "Failed to read persisted state, using defaults");
                PersistedState::default()
            }
        };

        let base_currency = persisted.base_currency.clone();

        Self {
            state: ConversionState::from_persisted(persisted),
            base_currency,
            storage,
            listeners: ListenerRegistry::new(),
            clock,
        }
    }

    /// Change la devise de base utilisée par les conversions
    ///
    /// Les taux en cache sont exprimés dans l'ancienne base : ils sont
    /// recalculés si la nouvelle base y figure, sinon abandonnés (le cache
    /// devient alors vide et périmé).
    pub fn with_base_currency(mut self, base: &str) -> Self {
        let base = canonical_code(base);

        if base != self.base_currency && !self.state.rates.is_empty() {
            match self.state.rates.rebased(&base) {
                Some(rates) => {
                    info!(from = %self.base_currency, to = %base, "Cached rates rebased");
                    self.state.rates = rates;
                }
                None => {
                    warn!(from = %self.base_currency, to = %base, "Cached rates dropped, new base not quoted");
                    self.state.rates = RateTable::new();
                    self.state.last_updated = None;
                }
            }
        }

        self.base_currency = base;
        self
    }

    /// Emballe le modèle pour le partager
    pub fn into_shared(self) -> SharedModel {
        Arc::new(Mutex::new(self))
    }

    // ========================================================================
    // Accesseurs
    // ========================================================================

    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    pub fn rates(&self) -> &RateTable {
        &self.state.rates
    }

    pub fn user_currencies(&self) -> &[String] {
        &self.state.user_currencies
    }

    pub fn active_currency(&self) -> &str {
        &self.state.active_currency
    }

    pub fn active_amount(&self) -> f64 {
        self.state.active_amount
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.last_updated
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    // ========================================================================
    // Abonnements
    // ========================================================================

    /// Enregistre un abonné appelé après chaque mutation
    ///
    /// Le callback reçoit l'état pendant que le modèle est verrouillé :
    /// il ne doit pas essayer de reverrouiller le SharedModel.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<ConversionState>
    where
        F: FnMut(&ConversionState) + Send + 'static,
    {
        self.listeners.subscribe(listener)
    }

    fn notify(&self) {
        self.listeners.notify(&self.state);
    }

    fn save(&self) {
        let result = self
            .state
            .to_persisted(&self.base_currency)
            .to_json()
            .and_then(|json| self.storage.write(&json));

        if let Err(e) = result {
            warn!(error = ?e, "Failed to persist state");
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Remplace entièrement la table de taux
    pub fn set_rates(&mut self, rates: RateTable) {
        info!(rates = rates.len(), "Exchange rates updated");
        self.state.rates = rates;
        self.state.last_updated = Some((self.clock)());
        self.save();
        self.notify();
    }

    /// Change la devise active sans toucher au montant
    ///
    /// Non persisté : la devise en cours d'édition est un état d'interface.
    pub fn set_active_currency(&mut self, code: &str) {
        self.state.active_currency = canonical_code(code);
        self.notify();
    }

    /// Change la devise active et remplace son montant
    ///
    /// Non persisté, comme `set_active_currency`.
    pub fn set_active_currency_with_amount(&mut self, code: &str, amount: impl IntoAmount) {
        self.state.active_currency = canonical_code(code);
        self.state.active_amount = amount.into_amount();
        self.notify();
    }

    /// Remplace le montant de la devise active (saisie invalide -> 0)
    pub fn set_active_amount(&mut self, amount: impl IntoAmount) {
        self.state.active_amount = amount.into_amount();
        self.save();
        self.notify();
    }

    /// Ajoute une devise en fin de liste (sans effet si déjà présente)
    pub fn add_currency(&mut self, code: &str) {
        let code = canonical_code(code);
        if code.is_empty() || self.state.user_currencies.contains(&code) {
            return;
        }

        debug!(currency = %code, "Adding currency");
        self.state.user_currencies.push(code);
        self.save();
        self.notify();
    }

    /// Retire une devise de la liste
    ///
    /// Si c'était la devise active et qu'il en reste d'autres, la première
    /// devise restante devient active. Vider la liste est permis : la devise
    /// active reste alors orpheline.
    pub fn remove_currency(&mut self, code: &str) {
        let code = canonical_code(code);
        self.state.user_currencies.retain(|c| *c != code);

        if self.state.active_currency == code {
            if let Some(first) = self.state.user_currencies.first() {
                self.state.active_currency = first.clone();
            }
        }

        debug!(currency = %code, "Removed currency");
        self.save();
        self.notify();
    }

    /// Remplace une devise par une autre à la même position
    ///
    /// - si `new` est déjà dans la liste : équivaut à retirer `old`
    /// - si `old` est absent : `new` est ajouté en fin de liste
    pub fn replace_currency(&mut self, old: &str, new: &str) {
        let old = canonical_code(old);
        let new = canonical_code(new);

        if new.is_empty() || old == new {
            return;
        }

        if self.state.user_currencies.contains(&new) {
            self.remove_currency(&old);
            return;
        }

        match self.state.user_currencies.iter().position(|c| *c == old) {
            Some(index) => {
                self.state.user_currencies[index] = new.clone();
                if self.state.active_currency == old {
                    self.state.active_currency = new;
                }
                self.save();
                self.notify();
            }
            None => self.add_currency(&new),
        }
    }

    /// Déplace la devise `from_index` à la position `to_index`
    ///
    /// Sans effet si les indices sont égaux ou hors de [0, len).
    pub fn reorder_currencies(&mut self, from_index: usize, to_index: usize) {
        let len = self.state.user_currencies.len();
        if from_index == to_index || from_index >= len || to_index >= len {
            return;
        }

        let moved = self.state.user_currencies.remove(from_index);
        self.state.user_currencies.insert(to_index, moved);
        self.save();
        self.notify();
    }

    /// Ajoute les devises par défaut (USD, EUR, GBP, JPY)
    pub fn setup_default_currencies(&mut self) {
        for code in DEFAULT_CURRENCIES {
            self.add_currency(code);
        }
    }

    /// Active ou désactive l'indicateur de chargement (non persisté)
    pub fn set_loading(&mut self, is_loading: bool) {
        self.state.is_loading = is_loading;
        self.notify();
    }

    /// Définit ou efface le message d'erreur (non persisté)
    pub fn set_error(&mut self, error: Option<String>) {
        self.state.error = error;
        self.notify();
    }

    // ========================================================================
    // Calculs
    // ========================================================================

    /// Convertit un montant entre deux devises avec les taux actuels
    pub fn convert_amount(&self, from: &str, to: &str, amount: f64) -> f64 {
        convert(&self.state.rates, &self.base_currency, from, to, amount)
    }

    /// Montant de chaque devise de l'utilisateur
    ///
    /// Recalculé à chaque appel depuis le montant actif.
    pub fn all_amounts(&self) -> HashMap<String, f64> {
        let active = &self.state.active_currency;
        let amount = self.state.active_amount;

        self.state
            .user_currencies
            .iter()
            .map(|code| {
                let value = if code == active {
                    amount
                } else {
                    self.convert_amount(active, code, amount)
                };
                (code.clone(), value)
            })
            .collect()
    }

    /// Vrai si les taux n'ont jamais été chargés ou ont plus de 24h
    ///
    /// Exactement 24h est encore considéré frais.
    pub fn are_rates_stale(&self) -> bool {
        match self.state.last_updated {
            None => true,
            Some(at) => (self.clock)() - at > stale_threshold(),
        }
    }

    /// Première devise principale pas encore sélectionnée (hors défauts)
    pub fn next_suggested_currency(&self) -> Option<&'static str> {
        MAJOR_CURRENCIES
            .iter()
            .map(|info| info.code)
            .filter(|code| !DEFAULT_CURRENCIES.contains(code))
            .find(|code| !self.state.user_currencies.iter().any(|c| c == code))
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::persistence::{MemoryStorage, StateStorage};
    use anyhow::Result;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fixed_clock(at: DateTime<Utc>) -> Clock {
        Arc::new(move || at)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn sample_rates() -> RateTable {
        [("usd", 1.0), ("eur", 0.92), ("gbp", 0.79), ("jpy", 149.85)]
            .into_iter()
            .collect()
    }

    fn model_with(storage: &MemoryStorage) -> ConversionModel {
        ConversionModel::load_with_clock(Box::new(storage.clone()), fixed_clock(t0()))
    }

    fn model_with_rates(storage: &MemoryStorage) -> ConversionModel {
        let mut model = model_with(storage);
        model.set_rates(sample_rates());
        for code in ["USD", "EUR", "GBP", "JPY"] {
            model.add_currency(code);
        }
        model
    }

    /// Stockage qui échoue toujours
    struct BrokenStorage;

    impl StateStorage for BrokenStorage {
        fn read(&self) -> Result<Option<String>> {
            anyhow::bail!("disk on fire")
        }

        fn write(&self, _contents: &str) -> Result<()> {
            anyhow::bail!("disk on fire")
        }
    }

    #[test]
    fn test_defaults_without_storage() {
        let model = model_with(&MemoryStorage::new());
        assert_eq!(model.active_currency(), "USD");
        assert_eq!(model.active_amount(), 1000.0);
        assert!(model.user_currencies().is_empty());
        assert!(model.rates().is_empty());
        assert!(model.last_updated().is_none());
    }

    #[test]
    fn test_storage_failures_are_absorbed() {
        let mut model = ConversionModel::load(Box::new(BrokenStorage));
        assert_eq!(model.active_currency(), "USD");

        // Les écritures qui échouent ne remontent pas
        model.add_currency("EUR");
        assert_eq!(model.user_currencies(), ["EUR"]);
    }

    #[test]
    fn test_corrupt_storage_uses_defaults() {
        let storage = MemoryStorage::with_contents("not json at all");
        let model = model_with(&storage);
        assert_eq!(model.active_amount(), 1000.0);
    }

    #[test]
    fn test_hydrates_from_storage() {
        let storage = MemoryStorage::with_contents(
            r#"{"rates":{"usd":1,"eur":0.92},"userCurrencies":["USD","EUR"],
               "activeCurrency":"EUR","activeAmount":500,"lastUpdated":1234567890}"#,
        );
        let model = model_with(&storage);

        assert_eq!(model.user_currencies(), ["USD", "EUR"]);
        assert_eq!(model.active_currency(), "EUR");
        assert_eq!(model.active_amount(), 500.0);
        assert_eq!(model.last_updated().map(|at| at.timestamp_millis()), Some(1234567890));
    }

    #[test]
    fn test_set_rates_updates_timestamp_and_persists() {
        let storage = MemoryStorage::new();
        let mut model = model_with(&storage);

        model.set_rates(sample_rates());

        assert_eq!(model.rates(), &sample_rates());
        assert_eq!(model.last_updated(), Some(t0()));
        assert!(storage.contents().unwrap().contains("\"usd\":1"));
    }

    #[test]
    fn test_set_active_currency() {
        let mut model = model_with(&MemoryStorage::new());

        model.set_active_currency_with_amount("EUR", 500.0);
        assert_eq!(model.active_currency(), "EUR");
        assert_eq!(model.active_amount(), 500.0);

        model.set_active_currency("gbp");
        assert_eq!(model.active_currency(), "GBP");
        assert_eq!(model.active_amount(), 500.0);
    }

    #[test]
    fn test_set_active_currency_is_not_persisted() {
        // Asymétrie volontaire : la devise active n'est pas écrite,
        // le montant actif l'est
        let storage = MemoryStorage::new();
        let mut model = model_with(&storage);

        model.set_active_currency("EUR");
        model.set_active_currency_with_amount("GBP", "12");
        assert_eq!(storage.write_count(), 0);

        model.set_active_amount(750.0);
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn test_set_active_amount_parses_input() {
        let mut model = model_with(&MemoryStorage::new());

        model.set_active_amount("750");
        assert_eq!(model.active_amount(), 750.0);

        model.set_active_amount("invalid");
        assert_eq!(model.active_amount(), 0.0);
    }

    #[test]
    fn test_add_currency_is_idempotent() {
        let storage = MemoryStorage::new();
        let mut model = model_with(&storage);

        model.add_currency("usd");
        model.add_currency("EUR");
        let writes = storage.write_count();

        model.add_currency("USD");
        model.add_currency("eur");

        assert_eq!(model.user_currencies(), ["USD", "EUR"]);
        assert_eq!(storage.write_count(), writes);
    }

    #[test]
    fn test_remove_currency() {
        let mut model = model_with_rates(&MemoryStorage::new());

        model.remove_currency("eur");
        assert_eq!(model.user_currencies(), ["USD", "GBP", "JPY"]);
    }

    #[test]
    fn test_remove_active_currency_reassigns_first() {
        let mut model = model_with_rates(&MemoryStorage::new());
        model.set_active_currency("GBP");

        model.remove_currency("GBP");
        assert_eq!(model.active_currency(), "USD");

        model.set_active_currency("USD");
        model.remove_currency("USD");
        assert_eq!(model.active_currency(), "EUR");
    }

    #[test]
    fn test_remove_last_currency_leaves_active_orphaned() {
        let mut model = model_with(&MemoryStorage::new());
        model.add_currency("EUR");
        model.set_active_currency("EUR");

        model.remove_currency("EUR");
        assert!(model.user_currencies().is_empty());
        assert_eq!(model.active_currency(), "EUR");
    }

    #[test]
    fn test_replace_currency() {
        let mut model = model_with_rates(&MemoryStorage::new());
        model.set_active_currency("EUR");

        model.replace_currency("EUR", "chf");
        assert_eq!(model.user_currencies(), ["USD", "CHF", "GBP", "JPY"]);
        assert_eq!(model.active_currency(), "CHF");

        // Déjà présent : la devise remplacée disparaît simplement
        model.replace_currency("GBP", "USD");
        assert_eq!(model.user_currencies(), ["USD", "CHF", "JPY"]);

        // Ancienne devise absente : ajout en fin de liste
        model.replace_currency("XYZ", "CAD");
        assert_eq!(model.user_currencies(), ["USD", "CHF", "JPY", "CAD"]);
    }

    #[test]
    fn test_reorder_currencies() {
        let mut model = model_with_rates(&MemoryStorage::new());

        model.reorder_currencies(0, 2);
        assert_eq!(model.user_currencies(), ["EUR", "GBP", "USD", "JPY"]);

        model.reorder_currencies(3, 0);
        assert_eq!(model.user_currencies(), ["JPY", "EUR", "GBP", "USD"]);
    }

    #[test]
    fn test_reorder_ignores_invalid_indices() {
        let storage = MemoryStorage::new();
        let mut model = model_with_rates(&storage);
        let writes = storage.write_count();

        model.reorder_currencies(1, 1);
        model.reorder_currencies(4, 0);
        model.reorder_currencies(0, 4);

        assert_eq!(model.user_currencies(), ["USD", "EUR", "GBP", "JPY"]);
        assert_eq!(storage.write_count(), writes);
    }

    #[test]
    fn test_convert_amount() {
        let model = model_with_rates(&MemoryStorage::new());

        assert_eq!(model.convert_amount("USD", "EUR", 100.0), 92.0);
        assert_relative_eq!(model.convert_amount("EUR", "USD", 92.0), 100.0, epsilon = 0.1);
        assert_relative_eq!(model.convert_amount("EUR", "GBP", 100.0), 85.87, epsilon = 0.01);
        assert_eq!(model.convert_amount("USD", "USD", 100.0), 100.0);
        assert_eq!(model.convert_amount("USD", "UNKNOWN", 100.0), 0.0);
    }

    #[test]
    fn test_convert_amount_without_rates() {
        let model = model_with(&MemoryStorage::new());
        assert_eq!(model.convert_amount("USD", "EUR", 50.0), 50.0);
    }

    #[test]
    fn test_custom_base_currency() {
        let mut model = model_with(&MemoryStorage::new()).with_base_currency("eur");
        model.set_rates([("eur", 1.0), ("usd", 1.1)].into_iter().collect());
        assert_relative_eq!(model.convert_amount("EUR", "USD", 10.0), 11.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cache_follows_base_currency_change() {
        let storage = MemoryStorage::new();
        {
            let mut model = model_with(&storage);
            model.set_rates(sample_rates());
        }
        assert!(storage.contents().unwrap().contains("\"baseCurrency\":\"USD\""));

        // Une heure plus tard, la configuration passe en EUR
        let clock = fixed_clock(t0() + Duration::hours(1));
        let model = ConversionModel::load_with_clock(Box::new(storage.clone()), clock)
            .with_base_currency("EUR");

        assert!(!model.are_rates_stale());
        assert_eq!(model.rates().get("eur"), Some(1.0));
        assert_relative_eq!(model.convert_amount("EUR", "USD", 100.0), 100.0 / 0.92, epsilon = 1e-9);
        assert_relative_eq!(model.convert_amount("USD", "GBP", 100.0), 79.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cache_dropped_when_new_base_unquoted() {
        let storage = MemoryStorage::new();
        {
            let mut model = model_with(&storage);
            model.set_rates(sample_rates());
        }

        let model = model_with(&storage).with_base_currency("CHF");
        assert!(model.rates().is_empty());
        assert!(model.last_updated().is_none());
        assert!(model.are_rates_stale());
    }

    #[test]
    fn test_same_base_keeps_cache() {
        let storage = MemoryStorage::new();
        {
            let mut model = model_with(&storage).with_base_currency("eur");
            model.set_rates([("eur", 1.0), ("usd", 1.1)].into_iter().collect());
        }

        let model = model_with(&storage).with_base_currency("EUR");
        assert_eq!(model.rates().get("usd"), Some(1.1));
        assert_eq!(model.last_updated(), Some(t0()));
    }

    #[test]
    fn test_all_amounts_scenario() {
        let mut model = model_with_rates(&MemoryStorage::new());
        model.set_active_currency_with_amount("USD", 100.0);

        let amounts = model.all_amounts();
        assert_eq!(amounts.len(), 4);
        assert_relative_eq!(amounts["USD"], 100.0);
        assert_relative_eq!(amounts["EUR"], 92.0, epsilon = 1e-9);
        assert_relative_eq!(amounts["GBP"], 79.0, epsilon = 1e-9);
        assert_relative_eq!(amounts["JPY"], 14985.0, epsilon = 1e-6);
    }

    #[test]
    fn test_all_amounts_keeps_active_amount() {
        let mut model = model_with_rates(&MemoryStorage::new());
        model.set_active_currency_with_amount("EUR", 50.0);
        assert_eq!(model.all_amounts()["EUR"], 50.0);

        // Même sans taux
        let mut empty = model_with(&MemoryStorage::new());
        empty.add_currency("JPY");
        empty.set_active_currency_with_amount("JPY", 7.0);
        assert_eq!(empty.all_amounts()["JPY"], 7.0);
    }

    #[test]
    fn test_rates_stale_when_never_updated() {
        let model = model_with(&MemoryStorage::new());
        assert!(model.are_rates_stale());
    }

    #[test]
    fn test_rates_staleness_boundary() {
        let storage = MemoryStorage::new();
        let mut model = model_with(&storage);
        model.set_rates(sample_rates());
        assert!(!model.are_rates_stale());

        // Exactement 24h : encore frais
        let exactly = ConversionModel::load_with_clock(
            Box::new(storage.clone()),
            fixed_clock(t0() + Duration::hours(24)),
        );
        assert!(!exactly.are_rates_stale());

        // 24h et 1ms : périmé
        let older = ConversionModel::load_with_clock(
            Box::new(storage.clone()),
            fixed_clock(t0() + Duration::hours(24) + Duration::milliseconds(1)),
        );
        assert!(older.are_rates_stale());

        let much_older = ConversionModel::load_with_clock(
            Box::new(storage),
            fixed_clock(t0() + Duration::hours(25)),
        );
        assert!(much_older.are_rates_stale());
    }

    #[test]
    fn test_subscribers_notified_on_mutation() {
        let mut model = model_with(&MemoryStorage::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let counter = calls.clone();
        let sink = seen.clone();
        let subscription = model.subscribe(move |state| {
            counter.fetch_add(1, Ordering::SeqCst);
            sink.lock().unwrap().push(state.user_currencies.clone());
        });

        model.add_currency("CAD");
        model.set_loading(true);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(seen.lock().unwrap()[0], vec!["CAD".to_string()]);

        subscription.unsubscribe();
        model.add_currency("AUD");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_setup_default_currencies() {
        let mut model = model_with(&MemoryStorage::new());
        model.add_currency("EUR");
        model.setup_default_currencies();
        assert_eq!(model.user_currencies(), ["EUR", "USD", "GBP", "JPY"]);
    }

    #[test]
    fn test_next_suggested_currency() {
        let mut model = model_with(&MemoryStorage::new());
        model.setup_default_currencies();
        assert_eq!(model.next_suggested_currency(), Some("CAD"));

        model.add_currency("CAD");
        assert_eq!(model.next_suggested_currency(), Some("AUD"));
    }

    #[test]
    fn test_persisted_record_round_trip_through_model() {
        let storage = MemoryStorage::new();
        {
            let mut model = model_with_rates(&storage);
            model.set_active_amount(42.0);
        }

        let reloaded = model_with(&storage);
        assert_eq!(reloaded.user_currencies(), ["USD", "EUR", "GBP", "JPY"]);
        assert_eq!(reloaded.active_amount(), 42.0);
        assert_eq!(reloaded.rates(), &sample_rates());
        assert_eq!(reloaded.last_updated(), Some(t0()));
        assert!(!reloaded.is_loading());
        assert!(reloaded.error().is_none());
    }
}
