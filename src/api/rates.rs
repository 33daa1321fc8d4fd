// ============================================================================
// RateService : adaptateur entre le flux de taux et le modèle
// ============================================================================
// Décide quand interroger le réseau et comment dégrader en cas d'échec :
// - cache frais et non vide : pas de requête
// - échec réseau avec cache : on garde les anciens taux + message
// - échec réseau sans cache : erreur propagée à l'appelant
//
// CONCEPTS RUST :
// 1. Générique RateService<F: RateFeed> : le flux est injecté
// 2. Verrou jamais tenu pendant un .await : le modèle reste utilisable
//    par l'UI pendant la requête
// 3. anyhow::Error::context : message utilisateur + cause d'origine
// ============================================================================

use anyhow::Result;
use tracing::{error, info, instrument, warn};

use crate::api::feed::RateFeed;
use crate::models::{canonical_code, major_currency_codes, search_currencies, RateTable};
use crate::store::{lock_model, SharedModel};

/// Message affiché quand le rafraîchissement échoue
pub const STALE_DATA_MESSAGE: &str = "Could not fetch new rates. Displaying last saved data.";

/// Erreur propagée quand le rafraîchissement échoue sans cache
pub const NO_CACHE_MESSAGE: &str = "API fetch failed and no cached data is available.";

/// Adaptateur de taux lié à un modèle
pub struct RateService<F: RateFeed> {
    feed: F,
    model: SharedModel,
}

impl<F: RateFeed> RateService<F> {
    pub fn new(feed: F, model: SharedModel) -> Self {
        Self { feed, model }
    }

    /// Modèle alimenté par ce service
    pub fn model(&self) -> &SharedModel {
        &self.model
    }

    /// Taux en cache s'ils sont présents et frais
    fn fresh_cache(&self) -> Option<RateTable> {
        let model = lock_model(&self.model);
        if !model.rates().is_empty() && !model.are_rates_stale() {
            Some(model.rates().clone())
        } else {
            None
        }
    }

    /// Interroge toujours le flux
    ///
    /// En cas de succès, la table reçue (plus le taux 1 de la base) remplace
    /// celle du modèle. En cas d'échec, le message `STALE_DATA_MESSAGE` est
    /// posé sur le modèle, puis :
    /// - avec des taux en cache : ils sont retournés sans erreur
    /// - sans cache : l'erreur remonte avec `NO_CACHE_MESSAGE`
    ///
    /// L'indicateur de chargement est remis à false dans tous les cas.
    #[instrument(skip(self))]
    pub async fn fetch_rates(&self) -> Result<RateTable> {
        let base = {
            let mut model = lock_model(&self.model);
            model.set_loading(true);
            model.set_error(None);
            model.base_currency().to_string()
        };

        // CONCEPT : pas de verrou pendant l'attente réseau
        let outcome = self.feed.latest_rates(&base).await;

        let mut model = lock_model(&self.model);
        let result = match outcome {
            Ok(snapshot) => {
                let table = snapshot.rates.with_base(&base);
                info!(rates = table.len(), date = ?snapshot.date, "Rates refreshed");
                model.set_rates(table.clone());
                Ok(table)
            }
            Err(e) => {
                error!(error = ?e, "Failed to fetch exchange rates");
                model.set_error(Some(STALE_DATA_MESSAGE.to_string()));

                if model.rates().is_empty() {
                    Err(e.context(NO_CACHE_MESSAGE))
                } else {
                    warn!(rates = model.rates().len(), "Keeping cached rates");
                    Ok(model.rates().clone())
                }
            }
        };
        model.set_loading(false);

        result
    }

    /// Taux en cache s'ils sont frais, sinon requête
    pub async fn get_rates(&self) -> Result<RateTable> {
        if let Some(rates) = self.fresh_cache() {
            return Ok(rates);
        }
        self.fetch_rates().await
    }

    /// Chargement au démarrage de l'application
    ///
    /// Même politique que `get_rates` ; si la requête échoue alors que des
    /// taux existent en cache, ils sont utilisés avec un avertissement.
    pub async fn initialize(&self) -> Result<RateTable> {
        if let Some(rates) = self.fresh_cache() {
            info!(rates = rates.len(), "Using fresh cached rates");
            return Ok(rates);
        }

        match self.fetch_rates().await {
            Ok(rates) => Ok(rates),
            Err(e) => {
                let model = lock_model(&self.model);
                if model.rates().is_empty() {
                    Err(e)
                } else {
                    warn!(error = ?e, "Using cached rates due to API error");
                    Ok(model.rates().clone())
                }
            }
        }
    }

    /// Rafraîchissement manuel, ignore la fraîcheur du cache
    pub async fn refresh_rates(&self) -> Result<RateTable> {
        self.fetch_rates().await
    }

    /// Devises proposées à l'utilisateur, triées
    ///
    /// Ordre des sources :
    /// 1. catalogue distant
    /// 2. codes de la table de taux en cache
    /// 3. liste statique des devises principales (ordre de la table)
    pub async fn available_currencies(&self) -> Vec<String> {
        match self.feed.currency_catalog().await {
            Ok(catalog) if !catalog.is_empty() => {
                return catalog.into_keys().map(|code| code.to_uppercase()).collect();
            }
            Ok(_) => warn!("Currency catalog is empty"),
            Err(e) => warn!(error = ?e, "Failed to fetch currency catalog"),
        }

        let cached = lock_model(&self.model).rates().codes();
        if !cached.is_empty() {
            return cached;
        }

        major_currency_codes()
    }

    /// Vrai si un taux est connu pour cette devise
    pub fn is_currency_supported(&self, code: &str) -> bool {
        lock_model(&self.model).rates().contains(code)
    }

    /// Devises principales correspondant au filtre et pas encore choisies
    pub fn search_currencies(&self, filter: &str) -> Vec<String> {
        let selected = lock_model(&self.model).user_currencies().to_vec();
        search_currencies(filter, &selected)
    }

    /// Ajoute une devise si elle est cotée (ou si aucun taux n'est chargé)
    ///
    /// Retourne false si la devise a été refusée.
    pub fn add_supported_currency(&self, code: &str) -> bool {
        let code = canonical_code(code);
        let mut model = lock_model(&self.model);

        if !model.rates().is_empty() && !model.rates().contains(&code) {
            warn!(currency = %code, "Refusing unsupported currency");
            return false;
        }

        model.add_currency(&code);
        true
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
