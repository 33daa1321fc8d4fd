// ============================================================================
// API Client : flux de taux de change
// ============================================================================
// Interroge le flux public de taux (aucune authentification) :
//   GET {feed_url}/{base}.json -> { "date": "...", "{base}": { code: taux } }
//   GET {feed_url}.json        -> { code: "Nom de la devise", ... }
//
// CONCEPTS RUST :
// 1. async_trait : méthodes async dans un trait (frontière testable)
// 2. serde_json::Value : le schéma du flux peut évoluer, on ne lit que
//    les clés dont on a besoin
// 3. #[instrument] : span tracing avec les paramètres de la requête
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::models::RateTable;

/// Adresse par défaut du flux
pub const DEFAULT_FEED_URL: &str =
    "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1/currencies";

/// Résultat d'une requête de taux
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    /// Date de publication annoncée par le flux (si présente)
    pub date: Option<String>,

    /// Taux par devise, relatifs à la base demandée
    pub rates: RateTable,
}

// ============================================================================
// Trait RateFeed
// ============================================================================
// CONCEPT RUST : Trait comme frontière
// - RateService ne dépend que de ce trait
// - HttpRateFeed en production, un faux flux dans les tests
// ============================================================================

#[async_trait]
pub trait RateFeed: Send + Sync {
    /// Taux de toutes les devises par rapport à `base`
    async fn latest_rates(&self, base: &str) -> Result<FeedSnapshot>;

    /// Catalogue des devises disponibles : code -> nom
    async fn currency_catalog(&self) -> Result<BTreeMap<String, String>>;
}

// ============================================================================
// Implémentation HTTP
// ============================================================================

/// Client HTTP du flux de taux
#[derive(Debug, Clone)]
pub struct HttpRateFeed {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRateFeed {
    /// Crée le client
    ///
    /// # Arguments
    /// * `base_url` - Racine du flux, sans "/" final
    /// * `timeout` - Délai maximum d'une requête
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lazyrates/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET + vérification du statut + parsing JSON générique
    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!(url = %url, "Sending HTTP request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Échec de la requête HTTP vers le flux de taux")?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        // Vérifie que la réponse est un succès HTTP (200-299)
        if !status.is_success() {
            error!(status = %status, "Rate feed returned error status");
            anyhow::bail!("Le flux de taux a retourné une erreur : HTTP {}", status);
        }

        response
            .json::<Value>()
            .await
            .context("Échec du parsing JSON de la réponse du flux")
    }
}

#[async_trait]
impl RateFeed for HttpRateFeed {
    #[instrument(skip(self))]
    async fn latest_rates(&self, base: &str) -> Result<FeedSnapshot> {
        let url = rates_url(&self.base_url, base);
        let payload = self.get_json(&url).await?;
        let snapshot = parse_rates_payload(&payload, base)?;

        info!(rates = snapshot.rates.len(), date = ?snapshot.date, "Fetched exchange rates");
        Ok(snapshot)
    }

    #[instrument(skip(self))]
    async fn currency_catalog(&self) -> Result<BTreeMap<String, String>> {
        let url = catalog_url(&self.base_url);
        let payload = self.get_json(&url).await?;
        let catalog = parse_catalog_payload(&payload);

        info!(currencies = catalog.len(), "Fetched currency catalog");
        Ok(catalog)
    }
}

// ============================================================================
// Construction des URLs
// ============================================================================

/// URL des taux pour une devise de base : {base_url}/{base}.json
fn rates_url(base_url: &str, base: &str) -> String {
    format!("{}/{}.json", base_url, base.trim().to_lowercase())
}

/// URL du catalogue : {base_url}.json
fn catalog_url(base_url: &str) -> String {
    format!("{}.json", base_url)
}

// ============================================================================
// Parsing des réponses
// ============================================================================

/// Extrait la sous-table de la devise de base
///
/// La réponse doit contenir un objet sous la clé de la base ; sinon
/// c'est une erreur de format. Les entrées non numériques ou non
/// positives sont ignorées.
pub fn parse_rates_payload(payload: &Value, base: &str) -> Result<FeedSnapshot> {
    let base_key = base.trim().to_lowercase();

    let table = payload
        .get(&base_key)
        .and_then(Value::as_object)
        .with_context(|| format!("Format de réponse invalide : clé \"{}\" absente", base_key))?;

    let mut rates = RateTable::new();
    let mut skipped = 0;
    for (code, value) in table {
        match value.as_f64().filter(|rate| rate.is_finite() && *rate > 0.0) {
            Some(rate) => rates.insert(code, rate),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, total = table.len(), "Skipped invalid rate entries");
    }

    let date = payload
        .get("date")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(FeedSnapshot { date, rates })
}

/// Catalogue code -> nom, codes en majuscules
///
/// Un payload qui n'est pas un objet donne un catalogue vide.
pub fn parse_catalog_payload(payload: &Value) -> BTreeMap<String, String> {
    payload
        .as_object()
        .map(|entries| {
            entries
                .iter()
                .map(|(code, name)| {
                    let name = name.as_str().unwrap_or_default().to_string();
                    (code.to_uppercase(), name)
                })
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serveur HTTP local qui répond une seule fois avec la réponse fournie
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = [0u8; 4096];
            let _ = socket.read(&mut buffer).await;

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{}/v1/currencies", addr)
    }

    #[test]
    fn test_build_urls() {
        let base = "https://example.com/v1/currencies";
        assert_eq!(rates_url(base, "USD"), "https://example.com/v1/currencies/usd.json");
        assert_eq!(catalog_url(base), "https://example.com/v1/currencies.json");
    }

    #[test]
    fn test_parse_rates_payload() {
        let payload = json!({
            "date": "2024-01-01",
            "usd": { "eur": 0.92, "gbp": 0.79, "jpy": 149.85 }
        });

        let snapshot = parse_rates_payload(&payload, "USD").unwrap();
        assert_eq!(snapshot.date.as_deref(), Some("2024-01-01"));
        assert_eq!(snapshot.rates.len(), 3);
        assert_eq!(snapshot.rates.get("eur"), Some(0.92));
    }

    #[test]
    fn test_parse_rates_payload_missing_base() {
        let payload = json!({ "date": "2024-01-01" });
        assert!(parse_rates_payload(&payload, "usd").is_err());

        let payload = json!({ "usd": "not a table" });
        assert!(parse_rates_payload(&payload, "usd").is_err());
    }

    #[test]
    fn test_parse_rates_payload_skips_invalid_entries() {
        let payload = json!({
            "usd": { "eur": 0.92, "bad": "x", "zero": 0, "neg": -1.5, "nil": null }
        });

        let snapshot = parse_rates_payload(&payload, "usd").unwrap();
        assert_eq!(snapshot.rates.codes(), vec!["EUR"]);
        assert!(snapshot.date.is_none());
    }

    #[test]
    fn test_parse_catalog_payload() {
        let payload = json!({ "usd": "US Dollar", "eur": "Euro", "btc": 3 });
        let catalog = parse_catalog_payload(&payload);

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog["USD"], "US Dollar");
        assert_eq!(catalog["BTC"], "");
        assert!(parse_catalog_payload(&json!([1, 2])).is_empty());
    }

    #[tokio::test]
    async fn test_http_feed_success() {
        let url = serve_once("200 OK", r#"{"date":"2024-01-01","usd":{"eur":0.92}}"#).await;
        let feed = HttpRateFeed::new(&url, Duration::from_secs(5)).unwrap();

        let snapshot = feed.latest_rates("usd").await.unwrap();
        assert_eq!(snapshot.rates.get("eur"), Some(0.92));
    }

    #[tokio::test]
    async fn test_http_feed_error_status() {
        let url = serve_once("404 Not Found", "").await;
        let feed = HttpRateFeed::new(&url, Duration::from_secs(5)).unwrap();

        let err = feed.latest_rates("usd").await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_http_feed_catalog() {
        let url = serve_once("200 OK", r#"{"usd":"US Dollar","eur":"Euro"}"#).await;
        let feed = HttpRateFeed::new(&url, Duration::from_secs(5)).unwrap();

        let catalog = feed.currency_catalog().await.unwrap();
        assert_eq!(catalog.keys().cloned().collect::<Vec<_>>(), vec!["EUR", "USD"]);
    }
}
