// ============================================================================
// Structure : RateTable
// ============================================================================
// Table de taux exprimés par rapport à une devise de base
// (ex: base "usd" -> { usd: 1, eur: 0.92, jpy: 149.85 })
//
// CONCEPTS RUST :
// 1. Newtype pattern : RateTable(BTreeMap) pour contrôler les clés
// 2. #[serde(from, into)] : sérialisé comme la map sous-jacente,
//    relu en passant par insert (clés normalisées)
// 3. BTreeMap : clés triées, l'ordre d'itération est déterministe
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Table des taux de change (clés en minuscules)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct RateTable(BTreeMap<String, f64>);

impl From<BTreeMap<String, f64>> for RateTable {
    fn from(map: BTreeMap<String, f64>) -> Self {
        map.iter().map(|(code, rate)| (code.as_str(), *rate)).collect()
    }
}

impl From<RateTable> for BTreeMap<String, f64> {
    fn from(table: RateTable) -> Self {
        table.0
    }
}

impl RateTable {
    /// Crée une table vide
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Ajoute (ou remplace) le taux d'une devise
    pub fn insert(&mut self, code: &str, rate: f64) {
        self.0.insert(code.trim().to_lowercase(), rate);
    }

    /// Retourne le taux d'une devise (insensible à la casse)
    pub fn get(&self, code: &str) -> Option<f64> {
        self.0.get(&code.trim().to_lowercase()).copied()
    }

    /// Vérifie si un taux est connu pour cette devise
    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Codes connus, en majuscules et triés
    pub fn codes(&self) -> Vec<String> {
        // BTreeMap est déjà trié sur les clés minuscules,
        // l'ordre est le même une fois en majuscules
        self.0.keys().map(|code| code.to_uppercase()).collect()
    }

    /// Itère sur (code minuscule, taux)
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(code, rate)| (code.as_str(), *rate))
    }

    /// Retourne une copie de la table avec le taux 1 pour la devise de base
    ///
    /// Le flux ne contient pas toujours la base elle-même ;
    /// la valeur explicite 1 l'emporte sur ce que le flux aurait fourni.
    pub fn with_base(mut self, base: &str) -> Self {
        self.insert(base, 1.0);
        self
    }

    /// Exprime la table par rapport à une autre devise de base
    ///
    /// None si la nouvelle base n'a pas de taux utilisable dans la table.
    pub fn rebased(&self, base: &str) -> Option<Self> {
        let pivot = self.get(base).filter(|rate| rate.is_finite() && *rate > 0.0)?;
        let table: RateTable = self.iter().map(|(code, rate)| (code, rate / pivot)).collect();
        Some(table.with_base(base))
    }
}

// CONCEPT RUST : FromIterator
// - Permet d'écrire `pairs.into_iter().collect::<RateTable>()`
impl<'a> FromIterator<(&'a str, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut table = RateTable::new();
        for (code, rate) in iter {
            table.insert(code, rate);
        }
        table
    }
}

// ============================================================================
// Politique des taux manquants
// ============================================================================
// Une devise absente de la table n'a pas le même traitement selon qu'elle
// est la source ou la destination de la conversion :
// - source inconnue : supposée à parité avec la base (taux 1)
// - destination inconnue : supposée sans valeur (taux 0)
//
// Comportement historique, asymétrique. Il est isolé ici pour pouvoir être
// corrigé sans toucher aux appelants.
// ============================================================================

/// Taux supposé pour une devise source absente de la table
pub const MISSING_SOURCE_RATE: f64 = 1.0;

/// Taux supposé pour une devise destination absente de la table
pub const MISSING_TARGET_RATE: f64 = 0.0;

/// Taux à utiliser quand la devise est la source de la conversion
///
/// Un taux nul est traité comme absent (évite la division par zéro).
pub fn source_rate(rates: &RateTable, code: &str) -> f64 {
    rates
        .get(code)
        .filter(|rate| *rate != 0.0)
        .unwrap_or(MISSING_SOURCE_RATE)
}

/// Taux à utiliser quand la devise est la destination de la conversion
pub fn target_rate(rates: &RateTable, code: &str) -> f64 {
    rates.get(code).unwrap_or(MISSING_TARGET_RATE)
}

/// Convertit un montant d'une devise à une autre via la devise de base
///
/// Fonction pure : aucun arrondi, aucun effet de bord.
///
/// - table vide : montant inchangé (les devises pas encore cotées
///   n'affichent pas 0 avant le premier chargement)
/// - même devise : montant inchangé
/// - depuis la base : `amount * taux[to]`
/// - vers la base : `amount / taux[from]`
/// - sinon : deux sauts via la base
pub fn convert(rates: &RateTable, base: &str, from: &str, to: &str, amount: f64) -> f64 {
    if rates.is_empty() {
        return amount;
    }

    let from = from.trim().to_lowercase();
    let to = to.trim().to_lowercase();
    let base = base.trim().to_lowercase();

    if from == to {
        return amount;
    }

    if from == base {
        return amount * target_rate(rates, &to);
    }

    if to == base {
        return amount / source_rate(rates, &from);
    }

    let base_amount = amount / source_rate(rates, &from);
    base_amount * target_rate(rates, &to)
}

// ============================================================================
// Tests unitaires
// ============================================================================
