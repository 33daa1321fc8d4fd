// ============================================================================
// Référentiel des devises
// ============================================================================
// Canonicalisation des codes et table statique (nom + drapeau) des devises
// principales. Les vues s'en servent pour l'affichage et la recherche.
//
// CONCEPTS RUST :
// 1. const + slices : table statique sans allocation
// 2. Iterator::find : recherche linéaire (39 entrées, suffisant)
// ============================================================================

/// Devises ajoutées par `setup_default_currencies`
pub const DEFAULT_CURRENCIES: [&str; 4] = ["USD", "EUR", "GBP", "JPY"];

/// Drapeau générique pour les devises inconnues
pub const UNKNOWN_FLAG: &str = "🏳️";

/// Nombre maximum de résultats retournés par `search_currencies`
pub const SEARCH_LIMIT: usize = 20;

/// Une entrée du référentiel : (code, nom, drapeau)
///
/// CONCEPT : une seule table pour les noms ET les drapeaux
/// - Impossible d'avoir un nom sans drapeau (ou l'inverse)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub flag: &'static str,
}

const fn info(code: &'static str, name: &'static str, flag: &'static str) -> CurrencyInfo {
    CurrencyInfo { code, name, flag }
}

/// Devises principales, dans l'ordre de présentation
pub const MAJOR_CURRENCIES: [CurrencyInfo; 39] = [
    info("USD", "US Dollar", "🇺🇸"),
    info("EUR", "Euro", "🇪🇺"),
    info("GBP", "British Pound", "🇬🇧"),
    info("JPY", "Japanese Yen", "🇯🇵"),
    info("CAD", "Canadian Dollar", "🇨🇦"),
    info("AUD", "Australian Dollar", "🇦🇺"),
    info("CHF", "Swiss Franc", "🇨🇭"),
    info("CNY", "Chinese Yuan", "🇨🇳"),
    info("INR", "Indian Rupee", "🇮🇳"),
    info("KRW", "South Korean Won", "🇰🇷"),
    info("SGD", "Singapore Dollar", "🇸🇬"),
    info("HKD", "Hong Kong Dollar", "🇭🇰"),
    info("NOK", "Norwegian Krone", "🇳🇴"),
    info("SEK", "Swedish Krona", "🇸🇪"),
    info("DKK", "Danish Krone", "🇩🇰"),
    info("PLN", "Polish Zloty", "🇵🇱"),
    info("CZK", "Czech Koruna", "🇨🇿"),
    info("HUF", "Hungarian Forint", "🇭🇺"),
    info("RUB", "Russian Ruble", "🇷🇺"),
    info("BRL", "Brazilian Real", "🇧🇷"),
    info("MXN", "Mexican Peso", "🇲🇽"),
    info("ZAR", "South African Rand", "🇿🇦"),
    info("NZD", "New Zealand Dollar", "🇳🇿"),
    info("TRY", "Turkish Lira", "🇹🇷"),
    info("AED", "UAE Dirham", "🇦🇪"),
    info("THB", "Thai Baht", "🇹🇭"),
    info("MYR", "Malaysian Ringgit", "🇲🇾"),
    info("IDR", "Indonesian Rupiah", "🇮🇩"),
    info("PHP", "Philippine Peso", "🇵🇭"),
    info("VND", "Vietnamese Dong", "🇻🇳"),
    info("ILS", "Israeli Shekel", "🇮🇱"),
    info("EGP", "Egyptian Pound", "🇪🇬"),
    info("SAR", "Saudi Riyal", "🇸🇦"),
    info("QAR", "Qatari Riyal", "🇶🇦"),
    info("KWD", "Kuwaiti Dinar", "🇰🇼"),
    info("BHD", "Bahraini Dinar", "🇧🇭"),
    info("OMR", "Omani Rial", "🇴🇲"),
    info("JOD", "Jordanian Dinar", "🇯🇴"),
    info("LBP", "Lebanese Pound", "🇱🇧"),
];

/// Normalise un code devise : espaces retirés, majuscules
///
/// # Exemple
/// canonical_code(" eur ") == "EUR"
pub fn canonical_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Cherche une devise dans le référentiel (insensible à la casse)
pub fn lookup(code: &str) -> Option<&'static CurrencyInfo> {
    let code = canonical_code(code);
    MAJOR_CURRENCIES.iter().find(|info| info.code == code)
}

/// Nom lisible de la devise, ou le code lui-même si inconnu
pub fn currency_name(code: &str) -> String {
    lookup(code)
        .map(|info| info.name.to_string())
        .unwrap_or_else(|| canonical_code(code))
}

/// Drapeau emoji de la devise, ou un drapeau générique si inconnu
pub fn currency_flag(code: &str) -> &'static str {
    lookup(code).map(|info| info.flag).unwrap_or(UNKNOWN_FLAG)
}

/// Codes des devises principales, dans l'ordre de la table
pub fn major_currency_codes() -> Vec<String> {
    MAJOR_CURRENCIES.iter().map(|info| info.code.to_string()).collect()
}

/// Filtre les devises principales par code ou par nom
///
/// - `filter` : sous-chaîne recherchée (insensible à la casse, vide = tout)
/// - `exclude` : codes déjà sélectionnés par l'utilisateur
///
/// Retourne au plus `SEARCH_LIMIT` codes.
pub fn search_currencies(filter: &str, exclude: &[String]) -> Vec<String> {
    let filter = filter.trim().to_lowercase();

    MAJOR_CURRENCIES
        .iter()
        .filter(|info| !exclude.iter().any(|code| code == info.code))
        .filter(|info| {
            info.code.to_lowercase().contains(&filter)
                || info.name.to_lowercase().contains(&filter)
        })
        .take(SEARCH_LIMIT)
        .map(|info| info.code.to_string())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_canonical_code() {
        assert_eq!(canonical_code("eur"), "EUR");
        assert_eq!(canonical_code(" Gbp "), "GBP");
    }

    #[test]
    fn test_currency_name() {
        assert_eq!(currency_name("USD"), "US Dollar");
        assert_eq!(currency_name("eur"), "Euro");
        assert_eq!(currency_name("xyz"), "XYZ");
    }

    #[test]
    fn test_currency_flag() {
        assert_eq!(currency_flag("JPY"), "🇯🇵");
        assert_eq!(currency_flag("usd"), "🇺🇸");
        assert_eq!(currency_flag("UNKNOWN"), UNKNOWN_FLAG);
    }

    #[test]
    fn test_names_and_flags_are_aligned() {
        // Chaque code avec un nom personnalisé a aussi un drapeau, et inversement
        let with_name: HashSet<&str> = MAJOR_CURRENCIES
            .iter()
            .filter(|info| currency_name(info.code) != info.code)
            .map(|info| info.code)
            .collect();
        let with_flag: HashSet<&str> = MAJOR_CURRENCIES
            .iter()
            .filter(|info| currency_flag(info.code) != UNKNOWN_FLAG)
            .map(|info| info.code)
            .collect();

        assert_eq!(with_name, with_flag);
        assert_eq!(with_name.len(), MAJOR_CURRENCIES.len());
    }

    #[test]
    fn test_major_codes_are_unique() {
        let codes: HashSet<String> = major_currency_codes().into_iter().collect();
        assert_eq!(codes.len(), 39);
        assert_eq!(major_currency_codes()[0], "USD");
        assert_eq!(major_currency_codes()[38], "LBP");
    }

    #[test]
    fn test_search_currencies() {
        let selected = vec!["USD".to_string()];

        // Recherche par nom
        let found = search_currencies("dollar", &selected);
        assert!(found.contains(&"CAD".to_string()));
        assert!(!found.contains(&"USD".to_string()));

        // Recherche par code
        assert_eq!(search_currencies("chf", &selected), vec!["CHF".to_string()]);

        // Filtre vide : limité à SEARCH_LIMIT
        assert_eq!(search_currencies("", &[]).len(), SEARCH_LIMIT);
    }
}
