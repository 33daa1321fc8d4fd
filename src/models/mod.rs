// ============================================================================
// Module : models
// ============================================================================
// Ce module contient les structures de données et les calculs purs :
// table de taux, politique de conversion, référentiel des devises,
// saisie des montants.
// ============================================================================

pub mod amount;     // Parsing des montants saisis
pub mod currency;   // Codes, noms et drapeaux des devises
pub mod rate_table; // RateTable + conversion via la devise de base

// Re-export des éléments principaux pour simplifier les imports
// Au lieu de : use lazyrates::models::rate_table::RateTable;
// On peut faire : use lazyrates::models::RateTable;
pub use amount::{parse_amount, IntoAmount};
pub use currency::{
    canonical_code, currency_flag, currency_name, major_currency_codes, search_currencies,
    CurrencyInfo, DEFAULT_CURRENCIES, MAJOR_CURRENCIES,
};
pub use rate_table::{convert, RateTable};
