// ============================================================================
// LazyRates - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;    // Flux de taux + RateService (cache, repli)
pub mod app;    // État de l'interface
pub mod config; // Configuration TOML
pub mod models; // Devises, table de taux, montants
pub mod store;  // ConversionModel, persistance, abonnés
pub mod ui;     // Interface utilisateur
