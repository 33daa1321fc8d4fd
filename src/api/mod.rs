// ============================================================================
// Module : api
// ============================================================================
// Récupération des taux de change depuis le flux distant et politique de
// cache (fraîcheur, repli sur les données sauvegardées)
// ============================================================================

pub mod feed;  // Client du flux de taux (HTTP)
pub mod rates; // RateService : cache + repli

// Re-export des éléments principaux
pub use feed::{FeedSnapshot, HttpRateFeed, RateFeed, DEFAULT_FEED_URL};
pub use rates::{RateService, NO_CACHE_MESSAGE, STALE_DATA_MESSAGE};
