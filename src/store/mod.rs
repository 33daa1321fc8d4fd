// ============================================================================
// Module : store
// ============================================================================
// Le modèle de conversion, sa persistance et ses abonnés
// ============================================================================

pub mod model;       // ConversionModel : état + mutations + calculs
pub mod persistence; // Stockage de l'enregistrement persisté
pub mod subscribers; // Registre des abonnés (publish/subscribe)

pub use model::{lock_model, Clock, ConversionModel, ConversionState, SharedModel};
pub use persistence::{JsonFileStorage, MemoryStorage, PersistedState, StateStorage};
pub use subscribers::{ListenerRegistry, Subscription};
