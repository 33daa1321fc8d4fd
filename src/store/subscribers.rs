// ============================================================================
// Abonnés du modèle
// ============================================================================
// Publication synchrone : notify() appelle chaque abonné une fois, dans le
// thread appelant, avant de rendre la main.
//
// CONCEPTS RUST :
// 1. Arc<Mutex<..>> : registre partagé entre le modèle et les Subscription
// 2. Weak : une Subscription ne maintient pas le registre en vie
// 3. catch_unwind : un abonné qui panique n'empêche pas les suivants
// ============================================================================

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::warn;

/// Callback d'un abonné
type Listener<S> = Arc<Mutex<Box<dyn FnMut(&S) + Send>>>;

struct Registry<S> {
    next_id: u64,
    listeners: Vec<(u64, Listener<S>)>,
}

/// Registre des abonnés d'un état de type `S`
pub struct ListenerRegistry<S> {
    inner: Arc<Mutex<Registry<S>>>,
}

impl<S> ListenerRegistry<S> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Enregistre un abonné et retourne le moyen de le désinscrire
    pub fn subscribe<F>(&self, listener: F) -> Subscription<S>
    where
        F: FnMut(&S) + Send + 'static,
    {
        let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .listeners
            .push((id, Arc::new(Mutex::new(Box::new(listener)))));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Nombre d'abonnés actifs
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appelle chaque abonné avec l'état courant
    ///
    /// Le registre n'est pas verrouillé pendant les appels : un abonné peut
    /// se désinscrire (ou en inscrire un autre) depuis son callback. Les
    /// changements prennent effet au prochain notify().
    ///
    /// Retourne le nombre d'abonnés qui ont paniqué.
    pub fn notify(&self, state: &S) -> usize {
        let snapshot: Vec<(u64, Listener<S>)> = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .clone();

        let mut failures = 0;
        for (id, listener) in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut callback = listener.lock().unwrap_or_else(PoisonError::into_inner);
                callback(state);
            }));

            if outcome.is_err() {
                failures += 1;
                warn!(listener = id, "Listener panicked during notification");
            }
        }
        failures
    }
}

impl<S> Default for ListenerRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Jeton retourné par `subscribe`
///
/// Le jeton peut être abandonné sans effet : l'abonné reste inscrit
/// jusqu'à l'appel explicite de `unsubscribe`.
#[must_use = "keep the subscription to be able to unsubscribe later"]
pub struct Subscription<S> {
    id: u64,
    registry: Weak<Mutex<Registry<S>>>,
}

impl<S> Subscription<S> {
    /// Désinscrit l'abonné (sans effet si le modèle n'existe plus)
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
