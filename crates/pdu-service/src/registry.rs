//! Process-wide registry of lazily constructed shared managers.
//!
//! Each registered type owns a slot with its own construction mutex, so
//! building one manager never blocks lookups of another. The map of slots
//! sits behind a separate read-mostly lock that is only written when a type
//! is seen for the first time.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use once_cell::sync::Lazy;
use pdu_types::ErrorCode;
use thiserror::Error;
use tracing::debug;

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

static GLOBAL: Lazy<Arc<SingletonRegistry>> = Lazy::new(|| Arc::new(SingletonRegistry::new()));

/// A type the registry constructs at most once.
pub trait Singleton: Any + Send + Sync + Sized {
    /// Arguments consumed by the first construction.
    type Args;
    /// Construction failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// When `true`, arguments passed after construction are silently
    /// ignored instead of rejected.
    const IGNORE_SUBSEQUENT_ARGS: bool = false;

    /// Builds the instance.
    ///
    /// # Errors
    ///
    /// Returns the type's own construction error.
    fn construct(args: Self::Args) -> Result<Self, Self::Error>;

    /// Hook invoked before the registry drops its reference.
    fn prepare_to_forget(&self) {}
}

/// Errors returned by [`SingletonRegistry::get_instance`].
#[derive(Debug, Error)]
pub enum SingletonError<E>
where
    E: std::error::Error + 'static,
{
    /// Arguments were supplied for a type that already has an instance.
    #[error("{type_name} is already initialised")]
    AlreadyInitialized {
        /// Registered type.
        type_name: &'static str,
    },
    /// The first lookup for a type carried no construction arguments.
    #[error("{type_name} has not been initialised and no arguments were supplied")]
    MissingArguments {
        /// Registered type.
        type_name: &'static str,
    },
    /// The constructor failed; nothing was registered.
    #[error("failed to construct {type_name}: {source}")]
    Construct {
        /// Registered type.
        type_name: &'static str,
        /// Constructor error.
        #[source]
        source: E,
    },
}

impl<E> SingletonError<E>
where
    E: std::error::Error + 'static,
{
    /// Error code for the envelope and exit status.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::MissingArguments { .. } | Self::Construct { .. } => ErrorCode::Generic,
        }
    }
}

type SharedInstance = Arc<dyn Any + Send + Sync>;

struct Entry {
    instance: SharedInstance,
    forget: fn(&(dyn Any + Send + Sync)),
}

#[derive(Default)]
struct Slot {
    construct: Mutex<()>,
    entry: RwLock<Option<Entry>>,
}

impl Slot {
    fn current<T: Singleton>(&self) -> Option<Arc<T>> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .and_then(|stored| Arc::clone(&stored.instance).downcast::<T>().ok())
    }

    fn store<T: Singleton>(&self, instance: Arc<T>) {
        let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        *entry = Some(Entry {
            instance,
            forget: forget::<T>,
        });
    }

    fn release(&self) -> bool {
        let _construction = self
            .construct
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let taken = self
            .entry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match taken {
            Some(Entry { instance, forget }) => {
                forget(instance.as_ref());
                true
            }
            None => false,
        }
    }

    fn is_occupied(&self) -> bool {
        self.entry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

fn forget<T: Singleton>(instance: &(dyn Any + Send + Sync)) {
    if let Some(typed) = instance.downcast_ref::<T>() {
        typed.prepare_to_forget();
    }
}

/// Registry keyed by type identity.
#[derive(Default)]
pub struct SingletonRegistry {
    slots: RwLock<HashMap<TypeId, Arc<Slot>>>,
}

impl SingletonRegistry {
    /// Empty registry, for tests and embedders that want isolation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    fn slot<T: Singleton>(&self) -> Arc<Slot> {
        let key = TypeId::of::<T>();
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key).or_default())
    }

    fn existing_slot<T: Singleton>(&self) -> Option<Arc<Slot>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .cloned()
    }

    /// Returns the instance of `T`, constructing it from `args` on first use.
    ///
    /// Concurrent first calls construct exactly once; the losers of the race
    /// receive the winner's instance.
    ///
    /// # Errors
    ///
    /// * [`SingletonError::MissingArguments`] when no instance exists and
    ///   `args` is `None`.
    /// * [`SingletonError::AlreadyInitialized`] when an instance exists,
    ///   `args` is `Some` and `T` does not ignore subsequent arguments.
    /// * [`SingletonError::Construct`] when the constructor fails.
    pub fn get_instance<T: Singleton>(
        &self,
        args: Option<T::Args>,
    ) -> Result<Arc<T>, SingletonError<T::Error>> {
        let slot = self.slot::<T>();
        if let Some(instance) = slot.current::<T>() {
            return reuse(instance, args.is_some());
        }

        let _construction = slot
            .construct
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(instance) = slot.current::<T>() {
            return reuse(instance, args.is_some());
        }
        let Some(arguments) = args else {
            return Err(SingletonError::MissingArguments {
                type_name: type_name::<T>(),
            });
        };
        let instance = Arc::new(T::construct(arguments).map_err(|source| {
            SingletonError::Construct {
                type_name: type_name::<T>(),
                source,
            }
        })?);
        slot.store(Arc::clone(&instance));
        debug!(target: REGISTRY_TARGET, type_name = type_name::<T>(), "singleton constructed");
        Ok(instance)
    }

    /// Whether an instance of `T` is currently registered.
    #[must_use]
    pub fn is_registered<T: Singleton>(&self) -> bool {
        self.existing_slot::<T>()
            .is_some_and(|slot| slot.is_occupied())
    }

    /// Forgets the instance of `T` after calling its
    /// [`Singleton::prepare_to_forget`] hook. No-op when absent.
    pub fn release_for_testing<T: Singleton>(&self) {
        if let Some(slot) = self.existing_slot::<T>() {
            if slot.release() {
                debug!(target: REGISTRY_TARGET, type_name = type_name::<T>(), "singleton released");
            }
        }
    }

    /// Forgets every instance.
    ///
    /// Intended for quiescent teardown between tests.
    ///
    /// # Panics
    ///
    /// Panics when another thread registers an instance while the release
    /// is in progress.
    pub fn release_all_for_testing(&self) {
        let slots: Vec<Arc<Slot>> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for slot in &slots {
            slot.release();
        }
        let repopulated = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .any(|slot| slot.is_occupied());
        assert!(
            !repopulated,
            "a singleton was registered while the registry was being released"
        );
    }
}

fn reuse<T: Singleton>(
    instance: Arc<T>,
    args_supplied: bool,
) -> Result<Arc<T>, SingletonError<T::Error>> {
    if args_supplied && !T::IGNORE_SUBSEQUENT_ARGS {
        return Err(SingletonError::AlreadyInitialized {
            type_name: type_name::<T>(),
        });
    }
    Ok(instance)
}
