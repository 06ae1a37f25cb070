//! Registry of named dynamics constructors.
//!
//! Project files refer to the behaviour of atomic models by name. A
//! [`DynamicsRegistry`] maps these names to constructors and implements
//! [`DynamicsFactory`], so it can be handed directly to
//! [`SimInit::from_config`](crate::simulation::SimInit::from_config).
//!
//! ```
//! use devsim::model::{ConfluentPolicy, Dynamics};
//! use devsim::registry::DynamicsRegistry;
//!
//! struct Idle;
//! impl Dynamics for Idle {
//!     fn confluent_policy(&self) -> ConfluentPolicy {
//!         ConfluentPolicy::InternalFirst
//!     }
//! }
//!
//! let mut registry = DynamicsRegistry::new();
//! registry.add("idle", |_| Ok(Idle)).unwrap();
//! assert!(registry.add("idle", |_| Ok(Idle)).is_err());
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use crate::error::ConfigurationError;
use crate::model::{Dynamics, DynamicsFactory, DynamicsInit, DynamicsResult};

type Constructor =
    Box<dyn Fn(&DynamicsInit<'_>) -> DynamicsResult<Box<dyn Dynamics>> + Send + Sync + 'static>;

/// A table of dynamics constructors indexed by name.
#[derive(Default)]
pub struct DynamicsRegistry(HashMap<String, Constructor>);

impl DynamicsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constructor to the registry.
    ///
    /// If the specified name is already in use, the registry is left
    /// unchanged and an error is returned.
    pub fn add<F, D>(&mut self, name: impl Into<String>, constructor: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&DynamicsInit<'_>) -> DynamicsResult<D> + Send + Sync + 'static,
        D: Dynamics,
    {
        match self.0.entry(name.into()) {
            Entry::Vacant(s) => {
                s.insert(Box::new(move |init: &DynamicsInit<'_>| {
                    constructor(init).map(|d| Box::new(d) as Box<dyn Dynamics>)
                }));

                Ok(())
            }
            Entry::Occupied(s) => Err(ConfigurationError::DuplicateDynamics(s.key().clone())),
        }
    }

    /// Returns `true` if a constructor is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of registered constructors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl DynamicsFactory for DynamicsRegistry {
    fn build(&self, init: &DynamicsInit<'_>) -> DynamicsResult<Box<dyn Dynamics>> {
        match self.0.get(init.dynamics) {
            Some(constructor) => constructor(init),
            None => Err(ConfigurationError::UnknownDynamics(init.dynamics.to_owned()).into()),
        }
    }
}

impl fmt::Debug for DynamicsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DynamicsRegistry ({} dynamics)", self.0.len())
    }
}
