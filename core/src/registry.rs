//! Per-command flag registry.
//!
//! [`FlagRegistry`] stores the processed flags of one command in insertion
//! order, alongside name and option indexes for constant-time lookup.
//! Collisions are either raised or downgraded to a warning depending on the
//! [`RegistryPolicy`] chosen at construction.
//!
//! # Examples
//!
//! ```
//! use flagtree_core::*;
//!
//! let mut registry = FlagRegistry::new();
//! registry
//!     .add_flag(FlagDefinition::new("verbose").options(["-v", "--verbose"]).flag_only())
//!     .unwrap();
//!
//! assert!(registry.has_flag("verbose"));
//! assert_eq!(registry.find_by_option("-v").unwrap().name, "verbose");
//!
//! // A second flag named `verbose` is rejected
//! let dup = registry.add_flag(FlagDefinition::new("verbose").option("--loud"));
//! assert!(matches!(dup, Err(RegistryError::DuplicateFlag(_))));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{FlagDefinition, ProcessedFlag, RegistryError, validate_definition};

/// What to do when a definition collides with an existing flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryPolicy {
    /// Return the collision as an error (the default).
    #[default]
    Throw,
    /// Log a warning and skip the offending definition.
    Warn,
}

/// Ordered collection of a command's flags.
#[derive(Debug, Clone, Default)]
pub struct FlagRegistry {
    flags: Vec<ProcessedFlag>,
    by_name: HashMap<String, usize>,
    by_option: HashMap<String, usize>,
    policy: RegistryPolicy,
}

impl FlagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RegistryPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> RegistryPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RegistryPolicy) {
        self.policy = policy;
    }

    /// Normalizes and inserts a definition.
    ///
    /// Returns `Ok(true)` when the flag was added and `Ok(false)` when a
    /// collision was skipped under [`RegistryPolicy::Warn`].
    ///
    /// # Errors
    ///
    /// Structural problems (see [`validate_definition`]) are always
    /// returned. [`RegistryError::DuplicateFlag`] and
    /// [`RegistryError::OptionCollision`] are returned only under
    /// [`RegistryPolicy::Throw`].
    pub fn add_flag(&mut self, def: FlagDefinition) -> Result<bool, RegistryError> {
        validate_definition(&def)?;
        let flag = ProcessedFlag::from_definition(def);

        if let Err(err) = self.check_collisions(&flag) {
            return match self.policy {
                RegistryPolicy::Throw => Err(err),
                RegistryPolicy::Warn => {
                    warn!(flag = %flag.name, error = %err, "Skipping flag definition");
                    Ok(false)
                }
            };
        }

        // A local definition displaces an inherited copy of the same name.
        if self.get_flag(&flag.name).is_some_and(|f| f.inherited) {
            self.remove_flag(&flag.name);
        }
        self.push(flag);
        Ok(true)
    }

    /// Adds several definitions, stopping at the first error.
    pub fn add_flags<I>(&mut self, defs: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = FlagDefinition>,
    {
        for def in defs {
            self.add_flag(def)?;
        }
        Ok(())
    }

    /// Copies a flag from an ancestor registry.
    ///
    /// The flag is taken verbatim and marked inherited. A local flag with the
    /// same name always wins, and options already claimed keep pointing at
    /// their current owner. Returns whether the flag was inserted.
    pub fn insert_inherited(&mut self, flag: &ProcessedFlag) -> bool {
        if self.by_name.contains_key(&flag.name) {
            return false;
        }
        let mut copy = flag.clone();
        copy.inherited = true;
        let index = self.flags.len();
        self.by_name.insert(copy.name.clone(), index);
        for option in &copy.options {
            self.by_option.entry(option.clone()).or_insert(index);
        }
        self.flags.push(copy);
        true
    }

    /// Removes a flag and purges its option entries.
    pub fn remove_flag(&mut self, name: &str) -> Option<ProcessedFlag> {
        let index = self.by_name.get(name).copied()?;
        let removed = self.flags.remove(index);
        self.reindex();
        Some(removed)
    }

    /// Drops every inherited copy, returning how many were removed.
    pub fn remove_inherited(&mut self) -> usize {
        let before = self.flags.len();
        self.flags.retain(|f| !f.inherited);
        let removed = before - self.flags.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    pub fn get_flag(&self, name: &str) -> Option<&ProcessedFlag> {
        self.by_name.get(name).and_then(|&i| self.flags.get(i))
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All flags in insertion order.
    pub fn all_flags(&self) -> &[ProcessedFlag] {
        &self.flags
    }

    /// Looks up the flag owning an option string in O(1).
    pub fn find_by_option(&self, option: &str) -> Option<&ProcessedFlag> {
        self.by_option.get(option).and_then(|&i| self.flags.get(i))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    fn check_collisions(&self, flag: &ProcessedFlag) -> Result<(), RegistryError> {
        if self.get_flag(&flag.name).is_some_and(|f| !f.inherited) {
            return Err(RegistryError::DuplicateFlag(flag.name.clone()));
        }
        for option in &flag.options {
            if let Some(owner) = self.find_by_option(option).filter(|f| !f.inherited) {
                return Err(RegistryError::OptionCollision {
                    option: option.clone(),
                    flag: flag.name.clone(),
                    owner: owner.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn push(&mut self, flag: ProcessedFlag) {
        let index = self.flags.len();
        self.by_name.insert(flag.name.clone(), index);
        for option in &flag.options {
            self.by_option.insert(option.clone(), index);
        }
        self.flags.push(flag);
    }

    fn reindex(&mut self) {
        self.by_name.clear();
        self.by_option.clear();
        // Local flags claim their options before inherited copies do.
        let (local, inherited): (Vec<_>, Vec<_>) =
            self.flags.iter().enumerate().partition(|(_, f)| !f.inherited);
        for (index, flag) in local.into_iter().chain(inherited) {
            self.by_name.insert(flag.name.clone(), index);
            for option in &flag.options {
                self.by_option.entry(option.clone()).or_insert(index);
            }
        }
    }
}
