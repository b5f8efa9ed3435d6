//! Pluggable command-tree extensions.
//!
//! Extensions add flags, subcommands or handlers to an existing tree. They
//! live in a caller-owned [`ExtensionRegistry`]; nothing is registered
//! globally.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use flagtree_core::{FlagDefinition, RegistryError};
//! use flagtree_engine::{CommandNode, Extension, ExtensionRegistry};
//!
//! struct JsonOutput;
//!
//! impl Extension for JsonOutput {
//!     fn name(&self) -> &str {
//!         "json-output"
//!     }
//!
//!     fn install(&self, node: &mut CommandNode) -> Result<(), RegistryError> {
//!         node.add_flag(FlagDefinition::new("json").option("--json").flag_only())?;
//!         Ok(())
//!     }
//! }
//!
//! let mut extensions = ExtensionRegistry::new();
//! extensions.register(Arc::new(JsonOutput));
//!
//! let mut app = CommandNode::new("app");
//! app.install_extensions(&extensions).unwrap();
//! assert!(app.has_flag("json"));
//! ```

use std::fmt;
use std::sync::Arc;

use flagtree_core::RegistryError;
use tracing::debug;

use crate::node::CommandNode;

pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    /// Modifies `node`. Registration errors abort installation.
    fn install(&self, node: &mut CommandNode) -> Result<(), RegistryError>;
}

/// Ordered set of extensions, installed in registration order.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an extension. One with the same name replaces the earlier entry
    /// in place.
    pub fn register(&mut self, extension: Arc<dyn Extension>) {
        match self
            .extensions
            .iter()
            .position(|e| e.name() == extension.name())
        {
            Some(index) => self.extensions[index] = extension,
            None => self.extensions.push(extension),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub(crate) fn install_into(&self, node: &mut CommandNode) -> Result<(), RegistryError> {
        for extension in &self.extensions {
            debug!(extension = extension.name(), command = %node.name, "Installing extension");
            extension.install(node)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use flagtree_core::FlagDefinition;

    use super::*;

    struct AddFlag(&'static str);

    impl Extension for AddFlag {
        fn name(&self) -> &str {
            self.0
        }

        fn install(&self, node: &mut CommandNode) -> Result<(), RegistryError> {
            node.add_flag(FlagDefinition::new(self.0).option(format!("--{}", self.0)))?;
            Ok(())
        }
    }

    struct AddCommand;

    impl Extension for AddCommand {
        fn name(&self) -> &str {
            "version"
        }

        fn install(&self, node: &mut CommandNode) -> Result<(), RegistryError> {
            node.attach(CommandNode::new("version").with_description("Print the version"));
            Ok(())
        }
    }

    #[test]
    fn test_install_in_order() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Arc::new(AddFlag("alpha")));
        registry.register(Arc::new(AddCommand));
        registry.register(Arc::new(AddFlag("beta")));
        assert_eq!(registry.names(), vec!["alpha", "version", "beta"]);

        let mut node = CommandNode::new("app");
        node.install_extensions(&registry).unwrap();
        assert_eq!(node.registry().names().collect::<Vec<_>>(), vec!["alpha", "beta"]);
        assert!(node.subcommand("version").is_some());
    }

    #[test]
    fn test_same_name_replaces() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Arc::new(AddFlag("alpha")));
        registry.register(Arc::new(AddFlag("alpha")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_install_stops_on_error() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Arc::new(AddFlag("alpha")));

        let mut node = CommandNode::new("app")
            .with_flag(FlagDefinition::new("alpha").option("--alpha"))
            .unwrap();
        let err = node.install_extensions(&registry).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateFlag(name) if name == "alpha"));
    }
}
