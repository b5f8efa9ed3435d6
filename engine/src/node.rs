//! Command tree nodes.
//!
//! A [`CommandNode`] owns its flag registry and its children; ownership only
//! ever flows parent → child. The optional [`ParentLink`] is informational
//! (the command path above the node) and is filled in by [`attach`].
//!
//! [`attach`]: CommandNode::attach
//!
//! # Examples
//!
//! ```
//! use flagtree_core::FlagDefinition;
//! use flagtree_engine::{CommandNode, InheritMode};
//!
//! let mut app = CommandNode::new("app")
//!     .with_description("Example app")
//!     .with_flag(FlagDefinition::new("verbose").options(["-v", "--verbose"]).flag_only())
//!     .unwrap();
//!
//! app.attach(CommandNode::new("build").with_inherit(InheritMode::DirectParent));
//!
//! let build = app.subcommand("build").unwrap();
//! assert!(build.has_flag("verbose"));
//! assert_eq!(build.path(), vec!["app", "build"]);
//! ```

use flagtree_core::{FlagDefinition, FlagRegistry, ProcessedFlag, RegistryError};
use tracing::warn;

use crate::exec::ParserConfig;
use crate::extension::ExtensionRegistry;
use crate::handler::Handler;
use crate::inherit::{self, InheritMode, ParentView};

/// Non-owning reference to where a node sits in its tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    /// Command names from the root down to the parent, inclusive
    pub path: Vec<String>,
}

impl ParentLink {
    /// Name of the direct parent.
    pub fn name(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}

/// One command in a command tree.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) registry: FlagRegistry,
    pub(crate) children: Vec<CommandNode>,
    pub(crate) handler: Option<Handler>,
    pub(crate) inherit_mode: InheritMode,
    pub(crate) parent: Option<ParentLink>,
    /// Flags of every ancestor, nearest first, as of the last attach
    pub(crate) ancestry: Vec<ProcessedFlag>,
    pub(crate) config: ParserConfig,
}

impl CommandNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            registry: FlagRegistry::new(),
            children: Vec::new(),
            handler: None,
            inherit_mode: InheritMode::None,
            parent: None,
            ancestry: Vec::new(),
            config: ParserConfig::default(),
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Sets the parse configuration. The registry policy applies to flags
    /// added afterwards.
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.registry.set_policy(config.registry_policy);
        self.config = config;
        self
    }

    pub fn with_inherit(mut self, mode: InheritMode) -> Self {
        self.inherit_mode = mode;
        self
    }

    pub fn with_handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Builder form of [`add_flag`](Self::add_flag).
    pub fn with_flag(mut self, def: FlagDefinition) -> Result<Self, RegistryError> {
        self.add_flag(def)?;
        Ok(self)
    }

    pub fn with_flags<I>(mut self, defs: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = FlagDefinition>,
    {
        self.registry.add_flags(defs)?;
        Ok(self)
    }

    /// Builder form of [`attach`](Self::attach).
    pub fn with_subcommand(mut self, child: CommandNode) -> Self {
        self.attach(child);
        self
    }

    /// Adds a flag to this command only. Already attached children are not
    /// updated.
    pub fn add_flag(&mut self, def: FlagDefinition) -> Result<bool, RegistryError> {
        self.registry.add_flag(def)
    }

    pub fn remove_flag(&mut self, name: &str) -> Option<ProcessedFlag> {
        self.registry.remove_flag(name)
    }

    pub fn set_handler(&mut self, handler: Handler) {
        self.handler = Some(handler);
    }

    /// Attaches `child` under this command and applies inheritance.
    ///
    /// The child (and its subtree) adopts this command's parser
    /// configuration. A child with the same name as an existing one replaces
    /// it.
    pub fn attach(&mut self, mut child: CommandNode) -> &mut CommandNode {
        child.adopt_config(&self.config);
        inherit::attach_to(&mut child, &ParentView::of(self));

        let index = match self.children.iter().position(|c| c.name == child.name) {
            Some(index) => {
                warn!(parent = %self.name, command = %child.name, "Replacing existing subcommand");
                self.children[index] = child;
                index
            }
            None => {
                self.children.push(child);
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Runs every extension in `extensions` against this command.
    pub fn install_extensions(
        &mut self,
        extensions: &ExtensionRegistry,
    ) -> Result<(), RegistryError> {
        extensions.install_into(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Processed flags in declaration order, inherited copies included.
    pub fn flags(&self) -> &[ProcessedFlag] {
        self.registry.all_flags()
    }

    pub fn registry(&self) -> &FlagRegistry {
        &self.registry
    }

    pub fn get_flag(&self, name: &str) -> Option<&ProcessedFlag> {
        self.registry.get_flag(name)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.registry.has_flag(name)
    }

    /// Child commands in attach order.
    pub fn subcommands(&self) -> impl Iterator<Item = &CommandNode> {
        self.children.iter()
    }

    pub fn subcommand(&self, name: &str) -> Option<&CommandNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn subcommand_mut(&mut self, name: &str) -> Option<&mut CommandNode> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    pub fn subcommand_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn inherit_mode(&self) -> InheritMode {
        self.inherit_mode
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Full command path from the root, this command included.
    pub fn path(&self) -> Vec<String> {
        let mut path = self
            .parent
            .as_ref()
            .map(|p| p.path.clone())
            .unwrap_or_default();
        path.push(self.name.clone());
        path
    }

    fn adopt_config(&mut self, config: &ParserConfig) {
        self.config = config.clone();
        self.registry.set_policy(config.registry_policy);
        for child in &mut self.children {
            child.adopt_config(config);
        }
    }
}
