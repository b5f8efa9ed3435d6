//! Serializable description of a command tree.
//!
//! Summaries carry everything a help renderer or an external adapter needs
//! without exposing callbacks; predicates, coercers and handlers are only
//! flagged as present.

use flagtree_core::{ProcessedFlag, Value};
use serde::{Deserialize, Serialize};

use crate::inherit::InheritMode;
use crate::node::CommandNode;

/// How a flag's mandatory rule is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Always,
    Conditional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagSummary {
    pub name: String,
    pub options: Vec<String>,
    #[serde(rename = "type")]
    pub type_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory: Option<Requirement>,
    #[serde(default)]
    pub flag_only: bool,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positional: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(default)]
    pub validated: bool,
    #[serde(default)]
    pub inherited: bool,
}

impl From<&ProcessedFlag> for FlagSummary {
    fn from(flag: &ProcessedFlag) -> Self {
        Self {
            name: flag.name.clone(),
            options: flag.options.clone(),
            type_label: flag.flag_type.label().to_string(),
            description: flag.description.clone(),
            default: flag.default_value.clone(),
            mandatory: flag.mandatory.as_ref().map(|rule| {
                if rule.is_conditional() {
                    Requirement::Conditional
                } else {
                    Requirement::Always
                }
            }),
            flag_only: flag.flag_only,
            allow_multiple: flag.allow_multiple,
            enum_values: flag.enum_values.clone(),
            positional: flag.positional,
            env: flag.env.clone(),
            validated: flag.validate.is_some(),
            inherited: flag.inherited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSummary {
    pub name: String,
    /// Command path from the root, this command included
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub inherit: InheritMode,
    #[serde(default)]
    pub has_handler: bool,
    #[serde(default)]
    pub flags: Vec<FlagSummary>,
    #[serde(default)]
    pub subcommands: Vec<CommandSummary>,
}

impl CommandSummary {
    /// Looks up a nested summary by subcommand names.
    pub fn find(&self, chain: &[String]) -> Option<&CommandSummary> {
        chain.iter().try_fold(self, |summary, name| {
            summary.subcommands.iter().find(|c| &c.name == name)
        })
    }

    /// Total number of commands in this subtree, this one included.
    pub fn command_count(&self) -> usize {
        1 + self
            .subcommands
            .iter()
            .map(CommandSummary::command_count)
            .sum::<usize>()
    }
}

impl CommandNode {
    /// Describes this command and its subtree.
    pub fn summary(&self) -> CommandSummary {
        CommandSummary {
            name: self.name.clone(),
            path: self.path(),
            description: self.description.clone(),
            inherit: self.inherit_mode,
            has_handler: self.handler.is_some(),
            flags: self.registry.all_flags().iter().map(FlagSummary::from).collect(),
            subcommands: self.children.iter().map(CommandNode::summary).collect(),
        }
    }
}
