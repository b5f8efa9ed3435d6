//! Serializable manifest model.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! settings:
//!   registry_policy: warn
//! command:
//!   name: pipeline
//!   description: Batch processing pipeline
//!   flags:
//!     - name: phase
//!       options: [-p, --phase]
//!       enum: [chunking, pairing, analysis]
//!       required: true
//!     - name: batch
//!       options: [--batch]
//!       type: number
//!       mandatory_unless: { flag: phase, equals: analysis }
//!       env: PIPELINE_BATCH
//!   subcommands:
//!     - name: status
//!       inherit: all-parents
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use flagtree_core::{FlagValues, PrimitiveType, RegistryPolicy, Value};
use flagtree_engine::{InheritMode, ParserConfig};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{ManifestError, Result};

fn default_version() -> String {
    "1.0".to_string()
}

fn yes() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Accepts either a single string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(var) => vec![var],
        OneOrMany::Many(vars) => vars,
    })
}

/// Parser settings applied to the root command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub registry_policy: RegistryPolicy,
    #[serde(default = "yes")]
    pub handle_errors: bool,
    #[serde(default = "yes")]
    pub auto_help: bool,
    #[serde(default = "yes")]
    pub system_flags: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_policy: RegistryPolicy::Throw,
            handle_errors: true,
            auto_help: true,
            system_flags: true,
        }
    }
}

impl From<&Settings> for ParserConfig {
    fn from(settings: &Settings) -> Self {
        ParserConfig {
            registry_policy: settings.registry_policy,
            handle_errors: settings.handle_errors,
            auto_help: settings.auto_help,
            system_flags: settings.system_flags,
            ..ParserConfig::default()
        }
    }
}

/// Reference to another flag's value, used by conditional mandatory rules.
///
/// Without `equals` the condition holds whenever the flag has a value. With
/// `equals` it holds when the value matches, or, for a list value, when the
/// list contains it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub flag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
}

impl Condition {
    pub fn holds(&self, values: &FlagValues) -> bool {
        let Some(value) = values.get(&self.flag).filter(|v| !v.is_null()) else {
            return false;
        };
        match (&self.equals, value) {
            (None, _) => true,
            (Some(expected), Value::Array(items)) if !expected.is_array() => {
                items.contains(expected)
            }
            (Some(expected), actual) => actual == expected,
        }
    }
}

/// One flag declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagSpec {
    pub name: String,
    pub options: Vec<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub flag_type: Option<PrimitiveType>,
    #[serde(
        default,
        alias = "default",
        alias = "defaultValue",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<Value>,
    #[serde(default, alias = "required", skip_serializing_if = "is_false")]
    pub mandatory: bool,
    /// Required when this condition holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory_if: Option<Condition>,
    /// Required unless this condition holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory_unless: Option<Condition>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub flag_only: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_multiple: bool,
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub allow_ligature: bool,
    #[serde(
        default,
        rename = "enum",
        alias = "enum_values",
        skip_serializing_if = "Option::is_none"
    )]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positional: Option<usize>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub env: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FlagSpec {
    /// Flags referenced by this flag's conditional rules.
    pub fn condition_targets(&self) -> impl Iterator<Item = &str> {
        self.mandatory_if
            .iter()
            .chain(&self.mandatory_unless)
            .map(|c| c.flag.as_str())
    }
}

/// One command and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub inherit: InheritMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<CommandSpec>,
}

/// A declarative command tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest format version (e.g., `"1.0"`).
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub settings: Settings,
    /// The root command
    pub command: CommandSpec,
}

impl Manifest {
    /// Loads a manifest, choosing the format from the file extension
    /// (`.json`, `.yaml` or `.yml`).
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedFormat`](ManifestError::UnsupportedFormat) for
    /// other extensions, [`IoError`](ManifestError::IoError) if the file cannot
    /// be read, and a JSON or YAML error if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let reader = || -> Result<BufReader<File>> { Ok(BufReader::new(File::open(path)?)) };
        let manifest: Manifest = match extension.as_str() {
            "json" => serde_json::from_reader(reader()?)?,
            "yaml" | "yml" => serde_yaml::from_reader(reader()?)?,
            _ => return Err(ManifestError::UnsupportedFormat(path.display().to_string())),
        };

        debug!(path = %path.display(), root = %manifest.command.name, "Loaded manifest");
        Ok(manifest)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
