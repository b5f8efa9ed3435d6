//! Structural validation of flag definitions.
//!
//! Catches problems that make a definition unusable regardless of what else
//! is in the registry: empty names, missing or malformed option strings,
//! zero positional indexes and defaults outside the declared enum. Name and
//! option collisions depend on registry contents and are checked by
//! [`FlagRegistry`](crate::FlagRegistry).
//!
//! # Examples
//!
//! ```
//! use flagtree_core::*;
//!
//! let ok = FlagDefinition::new("verbose").option("-v").option("--verbose");
//! assert!(validate_definition(&ok).is_ok());
//!
//! // Invalid: option missing its leading dash
//! let bad = FlagDefinition::new("verbose").option("verbose");
//! assert!(validate_definition(&bad).is_err());
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::{FlagDefinition, RegistryError, Value};

static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:-[A-Za-z0-9?@][A-Za-z0-9_.-]*|--[A-Za-z0-9][A-Za-z0-9_.:-]*)$")
        .expect("static regex must compile")
});

/// Checks whether `option` is a well-formed single-dash (`-x`, `-name`)
/// or double-dash (`--word`) option string.
pub fn is_valid_option(option: &str) -> bool {
    OPTION_RE.is_match(option)
}

/// Validates one definition, returning the first problem found.
pub fn validate_definition(def: &FlagDefinition) -> Result<(), RegistryError> {
    let name = def.name.trim();
    if name.is_empty() {
        return Err(RegistryError::EmptyName);
    }

    if def.options.is_empty() {
        return Err(RegistryError::MissingOptions(name.to_string()));
    }

    let mut seen = HashSet::new();
    for option in &def.options {
        if !is_valid_option(option) {
            return Err(RegistryError::InvalidOption {
                flag: name.to_string(),
                option: option.clone(),
            });
        }
        if !seen.insert(option.as_str()) {
            return Err(RegistryError::OptionCollision {
                option: option.clone(),
                flag: name.to_string(),
                owner: name.to_string(),
            });
        }
    }

    if def.positional == Some(0) {
        return Err(RegistryError::InvalidPositional(name.to_string()));
    }

    if let (Some(allowed), Some(default)) = (&def.enum_values, &def.default_value) {
        let defaults: Vec<&Value> = match default {
            Value::Array(items) if def.allow_multiple => items.iter().collect(),
            other => vec![other],
        };
        if let Some(bad) = defaults.into_iter().find(|v| !allowed.contains(v)) {
            return Err(RegistryError::DefaultNotInEnum {
                flag: name.to_string(),
                value: bad.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_formats() {
        assert!(is_valid_option("-v"));
        assert!(is_valid_option("--dry-run"));
        assert!(is_valid_option("--s3.bucket"));
        assert!(!is_valid_option("v"));
        assert!(!is_valid_option("-"));
        assert!(!is_valid_option("--"));
        assert!(is_valid_option("-name"));
        assert!(!is_valid_option("--has space"));
    }

    #[test]
    fn test_rejects_empty_name() {
        let def = FlagDefinition::new("  ").option("--x");
        assert_eq!(validate_definition(&def), Err(RegistryError::EmptyName));
    }

    #[test]
    fn test_rejects_missing_options() {
        let def = FlagDefinition::new("lonely");
        assert_eq!(
            validate_definition(&def),
            Err(RegistryError::MissingOptions("lonely".into()))
        );
    }

    #[test]
    fn test_rejects_repeated_option_within_flag() {
        let def = FlagDefinition::new("v").options(["-v", "-v"]);
        assert!(matches!(
            validate_definition(&def),
            Err(RegistryError::OptionCollision { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_positional() {
        let def = FlagDefinition::new("file").option("--file").positional(0);
        assert_eq!(
            validate_definition(&def),
            Err(RegistryError::InvalidPositional("file".into()))
        );
    }

    #[test]
    fn test_rejects_default_outside_enum() {
        let def = FlagDefinition::new("format")
            .option("--format")
            .enum_values(["json", "yaml"])
            .default_value("toml");
        assert!(matches!(
            validate_definition(&def),
            Err(RegistryError::DefaultNotInEnum { .. })
        ));

        let ok = FlagDefinition::new("format")
            .option("--format")
            .enum_values(["json", "yaml"])
            .default_value("yaml");
        assert!(validate_definition(&ok).is_ok());
    }
}
