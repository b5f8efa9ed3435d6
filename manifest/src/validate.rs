//! Manifest validation.
//!
//! Walks the whole command tree and reports every structural problem at once,
//! so `flagtree check` can list them together instead of stopping at the
//! first.
//!
//! # Examples
//!
//! ```
//! use flagtree_manifest::{Manifest, ManifestIssue, validate_manifest};
//!
//! let manifest = Manifest::from_yaml_str(r#"
//! command:
//!   name: app
//!   subcommands:
//!     - name: build
//!     - name: build
//! "#).unwrap();
//!
//! let issues = validate_manifest(&manifest);
//! assert_eq!(issues, vec![ManifestIssue::DuplicateSubcommand("app build".into())]);
//! ```

use std::collections::HashSet;

use flagtree_core::{RegistryPolicy, validate_definition};
use flagtree_engine::InheritMode;
use thiserror::Error;

use crate::model::{CommandSpec, Manifest};

/// A structural problem in a manifest. Paths are space-separated command
/// names from the root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestIssue {
    /// Command name is empty or whitespace-only.
    #[error("empty command name under '{0}'")]
    EmptyCommandName(String),
    /// Command name starts with `-` and could never be matched as a
    /// subcommand.
    #[error("command name looks like an option: {0}")]
    InvalidCommandName(String),
    /// Two subcommands of the same command share a name.
    #[error("duplicate subcommand: {0}")]
    DuplicateSubcommand(String),
    /// A flag definition is structurally invalid.
    #[error("command '{command}': {message}")]
    InvalidFlag { command: String, message: String },
    /// Two flags of the same command share a name.
    #[error("command '{command}': duplicate flag '{flag}'")]
    DuplicateFlag { command: String, flag: String },
    /// Two flags of the same command share an option string.
    #[error("command '{command}': option {option} is declared more than once")]
    DuplicateOption { command: String, option: String },
    /// A conditional mandatory rule refers to a flag the command never sees.
    #[error("command '{command}': flag '{flag}' depends on unknown flag '{target}'")]
    UnknownConditionFlag {
        command: String,
        flag: String,
        target: String,
    },
}

/// Validates a whole manifest.
///
/// Duplicate flags and options are only reported under
/// [`RegistryPolicy::Throw`]; with `warn` the registry skips them at build
/// time. A conditional rule may only name flags its command actually holds
/// once built: a `direct-parent` command sees what its parent holds, an
/// `all-parents` command sees every ancestor's flags.
pub fn validate_manifest(manifest: &Manifest) -> Vec<ManifestIssue> {
    let mut issues = Vec::new();
    let strict = manifest.settings.registry_policy == RegistryPolicy::Throw;
    validate_command(&manifest.command, &[], &[], &[], strict, &mut issues);
    issues
}

fn validate_command(
    command: &CommandSpec,
    parent_path: &[String],
    parent_flags: &[String],
    lineage: &[String],
    strict: bool,
    issues: &mut Vec<ManifestIssue>,
) {
    let mut path = parent_path.to_vec();
    path.push(command.name.clone());
    let path_label = path.join(" ");

    if command.name.trim().is_empty() {
        issues.push(ManifestIssue::EmptyCommandName(parent_path.join(" ")));
    } else if command.name.starts_with('-') {
        issues.push(ManifestIssue::InvalidCommandName(path_label.clone()));
    }

    let mut seen_flags = HashSet::new();
    let mut seen_options = HashSet::new();
    for flag in &command.flags {
        if let Err(err) = validate_definition(&flag.to_definition()) {
            issues.push(ManifestIssue::InvalidFlag {
                command: path_label.clone(),
                message: err.to_string(),
            });
        }
        if !strict {
            continue;
        }
        if !seen_flags.insert(flag.name.as_str()) {
            issues.push(ManifestIssue::DuplicateFlag {
                command: path_label.clone(),
                flag: flag.name.clone(),
            });
        }
        for option in &flag.options {
            if !seen_options.insert(option.as_str()) {
                issues.push(ManifestIssue::DuplicateOption {
                    command: path_label.clone(),
                    option: option.clone(),
                });
            }
        }
    }

    // Flags the built command ends up with: its own plus whatever its
    // inheritance mode copies in.
    let mut visible: Vec<String> = command.flags.iter().map(|f| f.name.clone()).collect();
    match command.inherit {
        InheritMode::None => {}
        InheritMode::DirectParent => visible.extend(parent_flags.iter().cloned()),
        InheritMode::AllParents => visible.extend(lineage.iter().cloned()),
    }
    for flag in &command.flags {
        for target in flag.condition_targets() {
            if !visible.iter().any(|name| name == target) {
                issues.push(ManifestIssue::UnknownConditionFlag {
                    command: path_label.clone(),
                    flag: flag.name.clone(),
                    target: target.to_string(),
                });
            }
        }
    }

    let mut below = lineage.to_vec();
    below.extend(visible.iter().cloned());

    let mut seen_children = HashSet::new();
    for child in &command.subcommands {
        if !seen_children.insert(child.name.as_str()) {
            issues.push(ManifestIssue::DuplicateSubcommand(format!(
                "{path_label} {}",
                child.name
            )));
        }
        validate_command(child, &path, &visible, &below, strict, issues);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(yaml: &str) -> Manifest {
        Manifest::from_yaml_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_manifest() {
        let m = manifest(
            r#"
command:
  name: app
  flags:
    - name: verbose
      options: [-v, --verbose]
      flag_only: true
  subcommands:
    - name: run
      inherit: direct-parent
      flags:
        - name: quiet
          options: [-q]
          mandatory_unless: { flag: verbose }
"#,
        );
        assert!(validate_manifest(&m).is_empty());
    }

    #[test]
    fn test_bad_names_and_flags() {
        let m = manifest(
            r#"
command:
  name: app
  flags:
    - name: a
      options: [--a]
    - name: a
      options: [--b]
    - name: c
      options: [bare]
    - name: d
      options: [--a]
  subcommands:
    - name: ""
    - name: --run
"#,
        );
        let issues = validate_manifest(&m);
        assert!(issues.contains(&ManifestIssue::DuplicateFlag {
            command: "app".into(),
            flag: "a".into(),
        }));
        assert!(issues.contains(&ManifestIssue::DuplicateOption {
            command: "app".into(),
            option: "--a".into(),
        }));
        assert!(issues.contains(&ManifestIssue::EmptyCommandName("app".into())));
        assert!(issues.contains(&ManifestIssue::InvalidCommandName("app --run".into())));
        assert!(issues.iter().any(|i| matches!(
            i,
            ManifestIssue::InvalidFlag { message, .. } if message.contains("bare")
        )));
    }

    #[test]
    fn test_warn_policy_allows_duplicates() {
        let m = manifest(
            r#"
settings:
  registry_policy: warn
command:
  name: app
  flags:
    - name: a
      options: [--a]
    - name: a
      options: [--a]
"#,
        );
        assert!(validate_manifest(&m).is_empty());
    }

    #[test]
    fn test_condition_on_ancestor_requires_inheritance() {
        let yaml = |inherit: &str| {
            format!(
                r#"
command:
  name: app
  flags:
    - name: mode
      options: [--mode]
  subcommands:
    - name: run
      inherit: {inherit}
      flags:
        - name: batch
          options: [--batch]
          mandatory_if: {{ flag: mode, equals: bulk }}
"#
            )
        };

        assert!(validate_manifest(&manifest(&yaml("all-parents"))).is_empty());
        assert_eq!(
            validate_manifest(&manifest(&yaml("none"))),
            vec![ManifestIssue::UnknownConditionFlag {
                command: "app run".into(),
                flag: "batch".into(),
                target: "mode".into(),
            }]
        );
    }

    #[test]
    fn test_direct_parent_does_not_see_past_its_parent() {
        let m = manifest(
            r#"
command:
  name: app
  flags:
    - name: mode
      options: [--mode]
  subcommands:
    - name: mid
      subcommands:
        - name: leaf
          inherit: direct-parent
          flags:
            - name: batch
              options: [--batch]
              mandatory_unless: { flag: mode }
"#,
        );
        assert_eq!(
            validate_manifest(&m),
            vec![ManifestIssue::UnknownConditionFlag {
                command: "app mid leaf".into(),
                flag: "batch".into(),
                target: "mode".into(),
            }]
        );
    }

    #[test]
    fn test_all_parents_sees_past_a_non_inheriting_parent() {
        let m = manifest(
            r#"
command:
  name: app
  flags:
    - name: mode
      options: [--mode]
  subcommands:
    - name: mid
      subcommands:
        - name: leaf
          inherit: all-parents
          flags:
            - name: batch
              options: [--batch]
              mandatory_if: { flag: mode, equals: bulk }
"#,
        );
        assert!(validate_manifest(&m).is_empty());
    }
}
