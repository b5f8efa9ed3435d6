//! Turning a manifest into a live command tree.

use flagtree_core::{FlagDefinition, Mandatory};
use flagtree_engine::{CommandNode, ParserConfig};
use tracing::debug;

use crate::error::{ManifestError, Result};
use crate::model::{CommandSpec, FlagSpec, Manifest};
use crate::validate::validate_manifest;

impl FlagSpec {
    /// Converts the declaration into a builder definition.
    ///
    /// `mandatory`, `mandatory_if` and `mandatory_unless` combine: the flag is
    /// required if any of them demands it.
    pub fn to_definition(&self) -> FlagDefinition {
        let mut def = FlagDefinition::new(self.name.as_str()).options(self.options.iter().cloned());

        if let Some(primitive) = self.flag_type {
            def = def.of_type(primitive);
        }
        if let Some(value) = &self.default_value {
            def = def.default_value(value.clone());
        }
        if self.flag_only {
            def = def.flag_only();
        }
        if self.allow_multiple {
            def = def.allow_multiple();
        }
        def = def.allow_ligature(self.allow_ligature);
        if let Some(allowed) = &self.enum_values {
            def = def.enum_values(allowed.iter().cloned());
        }
        if let Some(index) = self.positional {
            def = def.positional(index);
        }
        for var in &self.env {
            def = def.env(var.as_str());
        }
        if let Some(desc) = &self.description {
            def = def.with_description(desc);
        }

        def.mandatory = self.mandatory_rule();
        def
    }

    fn mandatory_rule(&self) -> Option<Mandatory> {
        if self.mandatory {
            return Some(Mandatory::Always);
        }
        match (self.mandatory_if.clone(), self.mandatory_unless.clone()) {
            (None, None) => None,
            (when, unless) => Some(Mandatory::when(move |values| {
                when.as_ref().is_some_and(|c| c.holds(values))
                    || unless.as_ref().is_some_and(|c| !c.holds(values))
            })),
        }
    }
}

impl CommandSpec {
    /// Builds this command and its subtree under `config`.
    ///
    /// Each command is attached before its own subcommands are built, so a
    /// child inheriting from its direct parent also receives the flags that
    /// parent inherited.
    pub fn build(&self, config: &ParserConfig) -> Result<CommandNode> {
        let mut node = self.node(config)?;
        for child in &self.subcommands {
            child.build_under(&mut node, config)?;
        }
        Ok(node)
    }

    fn build_under(&self, parent: &mut CommandNode, config: &ParserConfig) -> Result<()> {
        let node = parent.attach(self.node(config)?);
        for child in &self.subcommands {
            child.build_under(node, config)?;
        }
        Ok(())
    }

    /// This command alone, with its local flags.
    fn node(&self, config: &ParserConfig) -> Result<CommandNode> {
        let mut node = CommandNode::new(self.name.as_str())
            .with_config(config.clone())
            .with_inherit(self.inherit);
        if let Some(desc) = &self.description {
            node = node.with_description(desc);
        }

        for flag in &self.flags {
            node.add_flag(flag.to_definition())
                .map_err(|source| ManifestError::Registry {
                    command: self.name.clone(),
                    source,
                })?;
        }
        Ok(node)
    }
}

impl Manifest {
    /// Validates the manifest and builds its command tree.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidManifest`](ManifestError::InvalidManifest) with every
    /// issue [`validate_manifest`] finds, or a
    /// [`Registry`](ManifestError::Registry) error if a command rejects a
    /// flag.
    ///
    /// # Examples
    ///
    /// ```
    /// use flagtree_engine::ParseOptions;
    /// use flagtree_manifest::Manifest;
    ///
    /// let manifest = Manifest::from_yaml_str(r#"
    /// command:
    ///   name: greet
    ///   flags:
    ///     - name: name
    ///       options: [-n, --name]
    ///       default: world
    /// "#).unwrap();
    ///
    /// let root = manifest.build().unwrap();
    /// let outcome = root.parse_blocking(&["-n", "rust"], &ParseOptions::default()).unwrap();
    /// assert_eq!(outcome.args["name"], "rust");
    /// ```
    pub fn build(&self) -> Result<CommandNode> {
        let issues = validate_manifest(self);
        if !issues.is_empty() {
            return Err(ManifestError::InvalidManifest(issues));
        }

        let config = ParserConfig::from(&self.settings);
        let root = self.command.build(&config)?;
        debug!(
            root = %root.name(),
            commands = root.summary().command_count(),
            "Built command tree from manifest"
        );
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use flagtree_core::{ErrorKind, RegistryPolicy};
    use flagtree_engine::{InheritMode, ParseOptions};
    use serde_json::json;

    use super::*;
    use crate::model::Condition;

    fn spec(name: &str) -> FlagSpec {
        FlagSpec {
            name: name.to_string(),
            options: vec![format!("--{name}")],
            flag_type: None,
            default_value: None,
            mandatory: false,
            mandatory_if: None,
            mandatory_unless: None,
            flag_only: false,
            allow_multiple: false,
            allow_ligature: true,
            enum_values: None,
            positional: None,
            env: Vec::new(),
            description: None,
        }
    }

    #[test]
    fn test_mandatory_rules_combine() {
        let mut batch = spec("batch");
        batch.mandatory_if = Some(Condition {
            flag: "mode".into(),
            equals: Some(json!("bulk")),
        });
        batch.mandatory_unless = Some(Condition {
            flag: "dry".into(),
            equals: None,
        });

        let Some(Mandatory::When(rule)) = batch.to_definition().mandatory else {
            panic!("expected a conditional rule");
        };
        let values = |v: serde_json::Value| v.as_object().cloned().unwrap();

        assert!(rule(&values(json!({ "mode": "bulk", "dry": true }))));
        assert!(rule(&values(json!({ "mode": "single" }))));
        assert!(!rule(&values(json!({ "mode": "single", "dry": true }))));
    }

    #[test]
    fn test_build_tree_with_inheritance() {
        let manifest = Manifest::from_yaml_str(
            r#"
command:
  name: app
  description: Demo
  flags:
    - name: verbose
      options: [-v]
      flag_only: true
  subcommands:
    - name: run
      inherit: direct-parent
      subcommands:
        - name: fast
          inherit: all-parents
"#,
        )
        .unwrap();

        let root = manifest.build().unwrap();
        assert_eq!(root.description(), Some("Demo"));
        let run = root.subcommand("run").unwrap();
        assert_eq!(run.inherit_mode(), InheritMode::DirectParent);
        assert!(run.has_flag("verbose"));
        assert!(run.subcommand("fast").unwrap().has_flag("verbose"));
    }

    #[test]
    fn test_direct_parent_chain_reaches_root_flags() {
        let manifest = Manifest::from_yaml_str(
            r#"
command:
  name: app
  flags:
    - name: mode
      options: [--mode]
  subcommands:
    - name: mid
      inherit: direct-parent
      subcommands:
        - name: leaf
          inherit: direct-parent
          flags:
            - name: batch
              options: [--batch]
              mandatory_unless: { flag: mode }
"#,
        )
        .unwrap();

        let root = manifest.build().unwrap();
        let leaf = root.subcommand("mid").unwrap().subcommand("leaf").unwrap();
        assert!(leaf.has_flag("mode"));

        let outcome = root
            .parse_blocking(&["mid", "leaf", "--mode", "fast"], &ParseOptions::default())
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.args["mode"], "fast");
    }

    #[test]
    fn test_invalid_manifest_reports_all_issues() {
        let manifest = Manifest::from_yaml_str(
            r#"
command:
  name: app
  subcommands:
    - name: a
    - name: a
    - name: ""
"#,
        )
        .unwrap();

        let err = manifest.build().unwrap_err();
        let ManifestError::InvalidManifest(issues) = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(issues.len(), 2);
        assert_eq!(
            err.to_string(),
            "invalid manifest: duplicate subcommand: app a; empty command name under 'app'"
        );
    }

    #[test]
    fn test_settings_reach_every_command() {
        let manifest = Manifest::from_yaml_str(
            r#"
settings:
  registry_policy: warn
  handle_errors: false
command:
  name: app
  subcommands:
    - name: run
      flags:
        - name: a
          options: [--a]
        - name: a
          options: [--b]
"#,
        )
        .unwrap();

        let root = manifest.build().unwrap();
        let run = root.subcommand("run").unwrap();
        assert_eq!(run.config().registry_policy, RegistryPolicy::Warn);
        assert_eq!(run.flags().len(), 1);

        let err = root
            .parse_blocking(&["run", "--b", "x"], &ParseOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCommand);
    }
}
