//! Manifest-driven command tree.
//!
//! Loads a YAML manifest, installs an extension that adds a `--json` flag to
//! every command, attaches a handler, and drives the tree both from a normal
//! argument vector and from structured values (as a tool adapter would).
//!
//! # Usage
//!
//! ```bash
//! cargo run -p flagtree-demos --example manifest_tree
//! ```

use std::sync::Arc;

use flagtree_core::{FlagDefinition, RegistryError, Value};
use flagtree_engine::{
    CommandNode, Extension, ExtensionRegistry, Handler, ParseOptions, to_tokens,
};
use flagtree_manifest::Manifest;

const MANIFEST: &str = r#"
version: "1.0"
settings:
  registry_policy: warn
command:
  name: pipeline
  description: Batch processing pipeline
  flags:
    - name: phase
      options: [-p, --phase]
      enum: [chunking, pairing, analysis]
      required: true
    - name: batch
      options: [--batch]
      type: number
      mandatory_unless: { flag: phase, equals: analysis }
      env: PIPELINE_BATCH
  subcommands:
    - name: report
      description: Summarize a finished phase
      inherit: all-parents
      flags:
        - name: format
          options: [--format]
          enum: [json, text]
          default: text
"#;

/// Adds `--json` to a command and all of its subcommands.
struct JsonOutput;

impl JsonOutput {
    fn install_tree(node: &mut CommandNode) -> Result<(), RegistryError> {
        node.add_flag(
            FlagDefinition::new("json")
                .option("--json")
                .flag_only()
                .with_description("Emit machine-readable output"),
        )?;
        let names: Vec<String> = node.subcommand_names().into_iter().map(String::from).collect();
        for name in names {
            if let Some(child) = node.subcommand_mut(&name) {
                Self::install_tree(child)?;
            }
        }
        Ok(())
    }
}

impl Extension for JsonOutput {
    fn name(&self) -> &str {
        "json-output"
    }

    fn install(&self, node: &mut CommandNode) -> Result<(), RegistryError> {
        Self::install_tree(node)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::temp_dir().join("flagtree_manifest_demo.yaml");
    std::fs::write(&path, MANIFEST)?;
    let mut root = Manifest::load(&path)?.build()?;

    let mut extensions = ExtensionRegistry::new();
    extensions.register(Arc::new(JsonOutput));
    root.install_extensions(&extensions)?;

    if let Some(report) = root.subcommand_mut("report") {
        report.set_handler(Handler::from_fn(|ctx| {
            let phase = ctx.get("phase").cloned().unwrap_or(Value::Null);
            Ok(serde_json::json!({ "report": phase, "format": ctx.args["format"] }))
        }));
    }

    let options = ParseOptions::default();

    println!("{}", serde_json::to_string_pretty(&root.summary())?);

    for tokens in [
        vec!["--phase", "chunking"],
        vec!["--phase", "chunking", "--batch", "50"],
        vec!["report", "-p", "analysis", "--json"],
    ] {
        let outcome = root.parse_blocking(&tokens, &options)?;
        println!("$ pipeline {} -> {}", tokens.join(" "), serde_json::to_string(&outcome)?);
    }

    // Structured call, e.g. from a tool-invocation adapter.
    let report = root
        .subcommand("report")
        .ok_or_else(|| anyhow::anyhow!("manifest has no report command"))?;
    let Value::Object(values) = serde_json::json!({ "phase": "pairing", "batch": 8, "format": "json" })
    else {
        anyhow::bail!("structured arguments must be an object");
    };
    let mut tokens = vec!["report".to_string()];
    tokens.extend(to_tokens(report.registry(), &values));

    let outcome = root.parse_blocking(&tokens, &options)?;
    println!("$ pipeline {} -> {}", tokens.join(" "), serde_json::to_string(&outcome)?);

    std::fs::remove_file(&path)?;
    Ok(())
}
