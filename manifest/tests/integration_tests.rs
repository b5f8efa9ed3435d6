use std::fs;
use std::path::{Path, PathBuf};

use flagtree_core::ErrorKind;
use flagtree_engine::{Handler, OutcomeKind, ParseOptions};
use flagtree_manifest::{Manifest, ManifestError};
use serde_json::json;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PIPELINE_YAML: &str = r#"
version: "1.0"
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
      inherit: all-parents
      flags:
        - name: format
          options: [--format]
          enum: [json, text]
          default: text
"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write manifest");
    path
}

fn no_env() -> ParseOptions {
    ParseOptions::default().with_env_vars(Vec::<(String, String)>::new())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn test_load_yaml_and_json_agree() {
    let dir = TempDir::new().unwrap();
    let yaml_path = write(dir.path(), "pipeline.yml", PIPELINE_YAML);
    let from_yaml = Manifest::load(&yaml_path).unwrap();

    let json_path = write(dir.path(), "pipeline.json", &from_yaml.to_json_string().unwrap());
    let from_json = Manifest::load(&json_path).unwrap();

    assert_eq!(from_yaml, from_json);
    assert_eq!(from_yaml.command.subcommands[0].name, "report");
}

#[test]
fn test_load_rejects_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "pipeline.toml", "command = {}");
    let err = Manifest::load(&path).unwrap_err();
    assert!(matches!(err, ManifestError::UnsupportedFormat(_)));
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = Manifest::load(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ManifestError::IoError(_)));
}

#[test]
fn test_load_malformed_yaml() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "bad.yaml", "command: [unclosed");
    let err = Manifest::load(&path).unwrap_err();
    assert!(matches!(err, ManifestError::YamlError(_)));
}

// ---------------------------------------------------------------------------
// Building and parsing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_manifest_phase_batch_scenario() {
    let root = Manifest::from_yaml_str(PIPELINE_YAML).unwrap().build().unwrap();

    let outcome = root.parse(&["--phase", "chunking"], &no_env()).await.unwrap();
    let error = outcome.error.unwrap();
    assert_eq!(error.kind, ErrorKind::MissingMandatoryFlags);
    assert_eq!(error.message, "missing mandatory flags: batch");

    let outcome = root.parse(&["-p", "analysis"], &no_env()).await.unwrap();
    assert!(outcome.success);
    assert!(!outcome.args.contains_key("batch"));

    let env = ParseOptions::default().with_env_vars([("PIPELINE_BATCH", "25")]);
    let outcome = root.parse(&["--phase", "pairing"], &env).await.unwrap();
    assert_eq!(outcome.args["batch"], json!(25));
}

#[tokio::test]
async fn test_inherited_rules_apply_on_subcommand() {
    let root = Manifest::from_yaml_str(PIPELINE_YAML).unwrap().build().unwrap();

    let outcome = root
        .parse(&["report", "--phase", "analysis"], &no_env())
        .await
        .unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.chain, vec!["report"]);
    assert_eq!(outcome.args["format"], json!("text"));
    assert_eq!(outcome.args["phase"], json!("analysis"));
}

#[tokio::test]
async fn test_handler_attached_after_build() {
    let mut root = Manifest::from_yaml_str(PIPELINE_YAML).unwrap().build().unwrap();
    root.subcommand_mut("report")
        .unwrap()
        .set_handler(Handler::from_fn(|ctx| {
            Ok(json!(format!("report as {}", ctx.args["format"].as_str().unwrap_or("?"))))
        }));

    let outcome = root
        .parse(&["report", "-p", "analysis", "--format", "json"], &no_env())
        .await
        .unwrap();
    assert_eq!(outcome.handler_result, Some(json!("report as json")));
}

#[tokio::test]
async fn test_help_from_manifest_tree() {
    let root = Manifest::from_yaml_str(PIPELINE_YAML).unwrap().build().unwrap();
    let outcome = root.parse(&["-h"], &no_env()).await.unwrap();
    assert_eq!(outcome.kind, OutcomeKind::Help);
    let text = outcome.message.unwrap();
    assert!(text.contains("Batch processing pipeline"));
    assert!(text.contains("-p, --phase <string>"));
}

// ---------------------------------------------------------------------------
// Condition visibility
// ---------------------------------------------------------------------------

const NESTED_YAML: &str = r#"
command:
  name: app
  flags:
    - name: mode
      options: [--mode]
  subcommands:
    - name: mid
      inherit: MID_MODE
      subcommands:
        - name: leaf
          inherit: direct-parent
          flags:
            - name: batch
              options: [--batch]
              mandatory_unless: { flag: mode }
"#;

#[test]
fn test_condition_on_unreachable_grandparent_flag_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "nested.yaml", &NESTED_YAML.replace("MID_MODE", "none"));

    let err = Manifest::load(&path).unwrap().build().unwrap_err();
    let ManifestError::InvalidManifest(issues) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(issues.len(), 1);
    assert_eq!(
        err.to_string(),
        "invalid manifest: command 'app mid leaf': flag 'batch' depends on unknown flag 'mode'"
    );
}

#[tokio::test]
async fn test_condition_on_grandparent_flag_through_direct_parents() {
    let manifest =
        Manifest::from_yaml_str(&NESTED_YAML.replace("MID_MODE", "direct-parent")).unwrap();
    let root = manifest.build().unwrap();

    let outcome = root
        .parse(&["mid", "leaf", "--mode", "fast"], &no_env())
        .await
        .unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.chain, vec!["mid", "leaf"]);

    let outcome = root.parse(&["mid", "leaf"], &no_env()).await.unwrap();
    assert_eq!(outcome.error.unwrap().message, "missing mandatory flags: batch");
}
