//! Declarative command trees for flagtree.
//!
//! A [`Manifest`] describes a command tree in YAML or JSON: commands,
//! subcommands, inheritance modes, flags and parser settings. Conditional
//! mandatory rules are expressed as [`Condition`]s over another flag's value
//! (`mandatory_if` / `mandatory_unless`). Handlers and custom coercers are code
//! and are attached to the built tree afterwards.
//!
//! # Quick start
//!
//! ```no_run
//! use flagtree_engine::{Handler, ParseOptions};
//! use flagtree_manifest::Manifest;
//!
//! let manifest = Manifest::load("flagtree.yaml").unwrap();
//! let mut root = manifest.build().unwrap();
//!
//! if let Some(deploy) = root.subcommand_mut("deploy") {
//!     deploy.set_handler(Handler::from_fn(|ctx| Ok(ctx.args.clone().into())));
//! }
//!
//! let args: Vec<String> = std::env::args().skip(1).collect();
//! let outcome = root.parse_blocking(&args, &ParseOptions::default()).unwrap();
//! std::process::exit(outcome.exit_code);
//! ```

mod build;
mod error;
mod model;
mod validate;

pub use error::{ManifestError, Result};
pub use model::{CommandSpec, Condition, FlagSpec, Manifest, Settings};
pub use validate::{ManifestIssue, validate_manifest};
