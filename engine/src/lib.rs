//! Command trees and the parse pipeline for flagtree.
//!
//! A [`CommandNode`] owns a flag registry (see `flagtree-core`), an ordered
//! list of child commands and an optional [`Handler`]. Parsing a token
//! sequence against the root:
//!
//! 1. strips reserved `--s-*` tokens into [`SystemArgs`]
//! 2. follows exact subcommand names down the tree ([`resolve_chain`])
//! 3. parses the remaining tokens against the final command's flags only
//! 4. hands the values to the handler and returns a [`ParseOutcome`]
//!
//! Flags reach a child through [`InheritMode`] when it is attached:
//! `DirectParent` copies a snapshot of the parent's flags, `AllParents`
//! copies from every ancestor and is refreshed whenever the subtree is
//! attached again.
//!
//! # Example
//!
//! ```
//! use flagtree_core::{FlagDefinition, PrimitiveType, Value};
//! use flagtree_engine::{CommandNode, Handler, InheritMode, ParseOptions};
//!
//! let mut app = CommandNode::new("app")
//!     .with_flag(FlagDefinition::new("verbose").options(["-v", "--verbose"]).flag_only())
//!     .unwrap();
//!
//! app.attach(
//!     CommandNode::new("serve")
//!         .with_inherit(InheritMode::DirectParent)
//!         .with_flag(
//!             FlagDefinition::new("port")
//!                 .options(["-p", "--port"])
//!                 .of_type(PrimitiveType::Number)
//!                 .default_value(8080),
//!         )
//!         .unwrap()
//!         .with_handler(Handler::from_fn(|ctx| {
//!             Ok(Value::from(format!("listening on {}", ctx.args["port"])))
//!         })),
//! );
//!
//! let outcome = app
//!     .parse_blocking(&["serve", "-v", "--port=9000"], &ParseOptions::default())
//!     .unwrap();
//!
//! assert_eq!(outcome.chain, vec!["serve"]);
//! assert_eq!(outcome.args["verbose"], true);
//! assert_eq!(outcome.handler_result, Some(Value::from("listening on 9000")));
//! ```

mod chain;
mod exec;
mod extension;
mod handler;
mod help;
mod inherit;
mod node;
mod parser;
mod summary;
mod system;
mod tokens;

pub use chain::{Resolution, resolve_chain};
pub use exec::{ErrorDetail, HELP_OPTIONS, OutcomeKind, ParseOptions, ParseOutcome, ParserConfig};
pub use extension::{Extension, ExtensionRegistry};
pub use handler::{Handler, HandlerContext, LevelArgs};
pub use help::{HelpRenderer, PlainHelp};
pub use inherit::InheritMode;
pub use node::{CommandNode, ParentLink};
pub use parser::{EnvSource, looks_like_option};
pub use summary::{CommandSummary, FlagSummary, Requirement};
pub use system::{SystemArgs, strip_system_flags};
pub use tokens::to_tokens;

/// Reserved system token names.
pub mod system_flags {
    pub use crate::system::{DEBUG, DEBUG_PRINT, ENABLE_FUZZY, WITH_ENV};
}
