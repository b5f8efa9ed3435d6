//! Top-level parse orchestration.
//!
//! [`CommandNode::parse`] drives one invocation through a fixed sequence:
//!
//! 1. strip reserved `--s-*` tokens into [`SystemArgs`]
//! 2. resolve the subcommand chain
//! 3. short-circuit to help when `-h`/`--help` is in the unresolved tail
//! 4. parse the final command's flags
//! 5. collect ancestor values (defaults and environment only)
//! 6. run the handler, if any
//! 7. package a [`ParseOutcome`]
//!
//! Any error before the handler returns ends the parse. Depending on
//! [`ParserConfig::handle_errors`] it is folded into an error outcome or
//! returned as `Err`; the message is the same either way.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use flagtree_core::{ErrorKind, FlagValues, ParseError, RegistryPolicy, Value};
use futures::executor;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chain::{Resolution, resolve_chain};
use crate::handler::{HandlerContext, LevelArgs};
use crate::help::{HelpRenderer, PlainHelp};
use crate::node::CommandNode;
use crate::parser::{EnvSource, ambient_values, parse_node};
use crate::system::{SystemArgs, strip_system_flags};

/// Implicit help options recognized on every command.
pub const HELP_OPTIONS: [&str; 2] = ["-h", "--help"];

/// Tree-wide parse settings, held by the root and copied to children on
/// attach.
#[derive(Clone)]
pub struct ParserConfig {
    /// What happens when a flag definition collides with an existing one
    pub registry_policy: RegistryPolicy,
    /// Fold parse errors into the outcome instead of returning `Err`
    pub handle_errors: bool,
    /// Answer `-h`/`--help` with a help outcome
    pub auto_help: bool,
    /// Strip reserved `--s-*` tokens before parsing
    pub system_flags: bool,
    pub help_renderer: Arc<dyn HelpRenderer>,
}

impl ParserConfig {
    pub fn with_help_renderer(mut self, renderer: Arc<dyn HelpRenderer>) -> Self {
        self.help_renderer = renderer;
        self
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            registry_policy: RegistryPolicy::Throw,
            handle_errors: true,
            auto_help: true,
            system_flags: true,
            help_renderer: Arc::new(PlainHelp),
        }
    }
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("registry_policy", &self.registry_policy)
            .field("handle_errors", &self.handle_errors)
            .field("auto_help", &self.auto_help)
            .field("system_flags", &self.system_flags)
            .finish_non_exhaustive()
    }
}

/// Per-call parse options.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub skip_help: bool,
    pub skip_handler: bool,
    pub env: EnvSource,
}

impl ParseOptions {
    pub fn skip_help(mut self) -> Self {
        self.skip_help = true;
        self
    }

    pub fn skip_handler(mut self) -> Self {
        self.skip_handler = true;
        self
    }

    pub fn with_env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    /// Reads environment fallbacks from `vars` instead of the process.
    pub fn with_env_vars<I, K, V>(self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.with_env(EnvSource::Map(map))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Success,
    Error,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
}

/// Uniform result of one parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub success: bool,
    pub exit_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub kind: OutcomeKind,
    /// Matched subcommand names
    pub chain: Vec<String>,
    /// Values of the handling command
    pub args: FlagValues,
    /// Ancestor values, root first
    #[serde(default)]
    pub parents: Vec<LevelArgs>,
    #[serde(default, skip_serializing_if = "SystemArgs::is_empty")]
    pub system: SystemArgs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl ParseOutcome {
    fn success(
        chain: Vec<String>,
        args: FlagValues,
        parents: Vec<LevelArgs>,
        system: SystemArgs,
        handler_result: Option<Value>,
    ) -> Self {
        Self {
            success: true,
            exit_code: 0,
            message: None,
            kind: OutcomeKind::Success,
            chain,
            args,
            parents,
            system,
            handler_result,
            error: None,
        }
    }

    fn help(text: String, chain: Vec<String>, system: SystemArgs) -> Self {
        Self {
            success: true,
            exit_code: 0,
            message: Some(text),
            kind: OutcomeKind::Help,
            chain,
            args: FlagValues::new(),
            parents: Vec::new(),
            system,
            handler_result: None,
            error: None,
        }
    }

    /// Error outcome carrying the same text as `err`'s `Display`.
    pub fn failure(err: &ParseError, chain: Vec<String>, system: SystemArgs) -> Self {
        let message = err.to_string();
        Self {
            success: false,
            exit_code: err.exit_code(),
            message: Some(message.clone()),
            kind: OutcomeKind::Error,
            chain,
            args: FlagValues::new(),
            parents: Vec::new(),
            system,
            handler_result: None,
            error: Some(ErrorDetail {
                kind: err.kind(),
                message,
            }),
        }
    }

    pub fn is_help(&self) -> bool {
        self.kind == OutcomeKind::Help
    }

    pub fn is_error(&self) -> bool {
        self.kind == OutcomeKind::Error
    }
}

/// Whether the unresolved tail asks for help on `target`.
fn wants_help(target: &CommandNode, tail: &[String]) -> bool {
    tail.iter().any(|token| {
        HELP_OPTIONS.contains(&token.as_str()) && target.registry.find_by_option(token).is_none()
    })
}

impl CommandNode {
    /// Parses `tokens` (the argument vector without the program name).
    ///
    /// The configuration of the node `parse` is called on governs the whole
    /// parse.
    ///
    /// # Errors
    ///
    /// Only when [`ParserConfig::handle_errors`] is `false`; otherwise
    /// failures come back as an [`OutcomeKind::Error`] outcome.
    ///
    /// # Examples
    ///
    /// ```
    /// use flagtree_core::FlagDefinition;
    /// use flagtree_engine::{CommandNode, ParseOptions};
    ///
    /// let app = CommandNode::new("app")
    ///     .with_flag(FlagDefinition::new("name").option("--name").mandatory())
    ///     .unwrap();
    ///
    /// let outcome = app.parse_blocking(&["--name", "demo"], &ParseOptions::default()).unwrap();
    /// assert!(outcome.success);
    /// assert_eq!(outcome.args["name"], "demo");
    ///
    /// let outcome = app.parse_blocking::<&str>(&[], &ParseOptions::default()).unwrap();
    /// assert_eq!(outcome.exit_code, 1);
    /// assert_eq!(outcome.message.as_deref(), Some("missing mandatory flags: name"));
    /// ```
    pub async fn parse<S>(
        &self,
        tokens: &[S],
        options: &ParseOptions,
    ) -> Result<ParseOutcome, ParseError>
    where
        S: AsRef<str> + Sync,
    {
        let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        let (tokens, system) = if self.config.system_flags {
            strip_system_flags(&tokens)
        } else {
            (tokens, SystemArgs::default())
        };

        let resolution = resolve_chain(self, &tokens);
        if system.debug {
            info!(
                chain = ?resolution.chain,
                tokens = ?resolution.remaining(&tokens),
                "Resolved command"
            );
        }

        match self.execute(&resolution, &tokens, &system, options).await {
            Ok(outcome) => Ok(outcome),
            Err(err) if self.config.handle_errors => {
                debug!(error = %err, kind = ?err.kind(), "Parse failed");
                Ok(ParseOutcome::failure(&err, resolution.chain, system))
            }
            Err(err) => Err(err),
        }
    }

    /// Blocking form of [`parse`](Self::parse) for synchronous callers.
    pub fn parse_blocking<S>(
        &self,
        tokens: &[S],
        options: &ParseOptions,
    ) -> Result<ParseOutcome, ParseError>
    where
        S: AsRef<str> + Sync,
    {
        executor::block_on(self.parse(tokens, options))
    }

    async fn execute(
        &self,
        resolution: &Resolution<'_>,
        tokens: &[String],
        system: &SystemArgs,
        options: &ParseOptions,
    ) -> Result<ParseOutcome, ParseError> {
        let target = resolution.target();
        let tail = resolution.remaining(tokens);

        if self.config.auto_help && !options.skip_help && wants_help(target, tail) {
            debug!(command = %target.name, "Help requested");
            let text = self.config.help_renderer.render(&target.summary());
            return Ok(ParseOutcome::help(
                text,
                resolution.chain.clone(),
                system.clone(),
            ));
        }

        if system.debug_print {
            match serde_json::to_string_pretty(&target.summary()) {
                Ok(json) => info!(command = %target.name, summary = %json, "Command summary"),
                Err(err) => warn!(error = %err, "Failed to serialize command summary"),
            }
        }

        let args = parse_node(target, tail, &resolution.chain, &options.env).await?;

        let mut parents = Vec::with_capacity(resolution.ancestors().len());
        for ancestor in resolution.ancestors() {
            parents.push(LevelArgs {
                command: ancestor.name.clone(),
                args: ambient_values(ancestor, &options.env).await?,
            });
        }

        if system.debug {
            info!(command = %target.name, args = ?args, "Parsed values");
        }

        let handler = target.handler.as_ref().filter(|_| !options.skip_handler);
        let handler_result = match handler {
            Some(handler) => {
                let ctx = HandlerContext {
                    args: args.clone(),
                    parents: parents.clone(),
                    chain: resolution.chain.clone(),
                    system: system.clone(),
                };
                let result =
                    handler
                        .call(ctx)
                        .await
                        .map_err(|err| ParseError::HandlerExecutionFailure {
                            command: target.path().join(" "),
                            message: format!("{err:#}"),
                        })?;
                Some(result)
            }
            None => None,
        };

        Ok(ParseOutcome::success(
            resolution.chain.clone(),
            args,
            parents,
            system.clone(),
            handler_result,
        ))
    }
}

#[cfg(test)]
mod tests {
    use flagtree_core::FlagDefinition;
    use serde_json::json;

    use super::*;
    use crate::handler::Handler;

    fn app() -> CommandNode {
        let mut root = CommandNode::new("app")
            .with_flag(
                FlagDefinition::new("profile")
                    .option("--profile")
                    .default_value("dev"),
            )
            .unwrap();
        root.attach(
            CommandNode::new("run")
                .with_flag(FlagDefinition::new("script").option("--script").mandatory())
                .unwrap()
                .with_handler(Handler::from_fn(|ctx| {
                    Ok(ctx.get("script").cloned().unwrap_or(Value::Null))
                })),
        );
        root
    }

    #[test]
    fn test_help_short_circuits_validation() {
        let outcome = app()
            .parse_blocking(&["run", "--help"], &ParseOptions::default())
            .unwrap();
        assert!(outcome.is_help());
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.chain, vec!["run"]);
        assert!(outcome.message.unwrap().starts_with("Usage: app run"));
    }

    #[test]
    fn test_skip_help_parses_normally() {
        let outcome = app()
            .parse_blocking(&["run", "-h"], &ParseOptions::default().skip_help())
            .unwrap();
        assert!(outcome.is_error());
        assert_eq!(
            outcome.error.unwrap().kind,
            ErrorKind::UnknownCommand
        );
    }

    #[test]
    fn test_help_option_owned_by_command() {
        let root = CommandNode::new("du")
            .with_flag(FlagDefinition::new("human").option("-h").flag_only())
            .unwrap();
        let outcome = root
            .parse_blocking(&["-h"], &ParseOptions::default())
            .unwrap();
        assert!(!outcome.is_help());
        assert_eq!(outcome.args["human"], json!(true));
    }

    #[test]
    fn test_handler_result_and_parents() {
        let outcome = app()
            .parse_blocking(&["run", "--script", "build.sh"], &ParseOptions::default())
            .unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Success);
        assert_eq!(outcome.handler_result, Some(json!("build.sh")));
        assert_eq!(outcome.parents.len(), 1);
        assert_eq!(outcome.parents[0].command, "app");
        assert_eq!(outcome.parents[0].args["profile"], json!("dev"));
    }

    #[test]
    fn test_skip_handler() {
        let outcome = app()
            .parse_blocking(
                &["run", "--script", "x"],
                &ParseOptions::default().skip_handler(),
            )
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.handler_result, None);
    }

    #[test]
    fn test_system_flags_are_stripped() {
        let outcome = app()
            .parse_blocking(
                &["run", "--s-debug", "--script", "x", "--s-with-env", "prod.env"],
                &ParseOptions::default(),
            )
            .unwrap();
        assert!(outcome.success);
        assert!(outcome.system.debug);
        assert_eq!(outcome.system.env_file.as_deref(), Some("prod.env"));
        assert!(!outcome.args.contains_key("s-debug"));
    }

    #[test]
    fn test_system_flags_disabled() {
        let root = CommandNode::new("app").with_config(ParserConfig {
            system_flags: false,
            ..ParserConfig::default()
        });
        let outcome = root
            .parse_blocking(&["--s-debug"], &ParseOptions::default())
            .unwrap();
        assert!(outcome.is_error());
    }

    #[test]
    fn test_throw_mode_returns_err_with_same_message() {
        let lenient = app();
        let mut strict = CommandNode::new("app").with_config(ParserConfig {
            handle_errors: false,
            ..ParserConfig::default()
        });
        strict
            .add_flag(FlagDefinition::new("profile").option("--profile").default_value("dev"))
            .unwrap();
        strict.attach(
            CommandNode::new("run")
                .with_flag(FlagDefinition::new("script").option("--script").mandatory())
                .unwrap(),
        );

        let folded = lenient
            .parse_blocking(&["run"], &ParseOptions::default())
            .unwrap();
        let err = strict
            .parse_blocking(&["run"], &ParseOptions::default())
            .unwrap_err();

        let detail = folded.error.unwrap();
        assert_eq!(detail.kind, err.kind());
        assert_eq!(detail.message, err.to_string());
    }

    #[test]
    fn test_outcome_serialization_omits_empty_parts() {
        let outcome = app()
            .parse_blocking(&["--profile", "prod"], &ParseOptions::default())
            .unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "exit_code": 0,
                "kind": "success",
                "chain": [],
                "args": { "profile": "prod" },
                "parents": [],
            })
        );
    }
}
