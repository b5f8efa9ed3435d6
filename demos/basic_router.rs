//! Command routing example.
//!
//! Builds a small `git`-like tree in code, with flag inheritance and
//! handlers, and runs a few argument vectors through it.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p flagtree-demos --example basic_router
//! cargo run -p flagtree-demos --example basic_router -- remote add origin https://example.com
//! ```

use flagtree_core::{FlagDefinition, PrimitiveType, Value};
use flagtree_engine::{CommandNode, Handler, InheritMode, ParseOptions};

fn build_tree() -> anyhow::Result<CommandNode> {
    let mut git = CommandNode::new("git")
        .with_description("A tiny git front end")
        .with_flags([
            FlagDefinition::new("verbose")
                .options(["-v", "--verbose"])
                .flag_only()
                .with_description("Print more output"),
            FlagDefinition::new("config")
                .options(["-c", "--config"])
                .allow_multiple()
                .with_description("Override a config value (key=value)"),
        ])?;

    let remote = git.attach(
        CommandNode::new("remote")
            .with_description("Manage remotes")
            .with_inherit(InheritMode::DirectParent),
    );

    remote.attach(
        CommandNode::new("add")
            .with_description("Add a remote")
            .with_inherit(InheritMode::AllParents)
            .with_flags([
                FlagDefinition::new("name").option("--name").positional(1).mandatory(),
                FlagDefinition::new("url").option("--url").positional(2).mandatory(),
                FlagDefinition::new("fetch")
                    .options(["-f", "--fetch"])
                    .of_type(PrimitiveType::Boolean)
                    .default_value(false),
            ])?
            .with_handler(Handler::from_fn(|ctx| {
                let name = ctx.get("name").and_then(Value::as_str).unwrap_or_default();
                let url = ctx.get("url").and_then(Value::as_str).unwrap_or_default();
                if ctx.get("verbose") == Some(&Value::Bool(true)) {
                    println!("adding remote {name} -> {url}");
                }
                Ok(Value::from(format!("remote '{name}' added")))
            })),
    );

    git.attach(
        CommandNode::new("log")
            .with_description("Show commit logs")
            .with_flag(
                FlagDefinition::new("limit")
                    .options(["-n", "--max-count"])
                    .of_type(PrimitiveType::Number)
                    .default_value(10),
            )?,
    );

    Ok(git)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let git = build_tree()?;
    let options = ParseOptions::default();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let runs: Vec<Vec<String>> = if argv.is_empty() {
        [
            vec!["remote", "add", "-v", "origin", "https://example.com/repo.git"],
            vec!["log", "-n", "3", "-c", "color.ui=auto"],
            vec!["remote", "add", "--fetch"],
            vec!["remote", "rename"],
            vec!["log", "--help"],
        ]
        .into_iter()
        .map(|run| run.into_iter().map(String::from).collect())
        .collect()
    } else {
        vec![argv]
    };

    for tokens in runs {
        println!("$ git {}", tokens.join(" "));
        let outcome = git.parse_blocking(&tokens, &options)?;
        if outcome.is_help() {
            print!("{}", outcome.message.unwrap_or_default());
        } else {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        println!();
    }
    Ok(())
}
