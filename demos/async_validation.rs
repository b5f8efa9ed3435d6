//! Asynchronous coercion, validation and handlers.
//!
//! A `deploy` command whose `--image` flag is checked against a (simulated)
//! registry lookup and whose `--replicas` flag goes through a custom async
//! conversion. The handler itself is async too.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p flagtree-demos --example async_validation
//! DEPLOY_REGION=us-east-1 cargo run -p flagtree-demos --example async_validation
//! ```

use std::time::Duration;

use flagtree_core::{FlagDefinition, FlagType, Validator, Value, Verdict};
use flagtree_engine::{CommandNode, Handler, ParseOptions};

const KNOWN_IMAGES: [&str; 2] = ["web:1.4", "worker:2.0"];

async fn image_exists(image: &str) -> bool {
    tokio::time::sleep(Duration::from_millis(20)).await;
    KNOWN_IMAGES.contains(&image)
}

fn deploy_command() -> anyhow::Result<CommandNode> {
    let node = CommandNode::new("deploy")
        .with_description("Roll out an image")
        .with_flags([
            FlagDefinition::new("image")
                .options(["-i", "--image"])
                .mandatory()
                .validate(Validator::new(|value: Value| async move {
                    let image = value.as_str().unwrap_or_default().to_string();
                    if image_exists(&image).await {
                        Verdict::Pass
                    } else {
                        Verdict::Reject(format!("image '{image}' not found in registry"))
                    }
                })),
            FlagDefinition::new("replicas")
                .option("--replicas")
                .of_type(FlagType::custom(|raw: String| async move {
                    match raw.as_str() {
                        "auto" => Ok(Value::from(3)),
                        other => other
                            .parse::<u32>()
                            .map(Value::from)
                            .map_err(|_| format!("expected a count or 'auto', got '{other}'")),
                    }
                }))
                .default_value(1),
            FlagDefinition::new("region")
                .option("--region")
                .env("DEPLOY_REGION")
                .enum_values(["eu-west-1", "us-east-1"])
                .default_value("eu-west-1"),
        ])?
        .with_handler(Handler::new(|ctx| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(serde_json::json!({
                "deployed": ctx.args["image"],
                "replicas": ctx.args["replicas"],
                "region": ctx.args["region"],
            }))
        }));
    Ok(node)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let deploy = deploy_command()?;
    let options = ParseOptions::default();

    for tokens in [
        vec!["--image", "web:1.4", "--replicas", "auto"],
        vec!["-i", "db:9.9"],
        vec!["-i", "worker:2.0", "--replicas", "many"],
        vec!["--replicas", "2"],
    ] {
        println!("$ deploy {}", tokens.join(" "));
        let outcome = deploy.parse(&tokens, &options).await?;
        match (&outcome.handler_result, &outcome.message) {
            (Some(result), _) => println!("ok: {result}"),
            (None, Some(message)) => println!("exit {}: {message}", outcome.exit_code),
            (None, None) => println!("exit {}", outcome.exit_code),
        }
    }
    Ok(())
}
