//! Command handlers and the context they receive.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use flagtree_core::{FlagValues, Value};
use futures::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};

use crate::system::SystemArgs;

/// Values resolved for one ancestor command along the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelArgs {
    pub command: String,
    pub args: FlagValues,
}

/// Everything a handler gets to see about the parse that selected it.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerContext {
    /// Values parsed for the handling command
    pub args: FlagValues,
    /// Ancestor values, root first
    pub parents: Vec<LevelArgs>,
    /// Matched subcommand names
    pub chain: Vec<String>,
    pub system: SystemArgs,
}

impl HandlerContext {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Values of the direct parent command, if any.
    pub fn parent_args(&self) -> Option<&FlagValues> {
        self.parents.last().map(|level| &level.args)
    }

    /// Name of the handling subcommand; `None` for the root.
    pub fn command(&self) -> Option<&str> {
        self.chain.last().map(String::as_str)
    }
}

type HandlerFn = dyn Fn(HandlerContext) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync;

/// Callback invoked once a command has been resolved and its flags parsed.
///
/// # Examples
///
/// ```
/// use flagtree_core::Value;
/// use flagtree_engine::Handler;
///
/// let greet = Handler::from_fn(|ctx| {
///     let name = ctx.get("name").and_then(Value::as_str).unwrap_or("world");
///     Ok(Value::from(format!("hello {name}")))
/// });
/// # let _ = greet;
/// ```
#[derive(Clone)]
pub struct Handler {
    func: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            func: Arc::new(
                move |ctx: HandlerContext| -> BoxFuture<'static, anyhow::Result<Value>> {
                    Box::pin(func(ctx))
                },
            ),
        }
    }

    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(HandlerContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(
                move |ctx: HandlerContext| -> BoxFuture<'static, anyhow::Result<Value>> {
                    Box::pin(future::ready(func(ctx)))
                },
            ),
        }
    }

    pub fn call(&self, ctx: HandlerContext) -> BoxFuture<'static, anyhow::Result<Value>> {
        (self.func)(ctx)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}
