//! Reserved system tokens.
//!
//! A small closed set of `--s-*` tokens carries engine-level signals. They
//! are removed from the token stream before chain resolution and surfaced in
//! [`SystemArgs`] instead of the parsed values.

use serde::{Deserialize, Serialize};

/// Raises the engine's parse trace from `debug` to `info`.
pub const DEBUG: &str = "--s-debug";
/// Logs the resolved command's summary.
pub const DEBUG_PRINT: &str = "--s-debug-print";
/// Opt-in signal for fuzzy command matching in external front ends.
pub const ENABLE_FUZZY: &str = "--s-enable-fuzzy";
/// Requests an env-file load; takes an optional path.
pub const WITH_ENV: &str = "--s-with-env";

/// Side channel populated from reserved tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemArgs {
    pub debug: bool,
    pub debug_print: bool,
    pub enable_fuzzy: bool,
    pub with_env: bool,
    /// Path given after `--s-with-env`, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,
}

impl SystemArgs {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Splits reserved tokens out of `tokens`.
///
/// `--s-with-env` takes the next token as its path unless that token starts
/// with `-`.
///
/// # Examples
///
/// ```
/// use flagtree_engine::strip_system_flags;
///
/// let tokens: Vec<String> = ["deploy", "--s-debug", "--s-with-env", ".env.prod", "--force"]
///     .into_iter()
///     .map(String::from)
///     .collect();
/// let (rest, system) = strip_system_flags(&tokens);
///
/// assert_eq!(rest, vec!["deploy", "--force"]);
/// assert!(system.debug);
/// assert_eq!(system.env_file.as_deref(), Some(".env.prod"));
/// ```
pub fn strip_system_flags(tokens: &[String]) -> (Vec<String>, SystemArgs) {
    let mut system = SystemArgs::default();
    let mut rest = Vec::with_capacity(tokens.len());
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        match token.as_str() {
            DEBUG => system.debug = true,
            DEBUG_PRINT => system.debug_print = true,
            ENABLE_FUZZY => system.enable_fuzzy = true,
            WITH_ENV => {
                system.with_env = true;
                if let Some(path) = iter.next_if(|next| !next.starts_with('-')) {
                    system.env_file = Some(path.clone());
                }
            }
            _ => rest.push(token.clone()),
        }
    }

    (rest, system)
}
