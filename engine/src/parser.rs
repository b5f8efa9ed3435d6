//! Flag parsing for a single command.
//!
//! Runs on the command picked by chain resolution, over the tokens left
//! after the subcommand names. The order of the stages matters:
//!
//! 1. defaults seed the value map
//! 2. tokens are matched against options (ligatures split first) and coerced
//! 3. unmatched bare tokens fill `positional` flags; any other leftover is an
//!    unknown command
//! 4. environment variables fill flags no token supplied
//! 5. enum checks
//! 6. mandatory rules, evaluated after every other assignment and reported
//!    together
//! 7. custom validators

use std::collections::{HashMap, HashSet};

use flagtree_core::{
    FlagRegistry, FlagValues, ParseError, ProcessedFlag, Value, Verdict, check_enum, coerce,
    display_value, parse_number,
};
use tracing::{debug, warn};

use crate::node::CommandNode;

/// Where environment fallbacks are read from.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The process environment (the default).
    #[default]
    Process,
    /// A fixed map, for tests and embedding.
    Map(HashMap<String, String>),
}

impl EnvSource {
    pub fn get(&self, key: &str) -> Option<String> {
        match self {
            Self::Process => std::env::var(key).ok(),
            Self::Map(map) => map.get(key).cloned(),
        }
    }
}

/// Whether a token should be read as an option rather than a value.
///
/// Negative numbers such as `-5` are values.
pub fn looks_like_option(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && parse_number(token).is_none()
}

/// Finds the flag a token refers to, splitting `--opt=value` when the flag
/// accepts ligatures.
fn match_option<'r>(
    registry: &'r FlagRegistry,
    token: &str,
) -> Option<(&'r ProcessedFlag, Option<String>)> {
    if let Some(flag) = registry.find_by_option(token) {
        return Some((flag, None));
    }
    let (option, value) = token.split_once('=')?;
    registry
        .find_by_option(option)
        .filter(|flag| flag.allow_ligature)
        .map(|flag| (flag, Some(value.to_string())))
}

/// Value map under construction, tracking which flags tokens have set.
struct Assignments {
    values: FlagValues,
    explicit: HashSet<String>,
}

impl Assignments {
    fn seeded(registry: &FlagRegistry) -> Self {
        let values = registry
            .all_flags()
            .iter()
            .filter_map(|flag| {
                flag.default_value
                    .clone()
                    .map(|value| (flag.name.clone(), value))
            })
            .collect();
        Self {
            values,
            explicit: HashSet::new(),
        }
    }

    /// Records a token-supplied value. The first explicit occurrence of a
    /// multi-value flag replaces its default; later ones append.
    fn assign(&mut self, flag: &ProcessedFlag, value: Value) {
        let first = self.explicit.insert(flag.name.clone());
        if !flag.allow_multiple {
            self.values.insert(flag.name.clone(), value);
            return;
        }
        match self.values.get_mut(&flag.name) {
            Some(Value::Array(items)) if !first => items.push(value),
            _ => {
                self.values
                    .insert(flag.name.clone(), Value::Array(vec![value]));
            }
        }
    }

    fn is_explicit(&self, name: &str) -> bool {
        self.explicit.contains(name)
    }
}

async fn coerce_for(flag: &ProcessedFlag, raw: &str) -> Result<Value, ParseError> {
    coerce(raw, &flag.flag_type)
        .await
        .map_err(|err| ParseError::TypeCoercionFailure {
            flag: flag.name.clone(),
            value: raw.to_string(),
            message: err.message,
        })
}

/// Parses `tokens` against `node`'s flags.
pub(crate) async fn parse_node(
    node: &CommandNode,
    tokens: &[String],
    chain: &[String],
    env: &EnvSource,
) -> Result<FlagValues, ParseError> {
    let registry = &node.registry;
    let mut state = Assignments::seeded(registry);
    let mut unmatched: Vec<&String> = Vec::new();

    let mut iter = tokens.iter().peekable();
    while let Some(token) = iter.next() {
        let Some((flag, inline)) = match_option(registry, token) else {
            unmatched.push(token);
            continue;
        };

        if flag.flag_only {
            let value = match inline {
                Some(raw) => coerce_for(flag, &raw).await?,
                None => Value::Bool(true),
            };
            state.assign(flag, value);
            continue;
        }

        let raw = match inline {
            Some(raw) => Some(raw),
            None => iter
                .next_if(|next| !looks_like_option(next))
                .map(String::clone),
        };

        match raw {
            Some(raw) => {
                let value = coerce_for(flag, &raw).await?;
                state.assign(flag, value);
            }
            None if flag.is_boolean() => state.assign(flag, Value::Bool(true)),
            None => {
                warn!(
                    command = %node.name,
                    flag = %flag.name,
                    next = ?iter.peek(),
                    "Flag expects a value but none was supplied"
                );
            }
        }
    }

    let leftovers = assign_positionals(registry, &mut state, unmatched).await?;
    if let Some(token) = leftovers.first() {
        return Err(ParseError::UnknownCommand {
            token: token.to_string(),
            chain: chain.to_vec(),
        });
    }

    apply_env(registry, &mut state, env).await?;

    for flag in registry.all_flags() {
        if let Some(value) = state.values.get(&flag.name) {
            check_enum(flag, value)?;
        }
    }

    check_mandatory(registry, &state.values)?;
    run_validators(registry, &state.values).await?;

    debug!(command = %node.name, values = ?state.values, "Parsed command flags");
    Ok(state.values)
}

/// Maps bare unmatched tokens onto positional flags by 1-based index and
/// returns the tokens nobody claimed.
async fn assign_positionals<'t>(
    registry: &FlagRegistry,
    state: &mut Assignments,
    unmatched: Vec<&'t String>,
) -> Result<Vec<&'t String>, ParseError> {
    let bare: Vec<usize> = unmatched
        .iter()
        .enumerate()
        .filter(|(_, token)| !looks_like_option(token))
        .map(|(i, _)| i)
        .collect();
    let mut claimed = HashSet::new();

    for flag in registry.all_flags() {
        let Some(index) = flag.positional else {
            continue;
        };
        if state.is_explicit(&flag.name) {
            continue;
        }
        let Some(&slot) = bare.get(index.saturating_sub(1)) else {
            continue;
        };
        let Some(raw) = unmatched.get(slot) else {
            continue;
        };
        let value = coerce_for(flag, raw).await?;
        state.assign(flag, value);
        claimed.insert(slot);
    }

    Ok(unmatched
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !claimed.contains(i))
        .map(|(_, token)| token)
        .collect())
}

/// Fills flags no token supplied from their environment variables. The first
/// variable that is set wins over the default.
async fn apply_env(
    registry: &FlagRegistry,
    state: &mut Assignments,
    env: &EnvSource,
) -> Result<(), ParseError> {
    for flag in registry.all_flags() {
        if state.is_explicit(&flag.name) {
            continue;
        }
        let Some((variable, raw)) = flag
            .env
            .iter()
            .find_map(|var| env.get(var).map(|raw| (var, raw)))
        else {
            continue;
        };
        let value = coerce_for(flag, &raw).await?;
        debug!(flag = %flag.name, variable = %variable, "Using environment fallback");
        let value = if flag.allow_multiple && !value.is_array() {
            Value::Array(vec![value])
        } else {
            value
        };
        state.values.insert(flag.name.clone(), value);
    }
    Ok(())
}

/// Collects every flag whose mandatory rule holds but has no value.
fn check_mandatory(registry: &FlagRegistry, values: &FlagValues) -> Result<(), ParseError> {
    let missing: Vec<String> = registry
        .all_flags()
        .iter()
        .filter(|flag| {
            flag.mandatory
                .as_ref()
                .is_some_and(|rule| rule.is_required(values))
        })
        .filter(|flag| values.get(&flag.name).is_none_or(Value::is_null))
        .map(|flag| flag.name.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ParseError::MissingMandatoryFlags { flags: missing })
    }
}

async fn run_validators(registry: &FlagRegistry, values: &FlagValues) -> Result<(), ParseError> {
    for flag in registry.all_flags() {
        let (Some(validator), Some(value)) = (&flag.validate, values.get(&flag.name)) else {
            continue;
        };
        let message = match validator.run(value.clone()).await {
            Verdict::Pass => continue,
            Verdict::Fail => format!("value '{}' was rejected", display_value(value)),
            Verdict::Reject(message) => message,
        };
        return Err(ParseError::ValidationFailure {
            flag: flag.name.clone(),
            message,
        });
    }
    Ok(())
}

/// Defaults and environment values of a command that does not parse tokens
/// itself (an ancestor of the handling command).
pub(crate) async fn ambient_values(
    node: &CommandNode,
    env: &EnvSource,
) -> Result<FlagValues, ParseError> {
    let mut state = Assignments::seeded(&node.registry);
    apply_env(&node.registry, &mut state, env).await?;
    Ok(state.values)
}
