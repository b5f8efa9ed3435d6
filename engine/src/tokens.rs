//! Rebuilding a token sequence from structured values.
//!
//! Adapters that receive named values (a tool call, a form, a config file)
//! use [`to_tokens`] to drive [`CommandNode::parse`](crate::CommandNode::parse)
//! exactly as a command line would.

use flagtree_core::{
    FlagRegistry, FlagType, FlagValues, PrimitiveType, ProcessedFlag, Value, display_value,
};
use tracing::debug;

/// Renders a single value the way the coercion step reads it back.
fn raw_value(flag: &ProcessedFlag, value: &Value) -> String {
    match (value, &flag.flag_type) {
        (Value::Array(items), FlagType::Primitive(PrimitiveType::Array))
            if items.iter().all(|v| v.as_str().is_some_and(|s| !s.contains(','))) =>
        {
            items.iter().map(display_value).collect::<Vec<_>>().join(",")
        }
        _ => display_value(value),
    }
}

fn push_option(tokens: &mut Vec<String>, flag: &ProcessedFlag, raw: String) {
    let option = flag.long_option();
    if flag.allow_ligature {
        tokens.push(format!("{option}={raw}"));
    } else {
        tokens.push(option.to_string());
        tokens.push(raw);
    }
}

/// Converts named values into option tokens, in registry order.
///
/// Unknown names and `null` values are skipped. Flag-only flags are emitted
/// bare when `true` and omitted otherwise; values of multi-value flags are
/// emitted once per element.
///
/// # Examples
///
/// ```
/// use flagtree_core::{FlagDefinition, FlagRegistry, FlagValues, Value};
/// use flagtree_engine::to_tokens;
///
/// let mut registry = FlagRegistry::new();
/// registry.add_flag(FlagDefinition::new("tag").options(["-t", "--tag"]).allow_multiple()).unwrap();
/// registry.add_flag(FlagDefinition::new("force").option("--force").flag_only()).unwrap();
///
/// let mut values = FlagValues::new();
/// values.insert("tag".into(), Value::from(vec!["a", "b"]));
/// values.insert("force".into(), Value::Bool(true));
///
/// assert_eq!(to_tokens(&registry, &values), vec!["--tag=a", "--tag=b", "--force"]);
/// ```
pub fn to_tokens(registry: &FlagRegistry, values: &FlagValues) -> Vec<String> {
    let mut tokens = Vec::new();

    for name in values.keys().filter(|name| !registry.has_flag(name)) {
        debug!(flag = %name, "Skipping value for unknown flag");
    }

    for flag in registry.all_flags() {
        let Some(value) = values.get(&flag.name).filter(|v| !v.is_null()) else {
            continue;
        };

        if flag.flag_only {
            if value.as_bool().unwrap_or(false) {
                tokens.push(flag.long_option().to_string());
            }
            continue;
        }

        match value {
            Value::Array(items) if flag.allow_multiple => {
                for item in items {
                    push_option(&mut tokens, flag, raw_value(flag, item));
                }
            }
            other => push_option(&mut tokens, flag, raw_value(flag, other)),
        }
    }

    tokens
}
