//! Flag type definitions.
//!
//! A flag enters the system as a [`FlagDefinition`] (the builder users write)
//! and is stored as a [`ProcessedFlag`], its canonical form with the type
//! normalized and defaults resolved. Values travel as [`serde_json::Value`]
//! so parse results serialize deterministically.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};

pub use serde_json::Value;

/// Flag name → coerced value map produced by one parse.
///
/// Keys are kept sorted, so two identical parses serialize identically.
pub type FlagValues = serde_json::Map<String, Value>;

/// Built-in value types.
///
/// # Examples
///
/// ```
/// use flagtree_core::PrimitiveType;
///
/// assert_eq!(PrimitiveType::default(), PrimitiveType::String);
/// assert_eq!(PrimitiveType::Number.as_str(), "number");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// Identity conversion (the default).
    #[default]
    String,
    /// Strict integer or finite float.
    Number,
    /// `true|yes|1` (case-insensitive) is true, everything else false.
    Boolean,
    /// JSON array literal or comma-separated list.
    Array,
    /// JSON object literal.
    Object,
}

impl PrimitiveType {
    /// Returns the lowercase tag used in manifests and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type CoerceFn = dyn Fn(String) -> BoxFuture<'static, Result<Value, String>> + Send + Sync;

/// User-supplied conversion from a raw token to a value. May suspend.
#[derive(Clone)]
pub struct CustomCoercer {
    func: Arc<CoerceFn>,
}

impl CustomCoercer {
    /// Wraps an async conversion function.
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |raw: String| -> BoxFuture<'static, Result<Value, String>> {
                Box::pin(func(raw))
            }),
        }
    }

    /// Wraps a synchronous conversion function.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(move |raw: String| -> BoxFuture<'static, Result<Value, String>> {
                Box::pin(future::ready(func(&raw)))
            }),
        }
    }

    /// Starts the conversion of `raw`.
    pub fn call(&self, raw: String) -> BoxFuture<'static, Result<Value, String>> {
        (self.func)(raw)
    }
}

impl fmt::Debug for CustomCoercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomCoercer(..)")
    }
}

type SchemaFn = dyn Fn(&Value) -> Result<Value, String> + Send + Sync;

/// Structured validator applied to the token parsed as JSON.
///
/// Returns the (possibly transformed) value or a message describing why the
/// input does not fit the schema.
#[derive(Clone)]
pub struct SchemaValidator {
    func: Arc<SchemaFn>,
}

impl SchemaValidator {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    pub fn check(&self, value: &Value) -> Result<Value, String> {
        (self.func)(value)
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SchemaValidator(..)")
    }
}

/// How a flag's raw token becomes a value.
///
/// # Examples
///
/// ```
/// use flagtree_core::{FlagType, PrimitiveType, Value};
///
/// let number: FlagType = PrimitiveType::Number.into();
/// assert!(matches!(number, FlagType::Primitive(PrimitiveType::Number)));
///
/// let upper = FlagType::custom_fn(|raw| Ok(Value::String(raw.to_uppercase())));
/// assert_eq!(upper.label(), "custom");
/// ```
#[derive(Debug, Clone)]
pub enum FlagType {
    Primitive(PrimitiveType),
    Custom(CustomCoercer),
    Schema(SchemaValidator),
}

impl FlagType {
    /// Async custom conversion.
    pub fn custom<F, Fut>(func: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        Self::Custom(CustomCoercer::new(func))
    }

    /// Synchronous custom conversion.
    pub fn custom_fn<F>(func: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::Custom(CustomCoercer::from_fn(func))
    }

    pub fn schema<F>(func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::Schema(SchemaValidator::new(func))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Primitive(PrimitiveType::Boolean))
    }

    /// Short tag for summaries: the primitive name, `custom` or `schema`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Primitive(p) => p.as_str(),
            Self::Custom(_) => "custom",
            Self::Schema(_) => "schema",
        }
    }
}

impl Default for FlagType {
    fn default() -> Self {
        Self::Primitive(PrimitiveType::String)
    }
}

impl From<PrimitiveType> for FlagType {
    fn from(value: PrimitiveType) -> Self {
        Self::Primitive(value)
    }
}

type PredicateFn = dyn Fn(&FlagValues) -> bool + Send + Sync;

/// Mandatory rule of a flag.
///
/// Predicates see the values parsed so far on the same command and must not
/// block; they are evaluated once per parse after every non-mandatory
/// assignment is done.
#[derive(Clone)]
pub enum Mandatory {
    Always,
    When(Arc<PredicateFn>),
}

impl Mandatory {
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&FlagValues) -> bool + Send + Sync + 'static,
    {
        Self::When(Arc::new(predicate))
    }

    /// Whether the flag is required given the current values.
    pub fn is_required(&self, values: &FlagValues) -> bool {
        match self {
            Self::Always => true,
            Self::When(predicate) => predicate(values),
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::When(_))
    }
}

impl fmt::Debug for Mandatory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::When(_) => f.write_str("When(..)"),
        }
    }
}

/// Result of a custom validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    /// Failure with a user-facing explanation.
    Reject(String),
}

impl From<bool> for Verdict {
    fn from(passed: bool) -> Self {
        if passed { Self::Pass } else { Self::Fail }
    }
}

type ValidateFn = dyn Fn(Value) -> BoxFuture<'static, Verdict> + Send + Sync;

/// Custom per-flag validation, run after every other check. May suspend.
#[derive(Clone)]
pub struct Validator {
    func: Arc<ValidateFn>,
}

impl Validator {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Verdict> + Send + 'static,
    {
        Self {
            func: Arc::new(move |value: Value| -> BoxFuture<'static, Verdict> {
                Box::pin(func(value))
            }),
        }
    }

    /// Synchronous validator returning anything convertible to a [`Verdict`].
    pub fn from_fn<F, V>(func: F) -> Self
    where
        F: Fn(&Value) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        Self {
            func: Arc::new(move |value: Value| -> BoxFuture<'static, Verdict> {
                Box::pin(future::ready(func(&value).into()))
            }),
        }
    }

    pub fn run(&self, value: Value) -> BoxFuture<'static, Verdict> {
        (self.func)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

/// A flag as declared by the user.
///
/// Build one with [`FlagDefinition::new`] and the chained setters; the
/// registry turns it into a [`ProcessedFlag`].
///
/// # Examples
///
/// ```
/// use flagtree_core::{FlagDefinition, PrimitiveType};
///
/// let port = FlagDefinition::new("port")
///     .option("-p")
///     .option("--port")
///     .of_type(PrimitiveType::Number)
///     .default_value(8080)
///     .with_description("Port to listen on");
///
/// assert_eq!(port.options, vec!["-p", "--port"]);
/// assert!(port.allow_ligature);
/// ```
#[derive(Debug, Clone)]
pub struct FlagDefinition {
    /// Unique key within one registry
    pub name: String,
    /// Accepted option strings, e.g. `-p` and `--port`
    pub options: Vec<String>,
    /// Declared type; `None` means string (or boolean for flag-only flags)
    pub flag_type: Option<FlagType>,
    pub default_value: Option<Value>,
    pub mandatory: Option<Mandatory>,
    /// Presence-only; never consumes the following token
    pub flag_only: bool,
    /// Repeated occurrences accumulate into an array
    pub allow_multiple: bool,
    /// Accept `--opt=value` in addition to `--opt value`
    pub allow_ligature: bool,
    pub enum_values: Option<Vec<Value>>,
    pub validate: Option<Validator>,
    /// 1-based index of a trailing bare argument captured by this flag
    pub positional: Option<usize>,
    /// Environment variables consulted when no token supplies a value
    pub env: Vec<String>,
    pub description: Option<String>,
}

impl FlagDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
            flag_type: None,
            default_value: None,
            mandatory: None,
            flag_only: false,
            allow_multiple: false,
            allow_ligature: true,
            enum_values: None,
            validate: None,
            positional: None,
            env: Vec::new(),
            description: None,
        }
    }

    /// Adds one accepted option string.
    pub fn option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    pub fn of_type(mut self, flag_type: impl Into<FlagType>) -> Self {
        self.flag_type = Some(flag_type.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Alias of [`default_value`](Self::default_value).
    pub fn default(self, value: impl Into<Value>) -> Self {
        self.default_value(value)
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = Some(Mandatory::Always);
        self
    }

    /// Alias of [`mandatory`](Self::mandatory).
    pub fn required(self) -> Self {
        self.mandatory()
    }

    /// Mandatory only when `predicate` holds for the values parsed so far.
    pub fn mandatory_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&FlagValues) -> bool + Send + Sync + 'static,
    {
        self.mandatory = Some(Mandatory::when(predicate));
        self
    }

    pub fn flag_only(mut self) -> Self {
        self.flag_only = true;
        self
    }

    pub fn allow_multiple(mut self) -> Self {
        self.allow_multiple = true;
        self
    }

    pub fn allow_ligature(mut self, allow: bool) -> Self {
        self.allow_ligature = allow;
        self
    }

    pub fn enum_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    pub fn positional(mut self, index: usize) -> Self {
        self.positional = Some(index);
        self
    }

    pub fn env(mut self, variable: impl Into<String>) -> Self {
        self.env.push(variable.into());
        self
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }
}

/// Canonical form of a flag, as stored in a registry.
#[derive(Debug, Clone)]
pub struct ProcessedFlag {
    pub name: String,
    pub options: Vec<String>,
    pub flag_type: FlagType,
    /// Already wrapped in an array for `allow_multiple` flags
    pub default_value: Option<Value>,
    pub mandatory: Option<Mandatory>,
    pub flag_only: bool,
    pub allow_multiple: bool,
    pub allow_ligature: bool,
    /// Empty when any value is accepted
    pub enum_values: Vec<Value>,
    pub validate: Option<Validator>,
    pub positional: Option<usize>,
    pub env: Vec<String>,
    pub description: Option<String>,
    /// Copied from an ancestor command rather than declared locally
    pub inherited: bool,
}

impl ProcessedFlag {
    /// Normalizes a definition. Structural checks live in
    /// [`validate_definition`](crate::validate_definition).
    ///
    /// # Examples
    ///
    /// ```
    /// use flagtree_core::{FlagDefinition, ProcessedFlag, Value};
    ///
    /// let tags = ProcessedFlag::from_definition(
    ///     FlagDefinition::new("tag").option("--tag").allow_multiple().default_value("latest"),
    /// );
    /// assert_eq!(tags.default_value, Some(Value::Array(vec!["latest".into()])));
    ///
    /// let quiet = ProcessedFlag::from_definition(FlagDefinition::new("quiet").option("-q").flag_only());
    /// assert!(quiet.flag_type.is_boolean());
    /// ```
    pub fn from_definition(def: FlagDefinition) -> Self {
        let flag_type = match def.flag_type {
            Some(flag_type) => flag_type,
            None if def.flag_only => FlagType::Primitive(PrimitiveType::Boolean),
            None => FlagType::default(),
        };

        let default_value = match def.default_value {
            Some(Value::Array(items)) => Some(Value::Array(items)),
            Some(Value::Null) => None,
            Some(value) if def.allow_multiple => Some(Value::Array(vec![value])),
            other => other,
        };

        Self {
            name: def.name,
            options: def.options,
            flag_type,
            default_value,
            mandatory: def.mandatory,
            flag_only: def.flag_only,
            allow_multiple: def.allow_multiple,
            allow_ligature: def.allow_ligature,
            enum_values: def.enum_values.unwrap_or_default(),
            validate: def.validate,
            positional: def.positional,
            env: def.env,
            description: def.description,
            inherited: false,
        }
    }

    /// Checks if `option` is one of this flag's option strings.
    pub fn matches(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// First declared option, used when naming the flag to users.
    pub fn primary_option(&self) -> &str {
        self.options.first().map(String::as_str).unwrap_or(self.name.as_str())
    }

    /// Longest `--` option, falling back to the primary one.
    pub fn long_option(&self) -> &str {
        self.options
            .iter()
            .filter(|o| o.starts_with("--"))
            .max_by_key(|o| o.len())
            .map(String::as_str)
            .unwrap_or_else(|| self.primary_option())
    }

    pub fn is_boolean(&self) -> bool {
        self.flag_type.is_boolean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_only_defaults_to_boolean() {
        let flag = ProcessedFlag::from_definition(
            FlagDefinition::new("verbose").option("-v").flag_only(),
        );
        assert!(flag.is_boolean());
        assert!(flag.flag_only);
    }

    #[test]
    fn test_untyped_flag_defaults_to_string() {
        let flag = ProcessedFlag::from_definition(FlagDefinition::new("name").option("--name"));
        assert!(matches!(
            flag.flag_type,
            FlagType::Primitive(PrimitiveType::String)
        ));
    }

    #[test]
    fn test_aliases_fold_into_canonical_fields() {
        let flag = ProcessedFlag::from_definition(
            FlagDefinition::new("out").option("-o").default("a.txt").required(),
        );
        assert_eq!(flag.default_value, Some(Value::from("a.txt")));
        assert!(matches!(flag.mandatory, Some(Mandatory::Always)));
    }

    #[test]
    fn test_multiple_array_default_is_kept() {
        let flag = ProcessedFlag::from_definition(
            FlagDefinition::new("tag")
                .option("--tag")
                .allow_multiple()
                .default_value(vec!["a", "b"]),
        );
        assert_eq!(
            flag.default_value,
            Some(Value::Array(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn test_long_option_prefers_double_dash() {
        let flag = ProcessedFlag::from_definition(
            FlagDefinition::new("output").options(["-o", "--output"]),
        );
        assert_eq!(flag.primary_option(), "-o");
        assert_eq!(flag.long_option(), "--output");
    }

    #[test]
    fn test_conditional_mandatory() {
        let rule = Mandatory::when(|values| {
            values.get("phase").and_then(Value::as_str) != Some("analysis")
        });
        let mut values = FlagValues::new();
        values.insert("phase".into(), "chunking".into());
        assert!(rule.is_required(&values));
        values.insert("phase".into(), "analysis".into());
        assert!(!rule.is_required(&values));
    }
}
