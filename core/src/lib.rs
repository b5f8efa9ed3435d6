//! Core flag model for the flagtree command router.
//!
//! This crate defines everything that belongs to a single command's flags:
//!
//! - [`FlagDefinition`]: the user-facing builder for a flag (options, type,
//!   default, mandatory rule, enum, validator, positional index, env vars).
//! - [`ProcessedFlag`]: the canonical stored form, with the type normalized
//!   and defaults resolved.
//! - [`FlagType`]: a tagged variant of built-in primitive, custom conversion
//!   function or structured schema.
//! - [`FlagRegistry`]: insertion-ordered storage with O(1) option lookup and
//!   collision detection governed by a [`RegistryPolicy`].
//! - [`coerce`]: raw token → [`Value`] conversion, with [`check_enum`] for
//!   allowed-set checks.
//!
//! Command trees, inheritance and the parse pipeline live in
//! `flagtree-engine`.
//!
//! # Example
//!
//! ```
//! use flagtree_core::*;
//!
//! let mut registry = FlagRegistry::new();
//! registry.add_flag(
//!     FlagDefinition::new("port")
//!         .options(["-p", "--port"])
//!         .of_type(PrimitiveType::Number)
//!         .default_value(8080),
//! ).unwrap();
//!
//! let port = registry.find_by_option("--port").unwrap();
//! assert_eq!(coerce_blocking("9000", &port.flag_type).unwrap(), Value::from(9000));
//! assert!(validate_definition(&FlagDefinition::new("").option("-x")).is_err());
//! ```

mod coerce;
mod error;
mod registry;
mod types;
mod validate;

pub use coerce::{
    CoerceError, check_enum, coerce, coerce_blocking, coerce_primitive, display_value,
    parse_bool, parse_number,
};
pub use error::{ErrorKind, ParseError, RegistryError};
pub use registry::{FlagRegistry, RegistryPolicy};
pub use types::*;
pub use validate::{is_valid_option, validate_definition};
