//! Environment management.
//!
//! Environments hold the variables that `{{placeholder}}` tokens resolve
//! against. A single environment can carry several variables with the same
//! key at different scopes; the resolver in [`crate::variables`] picks the
//! one that applies to a given request.
//!
//! # Example
//!
//! ```
//! use rest_workbench::environment::{Environment, EnvironmentVariable};
//!
//! let mut env = Environment::with_variables(
//!     "dev",
//!     vec![EnvironmentVariable::global("baseUrl", "http://localhost:3000")],
//! );
//! env.set("token", "abc123");
//!
//! assert_eq!(env.get("baseUrl"), Some("http://localhost:3000"));
//! assert_eq!(env.get("token"), Some("abc123"));
//! ```

pub mod models;

pub use models::{Environment, EnvironmentVariable, VariableScope};
