//! Variables module
//!
//! Placeholder substitution (`{{name}}`) and scope-aware resolution of
//! environment variables for a request.

pub mod resolver;
pub mod substitution;

pub use resolver::{
    resolve_request, resolve_variable, substitute_variables, ResolvedRequest, ScopeChain,
};
pub use substitution::{has_placeholders, placeholder_names, substitute};
