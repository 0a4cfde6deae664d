//! Shared domain primitives: identifiers and construction errors.

mod errors;
mod ids;

pub use errors::DomainError;
pub use ids::SessionId;
