//! Base types and error handling.
//!
//! Provides foundational types shared by every layer of the crate:
//! - [`ConsentError`](consenterror::ConsentError): the crate-wide error type
//! - [`CategoryKey`](category::CategoryKey): consent category identifiers
//! - [`random`]: timestamp and radix helpers behind visitor and client ids

pub mod category;
pub mod consenterror;
pub mod random;

#[cfg(test)]
mod tests;
