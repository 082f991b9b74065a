//! Persisted consent state.
//!
//! - [`ConsentMap`](consentmap::ConsentMap): tri-state per-category decisions
//! - [`ConsentStore`](store::ConsentStore): the durable record, visitor id and
//!   change notifications
//! - [`DiscoveryLog`](discovery::DiscoveryLog): audit log of categories seen
//!   while scanning a page
//!
//! All three sit on the host's [`KeyValueStore`](crate::storage::KeyValueStore)
//! under fixed keys:
//!
//! | Key | Content |
//! |-----|---------|
//! | `consent-map` | JSON object of category → bool |
//! | `visitor-id` | visitor identifier string |
//! | `discovery-log` | JSON array of categories (present = enabled) |

pub mod consentmap;
pub mod discovery;
pub mod store;
