//! Durable key-value storage backends.
//!
//! The consent layer never talks to a concrete store; it goes through the
//! [`KeyValueStore`] trait, the same shape a browser's `localStorage` has:
//! string keys, string values, get/set/remove.
//!
//! | Backend | Durability | Use |
//! |---------|------------|-----|
//! | [`MemoryStore`] | process lifetime | tests, embedded hosts |
//! | [`JsonFileStore`] | JSON file on disk | single-profile tools |
//! | [`SqliteStore`] | SQLite database | multi-profile hosts |
//!
//! The on-disk backends sit behind the `json-store` and `sqlite-store`
//! features, both on by default. Hosts that bring their own store can turn
//! them off and implement [`KeyValueStore`] directly.
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "sqlite-store")] {
//! use cookiecontrol::storage::{KeyValueStore, SqliteStore};
//!
//! let store = SqliteStore::open("profile/storage.db")?;
//! store.set("visitor-id", "1700000000000-1abc23-1def45-1g6h")?;
//! assert!(store.get("visitor-id")?.is_some());
//! # }
//! # Ok::<(), cookiecontrol::base::consenterror::ConsentError>(())
//! ```

#[cfg(feature = "json-store")]
mod jsonfile;
mod keyvalue;
#[cfg(feature = "sqlite-store")]
mod sqlite;

#[cfg(feature = "json-store")]
pub use jsonfile::JsonFileStore;
pub use keyvalue::{KeyValueStore, MemoryStore};
#[cfg(feature = "sqlite-store")]
pub use sqlite::SqliteStore;
