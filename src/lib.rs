//! # cookiecontrol
//!
//! Consent state machine and deferred-activation engine for cookie consent
//! widgets.
//!
//! Pages ship third-party content (analytics scripts, video iframes, map
//! embeds) in a deferred form tagged with a consent category. `cookiecontrol`
//! keeps the visitor's per-category decisions, reports them to a logging
//! endpoint, and turns deferred content into live content exactly once when
//! its category is allowed. Declined categories can run a cookie-free
//! fallback instead.
//!
//! ## Features
//!
//! - **Consent Store**: persisted tri-state decisions and a stable visitor id
//! - **Activation**: scripts, iframes and custom embeds, each activated once
//! - **Fallbacks**: base64 JSON bindings from page markup, validated at load
//! - **Beacons**: consent logging over HTTP/1.1 with BoringSSL
//! - **Storage**: in-memory, JSON file and SQLite backends
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cookiecontrol::{ConsentController, ConsentMap, PageConfig, PageContext};
//! use cookiecontrol::storage::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PageConfig::new(["video", "stats"]);
//!     let page = PageContext::parse("https://shop.example/")?;
//!
//!     let mut controller = ConsentController::builder(config, page)
//!         .storage(SqliteStore::open("storage.db")?)
//!         .build()?;
//!
//!     controller
//!         .apply_decisions(ConsentMap::from([("video", true), ("stats", false)]))
//!         .await?;
//!     assert!(controller.has_consent("video"));
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Category keys, error definitions, id generation
//! - [`storage`] - Key-value storage backends
//! - [`consent`] - Consent map, consent store and discovery log
//! - [`dom`] - Host document abstraction
//! - [`activation`] - Deferred items and the activation engine
//! - [`alternative`] - Fallbacks for declined categories
//! - [`tracking`] - Consent beacons and their transport
//! - [`page`] - Page configuration

pub mod activation;
pub mod alternative;
pub mod base;
pub mod consent;
pub mod controller;
pub mod dom;
pub mod page;
pub mod storage;
pub mod tracking;

pub use base::category::CategoryKey;
pub use base::consenterror::ConsentError;
pub use consent::consentmap::ConsentMap;
pub use controller::{ConsentController, ConsentControllerBuilder, DecisionReport};
pub use page::{PageConfig, PageContext};
