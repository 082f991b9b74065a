//! Cookie-free fallbacks for declined categories.
//!
//! A page may bind a category to a fallback: when that category is not
//! allowed, the bound handler runs with its bound arguments instead. The
//! bundled [`AnalyticsPageview`](analytics::AnalyticsPageview) handler sends
//! an anonymous pageview in place of a cookie-based analytics script.

pub mod analytics;
pub mod registry;

pub use analytics::{AnalyticsPageview, ANALYTICS_HANDLER};
pub use registry::{AlternativeBinding, AlternativeHandler, AlternativeHandlers, AlternativeRegistry};
