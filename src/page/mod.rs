//! Page-level configuration.
//!
//! The widget root element declares which categories need a decision, the
//! default checkbox state and the fallback bindings:
//!
//! ```html
//! <div id="cookie-control" class="cc-hide-start"
//!      data-enabled="necessary,video,stats"
//!      data-necessary="necessary"
//!      data-checked="1"
//!      data-alternatives="eyJzdGF0cyI6WyJnYSIsWyJVQS0xIl1dfQ==">
//! ```

mod config;
mod context;

pub use config::{
    PageConfig, ALTERNATIVES_ATTRIBUTE, CHECKED_ATTRIBUTE, ENABLED_ATTRIBUTE, HIDE_START_CLASS,
    NECESSARY_ATTRIBUTE, NO_EXECUTE_CLASS,
};
pub use context::PageContext;
