//! Mathrice Export Core Library
//!
//! Reads remote calendars and writes one iCalendar feed and one JSON feed
//! per calendar for publication on a laboratory website.

pub mod error;
pub mod export;
pub mod feed;
pub mod ics;
pub mod json;
pub mod normalize;
pub mod providers;
pub mod types;

// Re-export core types and error handling
pub use error::{Error, Result};
pub use types::*;

/// Commonly used items
pub mod prelude {
    pub use crate::{export::*, feed::*, ics::*, json::*, normalize::*, providers::*, types::*};
}
