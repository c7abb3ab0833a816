//! Log aggregation for kubemux
//!
//! This crate selects pods, streams their logs concurrently, decorates each
//! line and merges everything into one output channel.

mod decorate;
mod error;
mod filter;
mod highlight;
mod palette;
mod stream;

pub use decorate::LineDecorator;
pub use error::{AggregateError, NoTargetsError, stream_diagnostic};
pub use filter::TargetFilter;
pub use highlight::{HighlightError, JsonHighlighter, THEMES, Theme};
pub use palette::{Colorizer, PALETTE};
pub use stream::{AggregatedLogs, LogAggregator, Phase};

// Re-export types used in our public API
pub use kubemux_types::{AggregationConfig, ColorSupport, MatchMode, Target};
