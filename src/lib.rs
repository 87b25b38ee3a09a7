//! Live rendering of `<t:EPOCH:STYLE>` timestamp tokens in chat messages.
//!
//! Tokens are parsed out of message text, replaced by display elements with
//! locale-aware absolute or relative text, and relative elements that are in
//! view get re-rendered on every refresh tick.

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod scheduler;
pub mod state;
pub mod token;

pub use config::{ConfigError, RefreshConfig, DEFAULT_REFRESH_PERIOD_MS};
pub use engine::{activate, ContentBlob, ContentId, Deactivate, Engine, Host, PassReport};
pub use error::{TimestampError, TimestampResult};
pub use format::bucket::{bucket, Bucket, Precision, TimeUnit};
pub use format::relative::{relative_for_locale, EnglishRelativeTime, GermanRelativeTime, Numeric, RelativeTimeFormat};
pub use format::{parse_locale, Formatter};
pub use scheduler::{RefreshScheduler, SchedulerState};
pub use state::{
    DisplayElement, ElementId, ElementRegistry, RegionId, RenderedContent, Rewrite, Segment,
    ViewportObserver, VisibilityEvent, VisibilitySender, VisibilityTracker,
};
pub use token::{parse_next_token, scan_tokens, TimestampStyle, TimestampToken, TokenMatch};
