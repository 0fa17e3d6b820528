//! Shared building blocks for the pulse analytics workspace.
//!
//! Hosts the fiscal calendar arithmetic, unix timestamp helpers, and the
//! Slack-markup formatting utilities used by the analytics and CLI crates.

mod fiscal;
mod format;
mod time_utils;

pub use fiscal::{
    fiscal_quarter_of, parse_quarter_label, quarter_offset, quarter_over_quarter_change,
    trailing_quarters, FiscalQuarter,
};
pub use format::{clean_slack_formatting, format_response_time};
pub use time_utils::{current_unix_timestamp_ms, is_expired_unix_ms};
