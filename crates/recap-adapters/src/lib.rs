//! Platform adapters for the recap pipeline.
//!
//! Each module wraps one external platform behind the matching
//! `recap-core` capability trait: wire JSON is decoded into core record
//! types right here at the boundary, and platform failures are mapped into
//! the core error taxonomy. Clients are constructed once at startup and
//! shared via `Arc`; none of them holds request state.

pub mod calendar;
pub mod github;
pub mod jira;
pub mod openai;
pub mod slack;

pub use calendar::{GoogleCalendarClient, GoogleConfig};
pub use github::GitHubClient;
pub use jira::{JiraClient, JiraConfig};
pub use openai::OpenAiClient;
pub use slack::SlackClient;

use std::time::Duration;

/// Conservative per-call bound; a timed-out call surfaces as
/// `SourceUnavailable` for the adapter that issued it.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
