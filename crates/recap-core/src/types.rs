use crate::error::{RecapError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The four aggregatable sources, plus the summarization endpoint for
/// error attribution. Only the four sources ever appear in `sources_used`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Chat,
    Code,
    Tracker,
    Calendar,
    Summarizer,
}

impl SourceKind {
    /// Stable lowercase name used in logs, errors, and `sources_used`.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Chat => "chat",
            SourceKind::Code => "code",
            SourceKind::Tracker => "tracker",
            SourceKind::Calendar => "calendar",
            SourceKind::Summarizer => "summarizer",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for SourceKind {}

/// Day-count lookback window applied to every source fetch.
///
/// Constructed per request and never reused. All adapters interpret it as
/// `now - days .. now`; the calendar adapter splits it symmetrically around
/// now via [`TimeWindow::split`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    days: u32,
}

impl TimeWindow {
    pub const MIN_DAYS: u32 = 1;
    pub const MAX_DAYS: u32 = 90;

    pub fn new(days: u32) -> Result<Self> {
        if !(Self::MIN_DAYS..=Self::MAX_DAYS).contains(&days) {
            return Err(RecapError::Validation(format!(
                "days must be between {} and {}, got {}",
                Self::MIN_DAYS,
                Self::MAX_DAYS,
                days
            )));
        }
        Ok(TimeWindow { days })
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    /// Start of the lookback period.
    pub fn since(&self) -> DateTime<Utc> {
        Utc::now() - Duration::days(self.days as i64)
    }

    /// End of the forward period (`now + days`), used by free-busy queries.
    pub fn until(&self) -> DateTime<Utc> {
        Utc::now() + Duration::days(self.days as i64)
    }

    /// Symmetric half-window around now: `(now - days/2, now + days/2)`.
    pub fn split(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let half = Duration::days((self.days / 2).max(1) as i64);
        let now = Utc::now();
        (now - half, now + half)
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow { days: 7 }
    }
}

// ── Chat records ─────────────────────────────────────────────────────────────

/// A single non-bot message fetched from the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Platform user id of the author. Absent for some message subtypes.
    pub user: Option<String>,
    /// Platform-native timestamp, kept verbatim for display.
    pub timestamp: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatChannel {
    pub id: String,
    pub name: String,
}

// ── Code records ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeCommit {
    /// Short (7-character) commit SHA.
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodePullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeIssue {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub labels: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeRelease {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepoSummary {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub url: String,
}

/// Everything the code source produced for one window.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeActivity {
    pub pull_requests: Vec<CodePullRequest>,
    pub issues: Vec<CodeIssue>,
    pub commits: Vec<CodeCommit>,
    pub releases: Vec<CodeRelease>,
    pub repository: Option<RepoSummary>,
}

impl CodeActivity {
    pub fn is_empty(&self) -> bool {
        self.pull_requests.is_empty()
            && self.issues.is_empty()
            && self.commits.is_empty()
            && self.releases.is_empty()
    }
}

// ── Tracker records ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerProject {
    pub key: String,
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerIssue {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    /// Tracker-native timestamp strings, kept verbatim.
    pub created: String,
    pub updated: String,
    pub issue_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerSprint {
    pub id: u64,
    pub name: String,
    pub state: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub goal: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackerActivity {
    pub issues: Vec<TrackerIssue>,
    pub sprints: Vec<TrackerSprint>,
}

impl TrackerActivity {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.sprints.is_empty()
    }
}

// ── Calendar records ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    /// RFC 3339 datetime, or a bare date for all-day events.
    pub start: String,
    pub end: String,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    pub organizer: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarInfo {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub primary: bool,
    pub access_role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusySlot {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CalendarActivity {
    pub events: Vec<CalendarEvent>,
    pub busy: Vec<BusySlot>,
}

impl CalendarActivity {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.busy.is_empty()
    }
}
