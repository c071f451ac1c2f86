use crate::compose::Prompt;
use crate::error::Result;
use crate::types::{
    BusySlot, CalendarActivity, CalendarEvent, CalendarInfo, ChatChannel, ChatMessage,
    CodeActivity, CodeIssue, TimeWindow, TrackerIssue, TrackerProject,
    TrackerSprint,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Fields for creating an issue on the code platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCodeIssue {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Fields for creating an issue on the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrackerIssue {
    pub project_key: String,
    pub summary: String,
    pub description: String,
    #[serde(default = "default_issue_type")]
    pub issue_type: String,
}

fn default_issue_type() -> String {
    "Task".to_string()
}

/// Fields for creating a calendar event. Times are ISO-8601 datetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCalendarEvent {
    pub summary: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default)]
    pub attendees: Vec<String>,
}

pub fn default_calendar_id() -> String {
    "primary".to_string()
}

/// Messages in a channel over a lookback window.
#[async_trait]
pub trait ChatSource: Send + Sync {
    async fn fetch_messages(&self, channel_id: &str, window: TimeWindow)
        -> Result<Vec<ChatMessage>>;

    async fn list_channels(&self) -> Result<Vec<ChatChannel>>;
}

/// Posts generated text back into the chat platform.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns whether the platform accepted the message.
    async fn post_message(&self, channel_id: &str, text: &str) -> Result<bool>;
}

/// Repository activity from the source-control platform.
#[async_trait]
pub trait CodeSource: Send + Sync {
    fn configured(&self) -> bool;

    async fn repository_activity(&self, window: TimeWindow) -> Result<CodeActivity>;

    async fn create_issue(&self, issue: NewCodeIssue) -> Result<CodeIssue>;

    async fn release_notes(&self, window: TimeWindow) -> Result<String>;
}

/// Issues and sprints from the issue tracker.
///
/// Read operations return empty collections when no credentials are
/// configured; only writes report `Unconfigured`.
#[async_trait]
pub trait TrackerSource: Send + Sync {
    fn configured(&self) -> bool;

    async fn projects(&self) -> Result<Vec<TrackerProject>>;

    async fn project_issues(&self, project_key: &str, window: TimeWindow)
        -> Result<Vec<TrackerIssue>>;

    async fn sprints(&self, project_key: &str) -> Result<Vec<TrackerSprint>>;

    async fn sprint_issues(&self, sprint_id: u64) -> Result<Vec<TrackerIssue>>;

    async fn create_issue(&self, issue: NewTrackerIssue) -> Result<TrackerIssue>;
}

/// Events and availability from the calendar platform.
///
/// Read operations degrade to empty results on credential failure.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    fn configured(&self) -> bool;

    async fn events(&self, window: TimeWindow, calendar_id: &str) -> Result<Vec<CalendarEvent>>;

    async fn calendars(&self) -> Result<Vec<CalendarInfo>>;

    async fn busy_times(&self, window: TimeWindow, calendar_id: &str) -> Result<Vec<BusySlot>>;

    async fn create_event(&self, event: NewCalendarEvent) -> Result<CalendarEvent>;

    /// Convenience for the aggregator: events plus busy slots in one call.
    async fn activity(&self, window: TimeWindow, calendar_id: &str) -> Result<CalendarActivity> {
        let events = self.events(window, calendar_id).await?;
        let busy = self.busy_times(window, calendar_id).await?;
        Ok(CalendarActivity { events, busy })
    }
}

/// Turns a composed prompt into display text.
///
/// Total by contract: failures are rendered into the returned string so the
/// result is always displayable and never a control-flow signal.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &Prompt) -> String;
}
