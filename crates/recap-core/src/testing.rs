//! In-memory fakes for exercising the pipeline without network I/O.

use crate::compose::Prompt;
use crate::error::{RecapError, Result};
use crate::sources::*;
use crate::types::*;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn message(text: &str) -> ChatMessage {
    ChatMessage {
        user: Some("U042".into()),
        timestamp: "1722400000.000100".into(),
        text: text.into(),
    }
}

pub struct FakeChat {
    pub messages: Vec<ChatMessage>,
    pub fail: bool,
}

#[async_trait]
impl ChatSource for FakeChat {
    async fn fetch_messages(
        &self,
        _channel_id: &str,
        _window: TimeWindow,
    ) -> Result<Vec<ChatMessage>> {
        if self.fail {
            return Err(RecapError::unavailable(SourceKind::Chat, "timeout"));
        }
        Ok(self.messages.clone())
    }

    async fn list_channels(&self) -> Result<Vec<ChatChannel>> {
        Ok(Vec::new())
    }
}

pub struct FakeCode {
    pub activity: Result<CodeActivity>,
}

#[async_trait]
impl CodeSource for FakeCode {
    fn configured(&self) -> bool {
        true
    }

    async fn repository_activity(&self, _window: TimeWindow) -> Result<CodeActivity> {
        self.activity.clone()
    }

    async fn create_issue(&self, _issue: NewCodeIssue) -> Result<CodeIssue> {
        Err(RecapError::unconfigured(SourceKind::Code))
    }

    async fn release_notes(&self, _window: TimeWindow) -> Result<String> {
        Ok(String::new())
    }
}

pub struct FakeTracker;

#[async_trait]
impl TrackerSource for FakeTracker {
    fn configured(&self) -> bool {
        false
    }

    async fn projects(&self) -> Result<Vec<TrackerProject>> {
        Ok(Vec::new())
    }

    async fn project_issues(
        &self,
        _project_key: &str,
        _window: TimeWindow,
    ) -> Result<Vec<TrackerIssue>> {
        Ok(Vec::new())
    }

    async fn sprints(&self, _project_key: &str) -> Result<Vec<TrackerSprint>> {
        Ok(Vec::new())
    }

    async fn sprint_issues(&self, _sprint_id: u64) -> Result<Vec<TrackerIssue>> {
        Ok(Vec::new())
    }

    async fn create_issue(&self, _issue: NewTrackerIssue) -> Result<TrackerIssue> {
        Err(RecapError::unconfigured(SourceKind::Tracker))
    }
}

pub struct FakeCalendar;

#[async_trait]
impl CalendarSource for FakeCalendar {
    fn configured(&self) -> bool {
        false
    }

    async fn events(&self, _window: TimeWindow, _calendar_id: &str) -> Result<Vec<CalendarEvent>> {
        Ok(Vec::new())
    }

    async fn calendars(&self) -> Result<Vec<CalendarInfo>> {
        Ok(Vec::new())
    }

    async fn busy_times(&self, _window: TimeWindow, _calendar_id: &str) -> Result<Vec<BusySlot>> {
        Ok(Vec::new())
    }

    async fn create_event(&self, _event: NewCalendarEvent) -> Result<CalendarEvent> {
        Err(RecapError::unconfigured(SourceKind::Calendar))
    }
}

/// Records every summarize call and returns a fixed reply.
pub struct CountingSummarizer {
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<Prompt>>,
}

impl CountingSummarizer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Summarizer for CountingSummarizer {
    async fn summarize(&self, prompt: &Prompt) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());
        "generated summary".to_string()
    }
}

/// Records posted messages; optionally reports delivery failure.
pub struct RecordingNotifier {
    pub posted: Mutex<Vec<(String, String)>>,
    pub accept: bool,
}

impl RecordingNotifier {
    pub fn new(accept: bool) -> Self {
        Self {
            posted: Mutex::new(Vec::new()),
            accept,
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post_message(&self, channel_id: &str, text: &str) -> Result<bool> {
        self.posted
            .lock()
            .unwrap()
            .push((channel_id.to_string(), text.to_string()));
        Ok(self.accept)
    }
}
