use crate::error::RecapError;
use crate::types::{
    CalendarActivity, ChatMessage, CodeActivity, SourceKind, TrackerActivity,
};
use std::collections::BTreeSet;

/// Outcome of one optional source within a request.
///
/// `Absent` means the source was not requested; `Failed` means it was
/// requested and errored. Both render as "nothing to summarize from this
/// source" downstream, but callers can tell them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceResult<T> {
    Absent,
    Populated(T),
    Failed(RecapError),
}

impl<T> SourceResult<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            SourceResult::Populated(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RecapError> {
        match self {
            SourceResult::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, SourceResult::Absent)
    }
}

/// Aggregated per-request view across all enabled sources.
///
/// Lives for exactly one request; nothing here is cached or shared.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBundle {
    pub chat: Vec<ChatMessage>,
    pub code: SourceResult<CodeActivity>,
    pub tracker: SourceResult<TrackerActivity>,
    pub calendar: SourceResult<CalendarActivity>,
}

impl ContextBundle {
    /// True when at least one source produced something worth summarizing.
    ///
    /// Failed and absent sources contribute nothing; an empty activity set
    /// from a populated source also counts as nothing.
    pub fn has_data(&self) -> bool {
        if !self.chat.is_empty() {
            return true;
        }
        if self.code.data().is_some_and(|c| !c.is_empty()) {
            return true;
        }
        if self.tracker.data().is_some_and(|t| !t.is_empty()) {
            return true;
        }
        self.calendar.data().is_some_and(|c| !c.is_empty())
    }

    /// Names of the sources that contributed data to this bundle.
    pub fn sources_used(&self) -> BTreeSet<SourceKind> {
        let mut used = BTreeSet::new();
        if !self.chat.is_empty() {
            used.insert(SourceKind::Chat);
        }
        if self.code.data().is_some_and(|c| !c.is_empty()) {
            used.insert(SourceKind::Code);
        }
        if self.tracker.data().is_some_and(|t| !t.is_empty()) {
            used.insert(SourceKind::Tracker);
        }
        if self.calendar.data().is_some_and(|c| !c.is_empty()) {
            used.insert(SourceKind::Calendar);
        }
        used
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TrackerIssue, TrackerActivity};

    fn empty_bundle() -> ContextBundle {
        ContextBundle {
            chat: Vec::new(),
            code: SourceResult::Absent,
            tracker: SourceResult::Absent,
            calendar: SourceResult::Absent,
        }
    }

    fn tracker_issue(key: &str) -> TrackerIssue {
        TrackerIssue {
            key: key.into(),
            summary: "Investigate login timeout".into(),
            status: "In Progress".into(),
            priority: None,
            assignee: None,
            reporter: None,
            created: "2026-07-30T09:00:00.000+0000".into(),
            updated: "2026-07-31T09:00:00.000+0000".into(),
            issue_type: "Task".into(),
            url: "https://tracker.example.com/browse/AB-1".into(),
        }
    }

    #[test]
    fn empty_bundle_has_no_data() {
        assert!(!empty_bundle().has_data());
        assert!(empty_bundle().sources_used().is_empty());
    }

    #[test]
    fn chat_messages_count_as_data() {
        let mut bundle = empty_bundle();
        bundle.chat.push(ChatMessage {
            user: Some("U123".into()),
            timestamp: "1722400000.000100".into(),
            text: "deployed the fix".into(),
        });
        assert!(bundle.has_data());
        assert!(bundle.sources_used().contains(&SourceKind::Chat));
    }

    #[test]
    fn failed_source_contributes_nothing() {
        let mut bundle = empty_bundle();
        bundle.code = SourceResult::Failed(RecapError::unavailable(
            SourceKind::Code,
            "connection reset",
        ));
        assert!(!bundle.has_data());
        assert!(bundle.code.error().is_some());
        assert!(bundle.code.data().is_none());
    }

    #[test]
    fn populated_but_empty_source_is_not_data() {
        let mut bundle = empty_bundle();
        bundle.tracker = SourceResult::Populated(TrackerActivity::default());
        assert!(!bundle.has_data());
        assert!(!bundle.sources_used().contains(&SourceKind::Tracker));
    }

    #[test]
    fn populated_tracker_is_counted() {
        let mut bundle = empty_bundle();
        bundle.tracker = SourceResult::Populated(TrackerActivity {
            issues: vec![tracker_issue("AB-1")],
            sprints: Vec::new(),
        });
        assert!(bundle.has_data());
        assert_eq!(
            bundle.sources_used().into_iter().collect::<Vec<_>>(),
            vec![SourceKind::Tracker]
        );
    }
}
