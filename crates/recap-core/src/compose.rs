use crate::bundle::ContextBundle;
use crate::types::{CalendarActivity, CodeActivity, TrackerActivity};
use serde::{Deserialize, Serialize};

/// Fixed instruction handed to the model as the system message.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that generates sprint summaries \
from team communications. Focus on identifying key accomplishments, blockers, and next steps \
from the conversation.";

pub const CHAT_SECTION: &str = "Chat Communications";
pub const CODE_SECTION: &str = "Code Activity";
pub const TRACKER_SECTION: &str = "Tracker Activity";
pub const CALENDAR_SECTION: &str = "Calendar";

/// One labelled block of source data inside a prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptSection {
    pub label: String,
    pub body: String,
}

/// A bounded, deterministic prompt built from one [`ContextBundle`].
///
/// Never persisted; handed straight to the summarizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub sections: Vec<PromptSection>,
}

impl Prompt {
    /// Assembles the user-facing message: the labelled sections followed by
    /// the fixed four-category rubric.
    pub fn user_message(&self) -> String {
        let mut data = String::new();
        for section in &self.sections {
            if !data.is_empty() {
                data.push_str("\n\n");
            }
            data.push_str(&format!("**{}:**\n{}", section.label, section.body));
        }

        format!(
            "Here is data from our team's communication and development activities \
for this period. Please analyze and summarize under these categories:\n\
\n\
- Key Accomplishments\n\
- Blockers & Issues\n\
- Next Steps & Action Items\n\
- Development Progress (PRs, commits, releases)\n\
\n\
Data:\n\
{}\n\
\n\
Please provide a comprehensive, actionable summary that would be useful for \
sprint planning and team coordination.",
            data
        )
    }
}

/// Platform join/leave notices that carry no summarizable content.
pub fn is_system_notice(text: &str) -> bool {
    text.contains("has joined the channel") || text.contains("has left the channel")
}

/// Build a prompt from an aggregated bundle.
///
/// Section order is always Chat, Code, Tracker, Calendar; sections with
/// nothing renderable are omitted, and `None` means there is nothing to
/// summarize at all. Failed and absent sources never contribute a section.
pub fn compose(bundle: &ContextBundle) -> Option<Prompt> {
    let mut sections = Vec::new();

    if let Some(body) = render_chat(bundle) {
        sections.push(PromptSection {
            label: CHAT_SECTION.to_string(),
            body,
        });
    }
    if let Some(body) = bundle.code.data().and_then(render_code) {
        sections.push(PromptSection {
            label: CODE_SECTION.to_string(),
            body,
        });
    }
    if let Some(body) = bundle.tracker.data().and_then(render_tracker) {
        sections.push(PromptSection {
            label: TRACKER_SECTION.to_string(),
            body,
        });
    }
    if let Some(body) = bundle.calendar.data().and_then(render_calendar) {
        sections.push(PromptSection {
            label: CALENDAR_SECTION.to_string(),
            body,
        });
    }

    if sections.is_empty() {
        return None;
    }

    Some(Prompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        sections,
    })
}

fn render_chat(bundle: &ContextBundle) -> Option<String> {
    let lines: Vec<String> = bundle
        .chat
        .iter()
        .filter(|m| !is_system_notice(&m.text))
        .map(|m| format!("- {}", m.text))
        .collect();

    if lines.is_empty() {
        return None;
    }
    Some(lines.join("\n"))
}

fn render_code(activity: &CodeActivity) -> Option<String> {
    let mut lines = Vec::new();
    if !activity.pull_requests.is_empty() {
        lines.push(format!("Pull Requests: {} PRs", activity.pull_requests.len()));
    }
    if !activity.issues.is_empty() {
        lines.push(format!("Issues: {} issues", activity.issues.len()));
    }
    if !activity.commits.is_empty() {
        lines.push(format!("Commits: {} commits", activity.commits.len()));
    }

    if lines.is_empty() {
        return None;
    }
    Some(lines.join("\n"))
}

fn render_tracker(activity: &TrackerActivity) -> Option<String> {
    let mut lines = Vec::new();
    if !activity.issues.is_empty() {
        lines.push(format!("Issues: {} issues", activity.issues.len()));
    }
    if !activity.sprints.is_empty() {
        lines.push(format!("Sprints: {} sprints", activity.sprints.len()));
    }

    if lines.is_empty() {
        return None;
    }
    Some(lines.join("\n"))
}

fn render_calendar(activity: &CalendarActivity) -> Option<String> {
    let mut lines = Vec::new();
    for event in &activity.events {
        lines.push(format!("{} ({})", event.summary, event.start));
        if let Some(description) = &event.description {
            if !description.is_empty() {
                lines.push(format!("  {}", description));
            }
        }
    }
    if !activity.busy.is_empty() {
        lines.push(format!("Busy slots: {}", activity.busy.len()));
    }

    if lines.is_empty() {
        return None;
    }
    Some(lines.join("\n"))
}
