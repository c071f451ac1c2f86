pub mod aggregate;
pub mod bot;
pub mod bundle;
pub mod compose;
pub mod error;
pub mod sources;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{
    Aggregator, SummaryPipeline, SummaryRequest, SummaryResult, NO_DATA_MESSAGE,
    NO_RELEVANT_MESSAGES,
};
pub use bot::{dispatch, BotCommand, BotService, HELP_TEXT};
pub use bundle::{ContextBundle, SourceResult};
pub use compose::{compose, Prompt, PromptSection, SYSTEM_INSTRUCTION};
pub use error::{RecapError, Result};
pub use sources::{
    CalendarSource, ChatSource, CodeSource, NewCalendarEvent, NewCodeIssue, NewTrackerIssue,
    Notifier, Summarizer, TrackerSource,
};
pub use types::*;
