use crate::aggregate::{SummaryPipeline, SummaryRequest};
use crate::error::Result;
use crate::sources::Notifier;
use log::error;
use std::sync::Arc;

/// What a mention resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Generate a summary and post it to the channel.
    Weekly,
    /// Generate a summary and return it inline.
    Summary,
    /// Return the static command list.
    Help,
    /// Nothing matched; greet the user.
    Greeting,
}

/// Ordered dispatch rules: the first entry with any matching keyword wins.
///
/// `weekly` is checked before the inline-summary keywords so that
/// "weekly summary" posts to the channel rather than replying inline.
const DISPATCH_TABLE: &[(&[&str], BotCommand)] = &[
    (&["weekly"], BotCommand::Weekly),
    (&["summary", "report", "status"], BotCommand::Summary),
    (&["help"], BotCommand::Help),
];

/// Resolve a mention's text to a command.
///
/// Case-insensitive substring matching over [`DISPATCH_TABLE`]; no
/// natural-language understanding.
pub fn dispatch(text: &str) -> BotCommand {
    let lowered = text.to_lowercase();
    for (keywords, command) in DISPATCH_TABLE {
        if keywords.iter().any(|k| lowered.contains(k)) {
            return *command;
        }
    }
    BotCommand::Greeting
}

pub const HELP_TEXT: &str = "🤖 *Recap Bot Commands:*\n\
• `@recap summary` - Generate a summary of recent activity\n\
• `@recap help` - Show this help message\n\
• `@recap weekly` - Post a comprehensive weekly summary to the channel";

const SUMMARY_HEADER: &str = "📊 *Sprint Summary*";
const ERROR_REPLY: &str = "❌ Sorry, I encountered an error. Please try again.";

/// Chat-bot flows: generate summaries and relay them into the chat service.
///
/// Every reply is displayable text; internal failures never escape.
pub struct BotService {
    pipeline: Arc<SummaryPipeline>,
    notifier: Arc<dyn Notifier>,
    /// Whether weekly and inline summaries should pull code activity.
    include_code: bool,
}

impl BotService {
    pub fn new(
        pipeline: Arc<SummaryPipeline>,
        notifier: Arc<dyn Notifier>,
        include_code: bool,
    ) -> Self {
        Self {
            pipeline,
            notifier,
            include_code,
        }
    }

    /// Post already-generated summary text to a channel.
    pub async fn post_summary(&self, channel_id: &str, summary: &str) -> Result<bool> {
        let message = format!("{}\n\n{}", SUMMARY_HEADER, summary);
        self.notifier.post_message(channel_id, &message).await
    }

    /// Generate a summary over `days` and post it to the channel.
    pub async fn post_weekly(&self, channel_id: &str, days: u32) -> Result<bool> {
        let mut request = SummaryRequest::for_channel(channel_id, days);
        request.include_code = self.include_code;

        let summary = self.pipeline.generate(&request).await?;
        self.post_summary(channel_id, &summary.text).await
    }

    /// Respond to a mention. The reply is always displayable text.
    pub async fn respond(&self, channel_id: &str, user_id: &str, text: &str) -> String {
        match dispatch(text) {
            BotCommand::Weekly => match self.post_weekly(channel_id, 7).await {
                Ok(true) => "✅ Weekly summary posted to the channel!".to_string(),
                Ok(false) => "❌ Failed to post weekly summary. Please try again.".to_string(),
                Err(err) => {
                    error!("weekly summary failed: {}", err);
                    ERROR_REPLY.to_string()
                }
            },
            BotCommand::Summary => {
                let mut request = SummaryRequest::for_channel(channel_id, 7);
                request.include_code = self.include_code;
                match self.pipeline.generate(&request).await {
                    Ok(summary) => format!("📊 *Here's your summary:*\n\n{}", summary.text),
                    Err(err) => {
                        error!("inline summary failed: {}", err);
                        ERROR_REPLY.to_string()
                    }
                }
            }
            BotCommand::Help => HELP_TEXT.to_string(),
            BotCommand::Greeting => format!(
                "Hi <@{}>! I'm Recap, your AI teammate. Type `@recap help` to see what I can do.",
                user_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::testing::*;
    use crate::types::CodeActivity;

    fn service(messages: Vec<&str>, accept: bool) -> (BotService, Arc<RecordingNotifier>) {
        let aggregator = Aggregator::new(
            Arc::new(FakeChat {
                messages: messages.into_iter().map(message).collect(),
                fail: false,
            }),
            Arc::new(FakeCode {
                activity: Ok(CodeActivity::default()),
            }),
            Arc::new(FakeTracker),
            Arc::new(FakeCalendar),
        );
        let pipeline = Arc::new(SummaryPipeline::new(
            aggregator,
            Arc::new(CountingSummarizer::new()),
        ));
        let notifier = Arc::new(RecordingNotifier::new(accept));
        (
            BotService::new(pipeline, notifier.clone(), false),
            notifier,
        )
    }

    #[test]
    fn weekly_wins_over_later_keywords() {
        assert_eq!(dispatch("please give me the WEEKLY update"), BotCommand::Weekly);
        assert_eq!(dispatch("weekly summary"), BotCommand::Weekly);
    }

    #[test]
    fn summary_keywords_dispatch_inline() {
        assert_eq!(dispatch("summary please"), BotCommand::Summary);
        assert_eq!(dispatch("send the REPORT"), BotCommand::Summary);
        assert_eq!(dispatch("what's the status?"), BotCommand::Summary);
    }

    #[test]
    fn help_and_fallback() {
        assert_eq!(dispatch("help"), BotCommand::Help);
        assert_eq!(dispatch("good morning"), BotCommand::Greeting);
        assert_eq!(dispatch(""), BotCommand::Greeting);
    }

    #[tokio::test]
    async fn posted_summary_carries_header() {
        let (service, notifier) = service(vec!["shipped it"], true);
        let ok = service.post_summary("C1", "all good").await.unwrap();
        assert!(ok);

        let posted = notifier.posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert!(posted[0].1.starts_with("📊 *Sprint Summary*"));
        assert!(posted[0].1.ends_with("all good"));
    }

    #[tokio::test]
    async fn weekly_mention_posts_to_channel() {
        let (service, notifier) = service(vec!["shipped it"], true);
        let reply = service.respond("C1", "U9", "weekly please").await;
        assert_eq!(reply, "✅ Weekly summary posted to the channel!");
        assert_eq!(notifier.posted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_post_reports_failure_inline() {
        let (service, _) = service(vec!["shipped it"], false);
        let reply = service.respond("C1", "U9", "weekly").await;
        assert_eq!(reply, "❌ Failed to post weekly summary. Please try again.");
    }

    #[tokio::test]
    async fn greeting_mentions_the_user() {
        let (service, _) = service(Vec::new(), true);
        let reply = service.respond("C1", "U9", "hello there").await;
        assert!(reply.contains("<@U9>"));
    }

    #[tokio::test]
    async fn inline_summary_reply_is_displayable() {
        let (service, _) = service(vec!["fixed the importer"], true);
        let reply = service.respond("C1", "U9", "give me a report").await;
        assert!(reply.starts_with("📊 *Here's your summary:*"));
    }
}
