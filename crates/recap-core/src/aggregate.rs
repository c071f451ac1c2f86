use crate::bundle::{ContextBundle, SourceResult};
use crate::compose;
use crate::error::Result;
use crate::sources::{CalendarSource, ChatSource, CodeSource, Summarizer, TrackerSource};
use crate::sources::default_calendar_id;
use crate::types::{SourceKind, TimeWindow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Returned verbatim when no enabled source produced anything; the
/// summarizer is never invoked in that case.
pub const NO_DATA_MESSAGE: &str = "No data found for the specified time period.";

/// Returned when sources produced records but nothing renderable survived
/// filtering (e.g. only join notices).
pub const NO_RELEVANT_MESSAGES: &str = "No relevant messages found for summary generation.";

fn default_days() -> u32 {
    7
}

/// Which sources to aggregate, and over what window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub channel_id: String,
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default)]
    pub include_code: bool,
    #[serde(default)]
    pub include_tracker: bool,
    #[serde(default)]
    pub include_calendar: bool,
    #[serde(default)]
    pub tracker_project_key: Option<String>,
}

impl SummaryRequest {
    pub fn for_channel(channel_id: impl Into<String>, days: u32) -> Self {
        SummaryRequest {
            channel_id: channel_id.into(),
            days,
            include_code: false,
            include_tracker: false,
            include_calendar: false,
            tracker_project_key: None,
        }
    }
}

/// The externally visible artifact of one summary request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryResult {
    pub text: String,
    pub sources_used: BTreeSet<SourceKind>,
}

/// Fans out to the enabled sources and merges the results into one bundle.
///
/// A single source failing never fails the aggregate call: the failure is
/// captured as a `Failed` bundle entry and logged. The fetches have no data
/// dependency on one another and run concurrently for latency only.
pub struct Aggregator {
    chat: Arc<dyn ChatSource>,
    code: Arc<dyn CodeSource>,
    tracker: Arc<dyn TrackerSource>,
    calendar: Arc<dyn CalendarSource>,
}

impl Aggregator {
    pub fn new(
        chat: Arc<dyn ChatSource>,
        code: Arc<dyn CodeSource>,
        tracker: Arc<dyn TrackerSource>,
        calendar: Arc<dyn CalendarSource>,
    ) -> Self {
        Self {
            chat,
            code,
            tracker,
            calendar,
        }
    }

    pub async fn aggregate(&self, request: &SummaryRequest) -> Result<ContextBundle> {
        let window = TimeWindow::new(request.days)?;

        let chat_fut = self.chat.fetch_messages(&request.channel_id, window);

        let code_fut = async {
            if !request.include_code {
                return SourceResult::Absent;
            }
            capture(SourceKind::Code, self.code.repository_activity(window).await)
        };

        let tracker_fut = async {
            if !request.include_tracker {
                return SourceResult::Absent;
            }
            let key = match request.tracker_project_key.as_deref() {
                Some(k) if !k.is_empty() => k,
                // Enabled but unusable without a project key: skip entirely.
                _ => return SourceResult::Absent,
            };
            capture(
                SourceKind::Tracker,
                self.tracker_activity(key, window).await,
            )
        };

        let calendar_fut = async {
            if !request.include_calendar {
                return SourceResult::Absent;
            }
            capture(
                SourceKind::Calendar,
                self.calendar.activity(window, &default_calendar_id()).await,
            )
        };

        let (chat, code, tracker, calendar) =
            futures::join!(chat_fut, code_fut, tracker_fut, calendar_fut);

        // Chat is the baseline source; a failure degrades to no messages
        // rather than aborting the whole request.
        let chat = match chat {
            Ok(messages) => messages,
            Err(err) => {
                warn!("chat fetch failed, continuing without messages: {}", err);
                Vec::new()
            }
        };

        Ok(ContextBundle {
            chat,
            code,
            tracker,
            calendar,
        })
    }

    async fn tracker_activity(
        &self,
        project_key: &str,
        window: TimeWindow,
    ) -> Result<crate::types::TrackerActivity> {
        let issues = self.tracker.project_issues(project_key, window).await?;
        let sprints = self.tracker.sprints(project_key).await?;
        Ok(crate::types::TrackerActivity { issues, sprints })
    }
}

fn capture<T>(source: SourceKind, result: Result<T>) -> SourceResult<T> {
    match result {
        Ok(data) => SourceResult::Populated(data),
        Err(err) => {
            warn!("{} fetch failed: {}", source, err);
            SourceResult::Failed(err)
        }
    }
}

/// The full fetch → compose → summarize flow for one request.
pub struct SummaryPipeline {
    aggregator: Aggregator,
    summarizer: Arc<dyn Summarizer>,
}

impl SummaryPipeline {
    pub fn new(aggregator: Aggregator, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            aggregator,
            summarizer,
        }
    }

    /// Generate a summary, short-circuiting on empty input so the
    /// summarization endpoint is never paid for nothing.
    pub async fn generate(&self, request: &SummaryRequest) -> Result<SummaryResult> {
        let bundle = self.aggregator.aggregate(request).await?;

        if !bundle.has_data() {
            return Ok(SummaryResult {
                text: NO_DATA_MESSAGE.to_string(),
                sources_used: BTreeSet::new(),
            });
        }

        let sources_used = bundle.sources_used();

        let prompt = match compose::compose(&bundle) {
            Some(prompt) => prompt,
            None => {
                return Ok(SummaryResult {
                    text: NO_RELEVANT_MESSAGES.to_string(),
                    sources_used: BTreeSet::new(),
                })
            }
        };

        let text = self.summarizer.summarize(&prompt).await;
        Ok(SummaryResult { text, sources_used })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecapError;
    use crate::testing::{message, CountingSummarizer, FakeCalendar, FakeChat, FakeCode, FakeTracker};
    use crate::types::*;
    use std::sync::atomic::Ordering;

    fn pipeline(
        chat: FakeChat,
        code: FakeCode,
        summarizer: Arc<CountingSummarizer>,
    ) -> SummaryPipeline {
        let aggregator = Aggregator::new(
            Arc::new(chat),
            Arc::new(code),
            Arc::new(FakeTracker),
            Arc::new(FakeCalendar),
        );
        SummaryPipeline::new(aggregator, summarizer)
    }

    #[tokio::test]
    async fn empty_input_short_circuits_without_summarizing() {
        let summarizer = Arc::new(CountingSummarizer::new());
        let pipeline = pipeline(
            FakeChat {
                messages: Vec::new(),
                fail: false,
            },
            FakeCode {
                activity: Ok(CodeActivity::default()),
            },
            summarizer.clone(),
        );

        let result = pipeline
            .generate(&SummaryRequest::for_channel("C123", 7))
            .await
            .unwrap();

        assert_eq!(result.text, NO_DATA_MESSAGE);
        assert!(result.sources_used.is_empty());
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn chat_only_flow_invokes_summarizer_once() {
        let summarizer = Arc::new(CountingSummarizer::new());
        let pipeline = pipeline(
            FakeChat {
                messages: vec![
                    message("finished the importer"),
                    message("reviewing the schema change"),
                    message("deploy is blocked on infra"),
                ],
                fail: false,
            },
            FakeCode {
                activity: Ok(CodeActivity::default()),
            },
            summarizer.clone(),
        );

        let result = pipeline
            .generate(&SummaryRequest::for_channel("C123", 7))
            .await
            .unwrap();

        assert_eq!(result.text, "generated summary");
        assert_eq!(
            result.sources_used.iter().copied().collect::<Vec<_>>(),
            vec![SourceKind::Chat]
        );
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);

        let prompt = summarizer.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt.sections.len(), 1);
        assert_eq!(prompt.sections[0].label, crate::compose::CHAT_SECTION);
        assert_eq!(prompt.sections[0].body.lines().count(), 3);
    }

    #[tokio::test]
    async fn failing_code_source_is_captured_not_propagated() {
        let summarizer = Arc::new(CountingSummarizer::new());
        let aggregator = Aggregator::new(
            Arc::new(FakeChat {
                messages: vec![message("working on auth")],
                fail: false,
            }),
            Arc::new(FakeCode {
                activity: Err(RecapError::api(SourceKind::Code, 500, "boom")),
            }),
            Arc::new(FakeTracker),
            Arc::new(FakeCalendar),
        );

        let mut request = SummaryRequest::for_channel("C123", 7);
        request.include_code = true;

        let bundle = aggregator.aggregate(&request).await.unwrap();
        assert!(bundle.code.error().is_some());
        assert!(bundle.has_data());

        let pipeline = SummaryPipeline::new(aggregator, summarizer.clone());
        let result = pipeline.generate(&request).await.unwrap();
        assert_eq!(result.text, "generated summary");
        assert!(!result.sources_used.contains(&SourceKind::Code));
    }

    #[tokio::test]
    async fn tracker_without_project_key_is_absent() {
        let aggregator = Aggregator::new(
            Arc::new(FakeChat {
                messages: Vec::new(),
                fail: false,
            }),
            Arc::new(FakeCode {
                activity: Ok(CodeActivity::default()),
            }),
            Arc::new(FakeTracker),
            Arc::new(FakeCalendar),
        );

        let mut request = SummaryRequest::for_channel("C123", 7);
        request.include_tracker = true;
        request.tracker_project_key = None;

        let bundle = aggregator.aggregate(&request).await.unwrap();
        assert!(bundle.tracker.is_absent());
    }

    #[tokio::test]
    async fn chat_failure_degrades_to_empty() {
        let aggregator = Aggregator::new(
            Arc::new(FakeChat {
                messages: Vec::new(),
                fail: true,
            }),
            Arc::new(FakeCode {
                activity: Ok(CodeActivity::default()),
            }),
            Arc::new(FakeTracker),
            Arc::new(FakeCalendar),
        );

        let bundle = aggregator
            .aggregate(&SummaryRequest::for_channel("C123", 7))
            .await
            .unwrap();
        assert!(bundle.chat.is_empty());
    }

    #[tokio::test]
    async fn invalid_window_is_rejected_before_any_fetch() {
        let aggregator = Aggregator::new(
            Arc::new(FakeChat {
                messages: Vec::new(),
                fail: false,
            }),
            Arc::new(FakeCode {
                activity: Ok(CodeActivity::default()),
            }),
            Arc::new(FakeTracker),
            Arc::new(FakeCalendar),
        );

        let result = aggregator
            .aggregate(&SummaryRequest::for_channel("C123", 0))
            .await;
        assert!(matches!(result, Err(RecapError::Validation(_))));
    }
}
