use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recap_core::{
    NewTrackerIssue, RecapError, Result, SourceKind, TimeWindow, TrackerIssue, TrackerProject,
    TrackerSource, TrackerSprint,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Connection settings for a Jira Cloud instance.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Base URL, e.g. `https://acme.atlassian.net`.
    pub server: String,
    pub email: String,
    pub api_token: String,
}

/// Jira REST client.
///
/// Read operations on an unconfigured client return empty collections.
/// There is no authenticated probe until the first real call, so
/// "unconfigured" and "no results" are deliberately the same signal on
/// reads. Writes report `Unconfigured` explicitly.
pub struct JiraClient {
    http: reqwest::Client,
    config: Option<JiraConfig>,
}

#[derive(Deserialize)]
struct WireProject {
    key: String,
    name: String,
    id: String,
}

#[derive(Deserialize)]
struct WireNamed {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    display_name: String,
}

#[derive(Deserialize)]
struct WireFields {
    summary: String,
    status: WireNamed,
    priority: Option<WireNamed>,
    assignee: Option<WireUser>,
    reporter: Option<WireUser>,
    created: String,
    updated: String,
    issuetype: WireNamed,
}

#[derive(Deserialize)]
struct WireIssue {
    key: String,
    fields: WireFields,
}

#[derive(Deserialize)]
struct WireSearch {
    #[serde(default)]
    issues: Vec<WireIssue>,
}

#[derive(Deserialize)]
struct WireBoard {
    id: u64,
}

#[derive(Deserialize)]
struct WireBoards {
    #[serde(default)]
    values: Vec<WireBoard>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSprint {
    id: u64,
    name: String,
    state: String,
    start_date: Option<String>,
    end_date: Option<String>,
    goal: Option<String>,
}

#[derive(Deserialize)]
struct WireSprints {
    #[serde(default)]
    values: Vec<WireSprint>,
}

#[derive(Deserialize)]
struct WireCreated {
    key: String,
}

/// JQL for issues created in the lookback window, newest first.
fn issues_jql(project_key: &str, since: DateTime<Utc>) -> String {
    format!(
        "project = {} AND created >= '{}' ORDER BY created DESC",
        project_key,
        since.format("%Y-%m-%d")
    )
}

fn browse_url(server: &str, key: &str) -> String {
    format!("{}/browse/{}", server.trim_end_matches('/'), key)
}

fn to_issue(server: &str, wire: WireIssue) -> TrackerIssue {
    TrackerIssue {
        url: browse_url(server, &wire.key),
        summary: wire.fields.summary,
        status: wire.fields.status.name,
        priority: wire.fields.priority.map(|p| p.name),
        assignee: wire.fields.assignee.map(|a| a.display_name),
        reporter: wire.fields.reporter.map(|r| r.display_name),
        created: wire.fields.created,
        updated: wire.fields.updated,
        issue_type: wire.fields.issuetype.name,
        key: wire.key,
    }
}

impl JiraClient {
    pub fn new(config: Option<JiraConfig>) -> Self {
        Self {
            http: crate::http_client(),
            config,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, cfg: &JiraConfig, path: &str) -> Result<T> {
        let url = format!("{}{}", cfg.server.trim_end_matches('/'), path);
        let response = self
            .http
            .get(&url)
            .basic_auth(&cfg.email, Some(&cfg.api_token))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Tracker, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RecapError::api(
                SourceKind::Tracker,
                status.as_u16(),
                message,
            ));
        }

        response
            .json()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Tracker, e.to_string()))
    }

    async fn search(&self, cfg: &JiraConfig, jql: &str, max_results: u32) -> Result<Vec<TrackerIssue>> {
        let path = format!(
            "/rest/api/2/search?jql={}&maxResults={}",
            urlencoding::encode(jql),
            max_results
        );
        let body: WireSearch = self.get_json(cfg, &path).await?;
        Ok(body
            .issues
            .into_iter()
            .map(|i| to_issue(&cfg.server, i))
            .collect())
    }
}

#[async_trait]
impl TrackerSource for JiraClient {
    fn configured(&self) -> bool {
        self.config.is_some()
    }

    async fn projects(&self) -> Result<Vec<TrackerProject>> {
        let Some(cfg) = &self.config else {
            debug!("tracker not configured, returning no projects");
            return Ok(Vec::new());
        };

        let wire: Vec<WireProject> = self.get_json(cfg, "/rest/api/2/project").await?;
        Ok(wire
            .into_iter()
            .map(|p| TrackerProject {
                key: p.key,
                name: p.name,
                id: p.id,
            })
            .collect())
    }

    async fn project_issues(
        &self,
        project_key: &str,
        window: TimeWindow,
    ) -> Result<Vec<TrackerIssue>> {
        let Some(cfg) = &self.config else {
            debug!("tracker not configured, returning no issues");
            return Ok(Vec::new());
        };

        let jql = issues_jql(project_key, window.since());
        self.search(cfg, &jql, 50).await
    }

    async fn sprints(&self, project_key: &str) -> Result<Vec<TrackerSprint>> {
        let Some(cfg) = &self.config else {
            debug!("tracker not configured, returning no sprints");
            return Ok(Vec::new());
        };

        let boards: WireBoards = self
            .get_json(
                cfg,
                &format!(
                    "/rest/agile/1.0/board?projectKeyOrId={}",
                    urlencoding::encode(project_key)
                ),
            )
            .await?;

        // Sprints hang off a board; no board means no sprints.
        let Some(board) = boards.values.first() else {
            return Ok(Vec::new());
        };

        let sprints: WireSprints = self
            .get_json(cfg, &format!("/rest/agile/1.0/board/{}/sprint", board.id))
            .await?;

        Ok(sprints
            .values
            .into_iter()
            .map(|s| TrackerSprint {
                id: s.id,
                name: s.name,
                state: s.state,
                start_date: s.start_date,
                end_date: s.end_date,
                goal: s.goal,
            })
            .collect())
    }

    async fn sprint_issues(&self, sprint_id: u64) -> Result<Vec<TrackerIssue>> {
        let Some(cfg) = &self.config else {
            debug!("tracker not configured, returning no sprint issues");
            return Ok(Vec::new());
        };

        self.search(cfg, &format!("sprint = {}", sprint_id), 50).await
    }

    async fn create_issue(&self, issue: NewTrackerIssue) -> Result<TrackerIssue> {
        let cfg = self
            .config
            .as_ref()
            .ok_or(RecapError::unconfigured(SourceKind::Tracker))?;

        let url = format!("{}/rest/api/2/issue", cfg.server.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .basic_auth(&cfg.email, Some(&cfg.api_token))
            .json(&json!({
                "fields": {
                    "project": {"key": issue.project_key},
                    "summary": issue.summary,
                    "description": issue.description,
                    "issuetype": {"name": issue.issue_type},
                }
            }))
            .send()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Tracker, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RecapError::api(
                SourceKind::Tracker,
                status.as_u16(),
                message,
            ));
        }

        let created: WireCreated = response
            .json()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Tracker, e.to_string()))?;

        // The create response carries only identifiers; fetch the issue to
        // return its populated fields.
        let wire: WireIssue = self
            .get_json(cfg, &format!("/rest/api/2/issue/{}", created.key))
            .await?;
        Ok(to_issue(&cfg.server, wire))
    }
}
