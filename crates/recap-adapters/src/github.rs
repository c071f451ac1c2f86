use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recap_core::{
    CodeActivity, CodeCommit, CodeIssue, CodePullRequest, CodeRelease, CodeSource, NewCodeIssue,
    RecapError, RepoSummary, Result, SourceKind, TimeWindow,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("recap/", env!("CARGO_PKG_VERSION"));

/// GitHub REST client scoped to one repository.
pub struct GitHubClient {
    http: reqwest::Client,
    token: Option<String>,
    repo: Option<String>,
    base_url: String,
}

#[derive(Deserialize)]
struct WireUser {
    login: String,
}

#[derive(Deserialize)]
struct WirePull {
    number: u64,
    title: String,
    state: String,
    created_at: DateTime<Utc>,
    user: Option<WireUser>,
    html_url: String,
}

#[derive(Deserialize)]
struct WireLabel {
    name: String,
}

#[derive(Deserialize)]
struct WireIssue {
    number: u64,
    title: String,
    state: String,
    created_at: DateTime<Utc>,
    user: Option<WireUser>,
    #[serde(default)]
    labels: Vec<WireLabel>,
    html_url: String,
    /// Present when the "issue" is actually a pull request.
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct WireCommitAuthor {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct WireCommitInner {
    message: String,
    author: Option<WireCommitAuthor>,
}

#[derive(Deserialize)]
struct WireCommit {
    sha: String,
    commit: WireCommitInner,
    html_url: String,
}

#[derive(Deserialize)]
struct WireRelease {
    tag_name: String,
    name: Option<String>,
    body: Option<String>,
    created_at: DateTime<Utc>,
    html_url: String,
}

#[derive(Deserialize)]
struct WireRepo {
    name: String,
    full_name: String,
    description: Option<String>,
    html_url: String,
}

fn short_sha(sha: &str) -> String {
    sha.chars().take(7).collect()
}

fn author_login(user: Option<WireUser>) -> String {
    user.map(|u| u.login).unwrap_or_else(|| "unknown".to_string())
}

impl GitHubClient {
    pub fn new(token: Option<String>, repo: Option<String>) -> Self {
        Self::with_base_url(token, repo, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        token: Option<String>,
        repo: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: crate::http_client(),
            token: token.filter(|t| !t.is_empty()),
            repo: repo.filter(|r| !r.is_empty()),
            base_url: base_url.into(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.token.as_deref(), self.repo.as_deref()) {
            (Some(token), Some(repo)) => Ok((token, repo)),
            _ => Err(RecapError::unconfigured(SourceKind::Code)),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, token: &str, url: String) -> Result<T> {
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Code, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RecapError::api(SourceKind::Code, status.as_u16(), message));
        }

        response
            .json()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Code, e.to_string()))
    }

    async fn fetch_pulls(
        &self,
        token: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CodePullRequest>> {
        let wire: Vec<WirePull> = self
            .get_json(
                token,
                format!("{}/repos/{}/pulls?state=all&per_page=100", self.base_url, repo),
            )
            .await?;

        Ok(wire
            .into_iter()
            .filter(|p| p.created_at >= since)
            .map(|p| CodePullRequest {
                number: p.number,
                title: p.title,
                state: p.state,
                author: author_login(p.user),
                created_at: p.created_at,
                url: p.html_url,
            })
            .collect())
    }

    async fn fetch_issues(
        &self,
        token: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CodeIssue>> {
        let wire: Vec<WireIssue> = self
            .get_json(
                token,
                format!(
                    "{}/repos/{}/issues?state=all&since={}&per_page=100",
                    self.base_url,
                    repo,
                    since.to_rfc3339()
                ),
            )
            .await?;

        Ok(wire
            .into_iter()
            .filter(|i| i.pull_request.is_none() && i.created_at >= since)
            .map(|i| CodeIssue {
                number: i.number,
                title: i.title,
                state: i.state,
                author: author_login(i.user),
                created_at: i.created_at,
                labels: i.labels.into_iter().map(|l| l.name).collect(),
                url: i.html_url,
            })
            .collect())
    }

    async fn fetch_commits(
        &self,
        token: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CodeCommit>> {
        let result: Result<Vec<WireCommit>> = self
            .get_json(
                token,
                format!(
                    "{}/repos/{}/commits?since={}&per_page=100",
                    self.base_url,
                    repo,
                    since.to_rfc3339()
                ),
            )
            .await;

        let wire = match result {
            Ok(wire) => wire,
            // 409 means the repository has no commits at all; that is an
            // empty result, not a failure.
            Err(RecapError::SourceApi { status: 409, .. }) => {
                debug!("repository is empty, no commits to fetch");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        Ok(wire
            .into_iter()
            .map(|c| CodeCommit {
                sha: short_sha(&c.sha),
                message: c.commit.message,
                author: c
                    .commit
                    .author
                    .as_ref()
                    .and_then(|a| a.name.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                date: c
                    .commit
                    .author
                    .and_then(|a| a.date)
                    .unwrap_or_else(Utc::now),
                url: c.html_url,
            })
            .collect())
    }

    async fn fetch_releases(
        &self,
        token: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CodeRelease>> {
        let wire: Vec<WireRelease> = self
            .get_json(token, format!("{}/repos/{}/releases", self.base_url, repo))
            .await?;

        Ok(wire
            .into_iter()
            .filter(|r| r.created_at >= since)
            .map(|r| CodeRelease {
                name: r.name.unwrap_or_else(|| r.tag_name.clone()),
                tag_name: r.tag_name,
                body: r.body.unwrap_or_default(),
                created_at: r.created_at,
                url: r.html_url,
            })
            .collect())
    }
}

/// Render release notes from one window of repository activity.
fn render_release_notes(activity: &CodeActivity) -> String {
    let mut notes = vec!["# Release Notes".to_string(), String::new()];

    let merged: Vec<_> = activity
        .pull_requests
        .iter()
        .filter(|pr| pr.state == "closed")
        .collect();
    if !merged.is_empty() {
        notes.push("## New Features".to_string());
        for pr in merged {
            notes.push(format!("- {} (#{})", pr.title, pr.number));
        }
        notes.push(String::new());
    }

    let fixes: Vec<_> = activity
        .issues
        .iter()
        .filter(|i| i.state == "closed" && i.labels.iter().any(|l| l.eq_ignore_ascii_case("bug")))
        .collect();
    if !fixes.is_empty() {
        notes.push("## Bug Fixes".to_string());
        for issue in fixes {
            notes.push(format!("- {} (#{})", issue.title, issue.number));
        }
        notes.push(String::new());
    }

    if !activity.commits.is_empty() {
        notes.push("## Recent Commits".to_string());
        for commit in activity.commits.iter().take(10) {
            let first_line = commit.message.lines().next().unwrap_or_default();
            notes.push(format!("- {} ({})", first_line, commit.sha));
        }
    }

    notes.join("\n").trim_end().to_string()
}

#[async_trait]
impl CodeSource for GitHubClient {
    fn configured(&self) -> bool {
        self.credentials().is_ok()
    }

    async fn repository_activity(&self, window: TimeWindow) -> Result<CodeActivity> {
        let (token, repo) = self.credentials()?;
        let since = window.since();

        // Repository lookup failures propagate; the per-list fetches degrade
        // so one broken listing doesn't empty the whole report.
        let repository: WireRepo = self
            .get_json(token, format!("{}/repos/{}", self.base_url, repo))
            .await?;

        let pull_requests = self
            .fetch_pulls(token, repo, since)
            .await
            .unwrap_or_else(|err| {
                warn!("pull request listing failed: {}", err);
                Vec::new()
            });
        let issues = self
            .fetch_issues(token, repo, since)
            .await
            .unwrap_or_else(|err| {
                warn!("issue listing failed: {}", err);
                Vec::new()
            });
        let commits = self
            .fetch_commits(token, repo, since)
            .await
            .unwrap_or_else(|err| {
                warn!("commit listing failed: {}", err);
                Vec::new()
            });
        let releases = self
            .fetch_releases(token, repo, since)
            .await
            .unwrap_or_else(|err| {
                warn!("release listing failed: {}", err);
                Vec::new()
            });

        Ok(CodeActivity {
            pull_requests,
            issues,
            commits,
            releases,
            repository: Some(RepoSummary {
                name: repository.name,
                full_name: repository.full_name,
                description: repository.description,
                url: repository.html_url,
            }),
        })
    }

    async fn create_issue(&self, issue: NewCodeIssue) -> Result<CodeIssue> {
        let (token, repo) = self.credentials()?;

        let response = self
            .http
            .post(format!("{}/repos/{}/issues", self.base_url, repo))
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .json(&json!({
                "title": issue.title,
                "body": issue.body,
                "labels": issue.labels,
            }))
            .send()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Code, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RecapError::api(SourceKind::Code, status.as_u16(), message));
        }

        let created: WireIssue = response
            .json()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Code, e.to_string()))?;

        Ok(CodeIssue {
            number: created.number,
            title: created.title,
            state: created.state,
            author: author_login(created.user),
            created_at: created.created_at,
            labels: created.labels.into_iter().map(|l| l.name).collect(),
            url: created.html_url,
        })
    }

    async fn release_notes(&self, window: TimeWindow) -> Result<String> {
        let activity = self.repository_activity(window).await?;
        Ok(render_release_notes(&activity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_decoding_truncates_sha() {
        let wire: WireCommit = serde_json::from_value(serde_json::json!({
            "sha": "0123456789abcdef0123456789abcdef01234567",
            "html_url": "https://github.com/acme/widgets/commit/0123456",
            "commit": {
                "message": "Fix pagination off-by-one\n\nDetails here",
                "author": {"name": "Dev One", "date": "2026-07-30T12:00:00Z"}
            }
        }))
        .unwrap();

        assert_eq!(short_sha(&wire.sha), "0123456");
        assert_eq!(short_sha(&wire.sha).len(), 7);
    }

    #[test]
    fn pull_requests_inside_issue_listing_are_dropped() {
        let wire: Vec<WireIssue> = serde_json::from_value(serde_json::json!([
            {
                "number": 10,
                "title": "Crash on empty config",
                "state": "open",
                "created_at": "2026-07-30T12:00:00Z",
                "user": {"login": "dev"},
                "labels": [{"name": "bug"}],
                "html_url": "https://github.com/acme/widgets/issues/10"
            },
            {
                "number": 11,
                "title": "Add retry support",
                "state": "open",
                "created_at": "2026-07-30T13:00:00Z",
                "user": {"login": "dev"},
                "html_url": "https://github.com/acme/widgets/pull/11",
                "pull_request": {"url": "https://api.github.com/repos/acme/widgets/pulls/11"}
            }
        ]))
        .unwrap();

        let issues: Vec<_> = wire.into_iter().filter(|i| i.pull_request.is_none()).collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].number, 10);
    }

    #[test]
    fn unconfigured_client_is_reported() {
        let client = GitHubClient::new(None, Some("acme/widgets".into()));
        assert!(!client.configured());
        assert!(matches!(
            client.credentials(),
            Err(RecapError::Unconfigured {
                source: SourceKind::Code
            })
        ));

        let client = GitHubClient::new(Some("ghp_token".into()), Some("acme/widgets".into()));
        assert!(client.configured());
    }

    fn commit(n: usize, message: &str) -> CodeCommit {
        CodeCommit {
            sha: format!("{:07x}", n),
            message: message.to_string(),
            author: "dev".into(),
            date: Utc::now(),
            url: "https://example.com".into(),
        }
    }

    #[test]
    fn release_notes_render_all_sections() {
        let activity = CodeActivity {
            pull_requests: vec![CodePullRequest {
                number: 5,
                title: "Add CSV export".into(),
                state: "closed".into(),
                author: "dev".into(),
                created_at: Utc::now(),
                url: "https://example.com/pull/5".into(),
            }],
            issues: vec![CodeIssue {
                number: 6,
                title: "Fix timezone drift".into(),
                state: "closed".into(),
                author: "dev".into(),
                created_at: Utc::now(),
                labels: vec!["Bug".into()],
                url: "https://example.com/issues/6".into(),
            }],
            commits: vec![commit(1, "Initial import\n\nlong body")],
            ..Default::default()
        };

        let notes = render_release_notes(&activity);
        assert!(notes.starts_with("# Release Notes"));
        assert!(notes.contains("## New Features\n- Add CSV export (#5)"));
        assert!(notes.contains("## Bug Fixes\n- Fix timezone drift (#6)"));
        assert!(notes.contains("## Recent Commits\n- Initial import (0000001)"));
    }

    #[test]
    fn release_notes_omit_empty_headings() {
        let activity = CodeActivity {
            commits: vec![commit(1, "Only a commit")],
            ..Default::default()
        };

        let notes = render_release_notes(&activity);
        assert!(!notes.contains("## New Features"));
        assert!(!notes.contains("## Bug Fixes"));
        assert!(notes.contains("## Recent Commits"));
    }

    #[test]
    fn recent_commits_cap_at_ten() {
        let activity = CodeActivity {
            commits: (0..15).map(|i| commit(i, "change")).collect(),
            ..Default::default()
        };

        let notes = render_release_notes(&activity);
        let commit_lines = notes
            .lines()
            .filter(|l| l.starts_with("- change"))
            .count();
        assert_eq!(commit_lines, 10);
    }
}
