mod config;
mod http;

use clap::Parser;
use config::Config;
use recap_adapters::{GitHubClient, GoogleCalendarClient, JiraClient, OpenAiClient, SlackClient};
use recap_core::{Aggregator, BotService, CodeSource, SummaryPipeline};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::parse();

    info!("Starting recap server v{}", env!("CARGO_PKG_VERSION"));
    info!("HTTP: {}", config.http_addr);
    for (service, status) in config.service_status() {
        info!("{}: {}", service, status);
    }

    // Platform clients are built once and shared read-only across requests.
    let slack = Arc::new(SlackClient::new(config.slack_bot_token.clone()));
    let github = Arc::new(GitHubClient::new(
        config.github_token.clone(),
        config.github_repo.clone(),
    ));
    let jira = Arc::new(JiraClient::new(config.jira_config()));
    let calendar = Arc::new(GoogleCalendarClient::new(config.google_config()));
    let summarizer = Arc::new(OpenAiClient::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        config.openai_model.clone(),
    ));

    let aggregator = Aggregator::new(
        slack.clone(),
        github.clone(),
        jira.clone(),
        calendar.clone(),
    );
    let pipeline = Arc::new(SummaryPipeline::new(aggregator, summarizer));
    let bot = Arc::new(BotService::new(
        pipeline.clone(),
        slack.clone(),
        github.configured(),
    ));

    let state = http::AppState {
        chat: slack,
        code: github,
        tracker: jira,
        calendar,
        pipeline,
        bot,
        services: config.service_status(),
        missing_required: config.missing_required(),
        start_time: std::time::Instant::now(),
    };

    let app = http::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    info!("Starting HTTP server on {}", config.http_addr);
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;

    info!("recap server ready");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received, terminating...");
        })
        .await?;

    Ok(())
}
