pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    ai_service::AIService, analytics_service::AnalyticsService,
    content_service::ContentService, lockdown_service::DEFAULT_TICK_PERIOD,
    session_registry::SessionRegistry,
};
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub ai_service: AIService,
    pub analytics_service: AnalyticsService,
    pub content_service: ContentService,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        let ai_service = AIService::new(
            config.llm_api_key.clone(),
            config.llm_base_url.clone(),
            config.llm_model.clone(),
            config.shuffle_options,
            http_client.clone(),
        );
        let analytics_service = AnalyticsService::new(
            &config.posthog_host,
            &config.posthog_project_id,
            config.posthog_api_key.clone(),
            http_client,
        )?;
        let content_service = ContentService::new(config.content_dir.clone());
        let sessions = SessionRegistry::new(config.lockdown_warning_seconds, DEFAULT_TICK_PERIOD);

        Ok(Self {
            ai_service,
            analytics_service,
            content_service,
            sessions,
        })
    }
}
