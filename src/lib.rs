pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::services::{
    access_gate::AccessGate,
    access_store::PgAccessStore,
    analytics_service::{AnalyticsService, OpenAiModel, PgAnalyticsStore},
    candidate_service::CandidateService,
    job_post_service::JobPostService,
    notification_service::NotificationService,
    token_service::LinkTokenService,
};
use crate::utils::time::{Clock, SystemClock};
use reqwest::Client;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub access_gate: AccessGate,
    pub job_post_service: JobPostService,
    pub candidate_service: CandidateService,
    pub notification_service: NotificationService,
    pub analytics_service: AnalyticsService,
}

impl AppState {
    pub fn new(pool: PgPool) -> error::Result<Self> {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tokens = LinkTokenService::new(&config.link_token_secret);

        let access_gate = AccessGate::new(
            Arc::new(PgAccessStore::new(pool.clone())),
            clock.clone(),
            tokens.clone(),
        )
        .with_right_answers(config.expose_right_answers);
        let job_post_service = JobPostService::new(pool.clone());
        let candidate_service = CandidateService::new(pool.clone());
        let notification_service = NotificationService::new(
            pool.clone(),
            tokens,
            clock,
            config.frontend_url.clone(),
        );
        let analytics_service = AnalyticsService::new(
            Arc::new(PgAnalyticsStore::new(pool.clone())),
            Arc::new(OpenAiModel::new(
                config.openai_api_key.clone(),
                config.openai_model.clone(),
                http_client,
            )),
        );

        Ok(Self {
            pool,
            access_gate,
            job_post_service,
            candidate_service,
            notification_service,
            analytics_service,
        })
    }
}
