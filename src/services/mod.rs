pub mod access_gate;
pub mod access_store;
pub mod analytics_service;
pub mod candidate_service;
pub mod job_post_service;
pub mod notification_service;
pub mod token_service;
