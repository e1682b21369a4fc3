pub mod access_dto;
pub mod analytics_dto;
pub mod candidate_dto;
pub mod job_post_dto;
