pub mod candidate;
pub mod interview_answer;
pub mod interview_question;
pub mod job_post;
pub mod outbox_message;
