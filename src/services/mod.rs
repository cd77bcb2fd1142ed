pub mod ai_service;
pub mod analytics_service;
pub mod content_service;
pub mod grading_service;
pub mod lockdown_service;
pub mod quiz_session;
pub mod report_service;
pub mod session_registry;
