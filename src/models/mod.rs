pub mod analytics;
pub mod answer;
pub mod document;
pub mod question;
