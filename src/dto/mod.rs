pub mod content_dto;
pub mod qna_dto;
pub mod quiz_dto;
