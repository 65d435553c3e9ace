pub mod chat;
pub mod health;
pub mod qna;
pub mod upload;
