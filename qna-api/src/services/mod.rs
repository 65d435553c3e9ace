pub mod answers;
pub mod batch;
pub mod chat;

pub use answers::AnswerGenerator;
pub use chat::{ChatOutcome, ChatSettings};
