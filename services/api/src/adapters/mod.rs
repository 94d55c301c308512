pub mod db;
pub mod llm;

pub use db::PgStore;
pub use llm::OpenAiCorrectionAdapter;
