pub mod chat_llm;
pub mod store;

pub use chat_llm::OpenAiChatAdapter;
pub use store::JsonFileStore;
