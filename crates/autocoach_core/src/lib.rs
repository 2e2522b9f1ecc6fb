pub mod domain;
pub mod extract;
pub mod persona;
pub mod ports;
pub mod progress;
pub mod quiz;
pub mod rate_limit;

pub use domain::{ChatMessage, LearningLevel, MessageAuthor, QuizQuestion, UserProfile};
pub use extract::MessageSegment;
pub use ports::{ChatModelService, ChatSession, PortError, PortResult, ProfileStore, TextFragmentStream};
pub use rate_limit::RateLimiter;
