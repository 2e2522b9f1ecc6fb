//! crates/autocoach_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage or transport beyond their
//! serde shape, which matches the JSON the store and wire protocol carry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The student's self-reported learning level, ordered from least to most
/// advanced. The serialized form is the human-readable label the profile
/// form offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LearningLevel {
    Beginner,
    #[serde(rename = "High School")]
    HighSchool,
    University,
    Professional,
    Expert,
}

impl LearningLevel {
    /// The label used in persona prompts and profile forms.
    pub fn label(&self) -> &'static str {
        match self {
            LearningLevel::Beginner => "Beginner",
            LearningLevel::HighSchool => "High School",
            LearningLevel::University => "University",
            LearningLevel::Professional => "Professional",
            LearningLevel::Expert => "Expert",
        }
    }
}

/// The student's profile and gamification state.
///
/// Invariant: `xp` is always strictly less than the XP threshold for
/// `level`; the leveling cascade in [`crate::progress`] maintains this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub learning_level: LearningLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_preferences: Option<String>,
    pub level: u32,
    pub xp: u64,
    pub streak: u32,
    /// Stored as YYYY-MM-DD, matching NaiveDate's serde form.
    pub last_login_date: NaiveDate,
}

impl UserProfile {
    /// A fresh profile as the sign-up flow creates it.
    pub fn new(name: String, learning_level: LearningLevel, today: NaiveDate) -> Self {
        Self {
            name,
            learning_level,
            subject_preferences: None,
            level: 1,
            xp: 0,
            streak: 1,
            last_login_date: today,
        }
    }
}

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageAuthor {
    User,
    Bot,
}

/// A single transcript entry. The last entry may be a bot message still
/// under construction while a response streams in; all earlier entries are
/// immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: MessageAuthor,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            author: MessageAuthor::User,
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            author: MessageAuthor::Bot,
            content: content.into(),
        }
    }
}

/// One multiple-choice question of a generated quiz. A quiz is exactly
/// three of these; quizzes are generated fresh per request and discarded
/// after completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    /// Exactly four options.
    pub options: Vec<String>,
    /// 0-based index into `options`.
    pub correct_answer_index: usize,
}
