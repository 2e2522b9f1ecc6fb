//! crates/autocoach_core/src/quiz.rs
//!
//! Quiz derivation helpers: selecting recent conversation topics, the JSON
//! schema the backend reply is constrained to, and strict reply parsing.
//!
//! "Not enough context" is a valid zero-result (`recent_topics` returns
//! `None` and no backend call happens), while a reply that cannot be parsed
//! is a `MalformedResponse` error. Callers must keep the two distinct.

use crate::domain::{ChatMessage, MessageAuthor, QuizQuestion};
use crate::ports::{PortError, PortResult};
use serde::Deserialize;
use serde_json::json;

/// Separator between joined topic excerpts.
const TOPIC_SEPARATOR: &str = "\n\n---\n\n";

/// Number of trailing bot messages mined for quiz topics.
const RECENT_BOT_MESSAGES: usize = 5;

#[derive(Debug, Deserialize)]
struct QuizReply {
    quiz: Vec<QuizQuestion>,
}

/// Joins the last five bot-authored transcript entries, in original order.
/// Returns `None` when the joined text is empty or whitespace.
pub fn recent_topics(history: &[ChatMessage]) -> Option<String> {
    let bot_contents: Vec<&str> = history
        .iter()
        .filter(|m| m.author == MessageAuthor::Bot)
        .map(|m| m.content.as_str())
        .collect();

    let start = bot_contents.len().saturating_sub(RECENT_BOT_MESSAGES);
    let joined = bot_contents[start..].join(TOPIC_SEPARATOR);

    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// The JSON schema the structured quiz request is constrained to: an object
/// holding `quiz`, an array of question objects.
pub fn quiz_response_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "quiz": {
                "type": "array",
                "description": "An array of 3 multiple-choice quiz questions.",
                "items": {
                    "type": "object",
                    "properties": {
                        "question": {
                            "type": "string",
                            "description": "The quiz question."
                        },
                        "options": {
                            "type": "array",
                            "description": "An array of 4 possible answers.",
                            "items": { "type": "string" }
                        },
                        "correctAnswerIndex": {
                            "type": "integer",
                            "description": "The 0-based index of the correct answer in the options array."
                        }
                    },
                    "required": ["question", "options", "correctAnswerIndex"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["quiz"],
        "additionalProperties": false
    })
}

/// Parses a structured quiz reply. Any shape violation is a
/// [`PortError::MalformedResponse`].
pub fn parse_quiz_reply(raw: &str) -> PortResult<Vec<QuizQuestion>> {
    let reply: QuizReply = serde_json::from_str(raw.trim())
        .map_err(|e| PortError::MalformedResponse(format!("quiz reply is not valid JSON: {e}")))?;

    for (i, question) in reply.quiz.iter().enumerate() {
        if question.options.len() != 4 {
            return Err(PortError::MalformedResponse(format!(
                "question {} has {} options, expected 4",
                i + 1,
                question.options.len()
            )));
        }
        if question.correct_answer_index >= question.options.len() {
            return Err(PortError::MalformedResponse(format!(
                "question {} has out-of-range answer index {}",
                i + 1,
                question.correct_answer_index
            )));
        }
    }

    Ok(reply.quiz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_has_no_topics() {
        assert_eq!(recent_topics(&[]), None);
    }

    #[test]
    fn user_messages_are_ignored() {
        let history = vec![ChatMessage::user("teach me calculus")];
        assert_eq!(recent_topics(&history), None);
    }

    #[test]
    fn whitespace_bot_messages_are_not_enough_context() {
        let history = vec![ChatMessage::bot("   "), ChatMessage::bot("")];
        assert_eq!(recent_topics(&history), None);
    }

    #[test]
    fn keeps_last_five_bot_messages_in_order() {
        let mut history = Vec::new();
        for i in 1..=7 {
            history.push(ChatMessage::user(format!("q{i}")));
            history.push(ChatMessage::bot(format!("a{i}")));
        }
        let topics = recent_topics(&history).unwrap();
        assert_eq!(topics, "a3\n\n---\n\na4\n\n---\n\na5\n\n---\n\na6\n\n---\n\na7");
    }

    #[test]
    fn parses_a_well_formed_reply() {
        let raw = r#"{
            "quiz": [
                {
                    "question": "What is 2 + 2?",
                    "options": ["3", "4", "5", "22"],
                    "correctAnswerIndex": 1
                }
            ]
        }"#;
        let quiz = parse_quiz_reply(raw).unwrap();
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].correct_answer_index, 1);
    }

    #[test]
    fn rejects_non_json() {
        let err = parse_quiz_reply("Sure! Here is your quiz:").unwrap_err();
        assert!(matches!(err, PortError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_a_missing_quiz_array() {
        let err = parse_quiz_reply(r#"{"questions": []}"#).unwrap_err();
        assert!(matches!(err, PortError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_wrong_option_counts() {
        let raw = r#"{"quiz": [{"question": "?", "options": ["a", "b"], "correctAnswerIndex": 0}]}"#;
        assert!(matches!(
            parse_quiz_reply(raw),
            Err(PortError::MalformedResponse(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_answer_index() {
        let raw =
            r#"{"quiz": [{"question": "?", "options": ["a", "b", "c", "d"], "correctAnswerIndex": 4}]}"#;
        assert!(matches!(
            parse_quiz_reply(raw),
            Err(PortError::MalformedResponse(_))
        ));
    }
}
