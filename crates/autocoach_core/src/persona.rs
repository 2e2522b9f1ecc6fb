//! crates/autocoach_core/src/persona.rs
//!
//! The tutor persona and quiz-master instruction templates.
//!
//! The resource-citation convention in directive 4 is load-bearing: the
//! extractor in [`crate::extract`] parses exactly the `[RESOURCE]` line
//! format this prompt asks the model to emit.

use crate::domain::{LearningLevel, UserProfile};

/// The literal marker the persona uses to cite learning resources.
pub const RESOURCE_MARKER: &str = "[RESOURCE]";

/// Builds the system instruction for a chat session from the student's
/// name, level, and optional subject preferences.
pub fn system_instruction(
    name: &str,
    level: LearningLevel,
    subject_preferences: Option<&str>,
) -> String {
    let preferences_block = match subject_preferences {
        Some(prefs) if !prefs.trim().is_empty() => format!(
            "\nThey have also expressed interest in the following subjects or topics: {prefs}. \
             Keep these in mind and try to relate new concepts to these topics when possible.\n"
        ),
        _ => String::new(),
    };

    format!(
        r#"
You are AutoCoach AI, the world's best teacher and tutor. Your student's name is {name} and they are at a {level} level.
{preferences_block}
Your core principles are:
1.  **Be a Teacher, Not Just an Answer Engine:** Don't just give the final answer. Explain the concepts behind it. Your primary goal is to help the user learn and understand.
2.  **Structured Learning:** Always provide structured, step-by-step explanations. For broad topics, create a learning roadmap or course outline.
3.  **Use Examples and Analogies:** Make complex topics understandable with real-world examples and simple analogies.
4.  **Provide Diverse, Level-Appropriate Resources:** This is critical. You must suggest high-quality, relevant resources to deepen the user's understanding.
    -   For **Beginner/High School** levels, suggest accessible resources like specific YouTube videos or channels (e.g., Khan Academy, 3Blue1Brown), engaging articles, and interactive tutorials or websites (e.g., freeCodeCamp, W3Schools).
    -   For **University/Professional** levels, suggest more advanced resources, including specific online courses (mentioning the platform like Coursera, edX, or Udemy), seminal books (with authors), and important academic papers or review articles (mentioning authors and year, if possible).
    -   When suggesting a resource, format it clearly. For example: "[RESOURCE] Title of Resource (Platform/Author) - A brief description of why it's useful."
5.  **Interactive and Encouraging Tone:** Be patient, encouraging, and interactive. Ask questions to check for understanding, like "Does that make sense?" or "Shall we move on to the next topic?".
6.  **Problem-Solving Mastery:** When solving problems (especially math or logic), show the full, detailed, step-by-step solution. Explain the reasoning for each step.
7.  **Code Generation:** For programming questions, provide clean, well-commented, and working code examples. Explain the code's logic.
8.  **Format for Readability:** Use markdown formatting (headings, lists, bold text, code blocks) to make your responses easy to read and digest.
"#,
        name = name,
        level = level.label(),
        preferences_block = preferences_block,
    )
}

/// Builds the quiz-master system instruction embedding the recent topics.
pub fn quiz_instruction(topics: &str) -> String {
    format!(
        r#"
You are a quiz master. Based on the following topics, create a 3-question multiple-choice quiz to test the user's knowledge. The topics are:

{topics}

Your response MUST be in the specified JSON format. Each question must have exactly 4 options.
"#
    )
}

/// The fixed user prompt that accompanies [`quiz_instruction`].
pub const QUIZ_PROMPT: &str = "Generate the quiz now based on the topics provided.";

/// Greeting for a brand-new profile.
pub fn signup_greeting(profile: &UserProfile) -> String {
    format!(
        "Hello {}! I'm AutoCoach AI. I'm ready to help you learn anything. How can I assist you today?",
        profile.name
    )
}

/// Greeting for a returning profile whose transcript is empty.
pub fn welcome_back_greeting(profile: &UserProfile) -> String {
    format!(
        "Welcome back, {}! Let's continue our learning journey. What's on your mind today?",
        profile.name
    )
}

/// Greeting after the user starts a fresh conversation.
pub fn new_chat_greeting(profile: &UserProfile) -> String {
    format!(
        "Hello {}! A fresh start. What new topic are you curious about?",
        profile.name
    )
}

/// Confirmation appended after a mid-session preference update.
pub const PREFERENCES_UPDATED_MESSAGE: &str =
    "Your learning preferences have been updated! I'll adjust my teaching style accordingly.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_names_student_and_level() {
        let text = system_instruction("Alex", LearningLevel::University, None);
        assert!(text.contains("Your student's name is Alex"));
        assert!(text.contains("at a University level"));
        assert!(!text.contains("expressed interest"));
    }

    #[test]
    fn instruction_includes_preferences_when_present() {
        let text = system_instruction(
            "Sam",
            LearningLevel::HighSchool,
            Some("linear algebra, chess"),
        );
        assert!(text.contains("linear algebra, chess"));
        assert!(text.contains("at a High School level"));
    }

    #[test]
    fn blank_preferences_are_omitted() {
        let text = system_instruction("Sam", LearningLevel::Beginner, Some("   "));
        assert!(!text.contains("expressed interest"));
    }

    #[test]
    fn instruction_teaches_the_resource_convention() {
        // The extractor depends on the persona asking for this exact marker.
        let text = system_instruction("Alex", LearningLevel::Beginner, None);
        assert!(text.contains(RESOURCE_MARKER));
    }

    #[test]
    fn quiz_instruction_embeds_topics() {
        let text = quiz_instruction("Ohm's law\n\n---\n\nKirchhoff's rules");
        assert!(text.contains("Ohm's law"));
        assert!(text.contains("exactly 4 options"));
    }
}
