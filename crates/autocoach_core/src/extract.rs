//! crates/autocoach_core/src/extract.rs
//!
//! Splits a finalized bot message into renderable segments: plain prose
//! (markdown for the client to render) interleaved with structured resource
//! references.
//!
//! This is a pure function of the final text only. It must never run over a
//! partially streamed message: a half-delivered `[RESOURCE]` line would
//! produce transient bogus segments.

use crate::persona::RESOURCE_MARKER;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Description attached to bare links found outside a `[RESOURCE]` marker.
const GENERIC_LINK_DESCRIPTION: &str = "An external link to learn more.";

/// One renderable slice of a bot message, in original text order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageSegment {
    /// A verbatim span of the message, rendered as markdown.
    Prose { text: String },
    /// A cited learning resource, rendered as a card.
    Resource {
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        description: String,
    },
}

/// Scans `content` left to right for `[RESOURCE]` lines and bare URLs,
/// emitting every non-matching span verbatim as prose. Concatenating the
/// matched and prose spans in order reconstructs the input exactly; when
/// nothing matches the whole input is a single prose segment.
pub fn extract_segments(content: &str) -> Vec<MessageSegment> {
    // [RESOURCE] takes priority over the URL pattern at the same position,
    // so a marked line containing a link stays one resource.
    let combined = Regex::new(r"(\[RESOURCE\][^\n]+)|(https?://\S+)").unwrap();

    let mut segments = Vec::new();
    let mut last_index = 0;

    for found in combined.find_iter(content) {
        if found.start() > last_index {
            segments.push(MessageSegment::Prose {
                text: content[last_index..found.start()].to_string(),
            });
        }

        let matched = found.as_str();
        if let Some(rest) = matched.strip_prefix(RESOURCE_MARKER) {
            segments.push(parse_resource_line(rest.trim()));
        } else {
            segments.push(MessageSegment::Resource {
                title: matched.to_string(),
                url: Some(matched.to_string()),
                description: GENERIC_LINK_DESCRIPTION.to_string(),
            });
        }

        last_index = found.end();
    }

    if last_index < content.len() {
        segments.push(MessageSegment::Prose {
            text: content[last_index..].to_string(),
        });
    }

    if segments.is_empty() {
        segments.push(MessageSegment::Prose {
            text: content.to_string(),
        });
    }

    segments
}

/// Parses the remainder of a `[RESOURCE]` line. Two accepted shapes:
/// a markdown link `[title](url) - description`, or a plain
/// `title - description` pair split once on the first ` - `.
fn parse_resource_line(resource_text: &str) -> MessageSegment {
    let link = Regex::new(r"\[(.*?)\]\((.*?)\)").unwrap();

    if let Some(captures) = link.captures(resource_text) {
        let description = resource_text
            .split_once(") - ")
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_default();
        return MessageSegment::Resource {
            title: captures[1].to_string(),
            url: Some(captures[2].to_string()),
            description,
        };
    }

    match resource_text.split_once(" - ") {
        Some((title, description)) => MessageSegment::Resource {
            title: title.to_string(),
            url: None,
            description: description.to_string(),
        },
        None => MessageSegment::Resource {
            title: resource_text.to_string(),
            url: None,
            description: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose(text: &str) -> MessageSegment {
        MessageSegment::Prose {
            text: text.to_string(),
        }
    }

    #[test]
    fn plain_text_is_one_prose_segment() {
        let segments = extract_segments("Just an explanation, no links.");
        assert_eq!(segments, vec![prose("Just an explanation, no links.")]);
    }

    #[test]
    fn empty_input_is_one_empty_prose_segment() {
        assert_eq!(extract_segments(""), vec![prose("")]);
    }

    #[test]
    fn marked_line_with_title_and_description() {
        let input = "Start here:\n[RESOURCE] Khan Academy Algebra (khanacademy.org) - great intro\nGood luck!";
        let segments = extract_segments(input);
        assert_eq!(
            segments,
            vec![
                prose("Start here:\n"),
                MessageSegment::Resource {
                    title: "Khan Academy Algebra (khanacademy.org)".to_string(),
                    url: None,
                    description: "great intro".to_string(),
                },
                prose("\nGood luck!"),
            ]
        );
    }

    #[test]
    fn marked_line_with_markdown_link() {
        let input = "[RESOURCE] [Linear Algebra Done Right](https://example.com/ladr) - the standard text";
        let segments = extract_segments(input);
        assert_eq!(
            segments,
            vec![MessageSegment::Resource {
                title: "Linear Algebra Done Right".to_string(),
                url: Some("https://example.com/ladr".to_string()),
                description: "the standard text".to_string(),
            }]
        );
    }

    #[test]
    fn bare_url_becomes_a_generic_resource() {
        let segments = extract_segments("see https://example.com/x for more");
        assert_eq!(
            segments,
            vec![
                prose("see "),
                MessageSegment::Resource {
                    title: "https://example.com/x".to_string(),
                    url: Some("https://example.com/x".to_string()),
                    description: "An external link to learn more.".to_string(),
                },
                prose(" for more"),
            ]
        );
    }

    #[test]
    fn marked_line_wins_over_its_own_url() {
        let input = "[RESOURCE] [Title](https://a.b) - described";
        let segments = extract_segments(input);
        assert_eq!(segments.len(), 1);
        assert!(matches!(
            &segments[0],
            MessageSegment::Resource { title, .. } if title == "Title"
        ));
    }

    #[test]
    fn description_split_happens_once() {
        let input = "[RESOURCE] Databases - relational - and more";
        let segments = extract_segments(input);
        assert_eq!(
            segments,
            vec![MessageSegment::Resource {
                title: "Databases".to_string(),
                url: None,
                description: "relational - and more".to_string(),
            }]
        );
    }

    #[test]
    fn prose_spans_partition_the_input() {
        let input = "a\nhttps://x.test/1 b\n[RESOURCE] T - d\nc https://x.test/2";
        let segments = extract_segments(input);

        // Every non-match span must come back verbatim and in order.
        let prose_spans: Vec<&str> = segments
            .iter()
            .filter_map(|s| match s {
                MessageSegment::Prose { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(prose_spans, vec!["a\n", " b\n", "\nc "]);
        assert_eq!(
            segments
                .iter()
                .filter(|s| matches!(s, MessageSegment::Resource { .. }))
                .count(),
            3
        );
    }

    #[test]
    fn multiline_marker_only_claims_its_line() {
        let input = "[RESOURCE] A - one\n[RESOURCE] B - two";
        let segments = extract_segments(input);
        assert_eq!(segments.len(), 3); // resource, newline prose, resource
        assert_eq!(segments[1], prose("\n"));
    }
}
