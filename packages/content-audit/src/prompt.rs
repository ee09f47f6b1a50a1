use std::sync::LazyLock;

use crate::client::{ContentPart, ImageUrl, Message, MessageContent, Role};
use crate::model::{AuditDecision, AuditOptionsItem, AuditText};
use crate::schema::SchemaDescriptor;

const SYSTEM_AUDIT: &str = include_str!("../prompts/system_audit.txt");

/// Stands in for the content block when the content is an attached image.
const IMAGE_CONTENT_NOTE: &str = "(The content is the attached image.)";

const UNCERTAIN_HINT: &str =
    "If you cannot decide and an 'uncertain' (or similar) option exists, prefer it.";

static DECISION_SCHEMA: LazyLock<String> =
    LazyLock::new(|| SchemaDescriptor::of::<AuditDecision>().render());

/// Build the system prompt for auditing.
pub fn build_system_prompt() -> &'static str {
    SYSTEM_AUDIT
}

/// Build the user prompt for auditing `content` against `item`.
///
/// Options are listed label first, in the rubric's order. The content is the
/// last large block, followed only by the output schema.
pub fn build_user_prompt(content: &str, item: &AuditOptionsItem) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("# Audit item: {}\n\n", item.name()));
    prompt.push_str(&format!("## Instruction\n{}\n\n", item.instruction()));

    prompt.push_str("## Options (label: meaning)\n");
    for option in item.options().iter() {
        prompt.push_str(&format!("{}: {}\n", option.label, option.meaning));
    }
    prompt.push('\n');

    prompt.push_str(&format!("## Content to audit\n{content}\n\n"));

    prompt.push_str("## Output schema\nReturn one JSON object shaped like:\n");
    prompt.push_str(&DECISION_SCHEMA);
    prompt.push_str("\n\n");

    prompt.push_str(UNCERTAIN_HINT);

    prompt
}

/// Build the two-message conversation for one (text, item) pair.
///
/// Image texts get a multi-part user message: the prompt, then the image.
pub fn build_messages(text: &AuditText, item: &AuditOptionsItem) -> Vec<Message> {
    let user = if text.is_image() {
        Message {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: build_user_prompt(IMAGE_CONTENT_NOTE, item),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: text.content().to_string(),
                    },
                },
            ]),
        }
    } else {
        Message::user(build_user_prompt(text.content(), item))
    };

    vec![Message::system(build_system_prompt()), user]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OptionSet;
    use pretty_assertions::assert_eq;

    fn sensitive_item() -> AuditOptionsItem {
        let options = OptionSet::from_pairs([
            ("有", "检测到敏感信息"),
            ("无", "没有检测到敏感信息"),
            ("不确定", "无法判断"),
        ])
        .expect("options");
        AuditOptionsItem::new("sensitive", "Check for personal data.", options).expect("item")
    }

    #[test]
    fn test_system_prompt_not_empty() {
        assert!(build_system_prompt().contains("JSON"));
    }

    #[test]
    fn test_user_prompt_section_order() {
        let prompt = build_user_prompt("电话 13800138000", &sensitive_item());

        let positions: Vec<usize> = [
            "sensitive",
            "Check for personal data.",
            "有: 检测到敏感信息\n无: 没有检测到敏感信息\n不确定: 无法判断\n",
            "电话 13800138000",
            "\"choice\"",
            "'uncertain'",
        ]
        .iter()
        .map(|needle| prompt.find(needle).expect("section present"))
        .collect();

        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
        assert!(prompt.ends_with(UNCERTAIN_HINT));
    }

    #[test]
    fn test_messages_are_system_then_user() {
        let text = AuditText::new("hello");
        let messages = build_messages(&text, &sensitive_item());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(matches!(messages[1].content, MessageContent::Text(_)));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let item = sensitive_item();
        let text = AuditText::new("same input");
        assert_eq!(build_messages(&text, &item), build_messages(&text, &item));
    }

    #[test]
    fn test_empty_content_still_builds() {
        let prompt = build_user_prompt("", &sensitive_item());
        assert!(prompt.contains("## Content to audit\n\n"));
    }

    #[test]
    fn test_image_message_is_multipart() {
        let image = AuditText::image("data:image/png;base64,AAAA", "image/png");
        let messages = build_messages(&image, &sensitive_item());

        let MessageContent::Parts(parts) = &messages[1].content else {
            panic!("expected multi-part user message");
        };
        assert_eq!(parts.len(), 2);
        assert!(messages[1].text().contains(IMAGE_CONTENT_NOTE));
        assert!(!messages[1].text().contains("base64"));
        assert_eq!(
            parts[1],
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,AAAA".to_string()
                }
            }
        );
    }
}
