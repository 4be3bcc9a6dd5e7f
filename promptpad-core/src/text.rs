use regex::Regex;
use std::sync::OnceLock;

// Only blocks at the very start of a reply count as model reasoning; the same
// tags further down may be part of the note itself.
fn leading_reasoning_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)^(?:\s*(?:<think>.*?</think>|<thinking>.*?</thinking>|<reasoning>.*?</reasoning>))+",
        )
        .expect("valid reasoning regex")
    })
}

/// Prepares a buffered model reply for insertion into the note.
///
/// Reasoning blocks some models emit before the answer are stripped;
/// markdown is otherwise left untouched apart from surrounding whitespace.
pub fn clean_reply(text: &str) -> String {
    leading_reasoning_re().replace(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_reasoning_blocks() {
        let input = "<thinking>plan\nmore</thinking>\n# Shopping list\n- [ ] Eggs";
        assert_eq!(clean_reply(input), "# Shopping list\n- [ ] Eggs");

        let input = "\n<think>a</think> <reasoning>b</reasoning>\nAnswer";
        assert_eq!(clean_reply(input), "Answer");
    }

    #[test]
    fn keeps_tags_inside_the_note() {
        let input = "# Prompting notes\nWrap drafts in <think>like this</think> first.\n";
        assert_eq!(
            clean_reply(input),
            "# Prompting notes\nWrap drafts in <think>like this</think> first."
        );
    }

    #[test]
    fn keeps_markdown_and_inline_tags() {
        let input = "\n- [ ] Pasta <b>now</b>\n\n";
        assert_eq!(clean_reply(input), "- [ ] Pasta <b>now</b>");
    }
}
