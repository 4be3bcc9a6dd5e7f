use crate::types::{CommandType, Placeholder};
use std::collections::BTreeMap;

pub const DEFAULT_CURSOR_PROMPT_TEMPLATE: &str = r#"
You are a helpful AI assistant that can, given a piece of text and a request generate an answer using markdown.
Include headers, lists, checkboxes, and other markdown elements in your answer when it makes sense.

====================================
Examples:

Request:
==================
Generate a shopping list with items for Spagetthi Carbonara
==================
Answer:
# Shopping list

- [ ] Pasta
- [ ] Eggs
- [ ] Parmesan cheese
- [ ] Pancetta
====================================

Request:
==================
Give me a good knock-knock joke
==================
Answer:
Knock, knock. Who's there? Lettuce. Lettuce who? Lettuce in, it's cold out here!
====================================    

Text: 
Request: 
==================
<QUERY>
==================
Answer:"#;

pub const DEFAULT_SELECTION_PROMPT_TEMPLATE: &str = r#"
You are a helpful AI assistant that can, given a piece of text and a request generate an answer using markdown.
====================================
Example:

Text:
==================
# TODO list
- Find out what is the capital of France?
==================
Request:
==================
Add 2 more items to the list with other questions about France
==================
Answer:
# TODO list
- Find out what is the capital of France?
- Find out what is the population of France?
- Find out what is the area of France?
====================================    

Text: 
==================
<SELECTION>
==================
Request: 
==================
<REQUEST>
==================
Answer:"#;

pub const DEFAULT_REWRITE_DOCUMENT_TEMPLATE: &str = r#"
You are a helpful AI assistant who is an expert in rewriting text. Given a markdown document and a request, you can generate a new version of the document.

====================================
Example:

Document:
==================
# TODO list
- Find out what is the capital of France?
==================
Request:
==================
Add 2 more items to the list with other questions about France
==================
Answer:
# TODO list
- Find out what is the capital of France?
- Find out what is the population of France?
- Find out what is the area of France?
====================================    

Document: 
==================
<DOCUMENT>
==================
Request: 
==================
<REQUEST>
==================
Answer:"#;

/// The immutable default template for a command.
pub fn default_template(command: CommandType) -> &'static str {
    match command {
        CommandType::Selection => DEFAULT_SELECTION_PROMPT_TEMPLATE,
        CommandType::Cursor => DEFAULT_CURSOR_PROMPT_TEMPLATE,
        CommandType::Document => DEFAULT_REWRITE_DOCUMENT_TEMPLATE,
    }
}

/// Values to substitute for placeholder tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bindings {
    values: BTreeMap<Placeholder, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.values.insert(placeholder, value.into());
        self
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values.get(&placeholder).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Placeholder, &str)> {
        self.values.iter().map(|(p, v)| (*p, v.as_str()))
    }
}

/// What the user supplied when invoking a command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptInput {
    pub request: String,
    pub selection: Option<String>,
    pub document: Option<String>,
}

/// Binds the placeholders of `command`'s contract from `input`.
///
/// A missing selection or document is simply not bound, so the literal token
/// survives composition and shows up in the prompt.
pub fn bindings_for(command: CommandType, input: &PromptInput) -> Bindings {
    let bindings = Bindings::new();
    match command {
        CommandType::Selection => {
            let bindings = match &input.selection {
                Some(s) => bindings.bind(Placeholder::Selection, s.clone()),
                None => bindings,
            };
            bindings.bind(Placeholder::Request, input.request.clone())
        }
        CommandType::Cursor => bindings.bind(Placeholder::Query, input.request.clone()),
        CommandType::Document => {
            let bindings = match &input.document {
                Some(d) => bindings.bind(Placeholder::Document, d.clone()),
                None => bindings,
            };
            bindings.bind(Placeholder::Request, input.request.clone())
        }
    }
}

/// Substitutes every bound placeholder token in `template`.
///
/// The template is scanned once, left to right. Bound values are copied into the
/// output as opaque text and never scanned again, so a value that itself looks
/// like a token stays as-is. Unbound tokens are left in place.
pub fn compose(template: &str, bindings: &Bindings) -> String {
    if bindings.is_empty() {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(idx) = rest.find('<') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];

        match bindings.iter().find(|(p, _)| rest.starts_with(p.token())) {
            Some((p, value)) => {
                out.push_str(value);
                rest = &rest[p.token().len()..];
            }
            None => {
                out.push('<');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_every_occurrence() {
        let b = Bindings::new().bind(Placeholder::Request, "go");
        assert_eq!(compose("<REQUEST> and <REQUEST>", &b), "go and go");
    }

    #[test]
    fn empty_bindings_return_template_unchanged() {
        let t = "keep <SELECTION> as is";
        assert_eq!(compose(t, &Bindings::new()), t);
    }

    #[test]
    fn unbound_tokens_stay_literal() {
        let b = Bindings::new().bind(Placeholder::Request, "r");
        assert_eq!(
            compose("<SELECTION>|<REQUEST>|<UNKNOWN>", &b),
            "<SELECTION>|r|<UNKNOWN>"
        );
    }

    #[test]
    fn inserted_values_are_not_rescanned() {
        let b = Bindings::new()
            .bind(Placeholder::Request, "<SELECTION>")
            .bind(Placeholder::Selection, "picked");
        let once = compose("<SELECTION> / <REQUEST>", &b);
        assert_eq!(once, "picked / <SELECTION>");
    }

    #[test]
    fn template_without_placeholders_is_idempotent() {
        let b = Bindings::new().bind(Placeholder::Query, "q");
        let t = "nothing to see <here>";
        assert_eq!(compose(&compose(t, &b), &b), t);
    }

    #[test]
    fn handles_non_ascii_around_tokens() {
        let b = Bindings::new().bind(Placeholder::Query, "café");
        assert_eq!(compose("« <QUERY> »<", &b), "« café »<");
    }

    #[test]
    fn default_templates_carry_their_placeholders() {
        for cmd in CommandType::all() {
            let t = default_template(cmd);
            for p in cmd.placeholders() {
                assert!(t.contains(p.token()), "{cmd} template lacks {}", p.token());
            }
        }
    }

    #[test]
    fn selection_scenario_substitutes_both_blocks() {
        let input = PromptInput {
            request: "Add 2 more items to the list with other questions about France".into(),
            selection: Some("# TODO list\n- Find out what is the capital of France?".into()),
            document: None,
        };
        let b = bindings_for(CommandType::Selection, &input);
        let prompt = compose(default_template(CommandType::Selection), &b);

        assert!(!prompt.contains("<SELECTION>"));
        assert!(!prompt.contains("<REQUEST>"));
        assert!(prompt.contains(
            "==================\n# TODO list\n- Find out what is the capital of France?\n==================\nRequest: \n"
        ));
        assert!(prompt.ends_with(
            "Add 2 more items to the list with other questions about France\n==================\nAnswer:"
        ));
        // The self-documenting example block is untouched.
        assert!(prompt.contains("- Find out what is the population of France?"));
        assert_eq!(prompt.matches("Add 2 more items").count(), 2);
    }

    #[test]
    fn cursor_binds_request_as_query() {
        let input = PromptInput {
            request: "A haiku about rust".into(),
            ..Default::default()
        };
        let b = bindings_for(CommandType::Cursor, &input);
        assert_eq!(b.get(Placeholder::Query), Some("A haiku about rust"));
        assert_eq!(b.get(Placeholder::Request), None);
    }

    #[test]
    fn missing_document_leaves_token_visible() {
        let input = PromptInput {
            request: "shorten".into(),
            ..Default::default()
        };
        let b = bindings_for(CommandType::Document, &input);
        let prompt = compose(default_template(CommandType::Document), &b);
        assert!(prompt.contains("<DOCUMENT>"));
        assert!(!prompt.contains("<REQUEST>"));
    }
}
