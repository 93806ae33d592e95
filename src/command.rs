use crate::models::{Intent, RecordKind};

const PREFIXES: [(&str, RecordKind); 5] = [
    ("/t", RecordKind::Todo),
    ("/i", RecordKind::Idea),
    ("/b", RecordKind::Bug),
    ("/n", RecordKind::Note),
    ("/p", RecordKind::Progress),
];

const UNKNOWN_LABEL: &str = "Unknown";
const GENERIC_PLACEHOLDER: &str = "Type something...";

/// Parses quick-capture input such as `/t fix login redirect -p1`.
///
/// Returns `None` when the first token is not a known prefix; that is the
/// "not a command" answer, not an error. The title is the run of tokens that
/// starts at the first non-flag token and stops at the next flag.
pub fn parse(input: &str) -> Option<Intent> {
    let mut tokens = input.split_whitespace();
    let prefix = tokens.next()?.to_lowercase();
    let kind = PREFIXES
        .iter()
        .find(|(candidate, _)| *candidate == prefix)
        .map(|(_, kind)| *kind)?;

    let title = tokens
        .skip_while(|token| is_flag(token))
        .take_while(|token| !is_flag(token))
        .collect::<Vec<_>>()
        .join(" ");

    Some(Intent {
        kind,
        title: (!title.is_empty()).then_some(title),
    })
}

pub fn label(kind: &str) -> &'static str {
    RecordKind::parse(kind).map(RecordKind::label).unwrap_or(UNKNOWN_LABEL)
}

pub fn placeholder(kind: &str) -> &'static str {
    RecordKind::parse(kind)
        .map(RecordKind::placeholder)
        .unwrap_or(GENERIC_PLACEHOLDER)
}

fn is_flag(token: &str) -> bool {
    token.starts_with('-')
}
