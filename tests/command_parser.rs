use devnote_lib::command::{label, parse, placeholder};
use devnote_lib::models::RecordKind;
use devnote_lib::{editor_params_for, parse_command};

#[test]
fn title_is_the_token_run_before_the_first_flag() {
    let intent = parse("/p wrapped up auth refactor -tomorrow notes").expect("intent");
    assert_eq!(intent.kind, RecordKind::Progress);
    assert_eq!(intent.title.as_deref(), Some("wrapped up auth refactor"));
}

#[test]
fn flag_right_after_prefix_leaves_title_unset() {
    let intent = parse("/t -x").expect("intent");
    assert_eq!(intent.kind, RecordKind::Todo);
    assert!(intent.title.is_none());
}

#[test]
fn unrecognized_prefix_is_not_a_command() {
    assert!(parse("/z something").is_none());
    assert!(parse_command("todo: buy milk").is_none());
}

#[test]
fn editor_params_carry_kind_and_title() {
    let params = editor_params_for("/I better search").expect("params");
    assert_eq!(params.block_type, RecordKind::Idea);
    assert_eq!(params.title.as_deref(), Some("better search"));

    let json = serde_json::to_value(&params).expect("json");
    assert_eq!(json, serde_json::json!({"block_type": "idea", "title": "better search"}));
}

#[test]
fn every_kind_has_presentation_text() {
    for kind in RecordKind::ALL {
        assert_ne!(label(kind.as_str()), "Unknown");
        assert!(!placeholder(kind.as_str()).is_empty());
    }
    assert_eq!(label("calendar"), "Unknown");
}
