use serde_json::json;

use form_spec::{
    FieldState, FormDefinition, FormSession, check_definition,
    render::{RenderStatus, build_render_payload, render_json_ui, render_text},
};

fn fixture(name: &str) -> &'static str {
    match name {
        "contact_form" => include_str!("../tests/fixtures/contact_form.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn contact_form() -> FormDefinition {
    FormDefinition::from_json(fixture("contact_form")).expect("deserialize")
}

#[test]
fn fixture_round_trips_through_json() {
    let definition = contact_form();
    let encoded = definition.to_json_pretty().expect("serialize");
    let decoded = FormDefinition::from_json(&encoded).expect("deserialize again");
    assert_eq!(decoded, definition);

    let topic = definition.find_field("topic").unwrap();
    assert_eq!(topic.options[1].label, "support");
    assert!(check_definition(&definition).is_empty());
}

#[test]
fn render_text_lists_active_fields_by_section() {
    let session = FormSession::from_definition(&contact_form());
    let payload = build_render_payload(&session);

    assert_eq!(payload.status, RenderStatus::NeedInput);
    assert_eq!(payload.progress.total, 4);
    assert_eq!(payload.progress.filled, 1);

    let text = render_text(&payload);
    assert!(text.starts_with("Status: need_input (1/4)"));
    assert!(text.contains("[Contact]"));
    assert!(text.contains(" - Name (text) [required]"));
    assert!(text.contains("  [Support details]"));
    assert!(!text.contains("Ticket"));
}

#[test]
fn render_json_ui_exposes_structure() {
    let mut session = FormSession::from_definition(&contact_form());
    session.set_value("topic", json!("support")).unwrap();
    session.set_value("ticket", json!("123")).unwrap();
    session.validate_field("ticket").unwrap();

    let payload = build_render_payload(&session);
    assert_eq!(payload.status, RenderStatus::Error);

    let ui = render_json_ui(&payload);
    assert_eq!(ui["status"], "error");
    let sections = ui["sections"].as_array().expect("sections array");
    assert_eq!(sections[0]["id"], "contact");
    assert_eq!(sections[0]["fields"][2]["options"][0]["value"], "sales");

    let ticket = &sections[0]["sections"][0]["fields"][0];
    assert_eq!(ticket["id"], "ticket");
    assert_eq!(ticket["active"], true);
    assert_eq!(ticket["error"], "Use the T-0000 format");
    assert_eq!(ticket["state"], "invalid");
}

#[test]
fn payload_is_complete_once_required_fields_are_filled() {
    let mut session = FormSession::from_definition(&contact_form());
    session.set_value("name", json!("Jane")).unwrap();
    session.set_value("email", json!("jane@example.com")).unwrap();
    session.set_value("topic", json!("sales")).unwrap();
    assert!(session.validate_all());

    let payload = build_render_payload(&session);
    assert_eq!(payload.status, RenderStatus::Complete);
    let name = payload
        .fields()
        .into_iter()
        .find(|field| field.id == "name")
        .unwrap();
    assert_eq!(name.state, FieldState::Valid);
    assert_eq!(name.placeholder.as_deref(), Some("Jane Doe"));
}

#[test]
fn hidden_field_error_does_not_block_completion() {
    let mut session = FormSession::from_definition(&contact_form());
    session.set_value("name", json!("Jane")).unwrap();
    session.set_value("email", json!("jane@example.com")).unwrap();
    session.set_value("topic", json!("support")).unwrap();
    session.set_value("ticket", json!("123")).unwrap();
    session.validate_field("ticket").unwrap();
    assert_eq!(build_render_payload(&session).status, RenderStatus::Error);

    session.set_value("topic", json!("sales")).unwrap();
    let payload = build_render_payload(&session);
    assert_eq!(payload.status, RenderStatus::Complete);
    let ticket = payload
        .fields()
        .into_iter()
        .find(|field| field.id == "ticket")
        .unwrap();
    assert!(!ticket.active);
    assert_eq!(ticket.error, None);
}
