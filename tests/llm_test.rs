//! Tests for the upstream request/response boundary.

use freight_ai::llm::{UpstreamRequest, extract_json_array};
use freight_ai::model::{Priority, Task, TaskKind};
use serde_json::json;

#[test]
fn batch_request_numbers_every_item() {
    let tasks = vec![
        Task::new(TaskKind::LeadQualification, "Acme Logistics, 40 trucks", Priority::Low),
        Task::new(TaskKind::LeadQualification, "Blue Ridge Produce", Priority::High),
    ];
    let request = UpstreamRequest::for_batch(TaskKind::LeadQualification, &tasks);

    assert_eq!(request.kind, TaskKind::LeadQualification);
    assert_eq!(request.task_count, 2);
    assert!(request.prompt.contains("exactly 2 elements"));
    assert!(request.prompt.contains("### Item 1"));
    assert!(request.prompt.contains("### Item 2"));
    assert!(request.prompt.contains(&tasks[1].id.to_string()));
    let first = request.prompt.find("Acme Logistics").unwrap();
    let second = request.prompt.find("Blue Ridge").unwrap();
    assert!(first < second);
}

#[test]
fn json_array_is_extracted_from_wrapped_replies() {
    let reply = "Sure! Here are the results:\n```json\n[{\"score\": 7}, \"hot lead\"]\n```";
    let values = extract_json_array(reply).unwrap();
    assert_eq!(values, vec![json!({"score": 7}), json!("hot lead")]);
}

#[test]
fn replies_without_an_array_are_dispatch_failures() {
    assert!(extract_json_array("I could not process these.").is_err());
    assert!(extract_json_array("] backwards [").is_err());
    assert!(extract_json_array("[1, 2,").is_err());
}
