/*
[INPUT]:  Mock backend responses for task and step endpoints
[OUTPUT]: Test results for typed endpoint wrappers
[POS]:    Integration tests - HTTP endpoints
[UPDATE]: When endpoints or response envelopes change
*/

mod common;

use common::{setup_mock_server, signed_in_store};
use stride_client::{
    AddStepRequest, ApiGateway, TaskQuery, TaskStatus, TaskUpdate,
};
use tokio_test::assert_ok;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn gateway(server: &wiremock::MockServer) -> ApiGateway {
    ApiGateway::new(&server.uri(), "anon-key", signed_in_store("token-1")).unwrap()
}

#[tokio::test]
async fn test_create_task_returns_queue_ref() {
    let server = setup_mock_server().await;
    let gateway = gateway(&server);

    Mock::given(method("POST"))
        .and(path("/create-task"))
        .and(body_json(serde_json::json!({ "prompt": "plan a weekend trip" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "queue_id": "q-42",
            "status": "pending",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let queue_ref = assert_ok!(gateway.create_task("plan a weekend trip").await);
    assert_eq!(queue_ref.queue_id, "q-42");
}

#[tokio::test]
async fn test_get_tasks_builds_filter_query() {
    let server = setup_mock_server().await;
    let gateway = gateway(&server);

    Mock::given(method("GET"))
        .and(path("/get-tasks"))
        .and(query_param("user_id", "user-1"))
        .and(query_param("status", "active"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tasks": [{
                "id": "t-1",
                "user_id": "user-1",
                "title": "Plan Weekend",
                "status": "active",
            }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = TaskQuery {
        status: Some(TaskStatus::Active),
        limit: Some(10),
        offset: None,
    };
    let tasks = assert_ok!(gateway.get_tasks("user-1", query).await);

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Plan Weekend");
    assert_eq!(tasks[0].status, TaskStatus::Active);
}

#[tokio::test]
async fn test_update_task_unwraps_envelope() {
    let server = setup_mock_server().await;
    let gateway = gateway(&server);

    Mock::given(method("PUT"))
        .and(path("/update-task/t-1"))
        .and(body_json(serde_json::json!({ "status": "completed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "task": {
                "id": "t-1",
                "user_id": "user-1",
                "title": "Plan Weekend",
                "status": "completed",
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let update = TaskUpdate {
        status: Some(TaskStatus::Completed),
        ..Default::default()
    };
    let task = assert_ok!(gateway.update_task("t-1", &update).await);
    assert_eq!(task.status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_get_task_steps_carries_metadata_flag() {
    let server = setup_mock_server().await;
    let gateway = gateway(&server);

    Mock::given(method("GET"))
        .and(path("/get-task-steps/t-1"))
        .and(query_param("include_metadata", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "task_id": "t-1",
            "steps": [
                { "id": "s-1", "task_id": "t-1", "title": "Book hotel", "is_completed": false },
                { "id": "s-2", "task_id": "t-1", "title": "Pack bags", "is_completed": true },
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = assert_ok!(gateway.get_task_steps("t-1", true).await);

    assert_eq!(response.steps.len(), 2);
    assert!(response.steps[1].is_completed);
}

#[tokio::test]
async fn test_add_step_omits_absent_insert_position() {
    let server = setup_mock_server().await;
    let gateway = gateway(&server);

    // insert_after_step_id must be absent from the body, not null.
    Mock::given(method("POST"))
        .and(path("/add-step"))
        .and(body_json(serde_json::json!({
            "task_id": "t-1",
            "prompt": "confirm reservations",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "queue_id": "q-7",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = AddStepRequest {
        task_id: "t-1".to_string(),
        prompt: "confirm reservations".to_string(),
        insert_after_step_id: None,
    };
    let queue_ref = assert_ok!(gateway.add_step(&request).await);
    assert_eq!(queue_ref.queue_id, "q-7");
}

#[tokio::test]
async fn test_step_note_update_and_delete() {
    let server = setup_mock_server().await;
    let gateway = gateway(&server);

    Mock::given(method("PUT"))
        .and(path("/update-step-note/s-1"))
        .and(body_json(serde_json::json!({ "note": "call ahead" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/update-step-note/s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(gateway.update_step_note("s-1", "call ahead").await);
    assert_ok!(gateway.delete_step_note("s-1").await);
}
