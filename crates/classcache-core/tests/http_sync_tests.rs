use std::sync::{Arc, Mutex};

use classcache_core::{Engine, HttpTransport, MemoryStore, Student, SyncEvent, TableName};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_for(server: &MockServer) -> Engine {
    let transport = HttpTransport::new(&server.uri(), None).unwrap();
    Engine::new(Arc::new(MemoryStore::new()), Some(Arc::new(transport)))
}

#[tokio::test]
async fn save_posts_command_to_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "create",
            "table": "students",
            "data": {"name": "Ana", "grade": "3"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let saved = engine.students().save(Student::new("Ana", "3"));
    engine.settle().await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["data"]["id"].as_str(), saved.id.as_deref());
}

#[tokio::test]
async fn subscribe_pulls_remote_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("action", "read"))
        .and(query_param("table", "students"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Ana", "grade": 3},
            {"id": 2, "name": "Bruno", "grade": 4}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = engine
        .students()
        .subscribe(move |rows: Vec<Student>| sink.lock().unwrap().push(rows.len()));
    engine.settle().await;

    assert_eq!(*seen.lock().unwrap(), vec![0, 2]);
    let ana = engine.students().get("1").unwrap();
    assert_eq!(ana.name, "Ana");
    assert_eq!(ana.grade.as_deref(), Some("3"));
}

#[tokio::test]
async fn server_errors_are_invisible_to_callers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Script error"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let mut events = engine.events();

    engine.students().save(Student::new("Ana", "3"));
    let _sub = engine.students().subscribe(|_rows: Vec<Student>| {});
    engine.settle().await;

    assert_eq!(engine.students().len(), 1);

    let mut send_failed = false;
    let mut fetch_failed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            SyncEvent::SendFailed { table, .. } => {
                assert_eq!(table, TableName::Students);
                send_failed = true;
            }
            SyncEvent::FetchFailed { .. } => fetch_failed = true,
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert!(send_failed);
    assert!(fetch_failed);
}

#[tokio::test]
async fn clearing_endpoint_returns_to_local_only() {
    let server = MockServer::start().await;
    let engine = Engine::new(Arc::new(MemoryStore::new()), None);

    engine.set_remote_endpoint(Some(&server.uri())).unwrap();
    assert!(engine.is_remote_enabled());

    engine.set_remote_endpoint(None).unwrap();
    engine.students().save(Student::new("Ana", "3"));
    engine.settle().await;

    assert!(server.received_requests().await.unwrap().is_empty());
}
