use std::sync::{Arc, Mutex};
use std::time::Duration;

use api::{ApiClient, ApiSettings, ChatApi};
use axum::{Json, Router, http::StatusCode, routing::post};
use chat::{DispatchOutcome, DispatcherOptions, MessageDispatcher, RemoteResponder, SessionStore};
use proto::{DeliveryStatus, FileAttachment, Role};
use serde_json::{Value, json};

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn remote_dispatcher(base_url: String) -> MessageDispatcher {
    let mut settings = ApiSettings::new(base_url);
    settings.timeout = Duration::from_secs(5);
    let client = Arc::new(ApiClient::new(settings).expect("client"));
    let responder = RemoteResponder::new(ChatApi::new(client));
    MessageDispatcher::new(
        Arc::new(SessionStore::new()),
        Arc::new(responder),
        DispatcherOptions::default(),
    )
}

#[tokio::test]
async fn remote_reply_is_appended_after_user_message() {
    let app = Router::new().route(
        "/api/v1/chat",
        post(|Json(req): Json<Value>| async move {
            let files = req["attachments"].as_array().map(Vec::len).unwrap_or(0);
            Json(json!({
                "response": format!("{} ({files} file)", req["message"].as_str().unwrap_or_default())
            }))
        }),
    );
    let dispatcher = remote_dispatcher(spawn_server(app).await);
    let session = dispatcher.store().create_session();

    let files = vec![FileAttachment::new("north.csv", "text/csv", 42, "/files/north.csv")];
    let outcome = dispatcher.send_message("Top regions?", files).await;

    let DispatchOutcome::Replied {
        session_id,
        message_id,
        reply,
    } = outcome
    else {
        panic!("expected reply, got {outcome:?}");
    };
    assert_eq!(&session_id, session.id());
    assert_eq!(reply.content(), "Top regions? (1 file)");
    assert_eq!(
        dispatcher.delivery_status(&message_id),
        Some(DeliveryStatus::Committed)
    );

    let stored = dispatcher.store().session(session.id()).expect("session");
    assert_eq!(stored.title(), "Top regions?");
    assert_eq!(stored.messages()[0].attachments().len(), 1);
    assert_eq!(stored.messages()[1].role(), Role::Assistant);
}

#[tokio::test]
async fn server_error_is_surfaced_and_nothing_is_appended() {
    let app = Router::new().route(
        "/api/v1/chat",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "model unavailable"})),
            )
        }),
    );
    let dispatcher = remote_dispatcher(spawn_server(app).await);
    let session = dispatcher.store().create_session();

    let outcome = dispatcher.send_message("hello", Vec::new()).await;
    assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
    let error = dispatcher.error().expect("error surfaced");
    assert!(error.contains("model unavailable"), "{error}");
    assert!(!dispatcher.is_loading());

    let stored = dispatcher.store().session(session.id()).expect("session");
    assert_eq!(stored.messages().len(), 1);
}

#[tokio::test]
async fn blank_remote_reply_counts_as_failure() {
    let app = Router::new().route(
        "/api/v1/chat",
        post(|| async { Json(json!({"content": "   "})) }),
    );
    let dispatcher = remote_dispatcher(spawn_server(app).await);
    dispatcher.store().create_session();

    let outcome = dispatcher.send_message("hello", Vec::new()).await;
    assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
}

#[tokio::test]
async fn conversation_history_is_sent_with_each_turn() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);
    let app = Router::new().route(
        "/api/v1/chat",
        post(move |Json(req): Json<Value>| {
            let recorded = Arc::clone(&recorded);
            async move {
                let reply = format!("re: {}", req["message"].as_str().unwrap_or_default());
                recorded.lock().expect("lock").push(req);
                Json(json!({ "response": reply }))
            }
        }),
    );
    let dispatcher = remote_dispatcher(spawn_server(app).await);
    dispatcher.store().create_session();

    dispatcher.send_message("first question", Vec::new()).await;
    dispatcher.send_message("follow-up", Vec::new()).await;

    let requests = seen.lock().expect("lock").clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0]["messages"],
        json!([{"role": "user", "content": "first question"}])
    );
    assert_eq!(
        requests[1]["messages"],
        json!([
            {"role": "user", "content": "first question"},
            {"role": "assistant", "content": "re: first question"},
            {"role": "user", "content": "follow-up"}
        ])
    );
}
