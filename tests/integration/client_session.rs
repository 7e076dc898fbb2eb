//! RelayClient integration tests
//!
//! A wiremock server stands in for the relay and serves a tagged body; the
//! client decodes it into the conversation view model.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::Value;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use playground_relay::client::{
    cancel_pair, Conversation, DecodedEvent, MetaKey, Part, RelayClient, SendOptions,
    SendOutcome, Status,
};

const TAGGED_BODY: &str = "\n<thinking:Planning a fox>Here is your fox.\
\n<image_partial:data:image/png;base64,P1>\n\
\n<image:data:image/png;base64,FINAL>\n\
\n<revised_prompt:a red fox &amp; friends>\n\
\n<response_id:resp_42>\n";

async fn relay_serving(body: &str, delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/playground"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body.to_string())
                .insert_header("Content-Type", "text/plain; charset=utf-8")
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_send_decodes_tags_into_view_model() {
    let relay = relay_serving(TAGGED_BODY, Duration::ZERO).await;
    let client = RelayClient::new(reqwest::Client::new(), &relay.uri());
    let mut conversation = Conversation::new();
    let (_handle, token) = cancel_pair();

    let mut seen = Vec::new();
    let outcome = client
        .send_with(
            &mut conversation,
            "draw a fox",
            SendOptions::default(),
            token,
            |_, event| seen.push(event.clone()),
        )
        .await;

    assert_eq!(outcome, SendOutcome::Completed);
    assert_eq!(conversation.status(), Status::Ready);
    assert_eq!(conversation.previous_response_id(), Some("resp_42"));
    assert!(seen.contains(&DecodedEvent::Thinking("Planning a fox".into())));

    let assistant = &conversation.messages()[1];
    assert_eq!(assistant.text(), "Here is your fox.");
    assert_eq!(
        assistant.visible_parts(),
        vec![
            &Part::Text("Here is your fox.".into()),
            &Part::Image {
                src: "data:image/png;base64,FINAL".into(),
                partial: false
            },
        ]
    );
    assert_eq!(
        assistant.meta_lines(),
        vec![
            (MetaKey::RevisedPrompt.label(), "a red fox & friends"),
            (MetaKey::ResponseId.label(), "resp_42"),
        ]
    );
    assert_eq!(conversation.thinking_for(assistant.id), Some("Planning a fox"));

    let requests = relay.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["messages"][0]["content"], "draw a fox");
    assert!(body.get("previousResponseId").is_none());
}

#[tokio::test]
async fn test_second_turn_sends_previous_response_id() {
    let relay = relay_serving(TAGGED_BODY, Duration::ZERO).await;
    let client = RelayClient::new(reqwest::Client::new(), &relay.uri());
    let mut conversation = Conversation::new();

    let (_h1, t1) = cancel_pair();
    client
        .send(&mut conversation, "draw a fox", SendOptions::default(), t1)
        .await;
    let (_h2, t2) = cancel_pair();
    client
        .send(&mut conversation, "make it blue", SendOptions::default(), t2)
        .await;

    let requests = relay.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(body["previousResponseId"], "resp_42");
    assert_eq!(body["messages"][1]["role"], "assistant");
    assert_eq!(
        body["messages"][1]["content"],
        "Here is your fox.\n[image omitted]"
    );
    assert_eq!(body["messages"][2]["content"], "make it blue");
}

#[tokio::test]
async fn test_http_failure_becomes_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/playground"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = RelayClient::new(reqwest::Client::new(), &server.uri());
    let mut conversation = Conversation::new();
    let (_handle, token) = cancel_pair();

    let outcome = client
        .send(&mut conversation, "hello", SendOptions::default(), token)
        .await;

    assert_eq!(outcome, SendOutcome::Failed("Request failed: 500".into()));
    assert_eq!(conversation.status(), Status::Ready);
    assert_eq!(
        conversation.messages().last().unwrap().text(),
        "There was an error: Request failed: 500"
    );
}

#[tokio::test]
async fn test_stop_ends_request() {
    let relay = relay_serving("late text", Duration::from_secs(5)).await;
    let client = RelayClient::new(reqwest::Client::new(), &relay.uri());
    let mut conversation = Conversation::new();
    let (handle, token) = cancel_pair();

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        client.send(&mut conversation, "hello", SendOptions::default(), token),
    )
    .await
    .expect("stop should end the request promptly");
    stopper.await.unwrap();

    assert_eq!(outcome, SendOutcome::Stopped);
    assert_eq!(conversation.status(), Status::Ready);
    assert!(!conversation
        .messages()
        .iter()
        .any(|m| m.text().contains("late text")));
}
