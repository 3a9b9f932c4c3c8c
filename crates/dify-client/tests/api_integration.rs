//! Blocking API integration tests against a mock Dify server.

use dify_client::{
    ChatMessageRequest, DifyClient, Error, ListConversationsQuery, ListMessagesQuery,
    MessageFeedbackRequest, Rating, RenameConversationRequest, WorkflowRunRequest,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> DifyClient {
    DifyClient::new(server.uri(), "app-key").unwrap()
}

/// Query pairs of the only request the server received.
async fn received_query(server: &MockServer) -> Vec<(String, String)> {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[tokio::test]
async fn test_chat_send_uses_blocking_mode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .and(header("authorization", "Bearer app-key"))
        .and(header("cache-control", "no-cache"))
        .and(body_partial_json(json!({
            "query": "Hello",
            "user": "u1",
            "response_mode": "blocking",
            "inputs": {}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "m1",
            "answer": "Hi there",
            "conversation_id": "c1",
            "created_at": 1705407629
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client(&server)
        .chat()
        .send(ChatMessageRequest::new("Hello", "u1"))
        .await
        .unwrap();

    assert_eq!(resp.answer, "Hi there");
    assert_eq!(resp.conversation_id, "c1");
}

#[tokio::test]
async fn test_api_error_body_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "invalid_param",
            "message": "query is required",
            "status": 400
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .chat()
        .send(ChatMessageRequest::new("", "u1"))
        .await
        .unwrap_err();

    match err {
        Error::Api {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code, "invalid_param");
            assert_eq!(message, "query is required");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_and_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/parameters"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "unauthorized",
            "message": "Access token is invalid"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/conversations/missing/name"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "not_found",
            "message": "Conversation Not Exists."
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.parameters().get("u1").await.unwrap_err();
    assert!(err.is_auth_error());

    let err = client
        .conversations()
        .rename(
            "missing",
            RenameConversationRequest {
                name: "x".into(),
                user: "u1".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_non_json_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/parameters"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = client(&server).parameters().get("u1").await.unwrap_err();
    assert!(err.is_server_error());
    match err {
        Error::Api { code, message, .. } => {
            assert_eq!(code, "unknown");
            assert_eq!(message, "Bad Gateway");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_with_api_secret_overrides_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/parameters"))
        .and(header("authorization", "Bearer other-app"))
        .and(query_param("user", "u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "opening_statement": "Welcome"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let params = client(&server)
        .with_api_secret("other-app")
        .parameters()
        .get("u1")
        .await
        .unwrap();
    assert_eq!(params.opening_statement, "Welcome");
}

#[tokio::test]
async fn test_feedback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages/72d3dc0f/feedbacks"))
        .and(body_partial_json(json!({"rating": "like", "user": "u1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client(&server)
        .messages()
        .feedback(
            "72d3dc0f",
            MessageFeedbackRequest {
                rating: Some(Rating::Like),
                user: "u1".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(resp.result, "success");
}

#[tokio::test]
async fn test_validation_errors_send_nothing() {
    let server = MockServer::start().await;
    let client = client(&server);

    let err = client
        .messages()
        .feedback(
            "",
            MessageFeedbackRequest {
                rating: None,
                user: "u1".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));

    let err = client
        .conversations()
        .list(ListConversationsQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));

    let err = client.parameters().get("").await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_messages_list_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "limit": 20,
            "has_more": false,
            "data": [{
                "id": "m1",
                "conversation_id": "c1",
                "inputs": {"name": "dify"},
                "query": "iphone 13 pro",
                "answer": "The iPhone 13 Pro...",
                "feedback": {"rating": "like"},
                "created_at": 1705569239
            }]
        })))
        .mount(&server)
        .await;

    let mut query = ListMessagesQuery::new("c1", "u1");
    query.limit = Some(0);
    let page = client(&server).messages().list(query).await.unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].answer, "The iPhone 13 Pro...");

    let pairs = received_query(&server).await;
    assert!(pairs.contains(&("conversation_id".into(), "c1".into())));
    assert!(pairs.contains(&("user".into(), "u1".into())));
    assert!(!pairs.iter().any(|(k, _)| k == "limit" || k == "first_id"));
}

#[tokio::test]
async fn test_conversations_list_defaults_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/conversations"))
        .and(query_param("user", "u1"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "limit": 20,
            "has_more": true,
            "data": [{"id": "c1", "name": "Greeting", "inputs": {}, "status": "normal", "created_at": 1}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .conversations()
        .list(ListConversationsQuery::new("u1"))
        .await
        .unwrap();

    assert!(page.has_more);
    assert_eq!(page.data[0].name, "Greeting");
}

#[tokio::test]
async fn test_rename_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/conversations/c1/name"))
        .and(body_partial_json(json!({"name": "rename!!!", "user": "u1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client(&server)
        .conversations()
        .rename(
            "c1",
            RenameConversationRequest {
                name: "rename!!!".into(),
                user: "u1".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(resp.result, "success");
}

#[tokio::test]
async fn test_workflow_run_blocking() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/workflows/run"))
        .and(body_partial_json(json!({
            "inputs": {"city": "Paris"},
            "response_mode": "blocking",
            "user": "u1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workflow_run_id": "r1",
            "task_id": "t1",
            "data": {
                "id": "r1",
                "workflow_id": "w1",
                "status": "succeeded",
                "outputs": {"forecast": "sunny"},
                "elapsed_time": 1.2,
                "total_tokens": 50,
                "total_steps": 3,
                "created_at": 1705407629,
                "finished_at": 1705407631
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client(&server)
        .workflows()
        .run(WorkflowRunRequest::new("u1").with_input("city", "Paris"))
        .await
        .unwrap();

    assert_eq!(resp.workflow_run_id, "r1");
    assert_eq!(resp.data.outputs.unwrap()["forecast"], "sunny");
}
