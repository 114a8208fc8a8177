use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use mockito::{Matcher, Server};

use cortex_relay::llm::ollama::OllamaClient;
use cortex_relay::llm::{LlmClient, Message};
use cortex_relay::planning::{Command, GoalPlanner, OraclePlanner};

fn client(base_url: String) -> OllamaClient {
    OllamaClient::new(
        Some(base_url),
        "mistral:latest".to_string(),
        256,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn test_generate_request_and_response() -> Result<()> {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "mistral:latest",
            "stream": false,
            "system": "be brief",
            "options": {"num_predict": 256}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response": "hello", "done": true, "prompt_eval_count": 12, "eval_count": 3}"#)
        .create_async()
        .await;

    let response = client(server.url())
        .send_message_with_system(&[Message::user("hi".to_string())], Some("be brief"))
        .await?;

    assert_eq!(response.text(), "hello");
    let usage = response.usage.expect("usage reported");
    assert_eq!(usage.input_tokens, 12);
    assert_eq!(usage.output_tokens, 3);

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_error_status_is_reported() -> Result<()> {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/api/generate")
        .with_status(404)
        .with_body(r#"{"error": "model 'mistral:latest' not found"}"#)
        .create_async()
        .await;

    let err = client(server.url())
        .send_message_with_system(&[Message::user("hi".to_string())], None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"));

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_connection_check() -> Result<()> {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(r#"{"models": []}"#)
        .create_async()
        .await;

    client(format!("{}/", server.url())).test_connection().await?;
    mock.assert_async().await;

    let unreachable = client("http://127.0.0.1:9".to_string());
    assert!(unreachable.test_connection().await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_oracle_plans_through_ollama() -> Result<()> {
    let mut server = Server::new_async().await;

    let reply = serde_json::json!({
        "response": "Here is the plan:\n```json\n{\"intent\": \"search\", \"steps\": [{\"action\": \"navigate\", \"url\": \"https://allrecipes.com\"}, {\"action\": \"input\", \"selector\": \"#search\", \"text\": \"lasagna\"}, {\"action\": \"hover\", \"selector\": \"#menu\"}], \"confidence\": 0.8}\n```",
        "done": true
    });

    let mock = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::Regex("lasagna".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply.to_string())
        .create_async()
        .await;

    let llm: Arc<dyn LlmClient> = Arc::new(client(server.url()));
    let planner = GoalPlanner::with_oracle(Arc::new(OraclePlanner::new(llm)));

    let plan = planner
        .plan("find a recipe for lasagna and show me reviews", None)
        .await;
    assert_eq!(
        plan,
        vec![
            Command::navigate("https://allrecipes.com"),
            Command::input("#search", "lasagna"),
        ]
    );

    mock.assert_async().await;
    Ok(())
}
