//! Integration tests for the full question answering pipeline
//!
//! Extraction, chunk planning and sequential streaming requests are run
//! together against a mock completion endpoint.

use doc_qa::context::{BudgetMode, QuestionPlacement, TiktokenTokenizer, TokenEncoding, Tokenizer};
use doc_qa::llm::{ApiCredential, ChunkError};
use doc_qa::orchestrator::ChunkState;
use doc_qa::{AnswerEvent, CollectingSink, Config, Document, DocumentFormat, QaError, QaPipeline};
use mockito::Matcher;
use serde_json::json;

const PATH: &str = "/v1/chat/completions";

fn config_for(url: &str, budget: usize) -> Config {
    let mut config = Config::default();
    config.completion.endpoint = format!("{}{}", url, PATH);
    config.completion.context_window = 1000;
    config.completion.max_tokens = 100;
    config.planner.budget_mode = BudgetMode::Fixed;
    config.planner.fixed_budget = Some(budget);
    config.planner.preamble = String::new();
    config.planner.separator = " ".to_string();
    config
}

fn sse(fragments: &[&str]) -> String {
    let mut body = String::new();
    for f in fragments {
        body.push_str(&format!(
            "data: {}\n\n",
            json!({"choices": [{"delta": {"content": f}}]})
        ));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn content_is(text: &str) -> Matcher {
    Matcher::PartialJson(json!({"messages": [{"role": "user", "content": text}]}))
}

/// Document whose combined text with `question` is exactly `total` tokens
fn document_of_tokens(question: &str, total: usize) -> String {
    let tokenizer = TiktokenTokenizer::new(TokenEncoding::Cl100kBase).unwrap();
    let mut document = "the".to_string();
    while tokenizer.count(&format!("{} {}", document, question)) < total {
        document.push_str(" the");
    }
    assert_eq!(tokenizer.count(&format!("{} {}", document, question)), total);
    document
}

#[tokio::test]
async fn test_three_chunks_with_failing_middle() {
    let mut server = mockito::Server::new_async().await;
    let pipeline = QaPipeline::new(
        &config_for(&server.url(), 10),
        ApiCredential::new("test-key").unwrap(),
    )
    .unwrap();

    let text = document_of_tokens("Summarize", 25);
    let document = Document::new(text.into_bytes(), DocumentFormat::PlainText);

    let plan = pipeline.plan(&document, "Summarize").unwrap();
    let sizes: Vec<usize> = plan.chunks.iter().map(|c| c.token_count).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
    assert!(plan.chunks[2].text.ends_with("Summarize"));

    let first = server
        .mock("POST", PATH)
        .match_body(content_is(&plan.chunks[0].text))
        .with_status(200)
        .with_body(sse(&["first ", "part"]))
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", PATH)
        .match_body(content_is(&plan.chunks[1].text))
        .with_status(500)
        .with_body("upstream exploded")
        .expect(1)
        .create_async()
        .await;
    let third = server
        .mock("POST", PATH)
        .match_body(content_is(&plan.chunks[2].text))
        .with_status(200)
        .with_body(sse(&["third part"]))
        .expect(1)
        .create_async()
        .await;

    let mut sink = CollectingSink::new();
    let report = pipeline.answer(&document, "Summarize", &mut sink).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    third.assert_async().await;

    let states: Vec<ChunkState> = report.outcomes.iter().map(|o| o.state).collect();
    assert_eq!(
        states,
        vec![ChunkState::Completed, ChunkState::Failed, ChunkState::Completed]
    );
    assert_eq!(sink.text_for(0), "first part");
    assert_eq!(sink.text_for(2), "third part");
    assert_eq!(
        sink.failures(),
        vec![(
            1,
            &ChunkError::Upstream {
                status: 500,
                body: "upstream exploded".to_string()
            }
        )]
    );
    assert!(!report.all_failed());
}

#[tokio::test]
async fn test_unauthorized_surfaces_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_header("authorization", "Bearer wrong-key")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Invalid API key"}}"#)
        .expect(1)
        .create_async()
        .await;

    let pipeline = QaPipeline::new(
        &config_for(&server.url(), 500),
        ApiCredential::new("wrong-key").unwrap(),
    )
    .unwrap();
    let document = Document::from_upload("notes.md", b"# Notes\n\nShort.".to_vec()).unwrap();

    let mut sink = CollectingSink::new();
    let report = pipeline.answer(&document, "What is this?", &mut sink).await.unwrap();

    mock.assert_async().await;
    assert_eq!(sink.fragment_count(), 0);

    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].1.status(), Some(401));
    assert!(failures[0].1.to_string().contains("Invalid API key"));
    assert!(report.all_failed());
}

#[tokio::test]
async fn test_question_in_every_chunk() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_body(Matcher::Regex("Which animal\\?\"".to_string()))
        .with_status(200)
        .with_body(sse(&["ok"]))
        .expect_at_least(2)
        .create_async()
        .await;

    let mut config = config_for(&server.url(), 30);
    config.planner.question_placement = QuestionPlacement::EveryChunk;
    let pipeline = QaPipeline::new(&config, ApiCredential::new("k").unwrap()).unwrap();

    let text = "The quick brown fox jumps over the lazy dog. ".repeat(10);
    let document = Document::new(text.into_bytes(), DocumentFormat::PlainText);

    let mut sink = CollectingSink::new();
    let report = pipeline.answer(&document, "Which animal?", &mut sink).await.unwrap();

    mock.assert_async().await;
    assert!(report.outcomes.len() >= 2);
    assert_eq!(report.completed(), report.outcomes.len());
}

#[tokio::test]
async fn test_truncation_warns_and_sends_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(sse(&["short answer"]))
        .expect(1)
        .create_async()
        .await;

    let mut config = config_for(&server.url(), 20);
    config.planner.policy = doc_qa::ChunkPolicy::Truncate;
    let pipeline = QaPipeline::new(&config, ApiCredential::new("k").unwrap()).unwrap();

    let text = "A fairly long sentence that will not fit. ".repeat(20);
    let document = Document::new(text.into_bytes(), DocumentFormat::PlainText);

    let mut sink = CollectingSink::new();
    let report = pipeline.answer(&document, "Summary?", &mut sink).await.unwrap();

    mock.assert_async().await;
    assert_eq!(report.outcomes.len(), 1);
    match &sink.events[0] {
        AnswerEvent::Truncated(t) => assert_eq!(t.kept_chars, 20),
        other => panic!("expected truncation notice, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_document_sends_question_only() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_body(content_is("Is anything here?"))
        .with_status(200)
        .with_body(sse(&["No."]))
        .expect(1)
        .create_async()
        .await;

    let pipeline = QaPipeline::new(
        &config_for(&server.url(), 50),
        ApiCredential::new("k").unwrap(),
    )
    .unwrap();
    let document = Document::new(Vec::new(), DocumentFormat::PlainText);

    let mut sink = CollectingSink::new();
    pipeline.answer(&document, "Is anything here?", &mut sink).await.unwrap();

    mock.assert_async().await;
    assert_eq!(sink.text_for(0), "No.");
}

#[test]
fn test_unsupported_format_rejected() {
    let err = Document::from_upload("scan.pdf", vec![1, 2, 3]).unwrap_err();
    assert!(matches!(err, QaError::UnsupportedFormat(_)));
}

#[test]
fn test_missing_api_key_is_configuration_error() {
    let err = ApiCredential::from_env("DOCQA_PIPELINE_TEST_UNSET_KEY").unwrap_err();
    assert!(matches!(err, QaError::Configuration(_)));
}
