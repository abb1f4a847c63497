//! Integration tests for the prompt-and-parse pipeline against a mocked
//! inference endpoint.
//!
//! Every test starts its own `wiremock` server, so they run offline and in
//! parallel.

use async_trait::async_trait;
use edgequake_examgen::{
    generate_from_bytes, generate_from_text, generate_questions, generate_sync, generate_to_file,
    ExamGenError, GeneratedRecord,
    GenerationBackend, GenerationConfig, GenerationResponse, QuestionGenerator, QuestionType,
    TransportErrorPolicy,
};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const MODEL: &str = "tiiuae/falcon-7b-instruct";
const MODEL_PATH: &str = "/models/tiiuae/falcon-7b-instruct";
const NOTES: &str = "The mitochondria is the powerhouse of the cell.";

// ── Test helpers ─────────────────────────────────────────────────────────────

fn config_for(server: &MockServer) -> GenerationConfig {
    GenerationConfig::builder()
        .endpoint(server.uri())
        .model(MODEL)
        .api_token("test-token")
        .build()
        .expect("valid config")
}

fn mcq_items() -> Value {
    json!([
        {
            "question": "What is the powerhouse of the cell?",
            "options": {"A": "Nucleus", "B": "Mitochondria", "C": "Ribosome", "D": "Golgi body"},
            "answer": "B",
            "explanation": "Mitochondria generate most of the cell's ATP."
        },
        {
            "question": "Which organelle produces ATP?",
            "options": {"A": "Mitochondria", "B": "Lysosome", "C": "Vacuole", "D": "Nucleolus"},
            "answer": "A",
            "explanation": "ATP synthesis happens in the mitochondria."
        },
        {
            "question": "The mitochondria is called the cell's…",
            "options": {"A": "Brain", "B": "Skeleton", "C": "Powerhouse", "D": "Library"},
            "answer": "C",
            "explanation": "The passage calls it the powerhouse of the cell."
        }
    ])
}

/// Endpoint answering with `generated_text` set to `text`.
async fn mount_generated_text(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "generated_text": text }])))
        .mount(server)
        .await;
}

fn records_json(records: &[GeneratedRecord]) -> Value {
    serde_json::to_value(records).expect("records serialise")
}

// ── Wire contract ────────────────────────────────────────────────────────────

#[tokio::test]
async fn request_has_expected_path_headers_and_body() {
    let server = MockServer::start().await;
    let expected_prompt =
        edgequake_examgen::prompts::build_prompt(NOTES, QuestionType::MultipleChoice, 1500);

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "inputs": expected_prompt,
            "parameters": {"max_new_tokens": 256, "temperature": 0.3},
            "options": {"wait_for_model": true}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "generated_text": mcq_items().to_string() }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let generator = QuestionGenerator::new(config_for(&server)).unwrap();
    let records = generator
        .generate(NOTES, QuestionType::MultipleChoice)
        .await
        .expect("generation succeeds");

    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn long_notes_are_truncated_in_prompt() {
    let server = MockServer::start().await;
    let captured: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&captured);

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(move |req: &Request| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            *sink.lock().unwrap() = body["inputs"].as_str().map(str::to_string);
            ResponseTemplate::new(200).set_body_json(json!([{ "generated_text": "[]" }]))
        })
        .mount(&server)
        .await;

    let notes: String = "0123456789".repeat(300); // 3000 chars
    let output = generate_from_text(&notes, QuestionType::ShortAnswer, &config_for(&server))
        .await
        .unwrap();

    let prompt = captured.lock().unwrap().clone().expect("prompt captured");
    assert!(prompt.contains(&format!("<<< {} >>>", &notes[..1500])));
    assert!(!prompt.contains(&notes[..1501]));
    assert!(output.stats.truncated);
    assert_eq!(output.stats.source_chars, 3000);
}

// ── Parse behaviour ──────────────────────────────────────────────────────────

#[tokio::test]
async fn mcq_end_to_end_three_items() {
    let server = MockServer::start().await;
    mount_generated_text(&server, &mcq_items().to_string()).await;

    let output = generate_from_text(NOTES, QuestionType::MultipleChoice, &config_for(&server))
        .await
        .unwrap();

    assert_eq!(output.records.len(), 3);
    for record in &output.records {
        assert!(record.has_fields(&["question", "options", "answer", "explanation"]));
    }
    assert!(!output.stats.fallback);
    assert_eq!(output.stats.model, MODEL);
}

#[tokio::test]
async fn valid_list_is_returned_unchanged() {
    let server = MockServer::start().await;
    let list = json!([{"question": "Q", "weird": {"nested": [1, 2, 3]}}, 7, "text"]);
    mount_generated_text(&server, &list.to_string()).await;

    let generator = QuestionGenerator::new(config_for(&server)).unwrap();
    let records = generator
        .generate(NOTES, QuestionType::ShortAnswer)
        .await
        .unwrap();

    assert_eq!(records_json(&records), list);
}

#[tokio::test]
async fn not_json_becomes_raw_record() {
    let server = MockServer::start().await;
    mount_generated_text(&server, "not json").await;

    let generator = QuestionGenerator::new(config_for(&server)).unwrap();
    let records = generator
        .generate(NOTES, QuestionType::MultipleChoice)
        .await
        .unwrap();

    assert_eq!(records_json(&records), json!([{"raw": "not json"}]));
}

#[tokio::test]
async fn plain_error_body_becomes_raw_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("ERROR 503"))
        .mount(&server)
        .await;

    let output = generate_from_text(NOTES, QuestionType::MultipleChoice, &config_for(&server))
        .await
        .unwrap();

    assert_eq!(records_json(&output.records), json!([{"raw": "ERROR 503"}]));
    assert!(output.stats.fallback);
    assert!(!output.stats.service_unavailable);
}

#[tokio::test]
async fn unexpected_json_shape_is_stringified_then_wrapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"estimated_time": 20.0})))
        .mount(&server)
        .await;

    let generator = QuestionGenerator::new(config_for(&server)).unwrap();
    let records = generator
        .generate(NOTES, QuestionType::MultipleChoice)
        .await
        .unwrap();

    // The stringified object is itself valid JSON, so it comes back as one item.
    assert_eq!(records_json(&records), json!([{"estimated_time": 20.0}]));
}

// ── Transport failures ───────────────────────────────────────────────────────

#[tokio::test]
async fn http_error_aborts_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = generate_from_text(NOTES, QuestionType::MultipleChoice, &config_for(&server))
        .await
        .unwrap_err();

    match err {
        ExamGenError::HttpStatus { status, ref body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "Service Unavailable");
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn http_error_degrades_under_fallback_policy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let config = GenerationConfig::builder()
        .endpoint(server.uri())
        .model(MODEL)
        .on_transport_error(TransportErrorPolicy::Fallback)
        .build()
        .unwrap();

    let output = generate_from_text(NOTES, QuestionType::MultipleChoice, &config)
        .await
        .unwrap();

    assert_eq!(output.records.len(), 1);
    let raw = output.records[0].get("raw").expect("fallback record");
    assert!(raw.as_str().unwrap().contains("HTTP 503"));
    assert!(output.stats.fallback);
    assert!(output.stats.service_unavailable);
}

// ── Refused connections (blocking API) ───────────────────────────────────────

/// Nothing listens on port 1, so every request is refused.
fn refused_config(policy: TransportErrorPolicy) -> GenerationConfig {
    GenerationConfig::builder()
        .endpoint("http://127.0.0.1:1")
        .model(MODEL)
        .timeout_secs(5)
        .on_transport_error(policy)
        .build()
        .unwrap()
}

fn notes_file() -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    f.write_all(NOTES.as_bytes()).unwrap();
    f
}

#[test]
fn refused_connection_aborts_by_default() {
    let notes = notes_file();
    let err = generate_sync(
        notes.path(),
        QuestionType::MultipleChoice,
        &refused_config(TransportErrorPolicy::Abort),
    )
    .unwrap_err();

    assert!(matches!(err, ExamGenError::Transport { .. }), "got {err:?}");
    assert!(err.is_service_unavailable());
}

#[test]
fn refused_connection_degrades_under_fallback_policy() {
    let notes = notes_file();
    let output = generate_sync(
        notes.path(),
        QuestionType::ShortAnswer,
        &refused_config(TransportErrorPolicy::Fallback),
    )
    .unwrap();

    assert_eq!(output.records.len(), 1);
    assert!(output.records[0].is_fallback());
    let raw = output.records[0].get("raw").expect("fallback record");
    assert!(
        raw.as_str().unwrap().starts_with("Generation service unavailable"),
        "got {raw}"
    );
    assert!(output.stats.service_unavailable);
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "generated_text": "[]" }]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = GenerationConfig::builder()
        .endpoint(server.uri())
        .model(MODEL)
        .timeout_secs(1)
        .build()
        .unwrap();

    let err = generate_from_text(NOTES, QuestionType::MultipleChoice, &config)
        .await
        .unwrap_err();

    assert!(
        matches!(err, ExamGenError::RequestTimeout { secs: 1, .. }),
        "got {err:?}"
    );
    assert!(err.is_service_unavailable());
}

// ── Custom backend & file entry points ───────────────────────────────────────

/// Backend double that records the prompt and answers with fixed text.
struct CannedBackend {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl GenerationBackend for CannedBackend {
    async fn generate(&self, prompt: &str) -> Result<GenerationResponse, ExamGenError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(GenerationResponse::StructuredGeneration(self.reply.clone()))
    }

    fn name(&self) -> String {
        "canned".into()
    }
}

#[tokio::test]
async fn prebuilt_backend_takes_precedence() {
    let backend = Arc::new(CannedBackend {
        reply: r#"[{"question": "Q", "model_answer": "A", "rubric": "0/1/2 scoring"}]"#.into(),
        prompts: Mutex::new(Vec::new()),
    });
    let config = GenerationConfig::builder()
        .endpoint("http://unreachable.invalid")
        .backend(backend.clone())
        .build()
        .unwrap();

    let output = generate_from_text(NOTES, QuestionType::ShortAnswer, &config)
        .await
        .unwrap();

    assert_eq!(output.records.len(), 1);
    assert!(output.records[0].has_fields(QuestionType::ShortAnswer.expected_fields()));
    assert_eq!(output.stats.model, "canned");
    let prompts = backend.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(NOTES));
}

#[tokio::test]
async fn text_file_with_invalid_bytes_to_csv() {
    let server = MockServer::start().await;
    mount_generated_text(&server, &mcq_items().to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let notes_path = dir.path().join("notes.txt");
    let mut f = std::fs::File::create(&notes_path).unwrap();
    f.write_all(b"The mitochondria\xff is the powerhouse of the cell.")
        .unwrap();
    drop(f);

    let output = generate_questions(&notes_path, QuestionType::MultipleChoice, &config_for(&server))
        .await
        .unwrap();
    assert_eq!(output.records.len(), 3);
    assert_eq!(output.stats.source_chars, NOTES.chars().count());

    let csv_path = dir.path().join("questions.csv");
    let stats = generate_to_file(
        &notes_path,
        &csv_path,
        QuestionType::MultipleChoice,
        &config_for(&server),
    )
    .await
    .unwrap();
    assert!(!stats.fallback);

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("question,options,answer,explanation"));
    assert_eq!(csv.lines().count(), 4);
}

#[tokio::test]
async fn declared_text_upload_is_not_sniffed_as_pdf() {
    let server = MockServer::start().await;
    mount_generated_text(&server, &mcq_items().to_string()).await;

    // Starts with the PDF magic, but the caller says it is plain text.
    let upload = format!("%PDF-1.4 is how PDF files begin. {NOTES}");
    let output = generate_from_bytes(
        upload.into_bytes(),
        Some("text/plain; charset=utf-8"),
        QuestionType::MultipleChoice,
        &config_for(&server),
    )
    .await
    .unwrap();

    assert_eq!(output.records.len(), 3);
    assert!(!output.stats.fallback);
    assert!(output.stats.source_chars > NOTES.len());
}

#[tokio::test]
async fn missing_notes_file_is_an_error() {
    let server = MockServer::start().await;
    let err = generate_questions(
        "/no/such/notes.txt",
        QuestionType::MultipleChoice,
        &config_for(&server),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ExamGenError::FileNotFound { .. }));
}
