//! In-process mock of the provider APIs.
//!
//! Every route records the JSON body it received. Credentials are checked
//! against `test-key`; the model name selects canned failure modes.

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use parking_lot::Mutex;
use rcore::StaticSource;
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    convert::Infallible,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{net::TcpListener, sync::Notify};

pub const KEY: &str = "test-key";

/// Full text of every canned OpenAI completion.
pub const OPENAI_TEXT: &str = "OpenAI is an AI company.";

/// Credentials for every mocked provider.
pub fn credentials() -> StaticSource {
    [
        "OPENAI_API_KEY",
        "ANTHROPIC_API_KEY",
        "GOOGLE_API_KEY",
        "COHERE_API_KEY",
        "AWS_BEARER_TOKEN_BEDROCK",
        "AZURE_OPENAI_API_KEY",
        "TOGETHER_API_KEY",
        "JINACHAT_API_KEY",
        "MISTRAL_API_KEY",
        "HUGGINGFACE_ACCESS_TOKEN",
        "REPLICATE_API_TOKEN",
        "GOOGLE_CLOUD_ACCESS_TOKEN",
    ]
    .into_iter()
    .map(|var| (var, KEY))
    .collect()
}

#[derive(Default)]
pub struct Shared {
    bodies: Mutex<Vec<Value>>,
    /// Replicate prediction polls served.
    polls: AtomicUsize,
    /// Notified when an endless stream's body is dropped.
    pub closed: Notify,
}

pub struct Mock {
    pub addr: SocketAddr,
    pub shared: Arc<Shared>,
}

impl Mock {
    /// `http://{addr}{path}`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// The most recent request body.
    pub fn last_body(&self) -> Value {
        self.shared.bodies.lock().last().cloned().unwrap_or_default()
    }

    pub fn requests(&self) -> usize {
        self.shared.bodies.lock().len()
    }

    pub fn polls(&self) -> usize {
        self.shared.polls.load(Ordering::SeqCst)
    }
}

pub async fn spawn() -> Mock {
    let shared = Arc::new(Shared::default());
    let app = Router::new()
        .route("/v1/chat/completions", post(openai))
        .route("/anthropic/v1/messages", post(anthropic))
        .route(
            "/azure/openai/deployments/{deployment}/chat/completions",
            post(azure),
        )
        .route("/gemini/models/{call}", post(gemini))
        .route("/vertex/models/{call}", post(vertex))
        .route("/hf/{endpoint}", post(huggingface))
        .route("/replicate/models/{owner}/{name}/predictions", post(replicate))
        .route("/replicate/predictions", post(replicate_version))
        .route("/replicate/predictions/{id}", get(replicate_poll))
        .route("/replicate/stream/{name}", get(replicate_stream))
        .route("/ollama/api/chat", post(ollama))
        .route("/cohere/chat", post(cohere))
        .route("/bedrock/model/{model}/converse", post(bedrock))
        .with_state(shared.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    Mock { addr, shared }
}

fn authorized(headers: &HeaderMap, name: header::HeaderName, expected: &str) -> bool {
    headers.get(name).and_then(|v| v.to_str().ok()) == Some(expected)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": { "message": message } }))).into_response()
}

/// Serve `body` as a chunked stream, a few bytes at a time.
fn chunked(content_type: &'static str, body: String) -> Response {
    let chunks: Vec<Result<Bytes, Infallible>> = body
        .into_bytes()
        .chunks(7)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    (
        [(header::CONTENT_TYPE, content_type)],
        Body::from_stream(futures_util::stream::iter(chunks)),
    )
        .into_response()
}

fn sse(events: &[Value]) -> Response {
    let body = events
        .iter()
        .map(|event| format!("data: {event}\n\n"))
        .collect();
    chunked("text/event-stream", body)
}

fn ndjson(lines: &[Value]) -> Response {
    let body = lines.iter().map(|line| format!("{line}\n")).collect();
    chunked("application/x-ndjson", body)
}

struct Guard(Arc<Shared>);

impl Drop for Guard {
    fn drop(&mut self) {
        self.0.closed.notify_one();
    }
}

/// An SSE body that never ends.
fn endless(shared: Arc<Shared>) -> Response {
    let guard = Guard(shared);
    let stream = async_stream::stream! {
        let _guard = guard;
        loop {
            yield Ok::<_, Infallible>(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"tick \"}}]}\n\n",
            ));
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(stream),
    )
        .into_response()
}

fn delta(text: &str) -> Value {
    json!({ "choices": [{ "index": 0, "delta": { "content": text } }] })
}

async fn openai(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    shared.bodies.lock().push(body.clone());
    if !authorized(&headers, header::AUTHORIZATION, &format!("Bearer {KEY}")) {
        return error(StatusCode::UNAUTHORIZED, "Incorrect API key provided");
    }
    let stream = body["stream"].as_bool().unwrap_or(false);
    match body["model"].as_str().unwrap_or_default() {
        "rate-limited" => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "7")],
            Json(json!({ "error": { "message": "Rate limit reached" } })),
        )
            .into_response(),
        "failing" => error(StatusCode::INTERNAL_SERVER_ERROR, "The server had an error"),
        "broken" => (
            [(header::CONTENT_TYPE, "application/json")],
            "{\"choices\": [",
        )
            .into_response(),
        "no-choices" => Json(json!({ "choices": [] })).into_response(),
        "error-body" => Json(json!({ "error": { "message": "model overloaded" } })).into_response(),
        "endless" if stream => endless(shared),
        "stream-error" if stream => sse(&[
            delta("partial"),
            json!({ "error": { "message": "overloaded" } }),
        ]),
        _ if stream => openai_stream(),
        _ if body.get("tools").is_some() => Json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_weather",
                            "arguments": "{\"location\":\"Paris\",\"days\":3}"
                        }
                    }]
                }
            }]
        }))
        .into_response(),
        _ => openai_text(),
    }
}

fn openai_text() -> Response {
    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": OPENAI_TEXT } }]
    }))
    .into_response()
}

fn openai_stream() -> Response {
    let mut events = vec![
        json!({ "choices": [{ "index": 0, "delta": { "role": "assistant" } }] }),
        delta("Open"),
        delta("AI is"),
        delta(" an AI company."),
    ];
    events.push(Value::String("[DONE]".into()));
    let body = events
        .iter()
        .map(|event| match event {
            Value::String(done) => format!("data: {done}\n\n"),
            event => format!("data: {event}\n\n"),
        })
        .collect();
    chunked("text/event-stream", body)
}

async fn azure(
    State(shared): State<Arc<Shared>>,
    Path(deployment): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    shared.bodies.lock().push(json!({
        "deployment": deployment,
        "api_version": query.get("api-version"),
        "authorization": headers.contains_key(header::AUTHORIZATION),
        "body": body,
    }));
    if !authorized(&headers, header::HeaderName::from_static("api-key"), KEY) {
        return error(StatusCode::UNAUTHORIZED, "Access denied due to invalid subscription key");
    }
    if body["stream"].as_bool().unwrap_or(false) {
        openai_stream()
    } else {
        openai_text()
    }
}

async fn anthropic(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    shared.bodies.lock().push(body.clone());
    if !authorized(&headers, header::HeaderName::from_static("x-api-key"), KEY)
        || headers.get("anthropic-version").is_none()
    {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "type": "error",
                "error": { "type": "authentication_error", "message": "invalid x-api-key" }
            })),
        )
            .into_response();
    }
    if !body["stream"].as_bool().unwrap_or(false) {
        return Json(json!({
            "type": "message",
            "content": [{ "type": "text", "text": "Claude says hi" }]
        }))
        .into_response();
    }
    if body["model"] == "overloaded" {
        return sse(&[
            json!({ "type": "message_start", "message": {} }),
            json!({ "type": "error", "error": { "type": "overloaded_error", "message": "Overloaded" } }),
        ]);
    }
    sse(&[
        json!({ "type": "message_start", "message": {} }),
        json!({ "type": "content_block_start", "index": 0, "content_block": { "type": "text", "text": "" } }),
        json!({ "type": "ping" }),
        json!({ "type": "content_block_delta", "index": 0, "delta": { "type": "text_delta", "text": "Claude" } }),
        json!({ "type": "content_block_delta", "index": 0, "delta": { "type": "text_delta", "text": " says hi" } }),
        json!({ "type": "content_block_stop", "index": 0 }),
        json!({ "type": "message_stop" }),
    ])
}

async fn gemini(
    State(shared): State<Arc<Shared>>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    shared.bodies.lock().push(body);
    if !authorized(&headers, header::HeaderName::from_static("x-goog-api-key"), KEY) {
        return error(StatusCode::FORBIDDEN, "API key not valid");
    }
    generate_content(&call)
}

async fn vertex(
    State(shared): State<Arc<Shared>>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    shared.bodies.lock().push(body);
    if !authorized(&headers, header::AUTHORIZATION, &format!("Bearer {KEY}")) {
        return error(StatusCode::UNAUTHORIZED, "Request had invalid authentication credentials");
    }
    generate_content(&call)
}

/// `{model}:{method}` for Gemini and Vertex AI.
fn generate_content(call: &str) -> Response {
    let part = |text: &str| json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] });
    match call.split_once(':') {
        Some(("empty", "generateContent")) => Json(json!({})).into_response(),
        Some((_, "generateContent")) => Json(part("Gemini says hi")).into_response(),
        Some((_, "streamGenerateContent")) => sse(&[part("Gemini"), part(" says hi")]),
        _ => error(StatusCode::NOT_FOUND, "unknown method"),
    }
}

async fn ollama(State(shared): State<Arc<Shared>>, Json(body): Json<Value>) -> Response {
    shared.bodies.lock().push(body.clone());
    let chunk = |text: &str, done: bool| {
        json!({ "message": { "role": "assistant", "content": text }, "done": done })
    };
    let stream = body["stream"].as_bool().unwrap_or(true);
    match body["model"].as_str().unwrap_or_default() {
        "empty" if !stream => Json(json!({})).into_response(),
        "missing" if !stream => Json(json!({ "error": "model 'missing' not found" })).into_response(),
        "missing" => ndjson(&[chunk("Llama", false), json!({ "error": "model 'missing' not found" })]),
        _ if stream => ndjson(&[chunk("Llama", false), chunk(" here", false), chunk("", true)]),
        _ => Json(chunk("Llama here", true)).into_response(),
    }
}

async fn huggingface(
    State(shared): State<Arc<Shared>>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    shared.bodies.lock().push(body.clone());
    if !authorized(&headers, header::AUTHORIZATION, &format!("Bearer {KEY}")) {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials in Authorization header");
    }
    let token = |text: &str, special: bool| json!({ "token": { "id": 1, "text": text, "special": special } });
    let stream = body["stream"].as_bool().unwrap_or(false);
    match endpoint.as_str() {
        "empty" => Json(json!([])).into_response(),
        "overloaded" if stream => sse(&[token("Hug", false), json!({ "error": "Model is overloaded" })]),
        _ if stream => sse(&[
            token("Hug", false),
            token("ging", false),
            json!({ "token": { "id": 2, "text": "</s>", "special": true }, "generated_text": "Hugging" }),
        ]),
        _ => Json(json!([{ "generated_text": "Hugging" }])).into_response(),
    }
}

/// `http://{host}` of the mock, as the client addressed it.
fn origin(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    format!("http://{host}")
}

/// Replicate predictions, keyed by the model name:
/// `llama` succeeds in the initial wait, `slow` succeeds on the first
/// poll, `stuck` never finishes, `crashed` fails, `late` answers the
/// initial request after a delay and never finishes.
async fn replicate(
    State(shared): State<Arc<Shared>>,
    Path((_owner, name)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    shared.bodies.lock().push(body.clone());
    if !authorized(&headers, header::AUTHORIZATION, &format!("Bearer {KEY}")) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "You did not pass a valid authentication token" })),
        )
            .into_response();
    }
    let origin = origin(&headers);
    let urls = |id: &str| {
        json!({
            "get": format!("{origin}/replicate/predictions/{id}"),
            "stream": format!("{origin}/replicate/stream/{name}"),
        })
    };
    if body["stream"].as_bool().unwrap_or(false) {
        return Json(json!({ "id": "p-stream", "status": "starting", "urls": urls("stream") }))
            .into_response();
    }
    match name.as_str() {
        "slow" | "stuck" => {
            Json(json!({ "status": "starting", "urls": urls(&name) })).into_response()
        }
        "late" => {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            Json(json!({ "status": "starting", "urls": urls("stuck") })).into_response()
        }
        "crashed" => Json(json!({
            "status": "failed",
            "error": "CUDA out of memory",
            "urls": urls(&name),
        }))
        .into_response(),
        _ => Json(json!({
            "status": "succeeded",
            "output": ["Llama", " two", " says hi"],
            "urls": urls(&name),
        }))
        .into_response(),
    }
}

async fn replicate_version(
    State(shared): State<Arc<Shared>>,
    Json(body): Json<Value>,
) -> Response {
    shared.bodies.lock().push(body);
    Json(json!({ "status": "succeeded", "output": "Pinned llama" })).into_response()
}

async fn replicate_poll(
    State(shared): State<Arc<Shared>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    shared.polls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers, header::AUTHORIZATION, &format!("Bearer {KEY}")) {
        return error(StatusCode::UNAUTHORIZED, "Unauthenticated");
    }
    let get = format!("{}/replicate/predictions/{id}", origin(&headers));
    match id.as_str() {
        "stuck" => Json(json!({ "status": "processing", "urls": { "get": get } })).into_response(),
        _ => Json(json!({
            "status": "succeeded",
            "output": ["Llama", " two", " says hi"],
            "urls": { "get": get },
        }))
        .into_response(),
    }
}

async fn replicate_stream(Path(name): Path<String>, headers: HeaderMap) -> Response {
    if headers.get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()) != Some("no-store") {
        return error(StatusCode::BAD_REQUEST, "stream requires cache-control: no-store");
    }
    let tail = if name == "faulty" {
        "event: error\ndata: {\"detail\":\"prediction failed\"}\n\n"
    } else {
        "event: output\ndata:  says hi\n\nevent: done\ndata: {}\n\n"
    };
    let body = format!("event: output\ndata: Llama\n\nevent: output\ndata:  two\n\n{tail}");
    chunked("text/event-stream", body)
}

async fn cohere(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    shared.bodies.lock().push(body.clone());
    if !authorized(&headers, header::AUTHORIZATION, &format!("Bearer {KEY}")) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid api token" })),
        )
            .into_response();
    }
    if !body["stream"].as_bool().unwrap_or(false) {
        return Json(json!({ "text": "Command R" })).into_response();
    }
    let end = if body["model"] == "cohere-error" {
        json!({ "event_type": "stream-end", "finish_reason": "ERROR_TOXIC", "response": { "text": "" } })
    } else {
        json!({ "event_type": "stream-end", "finish_reason": "COMPLETE", "response": { "text": "Command R" } })
    };
    ndjson(&[
        json!({ "event_type": "stream-start", "generation_id": "g1" }),
        json!({ "event_type": "text-generation", "text": "Command" }),
        json!({ "event_type": "text-generation", "text": " R" }),
        end,
    ])
}

async fn bedrock(
    State(shared): State<Arc<Shared>>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    shared.bodies.lock().push(json!({ "model": model, "body": body }));
    if !authorized(&headers, header::AUTHORIZATION, &format!("Bearer {KEY}")) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Bearer token invalid" })),
        )
            .into_response();
    }
    Json(json!({
        "output": { "message": { "role": "assistant", "content": [{ "text": "Titan says hi" }] } },
        "stopReason": "end_turn"
    }))
    .into_response()
}
