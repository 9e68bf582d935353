use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value as JsonValue};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};

type Replies = Arc<Mutex<VecDeque<(StatusCode, JsonValue)>>>;
type DelayedReplies = Arc<Mutex<VecDeque<(StatusCode, JsonValue, Duration)>>>;

#[derive(Clone, Default)]
struct MockState {
    meeting_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    meeting_pages: Replies,
    chat_requests: Arc<Mutex<Vec<JsonValue>>>,
    chat_replies: DelayedReplies,
}

/// One in-process server playing both the meeting records API and an
/// OpenAI-compatible chat endpoint. Queued replies are served in order. An
/// exhausted meeting queue answers with an empty page; an exhausted chat
/// queue answers 500 so unexpected calls show up as failures.
pub struct MockServices {
    pub base_url: String,
    state: MockState,
    _server_handle: tokio::task::JoinHandle<()>,
}

impl MockServices {
    pub async fn start() -> anyhow::Result<Self> {
        let state = MockState::default();

        let app = Router::new()
            .route("/api/meeting", get(handle_meeting))
            .route("/v1/chat/completions", post(handle_chat))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        sleep(Duration::from_millis(50)).await;

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _server_handle: server_handle,
        })
    }

    pub fn meeting_url(&self) -> String {
        format!("{}/api/meeting", self.base_url)
    }

    pub fn openai_url(&self) -> String {
        format!("{}/v1", self.base_url)
    }

    pub fn push_page(&self, records: JsonValue) {
        self.state
            .meeting_pages
            .lock()
            .unwrap()
            .push_back((StatusCode::OK, json!({ "meetingRecord": records })));
    }

    pub fn push_page_error(&self, status: StatusCode) {
        self.state
            .meeting_pages
            .lock()
            .unwrap()
            .push_back((status, json!({ "message": "error" })));
    }

    pub fn push_completion(&self, content: &str) {
        self.push_delayed_completion(content, Duration::ZERO);
    }

    /// A completion that is only sent after `delay`.
    pub fn push_delayed_completion(&self, content: &str, delay: Duration) {
        self.state.chat_replies.lock().unwrap().push_back((
            StatusCode::OK,
            json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": content },
                    "finish_reason": "stop"
                }]
            }),
            delay,
        ));
    }

    pub fn push_chat_error(&self, status: StatusCode) {
        self.state.chat_replies.lock().unwrap().push_back((
            status,
            json!({ "error": { "message": "scripted failure" } }),
            Duration::ZERO,
        ));
    }

    pub fn meeting_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.meeting_queries.lock().unwrap().clone()
    }

    pub fn chat_requests(&self) -> Vec<JsonValue> {
        self.state.chat_requests.lock().unwrap().clone()
    }

    /// The user message of every chat request, in arrival order.
    pub fn chat_prompts(&self) -> Vec<String> {
        self.chat_requests()
            .iter()
            .map(|request| {
                request["messages"][1]["content"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    /// Environment for a run against this server, writing into `output_dir`.
    pub fn env(&self, output_dir: &Path) -> HashMap<String, String> {
        [
            ("OPENAI_API_KEY", "sk-test".to_string()),
            ("OPENAI_BASE_URL", self.openai_url()),
            ("KOKKAI_API_URL", self.meeting_url()),
            ("OUTPUT_DIR", output_dir.display().to_string()),
            ("PAGE_DELAY_MS", "0".to_string()),
            ("MAX_RETRIES", "0".to_string()),
            ("RETRY_BASE_DELAY_MS", "0".to_string()),
            ("LLM_REQUESTS_PER_SECOND", "1000".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

pub fn lookup(vars: HashMap<String, String>) -> impl Fn(&str) -> Option<String> {
    move |name| vars.get(name).cloned()
}

pub fn meeting(date: &str, speeches: &[&str]) -> JsonValue {
    let speech_record: Vec<JsonValue> = speeches
        .iter()
        .enumerate()
        .map(|(i, speech)| json!({ "speechOrder": i, "speaker": "議員", "speech": speech }))
        .collect();
    json!({
        "issueID": format!("issue-{}", date),
        "nameOfHouse": "衆議院",
        "nameOfMeeting": "本会議",
        "date": date,
        "speechRecord": speech_record
    })
}

async fn handle_meeting(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<JsonValue>) {
    state.meeting_queries.lock().unwrap().push(query);
    let next = state.meeting_pages.lock().unwrap().pop_front();
    match next {
        Some((status, body)) => (status, Json(body)),
        None => (StatusCode::OK, Json(json!({ "numberOfRecords": 0 }))),
    }
}

async fn handle_chat(
    State(state): State<MockState>,
    Json(request): Json<JsonValue>,
) -> (StatusCode, Json<JsonValue>) {
    state.chat_requests.lock().unwrap().push(request);
    let next = state.chat_replies.lock().unwrap().pop_front();
    match next {
        Some((status, body, delay)) => {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            (status, Json(body))
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "no scripted reply" } })),
        ),
    }
}
