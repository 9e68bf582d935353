use axum::{extract::Query, extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde_json::{json, Value as JsonValue};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};

pub type RecordedQuery = HashMap<String, String>;

#[derive(Clone)]
struct MockState {
    queries: Arc<Mutex<Vec<RecordedQuery>>>,
    responses: Arc<Mutex<VecDeque<(StatusCode, JsonValue)>>>,
}

/// In-process stand-in for the meeting records endpoint. Replies are served in
/// the order they were queued; once the queue is empty every request gets an
/// empty page.
pub struct MockMeetingApi {
    pub url: String,
    queries: Arc<Mutex<Vec<RecordedQuery>>>,
    responses: Arc<Mutex<VecDeque<(StatusCode, JsonValue)>>>,
    _server_handle: tokio::task::JoinHandle<()>,
}

impl MockMeetingApi {
    pub async fn start() -> anyhow::Result<Self> {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(Mutex::new(VecDeque::new()));

        let state = MockState {
            queries: queries.clone(),
            responses: responses.clone(),
        };

        let app = Router::new()
            .route("/api/meeting", get(handle_meeting))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        sleep(Duration::from_millis(50)).await;

        Ok(Self {
            url: format!("http://127.0.0.1:{}/api/meeting", port),
            queries,
            responses,
            _server_handle: server_handle,
        })
    }

    pub fn push_page(&self, records: JsonValue) {
        self.push_response(StatusCode::OK, json!({ "meetingRecord": records }));
    }

    pub fn push_response(&self, status: StatusCode, body: JsonValue) {
        self.responses.lock().unwrap().push_back((status, body));
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }
}

async fn handle_meeting(
    State(state): State<MockState>,
    Query(query): Query<RecordedQuery>,
) -> (StatusCode, Json<JsonValue>) {
    state.queries.lock().unwrap().push(query);
    let next = state.responses.lock().unwrap().pop_front();
    match next {
        Some((status, body)) => (status, Json(body)),
        None => (StatusCode::OK, Json(json!({ "numberOfRecords": 0 }))),
    }
}
