#![allow(dead_code)]

use parking_lot::Mutex;
use reqwest::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use typesense_sync::models::{FieldValue, SourceRow};
use typesense_sync::search::{DocumentSink, ImportResponse, SearchError};
use typesense_sync::source::{RowSource, SourceError, TableName};

pub fn row(entries: Vec<(&str, FieldValue)>) -> SourceRow {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Rows `{id, name, city_name}` numbered from 1.
pub fn people(count: usize) -> Vec<SourceRow> {
    (1..=count)
        .map(|n| {
            row(vec![
                ("id", FieldValue::Int(n as i64)),
                ("name", FieldValue::Text(format!("person {n}"))),
                ("city_name", FieldValue::Text("Utrecht".to_string())),
            ])
        })
        .collect()
}

pub fn id_of(row: &SourceRow) -> i64 {
    match row.get("id") {
        Some(FieldValue::Int(id)) => *id,
        other => panic!("row without integer id: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Source double

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    Timeout,
    Fatal,
}

/// In-memory table with failures injectable by call number (0-based).
pub struct ScriptedSource {
    rows: Vec<SourceRow>,
    failures: Mutex<HashMap<usize, InjectedFailure>>,
    sample: Option<Option<SourceRow>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(usize, usize)>>,
}

impl ScriptedSource {
    pub fn new(rows: Vec<SourceRow>) -> Self {
        Self {
            rows,
            failures: Mutex::new(HashMap::new()),
            sample: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_call(self, call: usize, failure: InjectedFailure) -> Self {
        self.failures.lock().insert(call, failure);
        self
    }

    pub fn with_sample(mut self, sample: Option<SourceRow>) -> Self {
        self.sample = Some(sample);
        self
    }

    /// Every `(offset, limit)` requested, including failed ones.
    pub fn requests(&self) -> Vec<(usize, usize)> {
        self.requests.lock().clone()
    }
}

impl RowSource for ScriptedSource {
    async fn fetch_page(
        &self,
        _table: &TableName,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<SourceRow>, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push((offset, limit));

        match self.failures.lock().get(&call) {
            Some(InjectedFailure::Timeout) => {
                return Err(SourceError::Timeout(
                    "canceling statement due to statement timeout".to_string(),
                ));
            }
            Some(InjectedFailure::Fatal) => {
                return Err(SourceError::Decode("relation is corrupt".to_string()));
            }
            None => {}
        }

        let start = offset.min(self.rows.len());
        let end = (offset + limit).min(self.rows.len());
        Ok(self.rows[start..end].to_vec())
    }

    async fn fetch_sample(&self, _table: &TableName) -> Result<Option<SourceRow>, SourceError> {
        match &self.sample {
            Some(sample) => Ok(sample.clone()),
            None => Ok(self.rows.first().cloned()),
        }
    }
}

// ---------------------------------------------------------------------------
// Sink double

#[derive(Debug, Clone)]
pub enum Scripted {
    /// 200 with a success line per document.
    AllOk,
    /// Raw status and body.
    Reply(u16, String),
    Transport,
}

#[derive(Debug, Clone)]
pub struct SinkCall {
    pub body: String,
    pub at: tokio::time::Instant,
}

/// Replays scripted responses in order, then answers [`Scripted::AllOk`].
#[derive(Default)]
pub struct ScriptedSink {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<SinkCall>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSink {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl DocumentSink for ScriptedSink {
    async fn import_documents(
        &self,
        _collection: &str,
        body: String,
    ) -> Result<ImportResponse, SearchError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        self.calls.lock().push(SinkCall {
            body: body.clone(),
            at: tokio::time::Instant::now(),
        });
        let next = self.script.lock().pop_front().unwrap_or(Scripted::AllOk);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match next {
            Scripted::AllOk => Ok(ImportResponse {
                status: StatusCode::OK,
                body: all_ok_lines(&body),
            }),
            Scripted::Reply(status, reply) => Ok(ImportResponse {
                status: StatusCode::from_u16(status).unwrap(),
                body: reply,
            }),
            Scripted::Transport => Err(SearchError::Timeout(Duration::from_secs(60))),
        }
    }
}

pub fn all_ok_lines(jsonl: &str) -> String {
    jsonl
        .lines()
        .map(|_| "{\"success\":true}")
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Minimal HTTP server standing in for Typesense and callback receivers

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub type Handler = dyn Fn(&RecordedRequest) -> (u16, String) + Send + Sync;

pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl StubServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let recorded = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let _ = serve(stream, recorded, handler).await;
                });
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    stream: TcpStream,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    handler: Arc<Handler>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    loop {
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await? == 0 {
            return Ok(());
        }
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let target = parts.next().unwrap_or_default().to_string();

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                headers.push((key.trim().to_string(), value.trim().to_string()));
            }
        }

        let length = headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.parse::<usize>().ok())
            .unwrap_or(0);
        let mut body = vec![0; length];
        reader.read_exact(&mut body).await?;

        let request = RecordedRequest {
            method,
            target,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        };
        let (status, reply) = handler(&request);
        recorded.lock().push(request);

        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("Unknown");
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\n\
             content-length: {}\r\n\r\n{reply}",
            reply.len()
        );
        reader.get_mut().write_all(response.as_bytes()).await?;
        reader.get_mut().flush().await?;
    }
}

/// Typesense stand-in that keeps one collection definition in memory.
pub async fn typesense_stub() -> (StubServer, Arc<Mutex<HashMap<String, String>>>) {
    let collections: Arc<Mutex<HashMap<String, String>>> = Arc::new(Mutex::new(HashMap::new()));
    let state = Arc::clone(&collections);

    let server = StubServer::start(move |request| {
        let mut collections = state.lock();
        let path = request.target.split('?').next().unwrap_or_default();
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (request.method.as_str(), segments.as_slice()) {
            ("DELETE", ["collections", name]) => match collections.remove(*name) {
                Some(definition) => (200, definition),
                None => (404, "{\"message\":\"Not Found\"}".to_string()),
            },
            ("POST", ["collections"]) => {
                let name = request.json()["name"].as_str().unwrap_or_default().to_string();
                if collections.contains_key(&name) {
                    (409, "{\"message\":\"already exists\"}".to_string())
                } else {
                    collections.insert(name, request.body.clone());
                    (201, request.body.clone())
                }
            }
            ("POST", ["collections", name, "documents", "import"]) => {
                if collections.contains_key(*name) {
                    (200, all_ok_lines(&request.body))
                } else {
                    (404, "{\"message\":\"Not Found\"}".to_string())
                }
            }
            _ => (400, "{\"message\":\"unexpected request\"}".to_string()),
        }
    })
    .await;

    (server, collections)
}
