use std::{
    collections::HashMap,
    io::{BufRead, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc},
    thread,
};

use anyhow::{Context, Result, anyhow};
use deckgen_mcp::{Backend, ErrorCode, ProtocolError, ToolCall, ToolRegistry};
use log::{debug, info, warn};
use serde_json::{Value, json};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Threads running tool calls; further calls queue until one is free.
pub const CALL_WORKERS: usize = 8;

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;

const CANCELLED: &str = "notifications/cancelled";

/// What to do with one incoming line.
enum Incoming {
    /// Answer immediately.
    Reply(Value),
    /// Run a tool; may take as long as the backend does.
    ToolCall { id: Value, params: Value },
    /// No response expected.
    Notification(String),
}

/// A queued `tools/call`.
struct Job {
    id: Value,
    params: Value,
}

/// Line-delimited JSON-RPC host for the tool registry.
pub struct Server {
    registry: ToolRegistry,
    backend: Box<dyn Backend>,
    /// Accepted calls not yet answered, keyed by serialized id. `true` once cancelled.
    pending: Mutex<HashMap<String, bool>>,
}

impl Server {
    pub fn new(registry: ToolRegistry, backend: Box<dyn Backend>) -> Self {
        Self {
            registry,
            backend,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one request line synchronously. `None` for notifications.
    #[cfg(test)]
    pub fn handle_line(&self, line: &str) -> Option<Value> {
        match self.classify(line) {
            Incoming::Reply(response) => Some(response),
            Incoming::ToolCall { id, params } => self.run_call(id, params),
            Incoming::Notification(_) => None,
        }
    }

    fn classify(&self, line: &str) -> Incoming {
        let message: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("[server] unparseable request: {}", e);
                return Incoming::Reply(parse_error(e));
            }
        };

        let id = message.get("id").cloned();
        let Some(method) = message.get("method").and_then(Value::as_str) else {
            return Incoming::Reply(error_response(
                id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "invalid request: missing method".into(),
            ));
        };
        let params = message.get("params").cloned().unwrap_or(Value::Null);
        let Some(id) = id else {
            if method == CANCELLED {
                self.cancel(&params);
            }
            return Incoming::Notification(method.to_string());
        };

        debug!("[server] request id={} method={}", id, method);
        match method {
            "initialize" => Incoming::Reply(result_response(id, self.initialize_result())),
            "ping" => Incoming::Reply(result_response(id, json!({}))),
            "tools/list" => {
                let tools: Vec<Value> = self.registry.defs().iter().map(|d| d.listing()).collect();
                Incoming::Reply(result_response(id, json!({ "tools": tools })))
            }
            "tools/call" => {
                self.pending().insert(id.to_string(), false);
                Incoming::ToolCall { id, params }
            }
            other => Incoming::Reply(error_response(
                id,
                ErrorCode::MethodNotFound.rpc_code(),
                format!("method not found: {other}"),
            )),
        }
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, bool>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flag an accepted call as cancelled. Unknown or finished ids are ignored.
    fn cancel(&self, params: &Value) {
        let Some(request_id) = params.get("requestId") else {
            warn!("[server] {} without requestId", CANCELLED);
            return;
        };
        match self.pending().get_mut(&request_id.to_string()) {
            Some(cancelled) => {
                *cancelled = true;
                info!("[server] request {} cancelled", request_id);
            }
            None => debug!("[server] cancel for unknown request {}", request_id),
        }
    }

    /// Run an accepted call. `None` when it was cancelled before it finished.
    fn run_call(&self, id: Value, params: Value) -> Option<Value> {
        let key = id.to_string();
        let cancelled_early = self.pending().get(&key).copied().unwrap_or(false);
        let response = (!cancelled_early).then(|| self.call_tool(id, params));

        if self.pending().remove(&key).unwrap_or(false) {
            debug!("[server] discarding result of cancelled request {}", key);
            return None;
        }
        response
    }

    fn call_tool(&self, id: Value, params: Value) -> Value {
        let call: ToolCall = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(e) => {
                let err = ProtocolError::invalid_params(format!("invalid tools/call params: {e}"));
                return json!({ "jsonrpc": "2.0", "id": id, "error": err.to_json() });
            }
        };

        match self.registry.dispatch(&call, self.backend.as_ref()) {
            Ok(result) => result_response(
                id,
                json!({ "content": result.content(), "isError": false }),
            ),
            Err(err) => json!({ "jsonrpc": "2.0", "id": id, "error": err.to_json() }),
        }
    }
}

fn result_response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_response(id: Value, code: i64, message: String) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

fn parse_error(e: impl std::fmt::Display) -> Value {
    error_response(Value::Null, PARSE_ERROR, format!("parse error: {e}"))
}

/// Serve requests from `input` until it closes, writing one response per line.
///
/// `tools/call` requests run on a pool of [`CALL_WORKERS`] threads; everything
/// else is answered by the reader. Responses are funnelled through a channel so
/// only this thread writes to `output`.
pub fn serve<R, W>(server: Arc<Server>, input: R, output: &mut W) -> Result<()>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let (tx, rx) = mpsc::channel::<Value>();
    let (job_tx, job_rx) = mpsc::channel::<Job>();
    let job_rx = Arc::new(Mutex::new(job_rx));

    let workers: Vec<_> = (0..CALL_WORKERS)
        .map(|_| {
            let server = Arc::clone(&server);
            let jobs = Arc::clone(&job_rx);
            let tx = tx.clone();
            thread::spawn(move || run_jobs(&server, &jobs, &tx))
        })
        .collect();
    let reader = thread::spawn(move || read_requests(&server, input, &tx, job_tx));

    // Ends once the reader and every worker have dropped their senders.
    for response in rx {
        serde_json::to_writer(&mut *output, &response).context("writing response")?;
        output.write_all(b"\n").context("writing response")?;
        output.flush().context("flushing response")?;
    }

    for worker in workers {
        worker
            .join()
            .map_err(|_| anyhow!("tool worker thread panicked"))?;
    }
    reader
        .join()
        .map_err(|_| anyhow!("request reader thread panicked"))?
}

fn read_requests<R: BufRead>(
    server: &Server,
    input: R,
    tx: &mpsc::Sender<Value>,
    jobs: mpsc::Sender<Job>,
) -> Result<()> {
    for line in input.split(b'\n') {
        let line = line.context("reading request")?;
        let incoming = match String::from_utf8(line) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => server.classify(&line),
            Err(e) => {
                warn!("[server] request is not UTF-8: {}", e);
                Incoming::Reply(parse_error(e))
            }
        };

        match incoming {
            Incoming::Reply(response) => {
                if tx.send(response).is_err() {
                    break;
                }
            }
            Incoming::ToolCall { id, params } => {
                if jobs.send(Job { id, params }).is_err() {
                    break;
                }
            }
            Incoming::Notification(method) => debug!("[server] notification {}", method),
        }
    }

    info!("[server] input closed");
    Ok(())
}

fn run_jobs(server: &Server, jobs: &Mutex<mpsc::Receiver<Job>>, tx: &mpsc::Sender<Value>) {
    loop {
        // The guard is released before the call runs.
        let job = jobs.lock().unwrap_or_else(PoisonError::into_inner).recv();
        let Ok(Job { id, params }) = job else {
            break;
        };
        let Some(response) = server.run_call(id, params) else {
            continue;
        };
        if tx.send(response).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Cursor,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use deckgen_mcp::{BackendError, BackendRequest, catalog};

    use super::*;

    struct Canned(Value);

    impl Backend for Canned {
        fn send(&self, _request: &BackendRequest) -> Result<Value, BackendError> {
            Ok(self.0.clone())
        }
    }

    struct Down;

    impl Backend for Down {
        fn send(&self, _request: &BackendRequest) -> Result<Value, BackendError> {
            Err(BackendError::Status {
                status: 503,
                reason: "Service Unavailable".into(),
                body: String::new(),
            })
        }
    }

    /// Answers after a delay, tracking how many calls overlap.
    #[derive(Default)]
    struct Slow {
        delay: Duration,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl Backend for Slow {
        fn send(&self, _request: &BackendRequest) -> Result<Value, BackendError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(json!({"presentations": []}))
        }
    }

    fn server(backend: impl Backend + 'static) -> Server {
        Server::new(catalog(), Box::new(backend))
    }

    fn request(id: i64, method: &str, params: Value) -> String {
        json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
    }

    #[test]
    fn initialize_reports_tool_capability() {
        let resp = server(Canned(json!({})))
            .handle_line(&request(1, "initialize", json!({})))
            .unwrap();
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert!(resp["result"]["capabilities"]["tools"].is_object());
        assert_eq!(resp["result"]["serverInfo"]["name"], "deckgen");
    }

    #[test]
    fn tools_list_advertises_catalog() {
        let resp = server(Canned(json!({})))
            .handle_line(&request(2, "tools/list", Value::Null))
            .unwrap();
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 4);
        assert_eq!(tools[0]["name"], "create_presentation");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["prompt"]));
        assert_eq!(tools[2]["inputSchema"]["properties"]["format"]["enum"], json!(["pdf", "pptx"]));
    }

    #[test]
    fn tools_call_returns_content() {
        let resp = server(Canned(json!({"presentations": []})))
            .handle_line(&request(3, "tools/call", json!({"name": "list_presentations"})))
            .unwrap();
        assert_eq!(resp["result"]["isError"], false);
        let content = resp["result"]["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
    }

    #[test]
    fn tool_errors_map_to_rpc_codes() {
        let s = server(Down);

        let unknown = s
            .handle_line(&request(4, "tools/call", json!({"name": "delete_everything"})))
            .unwrap();
        assert_eq!(unknown["error"]["code"], -32601);

        let invalid = s
            .handle_line(&request(
                5,
                "tools/call",
                json!({"name": "export_presentation", "arguments": {"presentation_id": "p", "format": "docx"}}),
            ))
            .unwrap();
        assert_eq!(invalid["error"]["code"], -32602);

        let internal = s
            .handle_line(&request(
                6,
                "tools/call",
                json!({"name": "get_presentation_status", "arguments": {"presentation_id": "p"}}),
            ))
            .unwrap();
        assert_eq!(internal["error"]["code"], -32603);
        assert!(internal["error"]["message"].as_str().unwrap().contains("503"));

        let malformed = s
            .handle_line(&request(7, "tools/call", json!({"arguments": {}})))
            .unwrap();
        assert_eq!(malformed["error"]["code"], -32602);
    }

    #[test]
    fn protocol_level_failures() {
        let s = server(Canned(json!({})));
        assert_eq!(s.handle_line("{not json").unwrap()["error"]["code"], PARSE_ERROR);
        assert_eq!(
            s.handle_line(r#"{"jsonrpc":"2.0","id":1}"#).unwrap()["error"]["code"],
            INVALID_REQUEST
        );
        assert_eq!(
            s.handle_line(&request(8, "resources/list", json!({}))).unwrap()["error"]["code"],
            -32601
        );
        assert!(
            s.handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .is_none()
        );
    }

    /// Run `serve` over `input` and return the responses ordered by id.
    fn serve_all(server: Server, input: Vec<u8>) -> Vec<Value> {
        let mut output = Vec::new();
        serve(Arc::new(server), Cursor::new(input), &mut output).unwrap();

        let mut responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        responses.sort_by_key(|r| r["id"].as_i64());
        responses
    }

    fn cancel(id: i64) -> String {
        json!({"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": id}})
            .to_string()
    }

    #[test]
    fn serve_answers_every_request_once() {
        let input = [
            request(1, "initialize", json!({})),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#.to_string(),
            String::new(),
            request(2, "tools/call", json!({"name": "list_presentations"})),
            request(3, "tools/call", json!({"name": "create_presentation", "arguments": {}})),
            request(4, "ping", Value::Null),
        ]
        .join("\n");

        let responses = serve_all(
            server(Canned(json!({"presentations": []}))),
            input.into_bytes(),
        );

        assert_eq!(responses.len(), 4);
        assert!(responses[0]["result"]["serverInfo"].is_object());
        assert!(responses[1]["result"]["content"].is_array());
        assert_eq!(responses[2]["error"]["code"], -32602);
        assert_eq!(responses[3]["result"], json!({}));
    }

    #[test]
    fn non_utf8_line_is_a_parse_error_and_serving_continues() {
        let mut input = request(1, "ping", Value::Null).into_bytes();
        input.extend_from_slice(b"\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"p\xffing\"}\r\n");
        input.extend_from_slice(request(3, "ping", Value::Null).as_bytes());

        let responses = serve_all(server(Canned(json!({}))), input);

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[1]["id"], 1);
        assert_eq!(responses[2]["id"], 3);
        assert_eq!(responses[2]["result"], json!({}));
    }

    #[test]
    fn cancelled_call_is_not_answered() {
        let slow = Slow {
            delay: Duration::from_millis(300),
            ..Slow::default()
        };
        let input = [
            request(9, "tools/call", json!({"name": "list_presentations"})),
            cancel(9),
            request(10, "ping", Value::Null),
            request(11, "tools/call", json!({"name": "list_presentations"})),
        ]
        .join("\n");

        let responses = serve_all(server(slow), input.into_bytes());

        let ids: Vec<i64> = responses.iter().filter_map(|r| r["id"].as_i64()).collect();
        assert_eq!(ids, vec![10, 11]);
        assert!(responses[1]["result"]["content"].is_array());
    }

    #[test]
    fn cancel_bookkeeping_is_cleared() {
        let s = server(Canned(json!({"presentations": []})));
        assert!(s.handle_line(&cancel(42)).is_none());
        assert!(s.pending().is_empty());

        let resp = s
            .handle_line(&request(12, "tools/call", json!({"name": "list_presentations"})))
            .unwrap();
        assert_eq!(resp["id"], 12);
        assert!(s.pending().is_empty());
    }

    #[test]
    fn calls_beyond_pool_size_queue_and_all_complete() {
        let peak = Arc::new(AtomicUsize::new(0));
        let slow = Slow {
            delay: Duration::from_millis(20),
            peak: Arc::clone(&peak),
            ..Slow::default()
        };
        let calls = CALL_WORKERS as i64 * 3;
        let input = (1..=calls)
            .map(|id| request(id, "tools/call", json!({"name": "list_presentations"})))
            .collect::<Vec<_>>()
            .join("\n");

        let responses = serve_all(server(slow), input.into_bytes());

        assert_eq!(responses.len(), calls as usize);
        assert!(responses.iter().all(|r| r["result"]["isError"] == false));
        let peak = peak.load(Ordering::SeqCst);
        assert!((1..=CALL_WORKERS).contains(&peak), "peak concurrency {peak}");
    }
}
