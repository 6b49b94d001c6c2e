use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{
        atomic::{AtomicU16, AtomicUsize, Ordering},
        Arc, Mutex, RwLock,
    },
};

use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{body, Body, Method, Request, Response, Server, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Scriptable stand-in for the ALFA filtered-results endpoint.
///
/// Serves `POST {"filter": [...]}` with a JSON array of the records it knows
/// about; failure behavior is toggled per test.
#[derive(Clone, Default)]
pub struct MockAlfa {
    inner: Arc<MockAlfaInner>,
}

#[derive(Default)]
struct MockAlfaInner {
    records: RwLock<HashMap<String, Value>>,
    failures_before_success: AtomicUsize,
    // 0 means no override; anything else is returned for every request.
    permanent_status: AtomicU16,
    serve_malformed_body: AtomicUsize,
    requests: AtomicUsize,
    filters: Mutex<Vec<Vec<String>>>,
}

impl MockAlfa {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record for `key` with the same frequency in every
    /// population field.
    pub fn insert_uniform_record(&self, key: &str, frequency: f64) {
        let mut record = serde_json::Map::new();
        record.insert("chrom_pos_ref_alt".to_owned(), json!(key));
        for code in alfaquery::POPULATION_CODES {
            record.insert(code.to_owned(), json!(frequency));
        }
        self.inner
            .records
            .write()
            .expect("mock state poisoned")
            .insert(key.to_owned(), Value::Object(record));
    }

    /// The next `count` requests fail with HTTP 500, then service recovers.
    pub fn fail_next(&self, count: usize) {
        self.inner
            .failures_before_success
            .store(count, Ordering::SeqCst);
    }

    /// Every request gets this status from now on.
    pub fn always_respond_with(&self, status: u16) {
        self.inner.permanent_status.store(status, Ordering::SeqCst);
    }

    /// Every request gets HTTP 200 with a non-array body from now on.
    pub fn always_serve_malformed_body(&self) {
        self.inner.serve_malformed_body.store(1, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// Filter lists received so far, in arrival order.
    pub fn received_filters(&self) -> Vec<Vec<String>> {
        self.inner
            .filters
            .lock()
            .expect("mock state poisoned")
            .clone()
    }

    fn respond(&self, bytes: &[u8]) -> Response<Body> {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);

        let status = self.inner.permanent_status.load(Ordering::SeqCst);
        if status != 0 {
            return status_response(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY));
        }

        if self
            .inner
            .failures_before_success
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
        {
            return status_response(StatusCode::INTERNAL_SERVER_ERROR);
        }

        if self.inner.serve_malformed_body.load(Ordering::SeqCst) != 0 {
            return json_response(json!({"detail": "unexpected shape"}));
        }

        let payload: Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(_) => return status_response(StatusCode::BAD_REQUEST),
        };
        let filter: Vec<String> = payload
            .get("filter")
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        self.inner
            .filters
            .lock()
            .expect("mock state poisoned")
            .push(filter.clone());

        let records = self.inner.records.read().expect("mock state poisoned");
        let matched: Vec<Value> = filter
            .iter()
            .filter_map(|key| records.get(key).cloned())
            .collect();
        json_response(Value::Array(matched))
    }
}

fn status_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn json_response(value: Value) -> Response<Body> {
    let mut response = Response::new(Body::from(value.to_string()));
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

async fn serve_request(mock: MockAlfa, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    if req.method() != Method::POST {
        return Ok(status_response(StatusCode::METHOD_NOT_ALLOWED));
    }

    let bytes = match body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(_) => return Ok(status_response(StatusCode::BAD_REQUEST)),
    };

    Ok(mock.respond(&bytes))
}

pub struct MockAlfaServer {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockAlfaServer {
    pub async fn start(mock: MockAlfa) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock ALFA listener")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let std_listener = listener
            .into_std()
            .context("failed to convert mock listener")?;
        std_listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let make_service = make_service_fn(move |_| {
            let mock = mock.clone();
            async move { Ok::<_, Infallible>(service_fn(move |req| serve_request(mock.clone(), req))) }
        });

        let server = Server::from_tcp(std_listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock ALFA server stopped: {err}");
            }
        });

        Ok(Self {
            url: format!("http://{}/alfa/filtered-results/", addr),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
