//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use integration_gateway::config::GatewayConfig;
use integration_gateway::{HttpServer, Integration, IntegrationKind, Message, Outcome, SendError, SyncManager};

/// What the scripted integration does on its next send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Succeed,
    Fail,
    Reject,
    Hang,
}

/// Integration spy that replays a script, then repeats a fallback step.
pub struct ScriptedIntegration {
    name: String,
    kind: IntegrationKind,
    script: Mutex<VecDeque<Step>>,
    fallback: Mutex<Step>,
    reachable: AtomicBool,
    sends: AtomicUsize,
    probes: AtomicUsize,
}

impl ScriptedIntegration {
    pub fn new(name: &str, kind: IntegrationKind) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            kind,
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Step::Succeed),
            reachable: AtomicBool::new(true),
            sends: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        })
    }

    pub fn succeeding(name: &str) -> Arc<Self> {
        Self::new(name, IntegrationKind::Webhook)
    }

    pub fn failing(name: &str) -> Arc<Self> {
        let integration = Self::new(name, IntegrationKind::Ticketing);
        integration.always(Step::Fail);
        integration
    }

    pub fn always(&self, step: Step) {
        *self.fallback.lock() = step;
    }

    pub fn then(&self, steps: &[Step]) {
        self.script.lock().extend(steps.iter().copied());
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Integration for ScriptedIntegration {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> IntegrationKind {
        self.kind
    }

    async fn send(&self, message: &Message) -> Result<Outcome, SendError> {
        let n = self.sends.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().pop_front().unwrap_or(*self.fallback.lock());

        match step {
            Step::Succeed => Ok(Outcome::with_reference(format!("{}-{}", self.name, n + 1))),
            Step::Fail => Err(SendError::ConnectionFailed("connection refused".into())),
            Step::Reject => Err(SendError::InvalidPayload(format!(
                "cannot deliver `{}`",
                message.content
            ))),
            Step::Hang => std::future::pending().await,
        }
    }

    async fn probe(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.reachable.load(Ordering::SeqCst)
    }
}

/// Serve the gateway on an ephemeral port. Dropping the sender stops it.
pub async fn start_gateway(
    config: GatewayConfig,
    manager: Arc<SyncManager>,
) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let server = HttpServer::new(config, manager);
    tokio::spawn(async move {
        let _ = server
            .run(listener, async move {
                let _ = rx.await;
            })
            .await;
    });

    (addr, tx)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Start a programmable downstream that answers each request with `f()`.
///
/// Returns the bound address and a counter of requests received.
pub async fn start_programmable_downstream<F, Fut>(f: F) -> (SocketAddr, Arc<AtomicUsize>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let f = Arc::new(f);

    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                read_request(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);

                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    202 => "202 Accepted",
                    400 => "400 Bad Request",
                    422 => "422 Unprocessable Entity",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, hits)
}

/// Drain one HTTP/1.1 request (headers plus `Content-Length` body).
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);

        let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&data[..end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        if data.len() >= end + 4 + content_length {
            return;
        }
    }
}
