//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use intake_gate::config::IntakeConfig;
use intake_gate::http::HttpServer;
use intake_gate::lifecycle::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A running server plus the handles to steer it.
pub struct TestServer {
    pub base_url: String,
    pub shutdown: Shutdown,
    #[allow(dead_code)]
    pub config_tx: mpsc::UnboundedSender<IntakeConfig>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config with metrics off and the given bind address.
pub fn test_config(addr: SocketAddr) -> IntakeConfig {
    let mut config = IntakeConfig::default();
    config.listener.bind_address = addr.to_string();
    config.observability.metrics_enabled = false;
    config
}

/// Boot the server on `config.listener.bind_address` and wait until it accepts.
pub async fn start_server(config: IntakeConfig) -> TestServer {
    let addr: SocketAddr = config.listener.bind_address.parse().unwrap();
    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();

    let server = HttpServer::new(config);
    let listener = TcpListener::bind(addr).await.unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;

    TestServer {
        base_url: format!("http://{}", addr),
        shutdown,
        config_tx,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Start a webhook receiver. Each request body is forwarded on the returned
/// channel; the status for the nth request (0-based) comes from `status_for`.
#[allow(dead_code)]
pub async fn start_webhook<F>(addr: SocketAddr, status_for: F) -> mpsc::UnboundedReceiver<String>
where
    F: Fn(u32) -> u16 + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let status_for = Arc::new(status_for);
    let hits = Arc::new(AtomicU32::new(0));

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let tx = tx.clone();
                    let status_for = status_for.clone();
                    let hits = hits.clone();
                    tokio::spawn(async move {
                        let Some(body) = read_request_body(socket, move || {
                            let n = hits.fetch_add(1, Ordering::SeqCst);
                            status_for(n)
                        })
                        .await
                        else {
                            return;
                        };
                        let _ = tx.send(body);
                    });
                }
                Err(_) => break,
            }
        }
    });

    rx
}

async fn read_request_body<F: FnOnce() -> u16>(mut socket: TcpStream, status: F) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let code = status();
    let status_text = match code {
        200 => "200 OK",
        400 => "400 Bad Request",
        503 => "503 Service Unavailable",
        _ => "500 Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status_text
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;

    let end = (header_end + content_length).min(buf.len());
    Some(String::from_utf8_lossy(&buf[header_end..end]).into_owned())
}
