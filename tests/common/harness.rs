//! Test server harness.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cashguard::gateway::{HandlerState, create_router_with_state};
use cashguard::{
    InMemoryRateLimiter, MockClassifierBackend, MockGenerativeBackend, PrimaryPredictor,
    RateLimitConfig, Reconciler, SecondaryPredictor,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;

pub struct TestServerConfig {
    pub primary_reply: Option<MockGenerativeBackend>,
    pub classifier: Option<MockClassifierBackend>,
    pub rate_limit_max: u32,
    pub upstream_timeout: Duration,
    pub expose_details: bool,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            primary_reply: Some(MockGenerativeBackend::with_text(
                r#"{"denomination":"$20","currency":"USD","validity":"Valid","confidence":90}"#,
            )),
            classifier: None,
            rate_limit_max: 10,
            upstream_timeout: Duration::from_secs(30),
            expose_details: false,
        }
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
}

async fn wait_for_server_ready(addr: SocketAddr) -> Result<(), ServerStartupError> {
    let timeout = Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS);
    let interval = Duration::from_millis(STARTUP_POLL_INTERVAL_MS);
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }
        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => tokio::time::sleep(interval).await,
        }
    }
}

/// Spawns a server whose predictors are in-memory mocks. No credentials or network access
/// are needed.
pub async fn spawn_test_server(
    config: TestServerConfig,
) -> Result<TestServer, ServerStartupError> {
    let primary = match config.primary_reply {
        Some(backend) => PrimaryPredictor::new(Arc::new(backend), "gemini-2.5-pro"),
        None => PrimaryPredictor::unconfigured("gemini-2.5-pro"),
    };
    let secondary = match config.classifier {
        Some(backend) => SecondaryPredictor::new(Arc::new(backend)),
        None => SecondaryPredictor::disabled(),
    };

    let reconciler = Arc::new(Reconciler::new(primary, secondary, config.upstream_timeout));
    let limiter = Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
        max_requests: config.rate_limit_max,
        ..RateLimitConfig::default()
    }));
    let state =
        HandlerState::new(reconciler, limiter).with_expose_details(config.expose_details);
    let app = create_router_with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    wait_for_server_ready(addr).await?;

    Ok(TestServer {
        addr,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}
