//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_backend;

use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use tally_store::api::{ApiDefinition, ApiEngine, CacheOptions};
use tally_store::cancel::CancelToken;
use tally_store::endpoints::{counter, quotes};
use tally_store::service::{self, CounterService};
use tally_store::store::Store;

/// Find an available port for testing.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to free port");
    listener.local_addr().unwrap().port()
}

/// Quotes engine pointed at `base_url`.
pub fn quotes_engine(store: &Store, base_url: String, options: CacheOptions) -> ApiEngine {
    ApiEngine::new(
        store,
        ApiDefinition {
            reducer_path: quotes::REDUCER_PATH,
            base_url,
            timeout: Duration::from_secs(5),
        },
        options,
    )
    .expect("Failed to build quotes engine")
}

/// Counter-API engine pointed at `base_url`.
pub fn counter_engine(store: &Store, base_url: String, options: CacheOptions) -> ApiEngine {
    ApiEngine::new(
        store,
        ApiDefinition {
            reducer_path: counter::REDUCER_PATH,
            base_url,
            timeout: Duration::from_secs(5),
        },
        options,
    )
    .expect("Failed to build counter engine")
}

/// Running counter service; stops when dropped.
pub struct RunningService {
    pub addr: SocketAddr,
    pub service: CounterService,
    cancel: CancelToken,
}

impl RunningService {
    pub async fn start(initial: i64) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind counter service");
        let addr = listener.local_addr().unwrap();
        let service = CounterService::new(initial);
        let cancel = CancelToken::new();
        tokio::spawn(service::serve(listener, service.clone(), cancel.clone()));
        assert!(wait_for_server(addr, Duration::from_secs(2)).await);
        Self {
            addr,
            service,
            cancel,
        }
    }

    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }
}

impl Drop for RunningService {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Wait for a server to become available.
pub async fn wait_for_server(addr: SocketAddr, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
