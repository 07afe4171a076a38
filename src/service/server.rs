use std::future::IntoFuture;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::cancel::CancelToken;

/// Shared count behind the service routes.
#[derive(Debug, Clone, Default)]
pub struct CounterService {
    count: Arc<Mutex<i64>>,
}

impl CounterService {
    pub fn new(initial: i64) -> Self {
        Self {
            count: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn count(&self) -> i64 {
        *self.count.lock()
    }

    /// Add `amount` and return the new count.
    pub fn increment(&self, amount: i64) -> i64 {
        let mut count = self.count.lock();
        *count = count.saturating_add(amount);
        *count
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IncrementRequest {
    pub amount: i64,
}

async fn handle_count(State(service): State<CounterService>) -> Json<i64> {
    let count = service.count();
    tracing::info!(count, "GET /api/count");
    Json(count)
}

async fn handle_increment(
    State(service): State<CounterService>,
    Json(request): Json<IncrementRequest>,
) -> Json<i64> {
    let count = service.increment(request.amount);
    tracing::info!(amount = request.amount, count, "POST /api/increment");
    Json(count)
}

pub fn build_router(service: CounterService) -> Router {
    Router::new()
        .route("/api/count", get(handle_count))
        .route("/api/increment", post(handle_increment))
        .with_state(service)
}

/// Serve on `listener` until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    service: CounterService,
    cancel: CancelToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("Counter service listening on {}", addr);

    axum::serve(listener, build_router(service))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .into_future()
        .await?;

    tracing::info!("Counter service stopped");
    Ok(())
}
