pub mod models;
pub mod routes;

use anyhow::{anyhow, Result};
use bytes::Bytes;
use common::db::{DatabaseProbe, SchemaCache};
use common::pipeline::{QueryRefiner, SqlGenerator};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::Instrument;

pub use routes::CorsPolicy;

/// everything a request handler may touch; built once at startup
pub struct AppState {
    pub generator: SqlGenerator,
    pub refiner: QueryRefiner,
    pub cache: Arc<SchemaCache>,
    pub probe: Arc<dyn DatabaseProbe>,
    pub cors: CorsPolicy,
}

pub async fn serve(state: Arc<AppState>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow!("failed to bind {}: {}", addr, e))?;
    let bound = listener.local_addr()?;

    tracing::info!("text-to-sql api listening on http://{}", bound);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down text-to-sql api server");
                return Ok(());
            }
        };
        let io = TokioIo::new(stream);
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            let service = service_fn(move |req| handle(req, Arc::clone(&state)));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                tracing::debug!(%peer, "connection error: {}", e);
            }
        });
    }
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let method = parts.method;
    let path = parts.uri.path().to_string();

    let span = tracing::info_span!("http_request", %method, path = %path);
    async move {
        let body = body.collect().await?.to_bytes();
        let response = routes::route(&state, &method, &path, &parts.headers, body).await;
        tracing::info!(status = response.status().as_u16(), "request handled");
        Ok(response)
    }
    .instrument(span)
    .await
}
