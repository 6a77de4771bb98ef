//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection. Bodies are read in
//! full and routed by [`crate::routes::dispatch`].

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::HeaderValue;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::activity::{ActivityLogger, MemoryActivityLogger, MongoActivityLogger};
use crate::auth::JwtValidator;
use crate::closing::{ClosingRegistry, MemoryClosingRegistry, MongoClosingRegistry, MutationGate};
use crate::config::Args;
use crate::db::MongoClient;
use crate::records::{MemoryRecordStore, MongoRecordStore, RecordService, RecordStore};
use crate::routes::{self, ApiRequest};
use crate::types::{Result, SawitError};

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Closed periods, consulted on every gated write
    pub registry: Arc<dyn ClosingRegistry>,
    /// Gated record CRUD
    pub records: RecordService,
    pub activity: Arc<dyn ActivityLogger>,
    pub jwt: JwtValidator,
    /// Storage backend name for health output
    pub storage: &'static str,
    pub started_at: Instant,
}

impl AppState {
    /// Assemble state from already-opened stores
    pub fn with_stores(
        args: Args,
        registry: Arc<dyn ClosingRegistry>,
        store: Arc<dyn RecordStore>,
        activity: Arc<dyn ActivityLogger>,
        storage: &'static str,
    ) -> Result<Self> {
        let jwt = match (&args.jwt_secret, args.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), args.jwt_expiry_seconds)?,
            (None, true) => JwtValidator::new_dev(),
            (None, false) => {
                return Err(SawitError::Config("JWT_SECRET is required outside dev mode".into()))
            }
        };

        let gate = MutationGate::new(Arc::clone(&registry));
        let records = RecordService::new(store, gate, Arc::clone(&activity));

        Ok(Self {
            args,
            registry,
            records,
            activity,
            jwt,
            storage,
            started_at: Instant::now(),
        })
    }

    /// State backed entirely by in-memory stores (dev mode, tests)
    pub fn in_memory(args: Args) -> Result<Self> {
        Self::with_stores(
            args,
            Arc::new(MemoryClosingRegistry::new()),
            Arc::new(MemoryRecordStore::new()),
            Arc::new(MemoryActivityLogger::new()),
            "memory",
        )
    }

    /// State backed by MongoDB collections, creating indexes on open
    pub async fn connect(args: Args, mongo: MongoClient) -> Result<Self> {
        let registry = Arc::new(MongoClosingRegistry::new(&mongo).await?);
        let activity = Arc::new(MongoActivityLogger::new(&mongo).await?);
        let store = Arc::new(MongoRecordStore::new(mongo).await?);
        Self::with_stores(args, registry, store, activity, "mongodb")
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "SawiTrack listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - requests without a token act as admin");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let mut api_request = ApiRequest::new(parts.method.clone(), &path_and_query);
    api_request.authorization = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    api_request.body = body.collect().await?.to_bytes();

    let mut response = routes::dispatch(&state, api_request).await;

    match HeaderValue::from_str(&state.args.cors_origin) {
        Ok(origin) => {
            response
                .headers_mut()
                .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
        Err(e) => warn!("Invalid CORS origin '{}': {}", state.args.cors_origin, e),
    }

    info!(
        method = %parts.method,
        path = %parts.uri.path(),
        peer = %addr,
        status = response.status().as_u16(),
        "Request handled"
    );

    Ok(response)
}
