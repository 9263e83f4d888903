use axum::{
    Router,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use std::sync::Arc;

use crate::{ServerError, auth, coins, info, shop};
use engine::{Engine, EngineError, Principal};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// The caller of a protected endpoint, taken from a verified bearer token.
///
/// A missing `Authorization` header is rejected with
/// [`ServerError::MissingToken`]; any other header or token problem with
/// [`EngineError::Unauthorized`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl FromRequestParts<ServerState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header =
            match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
                Ok(header) => header,
                Err(rejection) if rejection.is_missing() => return Err(ServerError::MissingToken),
                Err(rejection) => {
                    return Err(EngineError::Unauthorized(rejection.to_string()).into());
                }
            };

        let principal = state.engine.verify_token(auth_header.token())?;
        Ok(AuthUser(principal))
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/auth", post(auth::authenticate))
        .route("/api/info", get(info::get))
        .route("/api/buy/{item}", get(shop::buy))
        .route("/api/sendCoin", post(coins::send))
        .with_state(state)
}

pub async fn run(engine: Engine, addr: &str) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
