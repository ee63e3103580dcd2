use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, Header};
use serde::Deserialize;

use crate::services::TokenService;

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[derive(Clone)]
pub struct TokenState {
    pub token_service: Arc<TokenService>,
}

pub async fn auth(
    State(state): State<TokenState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<impl IntoResponse, StatusCode> {
    let token = bearer_token(&req).ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = state
        .token_service
        .retrieve_token_claims(&token)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}

/// `Authorization: Bearer` header, or a `token` query parameter for clients that cannot set headers (EventSource).
fn bearer_token(req: &Request<Body>) -> Option<String> {
    let mut headers = req.headers().get_all(header::AUTHORIZATION).iter();
    if let Ok(header) = Authorization::<Bearer>::decode(&mut headers) {
        return Some(header.token().to_string());
    }

    Query::<TokenQuery>::try_from_uri(req.uri())
        .ok()?
        .0
        .token
        .filter(|token| !token.is_empty())
}
