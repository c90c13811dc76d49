use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::{
    descriptor::Variant,
    server::{AppState, Outcome, redirect_for},
};

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// `GET /health`
pub async fn health(method: Method) -> Response {
    if method != Method::GET {
        return method_not_allowed();
    }
    text(StatusCode::OK, "200 OK")
}

/// `GET /resize?key=<suffix descriptor>`
pub async fn resize(
    State(state): State<AppState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    handle(&state, &method, &query, "key", Variant::Suffix).await
}

/// `GET /do?ref=<params descriptor>`
pub async fn manipulate(
    State(state): State<AppState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    handle(&state, &method, &query, "ref", Variant::Params).await
}

async fn handle(
    state: &AppState,
    method: &Method,
    query: &HashMap<String, String>,
    param: &str,
    variant: Variant,
) -> Response {
    if *method != Method::GET {
        return method_not_allowed();
    }
    let Some(descriptor) = query.get(param).filter(|d| !d.is_empty()) else {
        tracing::debug!(param, "missing descriptor parameter");
        return bad_request();
    };

    match redirect_for(state, variant, descriptor).await {
        Outcome::Derived(uri) => redirect(StatusCode::MOVED_PERMANENTLY, &uri),
        Outcome::Fallback(uri) => redirect(StatusCode::TEMPORARY_REDIRECT, &uri),
        Outcome::Rejected => bad_request(),
    }
}

fn redirect(status: StatusCode, uri: &str) -> Response {
    match HeaderValue::from_str(uri) {
        Ok(location) => (status, [(header::LOCATION, location)]).into_response(),
        Err(_) => {
            tracing::info!(uri, "redirect target is not a valid header value");
            bad_request()
        }
    }
}

fn bad_request() -> Response {
    text(StatusCode::BAD_REQUEST, "400 Bad request")
}

fn method_not_allowed() -> Response {
    text(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed")
}

fn text(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, PLAIN_TEXT)], body).into_response()
}
