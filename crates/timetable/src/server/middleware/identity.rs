//! Authenticated-identity extraction.
//!
//! Token validation happens in the gateway in front of this service; a
//! request that reaches us carries the verified teacher's numeric ID in the
//! `X-Teacher-Id` header. Requests without it are rejected here, and handlers
//! read the ID through a typed extension.

use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::server::types::ApiErrorType;

pub const TEACHER_ID_HEADER: &str = "x-teacher-id";

/// Verified teacher identity, opaque to everything in this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeacherId(pub i64);

fn teacher_id_from_headers(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(TEACHER_ID_HEADER)?
        .to_str()
        .ok()?
        .parse::<i64>()
        .ok()
}

pub async fn require_teacher(mut req: Request, next: Next) -> Response {
    match teacher_id_from_headers(req.headers()) {
        Some(id) => {
            req.extensions_mut().insert(TeacherId(id));
            next.run(req).await
        }
        None => ApiErrorType::from((StatusCode::UNAUTHORIZED, "Unauthorized", None)).into_response(),
    }
}
