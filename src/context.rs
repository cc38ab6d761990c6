//! Tenant context resolution.
//!
//! Every tenant-scoped operation requires the `(tenant_id, session_id,
//! actor_id)` triple. The triple arrives on trusted headers set by the
//! authentication front end; it is never derived from request payloads.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const SESSION_HEADER: &str = "x-session-id";
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Ownership triple attached to every inbound request.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: String,
    pub session_id: String,
    pub actor_id: String,
}

impl TenantContext {
    pub fn new(
        tenant_id: impl Into<String>,
        session_id: impl Into<String>,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            session_id: session_id.into(),
            actor_id: actor_id.into(),
        }
    }
}

fn required_header(
    parts: &Parts,
    name: &'static str,
) -> Result<String, (StatusCode, Json<Value>)> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": format!("missing or invalid {name} header") })),
        ))
}

impl<S: Send + Sync> FromRequestParts<S> for TenantContext {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            tenant_id: required_header(parts, TENANT_HEADER)?,
            session_id: required_header(parts, SESSION_HEADER)?,
            actor_id: required_header(parts, ACTOR_HEADER)?,
        })
    }
}
