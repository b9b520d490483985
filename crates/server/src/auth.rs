//! Request identity and trace context.
//!
//! Folio sits behind a gateway that authenticates users and forwards the
//! caller as `x-actor-id` (UUID) plus an optional `x-actor-role: admin`.

use crate::error::{ApiError, ApiResult};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the authenticated caller's account id.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Header carrying the authenticated caller's role.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value, keeping at most
    /// [`MAX_TRACE_ID_LEN`] printable ASCII characters.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The caller of a request, as asserted by the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub admin: bool,
}

impl Actor {
    /// Require the admin role.
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin role required".to_string()))
        }
    }

    /// Require that the caller is `owner` or an admin.
    pub fn require_owner_or_admin(&self, owner: Option<Uuid>) -> ApiResult<()> {
        if self.admin || owner == Some(self.id) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "only the owner or an admin may modify this item".to_string(),
            ))
        }
    }
}

fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

fn extract_actor(req: &Request) -> ApiResult<Option<Actor>> {
    let Some(raw) = req.headers().get(ACTOR_ID_HEADER) else {
        return Ok(None);
    };
    let id = raw
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("invalid {ACTOR_ID_HEADER} header")))?;
    let admin = req
        .headers()
        .get(ACTOR_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|role| role.trim().eq_ignore_ascii_case("admin"));
    Ok(Some(Actor { id, admin }))
}

/// Identity middleware: records the actor and runs the request in a span
/// carrying the trace ID.
pub async fn identity_middleware(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let trace_id = extract_or_generate_trace_id(&req);
    let trace_id_str = trace_id.0.clone();
    req.extensions_mut().insert(trace_id);

    let actor = extract_actor(&req)?;
    if let Some(actor) = actor {
        req.extensions_mut().insert(actor);
    }

    let span = match actor {
        Some(actor) => tracing::info_span!("request", trace_id = %trace_id_str, actor = %actor.id),
        None => tracing::info_span!("request", trace_id = %trace_id_str),
    };
    Ok(next.run(req).instrument(span).await)
}

/// Require an authenticated actor.
pub fn require_actor(req: &Request) -> ApiResult<Actor> {
    req.extensions()
        .get::<Actor>()
        .copied()
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
}

/// Require an authenticated admin actor.
pub fn require_admin(req: &Request) -> ApiResult<Actor> {
    let actor = require_actor(req)?;
    actor.require_admin()?;
    Ok(actor)
}

/// Get the trace ID from request extensions.
pub fn get_trace_id(req: &Request) -> Option<&TraceId> {
    req.extensions().get::<TraceId>()
}
