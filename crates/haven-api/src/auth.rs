//! # Authentication Middleware
//!
//! Bearer-token authentication for the `/v1` surface. The token carries
//! the caller's role and actor id alongside the shared secret:
//!
//! ```text
//! Authorization: Bearer <secret>.<role>.<actor_uuid>
//! ```
//!
//! The secret segment is compared in constant time. Session issuance and
//! user management live outside this service; the token is the interface.
//!
//! When no token is configured (`HAVEN_AUTH_TOKEN` unset — the demo/dev
//! profile) the caller's identity is read from the `x-haven-role` and
//! `x-haven-actor` headers instead, defaulting to an admin identity.
//! Role capabilities are enforced identically in both profiles; the demo
//! profile changes who you are, never what a role may do.
//!
//! Health probes and `/metrics` are mounted outside this middleware.

use axum::async_trait;
use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use haven_core::{Actor, ActorId, Role};

use crate::error::AppError;

/// A shared secret that never appears in logs and compares in constant
/// time.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Constant-time equality against a candidate.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString(<redacted>)")
    }
}

/// Auth configuration attached to the router as an extension.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The shared secret; `None` enables the demo/dev header profile.
    pub token: Option<SecretString>,
}

/// The authenticated caller, inserted into request extensions by
/// [`auth_middleware`] and extracted by handlers.
#[derive(Clone, Copy, Debug)]
pub struct CallerIdentity {
    /// The caller as a domain actor.
    pub actor: Actor,
}

impl CallerIdentity {
    /// The caller's role.
    pub fn role(&self) -> Role {
        self.actor.role
    }

    /// The caller's actor id.
    pub fn actor_id(&self) -> ActorId {
        self.actor.id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("no authenticated identity".to_string()))
    }
}

/// Authenticate the request and attach a [`CallerIdentity`].
pub async fn auth_middleware(
    Extension(config): Extension<AuthConfig>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = match &config.token {
        Some(secret) => bearer_identity(&req, secret),
        None => header_identity(&req),
    };
    match identity {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

/// Parse `Authorization: Bearer <secret>.<role>.<actor_uuid>`.
fn bearer_identity(req: &Request, secret: &SecretString) -> Result<CallerIdentity, AppError> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing Authorization header".to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("expected Bearer authorization".to_string()))?;

    // secret.role.uuid — the secret itself must not contain '.'.
    let mut parts = token.splitn(3, '.');
    let (candidate, role, actor) = match (parts.next(), parts.next(), parts.next()) {
        (Some(c), Some(r), Some(a)) => (c, r, a),
        _ => return Err(AppError::Unauthorized("malformed bearer token".to_string())),
    };

    if !secret.matches(candidate) {
        return Err(AppError::Unauthorized("invalid token".to_string()));
    }
    let role: Role = role
        .parse()
        .map_err(|_| AppError::Unauthorized(format!("unknown role '{role}' in token")))?;
    let actor_id = actor
        .parse::<Uuid>()
        .map(ActorId::from_uuid)
        .map_err(|_| AppError::Unauthorized("malformed actor id in token".to_string()))?;

    Ok(CallerIdentity {
        actor: Actor::new(actor_id, role),
    })
}

/// Demo/dev profile: identity from headers, defaulting to admin.
fn header_identity(req: &Request) -> Result<CallerIdentity, AppError> {
    let role = match req.headers().get("x-haven-role") {
        Some(v) => v
            .to_str()
            .ok()
            .and_then(|s| s.parse::<Role>().ok())
            .ok_or_else(|| AppError::Unauthorized("unknown role header".to_string()))?,
        None => Role::Admin,
    };
    let actor_id = match req.headers().get("x-haven-actor") {
        Some(v) => v
            .to_str()
            .ok()
            .and_then(|s| s.parse::<Uuid>().ok())
            .map(ActorId::from_uuid)
            .ok_or_else(|| AppError::Unauthorized("malformed actor header".to_string()))?,
        None => ActorId::from_uuid(Uuid::nil()),
    };
    Ok(CallerIdentity {
        actor: Actor::new(actor_id, role),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_matches_itself_only() {
        let secret = SecretString::new("hunter2");
        assert!(secret.matches("hunter2"));
        assert!(!secret.matches("hunter3"));
        assert!(!secret.matches(""));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = SecretString::new("hunter2");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }
}
