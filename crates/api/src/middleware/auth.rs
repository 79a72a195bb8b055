//! # Actor Extraction
//!
//! Identity is issued by the gateway in front of this service, which forwards
//! the authenticated caller in two headers:
//!
//! - `X-Actor-Id`: the user id (for providers and patients, their provider or patient id)
//! - `X-Actor-Role`: `admin`, `provider` (or `doctor`), or `patient`
//!
//! Handlers that mutate state take a [`CurrentActor`]; requests without a
//! well-formed pair are rejected with 401 before reaching the handler.

use axum::{
    Json, async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use slotbook_core::auth::{Actor, Role};
use uuid::Uuid;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// The caller on whose behalf a request runs.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

#[derive(Debug)]
pub enum ActorRejection {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl IntoResponse for ActorRejection {
    fn into_response(self) -> Response {
        let message = match self {
            ActorRejection::Missing(header) => format!("Missing {} header", header),
            ActorRejection::Invalid(header, reason) => format!("Invalid {} header: {}", header, reason),
        };
        let body = Json(json!({ "error": message, "kind": "unauthenticated" }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

fn header_value<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, ActorRejection> {
    let value = parts
        .headers
        .get(name)
        .ok_or(ActorRejection::Missing(name))?;
    value
        .to_str()
        .map(str::trim)
        .map_err(|e| ActorRejection::Invalid(name, e.to_string()))
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ActorRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, ACTOR_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|e| ActorRejection::Invalid(ACTOR_ID_HEADER, e.to_string()))?;
        let role = header_value(parts, ACTOR_ROLE_HEADER)?
            .parse::<Role>()
            .map_err(|e| ActorRejection::Invalid(ACTOR_ROLE_HEADER, e))?;

        Ok(CurrentActor(Actor { user_id, role }))
    }
}
