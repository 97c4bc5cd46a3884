//! Authentication Middleware
//! Gate protected routes on a valid bearer token

use crate::auth::{
    jwt::{JwtHandler, TokenError},
    models::AuthenticatedUser,
};
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use std::sync::Arc;
use tracing::{debug, warn};

const UNAUTHORIZED: &str = "Unauthorized";

/// Auth middleware that validates JWT tokens
pub async fn auth_middleware(
    State(jwt_handler): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path().to_string();

    let Some(Authorization(bearer)) = req.headers().typed_get::<Authorization<Bearer>>() else {
        warn!(path = %path, reason = "missing token", "Request rejected");
        return Err(ApiError::Unauthorized(UNAUTHORIZED));
    };

    let claims = jwt_handler.verify(bearer.token()).map_err(|e| {
        let reason = match e {
            TokenError::Expired => "expired token",
            _ => "invalid token",
        };
        warn!(path = %path, reason, "Request rejected");
        ApiError::Unauthorized(UNAUTHORIZED)
    })?;

    debug!(path = %path, user_id = %claims.sub, "Request authenticated");

    // Handlers read the caller from request extensions
    req.extensions_mut().insert(AuthenticatedUser {
        user_id: claims.sub,
    });

    Ok(next.run(req).await)
}
