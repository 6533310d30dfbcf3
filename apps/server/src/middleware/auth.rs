//! Authentication middleware.

use auth::{Claims, JwtManager};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chat_store::ChatStore;
use uuid::Uuid;

use crate::error::ServerError;
use crate::state::SharedState;

/// Authenticated user information.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// User ID.
    pub id: Uuid,
    /// Login name.
    pub username: String,
}

impl TryFrom<Claims> for AuthenticatedUser {
    type Error = auth::AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            id: claims.user_id()?,
            username: claims.username,
        })
    }
}

/// Extracts the JWT token from the Authorization header.
fn extract_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Validates a JWT token and returns the claims.
fn validate_token(jwt_manager: &JwtManager, token: &str) -> Result<Claims, ServerError> {
    Ok(jwt_manager.validate_token(token)?)
}

/// Authentication middleware.
///
/// Extracts the bearer token from the Authorization header, validates it,
/// and stores the authenticated user in the request extensions. Rejections
/// use the same error body shape as the handlers.
pub async fn auth_middleware<S: ChatStore + 'static>(
    State(state): State<SharedState<S>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_token(&request) {
        Some(token) => token,
        None => return ServerError::AuthenticationRequired.into_response(),
    };

    let claims = match validate_token(&state.jwt_manager, token) {
        Ok(claims) => claims,
        Err(error) => return error.into_response(),
    };

    match AuthenticatedUser::try_from(claims) {
        Ok(user) => {
            request.extensions_mut().insert(user);
        }
        Err(error) => return ServerError::Auth(error).into_response(),
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticated_user_from_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "alice".to_string(), 24);

        let user = AuthenticatedUser::try_from(claims).unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn test_extract_token_requires_bearer_prefix() {
        let auth_header = "Basic credentials";
        let token = auth_header.strip_prefix("Bearer ");
        assert_eq!(token, None);
    }
}
