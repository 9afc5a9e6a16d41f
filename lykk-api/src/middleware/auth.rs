use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use lykk_core::UserIdentity;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

pub const ROLE_CUSTOMER: &str = "CUSTOMER";
pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_SUPER_ADMIN: &str = "SUPER_ADMIN";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN || self.role == ROLE_SUPER_ADMIN
    }

    pub fn identity(&self) -> UserIdentity {
        UserIdentity::from_claims(&self.sub, &self.email, self.name.as_deref())
    }
}

/// Claims of the caller on routes where signing in is optional.
#[derive(Debug, Clone)]
pub struct OptionalClaims(pub Option<Claims>);

fn bearer_token(req: &Request) -> Result<Option<&str>, AppError> {
    let Some(header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(Some)
        .ok_or_else(|| AppError::Authentication("Malformed Authorization header".to_string()))
}

fn decode_claims(state: &AppState, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))
}

fn required_claims(state: &AppState, req: &Request) -> Result<Claims, AppError> {
    let token = bearer_token(req)?
        .ok_or_else(|| AppError::Authentication("Missing bearer token".to_string()))?;
    decode_claims(state, token)
}

// ============================================================================
// Middleware
// ============================================================================

/// Any signed-in user; admins may act as customers too.
pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = required_claims(&state, &req)?;

    if claims.role != ROLE_CUSTOMER && !claims.is_admin() {
        return Err(AppError::Authorization(format!("Role {} may not book travel", claims.role)));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = required_claims(&state, &req)?;

    if !claims.is_admin() {
        return Err(AppError::Authorization("Administrator role required".to_string()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Anonymous callers pass through; a token that is present must still be valid.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = match bearer_token(&req)? {
        Some(token) => Some(decode_claims(&state, token)?),
        None => None,
    };

    req.extensions_mut().insert(OptionalClaims(claims));
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str) -> Claims {
        Claims {
            sub: "user-1".to_string(),
            email: "jane@example.com".to_string(),
            name: Some("Jane Doe".to_string()),
            role: role.to_string(),
            exp: 0,
        }
    }

    #[test]
    fn test_admin_roles() {
        assert!(claims(ROLE_ADMIN).is_admin());
        assert!(claims(ROLE_SUPER_ADMIN).is_admin());
        assert!(!claims(ROLE_CUSTOMER).is_admin());
    }

    #[test]
    fn test_identity_from_claims() {
        let identity = claims(ROLE_CUSTOMER).identity();
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.first_name, "Jane");
        assert_eq!(identity.last_name, "Doe");
    }
}
