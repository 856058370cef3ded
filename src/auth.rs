use axum::http::StatusCode;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::models::api::AuthContext;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub user_id: Option<String>,
    /// Standard subject claim, used when `user_id` is absent.
    pub sub: Option<String>,
    /// Permission tier: "admin" or anything else for a regular user.
    pub role: Option<String>,
    /// Expiration time (Unix timestamp).
    pub exp: Option<u64>,
}

/// Verify a JWT token and extract auth context.
pub fn verify_token(token: &str, secret: &str, algorithm: &str) -> Result<AuthContext, String> {
    let algo = match algorithm {
        "HS256" => jsonwebtoken::Algorithm::HS256,
        "HS384" => jsonwebtoken::Algorithm::HS384,
        "HS512" => jsonwebtoken::Algorithm::HS512,
        _ => return Err(format!("Unsupported algorithm: {algorithm}")),
    };

    let mut validation = Validation::new(algo);
    // Allow some clock drift.
    validation.leeway = 60;
    // Don't require specific claims.
    validation.required_spec_claims = std::collections::HashSet::new();

    let key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| format!("Token validation failed: {e}"))?;

    let claims = token_data.claims;
    let user_id = claims
        .user_id
        .or(claims.sub)
        .unwrap_or_else(|| "unknown".to_string());

    Ok(AuthContext {
        user_id,
        role: claims.role.unwrap_or_else(|| "user".to_string()),
    })
}

/// Extract auth context from an Authorization header. In bypass mode every
/// request runs as the configured dev user with admin rights.
pub fn extract_auth_from_header(
    auth_header: Option<&str>,
    secret: &str,
    algorithm: &str,
    bypass_mode: bool,
    dev_user_id: &str,
) -> Result<AuthContext, (StatusCode, String)> {
    if bypass_mode {
        return Ok(AuthContext {
            user_id: dev_user_id.to_string(),
            role: "admin".to_string(),
        });
    }

    let header = auth_header.ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            "Missing Authorization header".to_string(),
        )
    })?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header format".to_string(),
        )
    })?;

    verify_token(token, secret, algorithm).map_err(|e| (StatusCode::UNAUTHORIZED, e))
}

/// Admin gate for create/update/delete endpoints. Non-admin users get 401,
/// matching the original system's access-prohibited behavior.
pub fn require_admin(auth: &AuthContext) -> Result<(), (StatusCode, String)> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            "Admin privileges required".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn make_token(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn exp_in(secs: u64) -> Option<u64> {
        Some(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_secs()
                + secs,
        )
    }

    #[test]
    fn test_verify_valid_token() {
        let claims = Claims {
            user_id: Some("user1".to_string()),
            sub: None,
            role: Some("admin".to_string()),
            exp: exp_in(3600),
        };
        let token = make_token(&claims, "secret");
        let auth = verify_token(&token, "secret", "HS256").unwrap();
        assert_eq!(auth.user_id, "user1");
        assert!(auth.is_admin());
    }

    #[test]
    fn test_verify_invalid_secret() {
        let claims = Claims {
            user_id: Some("user1".to_string()),
            sub: None,
            role: None,
            exp: exp_in(3600),
        };
        let token = make_token(&claims, "secret");
        let result = verify_token(&token, "wrong-secret", "HS256");
        assert!(result.is_err());
    }

    #[test]
    fn test_verify_sub_fallback() {
        let claims = Claims {
            user_id: None,
            sub: Some("user2".to_string()),
            role: None,
            exp: exp_in(3600),
        };
        let token = make_token(&claims, "secret");
        let auth = verify_token(&token, "secret", "HS256").unwrap();
        assert_eq!(auth.user_id, "user2");
    }

    #[test]
    fn test_missing_role_is_regular_user() {
        let claims = Claims {
            user_id: Some("user1".to_string()),
            sub: None,
            role: None,
            exp: exp_in(3600),
        };
        let token = make_token(&claims, "secret");
        let auth = verify_token(&token, "secret", "HS256").unwrap();
        assert_eq!(auth.role, "user");
        assert!(require_admin(&auth).is_err());
    }

    #[test]
    fn test_bypass_auth_mode_is_admin() {
        let result = extract_auth_from_header(None, "secret", "HS256", true, "dev_user");
        let auth = result.unwrap();
        assert_eq!(auth.user_id, "dev_user");
        assert!(require_admin(&auth).is_ok());
    }

    #[test]
    fn test_missing_header_no_bypass() {
        let result = extract_auth_from_header(None, "secret", "HS256", false, "dev_user");
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().0, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_invalid_header_format() {
        let result =
            extract_auth_from_header(Some("Basic abc"), "secret", "HS256", false, "dev_user");
        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_algorithm() {
        let claims = Claims {
            user_id: Some("user1".to_string()),
            sub: None,
            role: None,
            exp: exp_in(3600),
        };
        let token = make_token(&claims, "secret");
        assert!(verify_token(&token, "secret", "RS256").is_err());
    }
}
