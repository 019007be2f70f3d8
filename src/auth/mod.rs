use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::database::Document;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Field naming the account that owns a bootcamp or course
pub const OWNER_FIELD: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bearer token payload. Tokens are issued elsewhere; this service only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub role: Role,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// Route-level role gate
pub fn authorize(user: &AuthUser, roles: &[Role]) -> Result<(), ApiError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!("User role {} is not authorized to access this route", user.role)))
    }
}

pub fn is_owner_or_admin(resource: &Document, user: &AuthUser) -> bool {
    user.role == Role::Admin || resource.get(OWNER_FIELD).and_then(Value::as_str) == Some(user.id.as_str())
}

/// Must pass before any write to `resource`; `action` reads like "update this bootcamp"
pub fn require_owner_or_admin(resource: &Document, user: &AuthUser, action: &str) -> Result<(), ApiError> {
    if is_owner_or_admin(resource, user) {
        Ok(())
    } else {
        tracing::warn!("user {} denied: {}", user.id, action);
        Err(ApiError::forbidden(format!("User {} is not authorized to {}", user.id, action)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    fn user(id: &str, role: Role) -> AuthUser {
        AuthUser { id: id.to_string(), role }
    }

    fn owned_by(id: &str) -> Document {
        json!({ "_id": "b1", "user": id }).as_object().cloned().unwrap()
    }

    #[test]
    fn owner_and_admin_pass() {
        let doc = owned_by("u1");
        assert!(require_owner_or_admin(&doc, &user("u1", Role::Publisher), "update this bootcamp").is_ok());
        assert!(require_owner_or_admin(&doc, &user("u9", Role::Admin), "update this bootcamp").is_ok());
    }

    #[test]
    fn other_publishers_are_forbidden() {
        let err = require_owner_or_admin(&owned_by("u1"), &user("u2", Role::Publisher), "update this bootcamp")
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "User u2 is not authorized to update this bootcamp");
    }

    #[test]
    fn unowned_documents_only_admin() {
        let doc = json!({ "_id": "b1" }).as_object().cloned().unwrap();
        assert!(!is_owner_or_admin(&doc, &user("u1", Role::Publisher)));
        assert!(is_owner_or_admin(&doc, &user("u1", Role::Admin)));
    }

    #[test]
    fn role_gate() {
        let writers = [Role::Publisher, Role::Admin];
        assert!(authorize(&user("u1", Role::Publisher), &writers).is_ok());
        let err = authorize(&user("u1", Role::User), &writers).unwrap_err();
        assert_eq!(err.message(), "User role user is not authorized to access this route");
    }

    #[test]
    fn roles_serialize_lowercase() {
        let claims: Claims = serde_json::from_value(json!({ "id": "u1", "role": "publisher", "exp": 1 })).unwrap();
        assert_eq!(claims.role, Role::Publisher);
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("admin"));
    }
}
