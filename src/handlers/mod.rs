// Handlers by resource:
// public (/ and /health), bootcamps (/api/v1/bootcamps/*), courses (/api/v1/courses/*).
// Mutating handlers sit behind jwt_auth_middleware and receive an AuthUser extension.
pub mod bootcamps;
pub mod courses;
pub mod public;

use crate::auth::{authorize, Role};
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Roles allowed to write bootcamps and courses
pub const WRITERS: &[Role] = &[Role::Publisher, Role::Admin];

pub(crate) fn require_writer(user: &AuthUser) -> Result<(), ApiError> {
    authorize(user, WRITERS)
}
