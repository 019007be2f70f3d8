pub mod bootcamp_service;
pub mod course_service;

pub use bootcamp_service::BootcampService;
pub use course_service::CourseService;

use crate::auth::OWNER_FIELD;
use crate::database::Document;
use crate::query::{CREATED_AT_FIELD, ID_FIELD};

/// Drops identity, timestamp, ownership and `derived` fields from a client body
pub(crate) fn strip_system_fields(mut body: Document, derived: &[&str]) -> Document {
    for field in [ID_FIELD, CREATED_AT_FIELD, OWNER_FIELD].iter().chain(derived) {
        body.remove(*field);
    }
    body
}
