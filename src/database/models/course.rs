use once_cell::sync::Lazy;
use serde_json::{json, Value};

use super::schema::{CollectionSchema, FieldSpec, FieldType};
use crate::database::document::Document;
use crate::query::Populate;

pub const COLLECTION: &str = "courses";

/// Field on a course holding its parent bootcamp's `_id`
pub const BOOTCAMP_FIELD: &str = "bootcamp";

static SCHEMA: Lazy<CollectionSchema> = Lazy::new(|| CollectionSchema {
    collection: COLLECTION,
    resource: "Course",
    fields: vec![
        FieldSpec::new("title", FieldType::String).required("Please add a course title"),
        FieldSpec::new("description", FieldType::String).required("Please add a description"),
        FieldSpec::new("weeks", FieldType::String).required("Please add number of weeks"),
        FieldSpec::new("tuition", FieldType::Number).required("Please add a tuition cost"),
        FieldSpec::new("minimumSkill", FieldType::String)
            .required("Please add a minimum skill")
            .one_of(&["beginner", "intermediate", "advanced"]),
        FieldSpec::new("scholarshipAvailable", FieldType::Boolean),
        FieldSpec::new(BOOTCAMP_FIELD, FieldType::Id),
        FieldSpec::new("user", FieldType::Id),
    ],
});

/// The parent bootcamp reduced to its name and description
pub const BOOTCAMP: Populate = Populate::Parent {
    field: BOOTCAMP_FIELD,
    collection: super::bootcamp::COLLECTION,
    select: &["name", "description"],
};

pub fn schema() -> &'static CollectionSchema {
    &SCHEMA
}

pub fn apply_defaults(doc: &mut Document) {
    doc.entry("scholarshipAvailable").or_insert(json!(false));
}

/// Bootcamp average cost: mean tuition rounded up to the next multiple of ten.
/// `None` when the bootcamp has no priced courses.
pub fn average_cost(courses: &[Document]) -> Option<Value> {
    let tuitions: Vec<f64> = courses.iter().filter_map(|c| c.get("tuition").and_then(Value::as_f64)).collect();
    if tuitions.is_empty() {
        return None;
    }
    let mean = tuitions.iter().sum::<f64>() / tuitions.len() as f64;
    let rounded = (mean / 10.0).ceil() * 10.0;
    Some(json!(rounded as i64))
}
