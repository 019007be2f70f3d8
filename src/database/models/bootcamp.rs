use once_cell::sync::Lazy;
use serde_json::{json, Value};

use super::schema::{CollectionSchema, FieldSpec, FieldType, Format};
use crate::database::document::Document;
use crate::geo::GeoLocation;
use crate::query::Populate;

pub const COLLECTION: &str = "bootcamps";

pub const CAREERS: &[&str] = &[
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

static SCHEMA: Lazy<CollectionSchema> = Lazy::new(|| CollectionSchema {
    collection: COLLECTION,
    resource: "Bootcamp",
    fields: vec![
        FieldSpec::new("name", FieldType::String)
            .required("Please add a name")
            .max_length(50, "Name can not be more than 50 characters"),
        FieldSpec::new("slug", FieldType::String),
        FieldSpec::new("description", FieldType::String)
            .required("Please add a description")
            .max_length(500, "Description can not be more than 500 characters"),
        FieldSpec::new("website", FieldType::String).format(Format::Url, "Please use a valid URL with HTTP or HTTPS"),
        FieldSpec::new("phone", FieldType::String).max_length(20, "Phone number can not be longer than 20 characters"),
        FieldSpec::new("email", FieldType::String).format(Format::Email, "Please add a valid email"),
        FieldSpec::new("address", FieldType::String).required("Please add an address"),
        FieldSpec::new("location", FieldType::Object),
        FieldSpec::new("location.zipcode", FieldType::String),
        FieldSpec::new("location.state", FieldType::String),
        FieldSpec::new("location.city", FieldType::String),
        FieldSpec::new("careers", FieldType::StringArray).required("Please add at least one career").one_of(CAREERS),
        FieldSpec::new("averageRating", FieldType::Number).range(1.0, 10.0, "Rating must be between 1 and 10"),
        FieldSpec::new("averageCost", FieldType::Number),
        FieldSpec::new("photo", FieldType::String),
        FieldSpec::new("housing", FieldType::Boolean),
        FieldSpec::new("jobAssistance", FieldType::Boolean),
        FieldSpec::new("jobGuarantee", FieldType::Boolean),
        FieldSpec::new("acceptGi", FieldType::Boolean),
        FieldSpec::new("user", FieldType::Id),
    ],
});

/// Computed by the service, never accepted from clients
pub const DERIVED_FIELDS: &[&str] = &["slug", "location", "averageCost"];

/// A bootcamp's courses, resolved inline on listings
pub const COURSES: Populate = Populate::Children {
    field: "courses",
    collection: super::course::COLLECTION,
    foreign_key: super::course::BOOTCAMP_FIELD,
};

pub fn schema() -> &'static CollectionSchema {
    &SCHEMA
}

/// Defaults applied to newly created bootcamps
pub fn apply_defaults(doc: &mut Document) {
    let defaults = [
        ("photo", json!("no-photo.jpg")),
        ("housing", json!(false)),
        ("jobAssistance", json!(false)),
        ("jobGuarantee", json!(false)),
        ("acceptGi", json!(false)),
    ];
    for (field, value) in defaults {
        doc.entry(field).or_insert(value);
    }
    if let Some(name) = doc.get("name").and_then(Value::as_str) {
        let slug = slugify(name);
        doc.insert("slug".to_string(), Value::String(slug));
    }
}

/// GeoJSON point plus the address parts reported by the geocoder
pub fn location_value(loc: &GeoLocation) -> Value {
    json!({
        "type": "Point",
        "coordinates": [loc.longitude, loc.latitude],
        "formattedAddress": loc.formatted_address,
        "street": loc.street,
        "city": loc.city,
        "state": loc.state,
        "zipcode": loc.zipcode,
        "country": loc.country,
    })
}

/// Lowercase, ASCII-alphanumeric words joined by single hyphens
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::schema::ValidationMode;

    #[test]
    fn slugs_collapse_punctuation() {
        assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
        assert_eq!(slugify("  ModernTech -- Bootcamp!! "), "moderntech-bootcamp");
    }

    #[test]
    fn defaults_do_not_override_supplied_values() {
        let mut doc = json!({ "name": "Codemasters", "housing": true }).as_object().cloned().unwrap();
        apply_defaults(&mut doc);
        assert_eq!(doc["housing"], json!(true));
        assert_eq!(doc["jobGuarantee"], json!(false));
        assert_eq!(doc["photo"], json!("no-photo.jpg"));
        assert_eq!(doc["slug"], json!("codemasters"));
    }

    #[test]
    fn careers_must_come_from_the_list() {
        let doc = json!({
            "name": "Devcentral",
            "description": "Full stack",
            "address": "45 Upper College Rd Kingston RI 02881",
            "careers": ["Web Development", "Basket Weaving"],
            "website": "https://devcentral.com",
        });
        let err = schema().validate(doc.as_object().unwrap(), ValidationMode::Create).unwrap_err();
        assert_eq!(err.fields.len(), 1);
        assert_eq!(err.fields[0].0, "careers");
    }

    #[test]
    fn location_is_lng_lat() {
        let loc = GeoLocation { latitude: 42.3, longitude: -71.1, ..Default::default() };
        assert_eq!(location_value(&loc)["coordinates"], json!([-71.1, 42.3]));
    }
}
