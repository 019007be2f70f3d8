mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{TestServer, BOSTON, BURLINGTON, KINGSTON, LOWELL, NEW_YORK};

// Five bootcamps, one course each, so averageCost equals the course tuition.
// Returned names are in creation order.
async fn seed(server: &TestServer) -> Result<Vec<String>> {
    let rows = [
        ("Devworks Bootcamp", BOSTON, 9000),
        ("ModernTech Bootcamp", LOWELL, 12000),
        ("Codemasters", KINGSTON, 8000),
        ("Devcentral Bootcamp", BURLINGTON, 10000),
        ("Uplift Academy", NEW_YORK, 15000),
    ];
    let mut names = Vec::new();
    for (i, (name, address, tuition)) in rows.into_iter().enumerate() {
        let owner = format!("owner-{}", i);
        let bootcamp = server.create_bootcamp(&owner, name, address).await?;
        let id = bootcamp["_id"].as_str().unwrap_or_default().to_string();
        server.add_course(&owner, &id, "Full Stack", tuition).await?;
        names.push(name.to_string());
    }
    Ok(names)
}

fn names(payload: &Value) -> Vec<String> {
    payload["data"]
        .as_array()
        .map(|items| items.iter().filter_map(|b| b["name"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn filtered_second_page_scenario() -> Result<()> {
    let server = common::start_server().await?;
    seed(&server).await?;

    let (status, payload) = server.get("/api/v1/bootcamps?averageCost[lte]=10000&page=2&limit=2").await?;
    assert_eq!(status, StatusCode::OK, "unexpected payload: {}", payload);

    assert_eq!(payload["count"], json!(1));
    assert_eq!(names(&payload), vec!["Devworks Bootcamp"]);
    assert_eq!(payload["pagination"], json!({ "prev": { "page": 1, "limit": 2 } }));
    Ok(())
}

#[tokio::test]
async fn default_sort_is_newest_first() -> Result<()> {
    let server = common::start_server().await?;
    let mut created = seed(&server).await?;
    created.reverse();

    let (status, payload) = server.get("/api/v1/bootcamps").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&payload), created);
    assert_eq!(payload["count"], json!(5));
    assert_eq!(payload["pagination"], json!({}));
    Ok(())
}

#[tokio::test]
async fn select_returns_only_requested_fields() -> Result<()> {
    let server = common::start_server().await?;
    seed(&server).await?;

    let (status, payload) = server.get("/api/v1/bootcamps?select=name,averageCost").await?;
    assert_eq!(status, StatusCode::OK);

    let items = payload["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 5);
    for item in items {
        let mut keys: Vec<String> = item.as_object().map(|o| o.keys().cloned().collect()).unwrap_or_default();
        keys.sort();
        assert_eq!(keys, vec!["_id", "averageCost", "name"], "unexpected fields in {}", item);
    }
    Ok(())
}

#[tokio::test]
async fn explicit_sort_and_limit() -> Result<()> {
    let server = common::start_server().await?;
    seed(&server).await?;

    let (_, payload) = server.get("/api/v1/bootcamps?sort=-averageCost,name&limit=2").await?;
    assert_eq!(names(&payload), vec!["Uplift Academy", "ModernTech Bootcamp"]);
    assert_eq!(payload["pagination"], json!({ "next": { "page": 2, "limit": 2 } }));

    let (_, payload) = server.get("/api/v1/bootcamps?sort=averageCost&page=3&limit=2").await?;
    assert_eq!(names(&payload), vec!["Uplift Academy"]);
    assert_eq!(payload["pagination"], json!({ "prev": { "page": 2, "limit": 2 } }));
    Ok(())
}

#[tokio::test]
async fn listing_populates_courses() -> Result<()> {
    let server = common::start_server().await?;
    seed(&server).await?;

    let (_, payload) = server.get("/api/v1/bootcamps?name=Codemasters").await?;
    assert_eq!(payload["count"], json!(1));
    let courses = &payload["data"][0]["courses"];
    assert_eq!(courses.as_array().map(Vec::len), Some(1));
    assert_eq!(courses[0]["tuition"], json!(8000));
    Ok(())
}

#[tokio::test]
async fn in_and_boolean_filters() -> Result<()> {
    let server = common::start_server().await?;
    seed(&server).await?;

    let (_, payload) = server.get("/api/v1/bootcamps?location.state[in]=MA,RI&sort=name").await?;
    assert_eq!(names(&payload), vec!["Codemasters", "Devworks Bootcamp", "ModernTech Bootcamp"]);

    let (_, payload) = server.get("/api/v1/bootcamps?housing=true&careers=UI/UX").await?;
    assert_eq!(payload["count"], json!(5));

    let (_, payload) = server.get("/api/v1/bootcamps?housing=false").await?;
    assert_eq!(payload["count"], json!(0));

    // careers is an array; `in` matches when any element is listed
    let (status, payload) = server.get("/api/v1/bootcamps?careers[in]=Business,UI/UX").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["count"], json!(5));

    let (_, payload) = server.get("/api/v1/bootcamps?careers[in]=Business,Other").await?;
    assert_eq!(payload["count"], json!(0));
    Ok(())
}

#[tokio::test]
async fn malformed_filters_are_rejected() -> Result<()> {
    let server = common::start_server().await?;

    for query in ["averageCost[ne]=5", "averageCost[lte]=cheap", "select=name,-email"] {
        let (status, payload) = server.get(&format!("/api/v1/bootcamps?{}", query)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} should be rejected", query);
        assert_eq!(payload["success"], json!(false));
    }
    Ok(())
}

#[tokio::test]
async fn courses_listing_populates_bootcamp() -> Result<()> {
    let server = common::start_server().await?;
    seed(&server).await?;

    let (status, payload) = server.get("/api/v1/courses?tuition[gt]=11000&sort=tuition").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["count"], json!(2));
    assert_eq!(payload["data"][0]["bootcamp"]["name"], json!("ModernTech Bootcamp"));
    assert!(payload["data"][0]["bootcamp"]["description"].is_string());
    Ok(())
}
