#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

pub const JWT_SECRET: &str = "integration-test-secret";

/// Addresses known to the fixture geocoder
pub const BOSTON: &str = "233 Bay State Rd Boston MA 02215";
pub const LOWELL: &str = "220 Pawtucket St Lowell MA 01854";
pub const KINGSTON: &str = "45 Upper College Rd Kingston RI 02881";
pub const BURLINGTON: &str = "85 South Prospect Street Burlington VT 05405";
pub const NEW_YORK: &str = "1 Penn Plaza New York NY 10119";

/// One server process per test over a fresh in-memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bootcamp-api"));
        cmd.arg("serve")
            .env("APP_ENV", "development")
            .env("HOST", "127.0.0.1")
            .env("PORT", port.to_string())
            // Empty value wins over any .env file and selects the in-memory store
            .env("DATABASE_URL", "")
            .env("JWT_SECRET", JWT_SECRET)
            .env("GEOCODER_PROVIDER", "static")
            .env("GEOCODER_FIXTURES", concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/geocoder.json"))
            .env("API_ENABLE_REQUEST_LOGGING", "false")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { port, base_url, client: reqwest::Client::new(), child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).send().await?;
        Ok((res.status(), res.json().await?))
    }

    /// Creates a bootcamp as `owner`, failing the test on any non-201
    pub async fn create_bootcamp(&self, owner: &str, name: &str, address: &str) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/api/v1/bootcamps"))
            .bearer_auth(token(owner, "admin"))
            .json(&bootcamp_body(name, address))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create {} returned {}", name, res.status());
        let payload: Value = res.json().await?;
        Ok(payload["data"].clone())
    }

    pub async fn add_course(&self, owner: &str, bootcamp_id: &str, title: &str, tuition: u64) -> Result<Value> {
        let res = self
            .client
            .post(self.url(&format!("/api/v1/bootcamps/{}/courses", bootcamp_id)))
            .bearer_auth(token(owner, "publisher"))
            .json(&course_body(title, tuition))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "add course {} returned {}", title, res.status());
        let payload: Value = res.json().await?;
        Ok(payload["data"].clone())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub async fn start_server() -> Result<TestServer> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

pub fn token(id: &str, role: &str) -> String {
    let exp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() + 3600)
        .unwrap_or(u64::MAX / 2);
    let claims = json!({ "id": id, "role": role, "exp": exp });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).expect("token encodes")
}

pub fn bootcamp_body(name: &str, address: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{} teaches full stack web development", name),
        "website": "https://example.com",
        "email": "enroll@example.com",
        "address": address,
        "careers": ["Web Development", "UI/UX"],
        "housing": true,
    })
}

pub fn course_body(title: &str, tuition: u64) -> Value {
    json!({
        "title": title,
        "description": "Project based curriculum",
        "weeks": "12",
        "tuition": tuition,
        "minimumSkill": "intermediate",
    })
}
