#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use spots_api::auth::{generate_jwt, Claims};

pub const JWT_SECRET: &str = "integration-test-secret";

/// A server process on its own port, killed when dropped
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_spots-api"));
        cmd.env("APP_ENV", "development")
            .env("HOST", "127.0.0.1")
            .env("SPOTS_API_PORT", port.to_string())
            .env("STORE_BACKEND", "memory")
            .env("SECURITY_JWT_SECRET", JWT_SECRET)
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            client: reqwest::Client::new(),
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = self.client.get(&url).send().await {
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

    /// POST /spots as `token`, returning the created spot
    pub async fn create_spot(&self, token: &str, spot: Value) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/spots"))
            .bearer_auth(token)
            .json(&json!({ "spot": spot }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create failed with {}", res.status());
        let body = res.json::<Value>().await?;
        Ok(body["spot"].clone())
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

/// A fresh caller: their user id and a bearer token for it
pub fn caller() -> (Uuid, String) {
    let user_id = Uuid::new_v4();
    let token = generate_jwt(&Claims::new(user_id, 1).expect("token claims"), JWT_SECRET).expect("token generation");
    (user_id, token)
}

pub fn cafe() -> Value {
    json!({ "name": "Cafe", "seen": false, "location": "Main St", "notes": "good coffee" })
}
