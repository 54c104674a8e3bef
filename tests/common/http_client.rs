//! HTTP client helpers for tests.

use std::time::Duration;

use serde_json::{Value, json};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

/// Status code, `x-cashguard-status` header and JSON body of a response.
pub struct TestResponse {
    pub status: u16,
    pub status_header: String,
    pub body: Value,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    pub async fn validate(
        &self,
        image_base64: &str,
        model: Option<&str>,
        forwarded_for: Option<&str>,
    ) -> reqwest::Result<TestResponse> {
        let mut body = json!({ "imageBase64": image_base64 });
        if let Some(model) = model {
            body["model"] = json!(model);
        }

        let mut builder = self.client.post(self.url("/api/validate")).json(&body);
        if let Some(ip) = forwarded_for {
            builder = builder.header("x-forwarded-for", ip);
        }
        Self::read(builder.send().await?).await
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<TestResponse> {
        Self::read(self.client.get(self.url(path)).send().await?).await
    }

    async fn read(resp: reqwest::Response) -> reqwest::Result<TestResponse> {
        let status = resp.status().as_u16();
        let status_header = resp
            .headers()
            .get("x-cashguard-status")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let body = resp.json().await.unwrap_or(Value::Null);
        Ok(TestResponse {
            status,
            status_header,
            body,
        })
    }
}
