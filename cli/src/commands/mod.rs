//! CLI Commands

pub mod billing;
pub mod suspension;

use serde::de::DeserializeOwned;

/// API client
pub struct ApiClient {
    pub base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().await.map_err(|e| e.to_string())?;
        Self::unwrap_envelope(resp).await
    }

    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, String> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Self::unwrap_envelope(resp).await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Self::unwrap_envelope(resp).await
    }

    /// Unwrap the `{success, data, error}` response envelope.
    async fn unwrap_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, String> {
        let json: serde_json::Value = resp.json().await.map_err(|e| e.to_string())?;

        if json.get("success").and_then(|s| s.as_bool()) == Some(false) {
            let message = json
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("request failed");
            return Err(message.to_string());
        }

        if let Some(data) = json.get("data") {
            serde_json::from_value(data.clone()).map_err(|e| e.to_string())
        } else {
            Err("No data in response".into())
        }
    }
}
