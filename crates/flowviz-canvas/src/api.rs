//! API client for the flowviz-web endpoints not covered by the loader

use serde::de::DeserializeOwned;

/// Thin client over the document server
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }
        response.json::<T>().await.map_err(|e| e.to_string())
    }

    /// Available deployment stands
    pub async fn get_stands(&self) -> Result<Vec<String>, String> {
        self.get("/api/stands").await
    }
}
