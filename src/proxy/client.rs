// src/proxy/client.rs
// Outbound calls to the selected service. Single attempt, no retry.
use hyper::body::Bytes;
use hyper::StatusCode;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use url::Url;

#[derive(Debug)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
}

impl BackendClient {
    pub fn new() -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
        })
    }

    pub async fn get(&self, url: Url, timeout: Duration) -> reqwest::Result<BackendResponse> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        Self::read(response).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &T,
        timeout: Duration,
    ) -> reqwest::Result<BackendResponse> {
        let response = self
            .client
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> reqwest::Result<BackendResponse> {
        let status = response.status();
        let body = response.bytes().await?;
        Ok(BackendResponse { status, body })
    }
}
