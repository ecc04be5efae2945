use super::{Transport, TransportError, TransportResult};
use crate::model::{Application, ApplicationsPage, RunStatus, Settings, Stats, SyncConfig};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Upper bound for establishing a connection, independent of the request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Error body returned by the service on 4xx/5xx.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// reqwest-backed [`Transport`] rooted at the configured base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(cfg: &SyncConfig) -> TransportResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(CONNECT_TIMEOUT.min(cfg.request_timeout))
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> TransportResult<T> {
        let resp = send(req.header(ACCEPT, "application/json")).await?;
        let body = resp.text().await.map_err(map_reqwest_error)?;
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn post_command(&self, route: &str) -> TransportResult<()> {
        send(
            self.http
                .post(self.url(route))
                .header(CONTENT_TYPE, "application/json"),
        )
        .await
        .map(|_| ())
    }
}

/// Send a request and turn any non-2xx status into [`TransportError::Rejected`].
async fn send(req: RequestBuilder) -> TransportResult<Response> {
    let resp = req.send().await.map_err(map_reqwest_error)?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    // Error bodies are best effort; a missing or non-JSON body just means no message.
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error);
    Err(TransportError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else if err.is_timeout() {
        TransportError::Network(format!("request timed out: {err}"))
    } else {
        TransportError::Network(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn status(&self) -> TransportResult<RunStatus> {
        self.get_json(self.http.get(self.url("status"))).await
    }

    async fn stats(&self) -> TransportResult<Stats> {
        self.get_json(self.http.get(self.url("stats"))).await
    }

    async fn applications(&self, per_page: usize) -> TransportResult<Vec<Application>> {
        let req = self
            .http
            .get(self.url("applications"))
            .query(&[("per_page", per_page)]);
        let page: ApplicationsPage = self.get_json(req).await?;
        Ok(page.applications)
    }

    async fn settings(&self) -> TransportResult<Settings> {
        self.get_json(self.http.get(self.url("settings"))).await
    }

    async fn save_settings(&self, settings: &Settings) -> TransportResult<()> {
        send(self.http.post(self.url("settings")).json(settings))
            .await
            .map(|_| ())
    }

    async fn start(&self) -> TransportResult<()> {
        self.post_command("start").await
    }

    async fn stop(&self) -> TransportResult<()> {
        self.post_command("stop").await
    }

    async fn simulate_application(&self) -> TransportResult<()> {
        self.post_command("simulate-application").await
    }

    async fn export_csv(&self) -> TransportResult<String> {
        let resp = send(self.http.get(self.url("export")).header(ACCEPT, "text/csv")).await?;
        resp.text().await.map_err(map_reqwest_error)
    }
}
