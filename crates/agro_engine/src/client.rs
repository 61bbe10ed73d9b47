use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::ApiSettings;
use crate::error::{map_reqwest_error, ApiError, ApiErrorKind};

/// Thin typed wrapper over the backend REST API.
///
/// All requests carry the cookie-based session and go to the configured
/// origin. On any non-2xx response the error is normalized to a single
/// message (body `message` field, body `error` field, then a status
/// fallback). Reads accept a caller-supplied cancellation token so a
/// superseded request cannot resolve into state.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(ApiErrorKind::InvalidUrl, err.to_string()))?;
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .cookie_store(true)
            .build()
            .map_err(|err| ApiError::new(ApiErrorKind::Network, err.to_string()))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::new(ApiErrorKind::InvalidUrl, err.to_string()))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        cancel: Option<&CancellationToken>,
    ) -> Result<T, ApiError> {
        let mut request = self.http.get(self.endpoint(path)?);
        if !query.is_empty() {
            request = request.query(query);
        }
        Self::run(request, cancel).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, ApiError> {
        let request = self.http.post(self.endpoint(path)?).json(body);
        Self::run(request, cancel).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.http.patch(self.endpoint(path)?).json(body);
        Self::run(request, None).await
    }

    /// DELETE with the response body ignored.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let request = self.http.delete(self.endpoint(path)?);
        let response = request.send().await.map_err(map_reqwest_error)?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn run<T: DeserializeOwned>(
        request: RequestBuilder,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, ApiError> {
        match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(ApiError::cancelled()),
                result = Self::execute::<T>(request) => result,
            },
            None => Self::execute::<T>(request).await,
        }
    }

    async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let response = Self::ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::new(ApiErrorKind::InvalidBody, err.to_string()))
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let fallback = format!("Request failed with status {}", status.as_u16());
        let message = match response.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("message")
                .and_then(serde_json::Value::as_str)
                .or_else(|| body.get("error").and_then(serde_json::Value::as_str))
                .map(str::to_string)
                .unwrap_or(fallback),
            Err(_) => fallback,
        };
        Err(ApiError::new(ApiErrorKind::Status(status.as_u16()), message))
    }
}
