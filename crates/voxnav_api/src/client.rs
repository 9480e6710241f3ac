use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::audio::content_type_for;
use crate::config::ApiConfig;
use crate::error::{parse_error_message, ApiError};
use crate::headers::{build_signed_headers, HEADER_CONTENT_TYPE};
use crate::payload::{
    ApiEnvelope, InitializeData, InitializeRequest, RegisterScreensData, RegisterScreensRequest,
    ScreenPayload, SubmitAudioData,
};
use crate::retry::{is_retryable_status, retry_delay};
use crate::sign::credential_signature;
use crate::validate::validate_success_headers;

/// Optional cancellation signal shared across request and retry loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

pub const INITIALIZE_PATH: &str = "/initialize";
pub const REGISTER_SCREENS_PATH: &str = "/register-screens";
pub const SUBMIT_AUDIO_PATH: &str = "/submit-audio";

/// One logical request through the pipeline.
#[derive(Debug, Clone)]
pub enum Operation {
    Initialize,
    RegisterScreens(Vec<ScreenPayload>),
    SubmitAudio { audio: Vec<u8>, file_name: String },
}

/// Typed result of a pipeline operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutput {
    Initialized(InitializeData),
    ScreensRegistered(RegisterScreensData),
    AudioSubmitted(SubmitAudioData),
}

/// Signed HTTP client for the voxnav backend.
#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        if config.api_key.trim().is_empty() {
            return Err(ApiError::MissingApiKey);
        }
        if reqwest::Url::parse(config.normalized_base_url()).is_err() {
            return Err(ApiError::InvalidBaseUrl(config.base_url.clone()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.normalized_base_url())
    }

    /// Runs one operation through the full pipeline.
    ///
    /// Every operation except `Initialize` requires the caller-supplied
    /// bearer token; the caller is responsible for session gating before the
    /// call reaches this crate.
    pub async fn execute(
        &self,
        operation: Operation,
        bearer: Option<&str>,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<OperationOutput, ApiError> {
        match operation {
            Operation::Initialize => self
                .initialize(cancellation)
                .await
                .map(OperationOutput::Initialized),
            Operation::RegisterScreens(screens) => {
                let token = bearer.ok_or(ApiError::MissingSessionToken)?;
                self.register_screens(token, &screens, cancellation)
                    .await
                    .map(OperationOutput::ScreensRegistered)
            }
            Operation::SubmitAudio { audio, file_name } => {
                let token = bearer.ok_or(ApiError::MissingSessionToken)?;
                self.submit_audio(token, audio, &file_name, cancellation)
                    .await
                    .map(OperationOutput::AudioSubmitted)
            }
        }
    }

    /// `POST /initialize` — validates credentials and obtains a session.
    pub async fn initialize(
        &self,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<InitializeData, ApiError> {
        let timestamp = current_epoch_ms();
        let request = InitializeRequest {
            api_key: self.config.api_key.clone(),
            app_package: self.config.app_package.clone(),
            sdk_version: self.config.sdk_version.clone(),
            timestamp,
            signature: credential_signature(&self.config.api_key, timestamp),
        };
        let body = serde_json::to_vec(&request)?;

        let response = self
            .send_json_with_retry(INITIALIZE_PATH, body, None, cancellation)
            .await?;
        parse_envelope(response, "initialize", cancellation).await
    }

    /// `POST /register-screens` — registers screens for voice matching.
    pub async fn register_screens(
        &self,
        bearer: &str,
        screens: &[ScreenPayload],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<RegisterScreensData, ApiError> {
        let request = RegisterScreensRequest {
            screens: screens.to_vec(),
            timestamp: current_epoch_ms(),
        };
        let body = serde_json::to_vec(&request)?;

        let response = self
            .send_json_with_retry(REGISTER_SCREENS_PATH, body, Some(bearer), cancellation)
            .await?;
        parse_envelope(response, "register screens", cancellation).await
    }

    /// `POST /submit-audio` — submits one audio part for processing.
    ///
    /// The multipart content type is inferred from the file extension. The
    /// signature covers the raw audio length, which both sides can derive
    /// independently of the multipart boundary.
    pub async fn submit_audio(
        &self,
        bearer: &str,
        audio: Vec<u8>,
        file_name: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<SubmitAudioData, ApiError> {
        let content_type = content_type_for(file_name);
        let body_len = audio.len() as u64;
        let endpoint = self.endpoint(SUBMIT_AUDIO_PATH);

        let response = self
            .send_with_retry(cancellation, || {
                let headers = build_signed_headers(
                    &self.config,
                    "POST",
                    SUBMIT_AUDIO_PATH,
                    body_len,
                    Some(bearer),
                    current_epoch_ms(),
                )?;
                let part = multipart::Part::bytes(audio.clone())
                    .file_name(file_name.to_owned())
                    .mime_str(content_type)
                    .map_err(ApiError::from)?;
                let form = multipart::Form::new().part("audio", part);
                Ok(self
                    .http
                    .post(&endpoint)
                    .headers(header_map(&headers)?)
                    .multipart(form))
            })
            .await?;
        parse_envelope(response, "submit audio", cancellation).await
    }

    async fn send_json_with_retry(
        &self,
        path: &str,
        body: Vec<u8>,
        bearer: Option<&str>,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, ApiError> {
        let endpoint = self.endpoint(path);
        let body_len = body.len() as u64;

        self.send_with_retry(cancellation, || {
            let headers = build_signed_headers(
                &self.config,
                "POST",
                path,
                body_len,
                bearer,
                current_epoch_ms(),
            )?;
            Ok(self
                .http
                .post(&endpoint)
                .headers(header_map(&headers)?)
                .header(HEADER_CONTENT_TYPE, "application/json")
                .body(body.clone()))
        })
        .await
    }

    /// Transport call wrapped in the retry stage.
    ///
    /// Requests are rebuilt (and re-signed with a fresh timestamp) for every
    /// attempt. Exactly `max_retries` attempts are made against a
    /// persistently failing transport; security violations from response
    /// validation short-circuit without retrying.
    async fn send_with_retry<F>(
        &self,
        cancellation: Option<&CancellationSignal>,
        mut build: F,
    ) -> Result<Response, ApiError>
    where
        F: FnMut() -> Result<reqwest::RequestBuilder, ApiError>,
    {
        let mut last_status: Option<StatusCode> = None;
        let mut last_error: Option<String> = None;
        let max_attempts = self.config.max_retries;

        for attempt in 1..=max_attempts {
            if is_cancelled(cancellation) {
                return Err(ApiError::Cancelled);
            }

            let send = build()?.send();
            match await_or_cancel(send, cancellation).await? {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        validate_success_headers(response.headers(), current_epoch_ms())?;
                        return Ok(response);
                    }

                    last_status = Some(status);
                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_else(|_| {
                            status
                                .canonical_reason()
                                .unwrap_or("request failed")
                                .to_string()
                        });
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if !is_retryable_status(status.as_u16()) {
                        return Err(ApiError::Status(status, message));
                    }
                    tracing::warn!(%status, attempt, max_attempts, "retryable response status");
                    if attempt < max_attempts {
                        let delay = retry_delay(self.config.initial_retry_delay, attempt);
                        await_or_cancel(tokio::time::sleep(delay), cancellation).await?;
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, attempt, max_attempts, "transport attempt failed");
                    last_error = Some(error.to_string());
                    if attempt < max_attempts {
                        let delay = retry_delay(self.config.initial_retry_delay, attempt);
                        await_or_cancel(tokio::time::sleep(delay), cancellation).await?;
                    }
                }
            }
        }

        Err(ApiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }
}

async fn parse_envelope<T: DeserializeOwned>(
    response: Response,
    operation: &'static str,
    cancellation: Option<&CancellationSignal>,
) -> Result<T, ApiError> {
    let envelope = await_or_cancel(response.json::<ApiEnvelope<T>>(), cancellation)
        .await?
        .map_err(ApiError::from)?;
    envelope.data.ok_or(ApiError::EmptyData(operation))
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ApiError> {
    let mut out = HeaderMap::new();
    for (key, value) in headers {
        out.insert(
            HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ApiError::InvalidHeader(format!("invalid header key: {key}")))?,
            HeaderValue::from_str(value)
                .map_err(|_| ApiError::InvalidHeader(format!("invalid header value for {key}")))?,
        );
    }
    Ok(out)
}

fn is_cancelled(cancellation: Option<&CancellationSignal>) -> bool {
    cancellation.is_some_and(|token| token.load(Ordering::Acquire))
}

/// Awaits a pipeline future while polling the cancellation flag.
///
/// Cancellation drops the in-flight future, which releases the underlying
/// transport resource, and surfaces [`ApiError::Cancelled`].
async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

/// Current wall-clock time as epoch milliseconds.
pub(crate) fn current_epoch_ms() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use super::{await_or_cancel, ApiClient, CancellationSignal};
    use crate::config::ApiConfig;
    use crate::error::ApiError;

    #[test]
    fn new_rejects_unparseable_base_urls() {
        let config = ApiConfig::new("vx_test_key", "com.example.app").with_base_url("not a url");
        assert!(matches!(
            ApiClient::new(config),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn await_or_cancel_completes_without_signal() {
        let value = await_or_cancel(async { 7 }, None).await.expect("no signal");
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn await_or_cancel_aborts_pending_future_when_flagged() {
        let cancel: CancellationSignal = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            flag.store(true, Ordering::Release);
        });

        let never = std::future::pending::<()>();
        let result = await_or_cancel(never, Some(&cancel)).await;
        assert!(matches!(result, Err(ApiError::Cancelled)));
    }
}
