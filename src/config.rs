use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use realtime_socket::RealtimeConfig;
use voxnav_api::ApiConfig;

use crate::error::SdkError;

/// Full configuration surface for one SDK instance.
///
/// Constructed with [`SdkConfig::new`] plus `with_*` builders; validated as a
/// whole when handed to `VoxnavSdk::initialize`.
#[derive(Clone)]
pub struct SdkConfig {
    pub api_key: String,
    pub app_package: String,
    pub base_url: String,
    /// Realtime endpoint; derived from `base_url` when absent.
    pub realtime_url: Option<String>,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub initial_retry_delay: Duration,
    /// Optional `sha256/`-prefixed TLS certificate pins.
    pub pinned_certificates: Vec<String>,
    pub reconnect_attempts: u32,
    pub reconnect_base_delay: Duration,
    pub rate_limit_per_minute: u32,
    /// Durable session record; in-memory only when absent.
    pub session_file: Option<PathBuf>,
    /// Expected app-identity hash; checked at initialize when present.
    pub expected_signature_hash: Option<String>,
    /// DER bytes of the host app's signing certificate, hashed for the
    /// identity check.
    pub signing_certificate: Option<Vec<u8>>,
}

impl SdkConfig {
    pub fn new(api_key: impl Into<String>, app_package: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            app_package: app_package.into(),
            base_url: voxnav_api::config::DEFAULT_BASE_URL.to_string(),
            realtime_url: None,
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            initial_retry_delay: Duration::from_secs(1),
            pinned_certificates: Vec::new(),
            reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_secs(1),
            rate_limit_per_minute: 60,
            session_file: None,
            expected_signature_hash: None,
            signing_certificate: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_realtime_url(mut self, realtime_url: impl Into<String>) -> Self {
        self.realtime_url = Some(realtime_url.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_retry_delay(mut self, delay: Duration) -> Self {
        self.initial_retry_delay = delay;
        self
    }

    pub fn with_pinned_certificates(
        mut self,
        certificates: impl IntoIterator<Item = String>,
    ) -> Self {
        self.pinned_certificates = certificates.into_iter().collect();
        self
    }

    pub fn with_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_attempts = attempts;
        self
    }

    pub fn with_reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect_base_delay = delay;
        self
    }

    pub fn with_rate_limit_per_minute(mut self, limit: u32) -> Self {
        self.rate_limit_per_minute = limit;
        self
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    pub fn with_identity_check(
        mut self,
        expected_signature_hash: impl Into<String>,
        signing_certificate: Vec<u8>,
    ) -> Self {
        self.expected_signature_hash = Some(expected_signature_hash.into());
        self.signing_certificate = Some(signing_certificate);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), SdkError> {
        if self.api_key.trim().is_empty() {
            return Err(invalid("api_key must not be empty"));
        }
        if self.app_package.trim().is_empty() {
            return Err(invalid("app_package must not be empty"));
        }
        if self.base_url.trim().is_empty() {
            return Err(invalid("base_url must not be empty"));
        }
        if self.request_timeout.is_zero() {
            return Err(invalid("request_timeout must be positive"));
        }
        if self.initial_retry_delay.is_zero() {
            return Err(invalid("initial_retry_delay must be positive"));
        }
        if self.reconnect_base_delay.is_zero() {
            return Err(invalid("reconnect_base_delay must be positive"));
        }
        if self.rate_limit_per_minute == 0 {
            return Err(invalid("rate_limit_per_minute must be positive"));
        }
        for pin in &self.pinned_certificates {
            if !pin.starts_with("sha256/") {
                return Err(invalid("certificate pins must be sha256/-prefixed"));
            }
        }
        if self.expected_signature_hash.is_some() && self.signing_certificate.is_none() {
            return Err(invalid(
                "expected_signature_hash requires a signing_certificate to hash",
            ));
        }
        Ok(())
    }

    /// Realtime endpoint, derived from the base URL when not set explicitly.
    #[must_use]
    pub(crate) fn realtime_endpoint(&self) -> String {
        if let Some(url) = &self.realtime_url {
            return url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        let socket_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{socket_base}/realtime")
    }

    pub(crate) fn api_config(&self) -> ApiConfig {
        ApiConfig::new(self.api_key.clone(), self.app_package.clone())
            .with_base_url(self.base_url.clone())
            .with_timeout(self.request_timeout)
            .with_max_retries(self.max_retries)
            .with_initial_retry_delay(self.initial_retry_delay)
            .with_pinned_certificates(self.pinned_certificates.iter().cloned())
    }

    pub(crate) fn realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            max_reconnect_attempts: self.reconnect_attempts,
            base_reconnect_delay: self.reconnect_base_delay,
        }
    }
}

fn invalid(message: &str) -> SdkError {
    SdkError::InvalidConfiguration(message.to_string())
}

// The API key is a live credential; keep it out of logs.
impl fmt::Debug for SdkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkConfig")
            .field("api_key", &"<redacted>")
            .field("app_package", &self.app_package)
            .field("base_url", &self.base_url)
            .field("realtime_url", &self.realtime_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .field("initial_retry_delay", &self.initial_retry_delay)
            .field("pinned_certificates", &self.pinned_certificates.len())
            .field("reconnect_attempts", &self.reconnect_attempts)
            .field("reconnect_base_delay", &self.reconnect_base_delay)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("session_file", &self.session_file)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(SdkConfig::new("vx_live_abc", "com.example.app")
            .validate()
            .is_ok());
    }

    #[test]
    fn empty_credentials_are_rejected() {
        assert!(matches!(
            SdkConfig::new("", "com.example.app").validate(),
            Err(SdkError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            SdkConfig::new("vx_live_abc", "  ").validate(),
            Err(SdkError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn unprefixed_certificate_pins_are_rejected() {
        let config = SdkConfig::new("vx_live_abc", "com.example.app")
            .with_pinned_certificates(["deadbeef".to_string()]);
        assert!(matches!(
            config.validate(),
            Err(SdkError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn identity_hash_without_certificate_is_rejected() {
        let mut config = SdkConfig::new("vx_live_abc", "com.example.app");
        config.expected_signature_hash = Some("hash".to_string());
        assert!(matches!(
            config.validate(),
            Err(SdkError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn realtime_endpoint_derives_from_base_url() {
        let config = SdkConfig::new("k", "p").with_base_url("https://api.voxnav.io/v1/");
        assert_eq!(config.realtime_endpoint(), "wss://api.voxnav.io/v1/realtime");

        let config = SdkConfig::new("k", "p")
            .with_base_url("http://localhost:8080")
            .with_realtime_url("ws://localhost:9000/events");
        assert_eq!(config.realtime_endpoint(), "ws://localhost:9000/events");
    }

    #[test]
    fn debug_output_redacts_the_api_key() {
        let rendered = format!("{:?}", SdkConfig::new("vx_live_secret", "com.example.app"));
        assert!(!rendered.contains("vx_live_secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
