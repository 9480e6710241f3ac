use std::time::Duration;

/// Default base URL for voxnav backend endpoints.
pub const DEFAULT_BASE_URL: &str = "https://api.voxnav.io/v1";

/// Transport configuration for signed voxnav requests.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Shared secret used for authentication and request signing.
    pub api_key: String,
    /// Base URL for backend endpoints.
    pub base_url: String,
    /// Host application package identifier sent at initialize time.
    pub app_package: String,
    /// Value of the `X-SDK-Version` header.
    pub sdk_version: String,
    /// Value of the `X-Platform` header.
    pub platform: String,
    /// Per-attempt transport timeout.
    pub timeout: Duration,
    /// Total transport attempts per logical request.
    pub max_retries: u32,
    /// Base delay before the first retry; doubles per attempt.
    pub initial_retry_delay: Duration,
    /// Optional `sha256/`-prefixed TLS certificate pins.
    pub pinned_certificates: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            app_package: String::new(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            initial_retry_delay: Duration::from_secs(1),
            pinned_certificates: Vec::new(),
        }
    }
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>, app_package: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            app_package: app_package.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
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

    /// Base URL without a trailing slash, ready for path concatenation.
    #[must_use]
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
