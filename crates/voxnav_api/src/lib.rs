//! Transport-only request pipeline for the voxnav backend.
//!
//! This crate owns request building, signing, retry, and response-validation
//! behavior for the signed HTTP endpoints only. It holds no session state and
//! no realtime-channel coupling: callers supply the bearer token per call and
//! own the session lifecycle.
//!
//! Pipeline stages run in fixed order on every call: client-identity headers,
//! request signature, transport under the configured timeout, retry with
//! exponential backoff for the retryable status set, then success-response
//! validation (signature presence, content type, timestamp freshness).

pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod sign;
pub mod validate;

pub use client::{ApiClient, CancellationSignal, Operation, OperationOutput};
pub use config::ApiConfig;
pub use error::ApiError;
pub use payload::{
    ApiEnvelope, InitializeData, NavigationData, RegisterScreensData, ScreenPayload,
    SubmitAudioData,
};
