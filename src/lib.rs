//! Secure voice-navigation client SDK.
//!
//! The [`VoxnavSdk`] handle ties the pieces together: a signed request
//! pipeline for the HTTP endpoints, a persisted single-session store, a
//! rate limiter and app-identity check in front of privileged operations,
//! and a self-healing realtime channel keyed by the session.
//!
//! Every SDK instance is fully isolated: all state lives on the handle
//! returned by [`VoxnavSdk::initialize`], so tests and multi-tenant hosts can
//! run several instances side by side.
//!
//! ```no_run
//! use voxnav_sdk::{SdkConfig, VoxnavSdk};
//!
//! # async fn demo() -> Result<(), voxnav_sdk::SdkError> {
//! let config = SdkConfig::new("vx_live_abc123", "com.example.app");
//! let sdk = VoxnavSdk::initialize(config).await?;
//! let outcome = sdk.submit_audio(vec![0u8; 16], "clip.wav", None).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod screens;
mod sdk;

pub use config::SdkConfig;
pub use error::SdkError;
pub use screens::ScreenRegistration;
pub use sdk::{SubmitAudioOutcome, VoxnavSdk};

pub use realtime_socket::{ConnectionState, ConversationResult, RealtimeEvent, ScreenMatch};
pub use session_store::Session;
pub use voxnav_api::{CancellationSignal, NavigationData, SubmitAudioData};
