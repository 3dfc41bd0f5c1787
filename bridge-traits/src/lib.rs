//! # Host Bridge Traits
//!
//! Capability traits that the host shell must provide to the audiobook core.
//!
//! ## Overview
//!
//! This crate defines the contract between the core crates and the
//! platform-specific world around them. The core never touches browser
//! storage, the network, the media element or the payment processor
//! directly; it is handed an implementation of the matching trait instead.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - JSON-over-HTTP requests to the catalog API
//!
//! ### Storage
//! - [`SecureStore`](storage::SecureStore) - Client-side credential persistence
//!
//! ### Media & Payments
//! - [`MediaElement`](media::MediaElement) - Load, play, pause and seek a media locator
//! - [`PaymentProcessor`](payment::PaymentProcessor) - Confirm a card charge for a client secret
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let http_client = config.http_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client implementation provided. \
//!                  Desktop: enable the desktop-shims feature.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep the message actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared across
//! async tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod media;
pub mod payment;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use media::{MediaElement, MediaState};
pub use payment::{PaymentProcessor, ProcessorOutcome, ProcessorStatus};
pub use storage::SecureStore;
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
