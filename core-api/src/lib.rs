//! # Catalog API
//!
//! Typed client for the audiobook catalog service.
//!
//! - [`ApiClient`] - catalog, author, library, account and payment endpoints
//! - [`CheckoutFlow`] - one-audiobook purchase through a [`PaymentProcessor`](bridge_traits::payment::PaymentProcessor)
//! - [`playlist_for`] - chapters of an audiobook as a playback queue

pub mod checkout;
pub mod client;
pub mod error;
pub mod models;
pub mod playlist;

pub use checkout::CheckoutFlow;
pub use client::ApiClient;
pub use error::{ApiError, Result};
pub use models::{
    AudiobookDetail, AudiobookSummary, Author, Category, Chapter, LibraryChange, LibraryItem,
    ListeningProgress, PaymentConfig, PaymentConfirmation, PaymentIntent, UserAccount,
};
pub use playlist::playlist_for;
