//! Catalog API response types
//!
//! Data structures for the JSON bodies of the catalog, library, account and
//! payment endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Audiobook as listed in the catalog, search results and the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudiobookSummary {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub narrator: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub duration_formatted: Option<String>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_premium: bool,
    /// Decimal price as sent by the server, e.g. `"29.99"`
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: Option<String>,
    #[serde(default)]
    pub is_in_library: bool,
    #[serde(default)]
    pub is_purchased: bool,
}

/// Full audiobook page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudiobookDetail {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub narrator: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub duration_formatted: Option<String>,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    /// Embedded chapter list; prefer [`ApiClient::chapters`](crate::ApiClient::chapters)
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub ratings_count: u32,
    #[serde(default)]
    pub is_in_library: bool,
    #[serde(default)]
    pub user_progress: Option<ListeningProgress>,
}

/// Where the user left off in an audiobook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListeningProgress {
    pub current_chapter: u32,
    pub current_position_seconds: u32,
    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub chapter_number: u32,
    /// Absolute URL of the audio file
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub duration_seconds: u32,
    #[serde(default)]
    pub duration_formatted: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub audiobooks_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub audiobooks_count: u32,
}

/// One entry of the user's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub id: u64,
    pub audiobook: AudiobookSummary,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_favorite: bool,
}

/// Answer to adding or removing a library entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryChange {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub in_library: Option<bool>,
}

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub plan_display_name: Option<String>,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
}

/// Key handed to the payment processor library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub publishable_key: String,
}

/// Server-created intent for one audiobook purchase.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub client_secret: String,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

impl std::fmt::Debug for PaymentIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentIntent")
            .field("client_secret", &"[REDACTED]")
            .field("payment_intent_id", &self.payment_intent_id)
            .finish()
    }
}

/// Server acknowledgement of a confirmed payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct AudiobookRef {
    pub audiobook_id: u64,
}

#[derive(Serialize)]
pub(crate) struct IntentRef<'a> {
    pub payment_intent_id: &'a str,
}

/// Accept `"29.99"`, `29.99` or `null`.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}
