//! Content model shared by the embedding pipeline and retrieval
//!
//! Three collections feed the pipeline: long-form posts, short notes and
//! logged activities. They share one record shape; kind-specific fields
//! live in [`KindDetails`] and kind-specific behaviour behind
//! [`EmbeddableKind`].

mod extract;
pub mod richtext;

pub use extract::{ActivityKind, NoteKind, PostKind};

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of hex characters kept from the SHA-256 digest of extracted text
pub const TEXT_HASH_LEN: usize = 16;

/// Content collection a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Post,
    Note,
    Activity,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Post, ContentKind::Note, ContentKind::Activity];

    /// Parse a kind from a path segment or request field.
    ///
    /// Accepts collection names (`posts`) and singular tags (`post`).
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "post" | "posts" => Ok(ContentKind::Post),
            "note" | "notes" => Ok(ContentKind::Note),
            "activity" | "activities" => Ok(ContentKind::Activity),
            other => Err(AppError::InvalidKind {
                kind: other.to_string(),
            }),
        }
    }

    /// Capability object used to dispatch kind-specific behaviour
    pub fn capability(&self) -> &'static dyn EmbeddableKind {
        match self {
            ContentKind::Post => &PostKind,
            ContentKind::Note => &NoteKind,
            ContentKind::Activity => &ActivityKind,
        }
    }

    /// Table / collection name
    pub fn collection_name(&self) -> &'static str {
        self.capability().collection_name()
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_name())
    }
}

/// Kind-specific behaviour of the embedding pipeline
pub trait EmbeddableKind: Send + Sync {
    /// Table / collection holding records of this kind
    fn collection_name(&self) -> &'static str;

    /// Flatten a record into the plain text that gets embedded
    fn extract_text(&self, record: &ContentRecord) -> String;

    /// Whether the record may appear in similarity and search results
    fn is_visible(&self, record: &ContentRecord, now: DateTime<Utc>) -> bool;

    /// SQL predicate equivalent to [`EmbeddableKind::is_visible`]
    fn visibility_sql(&self) -> &'static str;
}

/// Publication state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationState {
    Published,
    Draft,
}

impl PublicationState {
    pub fn from_db(value: &str) -> Self {
        match value {
            "published" => PublicationState::Published,
            _ => PublicationState::Draft,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationState::Published => "published",
            PublicationState::Draft => "draft",
        }
    }
}

/// What a logged activity records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Book,
    Article,
    Movie,
    Show,
    Video,
    Album,
    Podcast,
    Game,
    Other,
}

impl ActivityType {
    pub fn from_db(value: &str) -> Self {
        match value {
            "book" => ActivityType::Book,
            "article" => ActivityType::Article,
            "movie" => ActivityType::Movie,
            "show" => ActivityType::Show,
            "video" => ActivityType::Video,
            "album" => ActivityType::Album,
            "podcast" => ActivityType::Podcast,
            "game" => ActivityType::Game,
            _ => ActivityType::Other,
        }
    }

    /// Past-tense verb used when synthesizing an activity title
    pub fn verb(&self) -> &'static str {
        match self {
            ActivityType::Book | ActivityType::Article => "Read",
            ActivityType::Movie | ActivityType::Show | ActivityType::Video => "Watched",
            ActivityType::Album | ActivityType::Podcast => "Listened to",
            ActivityType::Game => "Played",
            ActivityType::Other => "Logged",
        }
    }
}

/// Fields only some kinds carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KindDetails {
    Post {
        tags: Vec<String>,
    },
    Note {
        quote_author: Option<String>,
        quote_source: Option<String>,
    },
    Activity {
        activity_type: ActivityType,
        creator: Option<String>,
        participants: Vec<String>,
    },
}

/// Vector and the metadata describing how it was produced.
///
/// Either all of these exist on a record or none do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmbedding {
    pub vector: Vec<f32>,
    pub model: String,
    pub dimensions: usize,
    pub text_hash: String,
    pub generated_at: DateTime<Utc>,
}

/// A content record as seen by the retrieval core
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRecord {
    pub id: i64,
    pub kind: ContentKind,
    pub status: PublicationState,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    /// Structured rich-text body
    pub body: serde_json::Value,
    pub details: KindDetails,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub embedding: Option<StoredEmbedding>,
    pub recommended_ids: Vec<i64>,
}

impl ContentRecord {
    /// Text fed to the embedding model
    pub fn source_text(&self) -> String {
        self.kind.capability().extract_text(self)
    }

    /// Whether the record is publicly visible right now
    pub fn is_visible(&self) -> bool {
        self.kind.capability().is_visible(self, Utc::now())
    }
}

/// Fingerprint of extracted text used for change detection.
///
/// Truncated SHA-256; collisions only cause a missed re-embed.
pub fn text_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(TEXT_HASH_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(ContentKind::parse("posts").unwrap(), ContentKind::Post);
        assert_eq!(ContentKind::parse("Note").unwrap(), ContentKind::Note);
        assert_eq!(ContentKind::parse("activities").unwrap(), ContentKind::Activity);
        assert!(matches!(
            ContentKind::parse("pages"),
            Err(AppError::InvalidKind { .. })
        ));
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(ContentKind::Post.to_string(), "posts");
        assert_eq!(ContentKind::Note.collection_name(), "notes");
        assert_eq!(ContentKind::Activity.collection_name(), "activities");
    }

    #[test]
    fn test_text_hash_is_short_and_stable() {
        let a = text_hash("Hello world");
        assert_eq!(a.len(), TEXT_HASH_LEN);
        assert_eq!(a, text_hash("Hello world"));
        assert_ne!(a, text_hash("Hello world!"));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_activity_verbs() {
        assert_eq!(ActivityType::from_db("book").verb(), "Read");
        assert_eq!(ActivityType::from_db("movie").verb(), "Watched");
        assert_eq!(ActivityType::from_db("podcast").verb(), "Listened to");
        assert_eq!(ActivityType::from_db("mystery").verb(), "Logged");
    }
}
