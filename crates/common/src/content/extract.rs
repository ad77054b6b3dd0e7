//! Per-kind text extraction and visibility

use super::richtext::{collapse_whitespace, plain_text};
use super::{ContentRecord, EmbeddableKind, KindDetails, PublicationState};
use chrono::{DateTime, Utc};

/// Long-form articles
pub struct PostKind;

/// Short notes and quotes
pub struct NoteKind;

/// Logged reading / watching / listening activity
pub struct ActivityKind;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Join the non-empty parts with newlines
fn join_parts(parts: Vec<String>) -> String {
    parts
        .into_iter()
        .map(|p| collapse_whitespace(&p))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl EmbeddableKind for PostKind {
    fn collection_name(&self) -> &'static str {
        "posts"
    }

    fn extract_text(&self, record: &ContentRecord) -> String {
        let mut parts = vec![record.title.clone()];
        if let Some(description) = non_empty(record.description.as_deref()) {
            parts.push(description.to_string());
        }
        if let KindDetails::Post { tags } = &record.details {
            if !tags.is_empty() {
                parts.push(format!("Tags: {}", tags.join(", ")));
            }
        }
        parts.push(plain_text(&record.body));
        join_parts(parts)
    }

    fn is_visible(&self, record: &ContentRecord, now: DateTime<Utc>) -> bool {
        record.status == PublicationState::Published
            && record.published_at.map_or(true, |at| at <= now)
    }

    fn visibility_sql(&self) -> &'static str {
        "status = 'published' AND (published_at IS NULL OR published_at <= NOW())"
    }
}

impl EmbeddableKind for NoteKind {
    fn collection_name(&self) -> &'static str {
        "notes"
    }

    fn extract_text(&self, record: &ContentRecord) -> String {
        let mut parts = vec![record.title.clone(), plain_text(&record.body)];

        if let KindDetails::Note {
            quote_author,
            quote_source,
        } = &record.details
        {
            let attribution = match (
                non_empty(quote_author.as_deref()),
                non_empty(quote_source.as_deref()),
            ) {
                (Some(author), Some(source)) => Some(format!("Quote from {author}, {source}")),
                (Some(author), None) => Some(format!("Quote from {author}")),
                (None, Some(source)) => Some(format!("Quote from {source}")),
                (None, None) => None,
            };
            parts.extend(attribution);
        }

        join_parts(parts)
    }

    fn is_visible(&self, record: &ContentRecord, _now: DateTime<Utc>) -> bool {
        record.status == PublicationState::Published
    }

    fn visibility_sql(&self) -> &'static str {
        "status = 'published'"
    }
}

impl EmbeddableKind for ActivityKind {
    fn collection_name(&self) -> &'static str {
        "activities"
    }

    fn extract_text(&self, record: &ContentRecord) -> String {
        let mut parts = Vec::new();

        if let KindDetails::Activity {
            activity_type,
            creator,
            participants,
        } = &record.details
        {
            let title = record.title.trim();
            if !title.is_empty() {
                let mut headline = format!("{} {}", activity_type.verb(), title);
                if let Some(creator) = non_empty(creator.as_deref()) {
                    headline.push_str(" by ");
                    headline.push_str(creator);
                }
                parts.push(headline);
            }
            if !participants.is_empty() {
                parts.push(format!("With {}", participants.join(", ")));
            }
        } else {
            parts.push(record.title.clone());
        }

        if let Some(description) = non_empty(record.description.as_deref()) {
            parts.push(description.to_string());
        }
        parts.push(plain_text(&record.body));
        join_parts(parts)
    }

    fn is_visible(&self, record: &ContentRecord, _now: DateTime<Utc>) -> bool {
        record.status == PublicationState::Published
    }

    fn visibility_sql(&self) -> &'static str {
        "status = 'published'"
    }
}
