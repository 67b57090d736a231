//! Maps loosely-shaped tweet records into [`Tweet`].
//!
//! The backend returns the same logical tweet through several envelopes
//! (single REST read, search item, conversation-map item) with partially
//! overlapping field names. Each logical field is resolved by an ordered
//! list of extractors; the first one that yields a value wins.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::devalue::normalize_timestamp;
use crate::tweet::{Tweet, TweetAuthor};

/// The envelope a record was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// `GET /api/tweets/:id`
    Single,
    /// An item of a search result's `tweets.items`.
    SearchItem,
    /// A value of a conversation's id → record map.
    ConversationItem,
}

/// Run `extractors` in order and return the first value any of them yields.
pub fn first_defined<'a, T>(
    record: &'a Value,
    extractors: &[&dyn Fn(&'a Value) -> Option<T>],
) -> Option<T> {
    extractors.iter().find_map(|extract| extract(record))
}

/// Walk `path` through nested objects. `null` counts as absent.
pub fn at<'a>(record: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = record;
    for key in path {
        current = current.get(key)?;
    }
    (!current.is_null()).then_some(current)
}

fn text_at(record: &Value, path: &[&str]) -> Option<String> {
    match at(record, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn object_at<'a>(record: &'a Value, path: &[&str]) -> Option<&'a Value> {
    at(record, path).filter(|v| v.is_object())
}

pub fn record_id(record: &Value) -> Option<String> {
    text_at(record, &["id"]).filter(|id| !id.is_empty())
}

pub fn author_username(record: &Value) -> Option<String> {
    text_at(record, &["authorUsername"])
}

pub fn bare_username(record: &Value) -> Option<String> {
    text_at(record, &["username"])
}

pub fn nested_author_username(record: &Value) -> Option<String> {
    text_at(record, &["author", "username"])
}

pub fn full_author_username(record: &Value) -> Option<String> {
    text_at(record, &["full", "author", "username"])
}

pub fn author_name(record: &Value) -> Option<String> {
    text_at(record, &["authorName"])
}

pub fn nested_author_name(record: &Value) -> Option<String> {
    text_at(record, &["author", "name"])
}

pub fn full_author_name(record: &Value) -> Option<String> {
    text_at(record, &["full", "author", "name"])
}

pub fn body_text(record: &Value) -> Option<String> {
    text_at(record, &["text"])
}

pub fn full_text(record: &Value) -> Option<String> {
    text_at(record, &["full", "text"])
}

/// Render a timestamp that may arrive as a string, epoch milliseconds or a
/// `["Date", iso]` tagged pair.
pub fn timestamp_repr(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Value::Array(pair) => match pair.as_slice() {
            [Value::String(tag), Value::String(raw)] if tag == "Date" => {
                Some(normalize_timestamp(raw))
            }
            _ => None,
        },
        _ => None,
    }
}

pub fn created_at(record: &Value) -> Option<String> {
    at(record, &["createdAt"]).and_then(timestamp_repr)
}

pub fn legacy_timestamp(record: &Value) -> Option<String> {
    at(record, &["timestamp"]).and_then(timestamp_repr)
}

pub fn full_created_at(record: &Value) -> Option<String> {
    at(record, &["full", "createdAt"]).and_then(timestamp_repr)
}

pub fn metrics_object(record: &Value) -> Option<&Value> {
    object_at(record, &["metrics"])
}

pub fn full_metrics_object(record: &Value) -> Option<&Value> {
    object_at(record, &["full", "metrics"])
}

pub fn full_object(record: &Value) -> Option<&Value> {
    object_at(record, &["full"])
}

fn record_itself(record: &Value) -> Option<&Value> {
    Some(record)
}

pub fn conversation_id(record: &Value) -> Option<String> {
    text_at(record, &["conversationId"])
}

pub fn full_conversation_id(record: &Value) -> Option<String> {
    text_at(record, &["full", "conversationId"])
}

pub fn in_reply_to(record: &Value) -> Option<String> {
    text_at(record, &["inReplyToStatusId"])
}

pub fn full_in_reply_to(record: &Value) -> Option<String> {
    text_at(record, &["full", "inReplyToStatusId"])
}

/// Id of the `replied_to` entry in a REST record's `referencedTweets`.
pub fn replied_to_reference(record: &Value) -> Option<String> {
    at(record, &["referencedTweets"])?
        .as_array()?
        .iter()
        .find(|reference| reference.get("type").and_then(Value::as_str) == Some("replied_to"))
        .and_then(|reference| text_at(reference, &["id"]))
}

/// Counters are non-negative; anything else upstream becomes zero.
pub fn coerce_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or_else(|| match n.as_f64() {
            Some(f) if f.is_finite() && f > 0.0 => f.floor() as u64,
            _ => 0,
        }),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn metrics_source(record: &Value, shape: RecordShape) -> Option<&Value> {
    match shape {
        RecordShape::SearchItem => first_defined(
            record,
            &[
                &metrics_object,
                &full_metrics_object,
                &full_object,
                &record_itself,
            ],
        ),
        RecordShape::Single | RecordShape::ConversationItem => {
            first_defined(record, &[&metrics_object, &full_metrics_object, &full_object])
        }
    }
}

/// Resolve one counter. Present values are coerced; an absent value is zero
/// when a metrics source exists and unknown otherwise.
///
/// Only conversation items carry authoritative top-level counters; the other
/// shapes read exclusively from the resolved source.
fn counter(
    record: &Value,
    shape: RecordShape,
    source: Option<&Value>,
    field: &str,
    alias: &str,
) -> Option<u64> {
    let from_source =
        || source.and_then(|metrics| at(metrics, &[field]).or_else(|| at(metrics, &[alias])));
    let raw = match shape {
        RecordShape::ConversationItem => at(record, &[field]).or_else(from_source),
        RecordShape::Single | RecordShape::SearchItem => from_source(),
    };
    match (raw, source) {
        (Some(value), _) => Some(coerce_count(value)),
        (None, Some(_)) => Some(0),
        (None, None) => None,
    }
}

/// Build a [`Tweet`] from one raw record, or `None` when it has no usable id.
pub fn normalize(record: &Value, shape: RecordShape) -> Option<Tweet> {
    let id = record_id(record)?;

    let username = first_defined(
        record,
        &[
            &author_username,
            &bare_username,
            &nested_author_username,
            &full_author_username,
        ],
    )
    .unwrap_or_default();
    let name = first_defined(record, &[&author_name, &nested_author_name, &full_author_name])
        .unwrap_or_else(|| username.clone());

    let metrics = metrics_source(record, shape);

    let in_reply_to_status_id = match shape {
        RecordShape::Single => replied_to_reference(record),
        RecordShape::SearchItem | RecordShape::ConversationItem => {
            first_defined(record, &[&in_reply_to, &full_in_reply_to])
        }
    };

    Some(Tweet {
        id,
        text: first_defined(record, &[&body_text, &full_text]).unwrap_or_default(),
        author: TweetAuthor { username, name },
        created_at: first_defined(record, &[&created_at, &legacy_timestamp, &full_created_at]),
        reply_count: counter(record, shape, metrics, "replyCount", "replies"),
        retweet_count: counter(record, shape, metrics, "retweetCount", "retweets"),
        like_count: counter(record, shape, metrics, "likeCount", "likes"),
        conversation_id: first_defined(record, &[&conversation_id, &full_conversation_id]),
        in_reply_to_status_id,
    })
}
