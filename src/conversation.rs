use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::normalize::{normalize, RecordShape};
use crate::tweet::Tweet;

/// Whether the anchor tweet belongs in the assembled sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootPolicy {
    Include,
    Exclude,
}

/// The decoded `{tweetIds, tweets}` payload of a conversation lookup.
#[derive(Debug, Default)]
pub struct ConversationMap {
    pub order: Vec<String>,
    pub records: Map<String, Value>,
}

impl ConversationMap {
    pub fn from_payload(payload: &Value) -> Self {
        let order = payload
            .get("tweetIds")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| match id {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let records = payload
            .get("tweets")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Self { order, records }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty() || self.records.is_empty()
    }
}

/// Rebuild the ordered tweet sequence for `root_id`. Upstream order is kept
/// as-is; ids without a record and records without an id are skipped.
pub fn assemble(
    conversation: &ConversationMap,
    root_id: &str,
    policy: RootPolicy,
) -> Result<Vec<Tweet>, ClientError> {
    if conversation.is_empty() {
        return Err(ClientError::EmptyConversation);
    }

    let tweets: Vec<Tweet> = conversation
        .order
        .iter()
        .filter(|id| policy == RootPolicy::Include || id.as_str() != root_id)
        .filter_map(|id| {
            let record = conversation.records.get(id);
            if record.is_none() {
                warn!(tweet_id = %id, "conversation id has no record");
            }
            record
        })
        .filter_map(|record| {
            let tweet = normalize(record, RecordShape::ConversationItem);
            if tweet.is_none() {
                warn!("dropping conversation record without id");
            }
            tweet
        })
        .collect();

    debug!(
        root_id,
        ordered = conversation.order.len(),
        assembled = tweets.len(),
        "conversation assembled"
    );
    Ok(tweets)
}
