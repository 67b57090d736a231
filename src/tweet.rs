use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetAuthor {
    pub username: String,
    pub name: String,
}

/// A tweet in the one shape every operation returns, whatever envelope it
/// arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub author: TweetAuthor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retweet_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to_status_id: Option<String>,
}

/// Outcome payload of `tweet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Posted {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_id: Option<String>,
}

/// Outcome payload of `read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadPayload {
    pub tweet: Tweet,
}

/// Outcome payload of `replies`, `thread` and `search`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub tweets: Vec<Tweet>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tweet {
        Tweet {
            id: "42".to_string(),
            text: "hello".to_string(),
            author: TweetAuthor {
                username: "bird".to_string(),
                name: "Bird".to_string(),
            },
            created_at: None,
            reply_count: Some(3),
            retweet_count: None,
            like_count: None,
            conversation_id: Some("40".to_string()),
            in_reply_to_status_id: Some("41".to_string()),
        }
    }

    #[test]
    fn test_serializes_camel_case_and_skips_unknown_counters() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["replyCount"], 3);
        assert_eq!(json["inReplyToStatusId"], "41");
        assert!(json.get("likeCount").is_none());
        assert!(json.get("createdAt").is_none());
    }
}
