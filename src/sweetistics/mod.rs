pub mod envelope;
pub mod transport;

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::conversation::{assemble, ConversationMap, RootPolicy};
use crate::error::ClientError;
use crate::normalize::{normalize, RecordShape};
use crate::result::ApiResult;
use crate::tweet::{Posted, ReadPayload, Timeline, Tweet};
use envelope::{check_status, is_truthy, parse_body, unwrap_envelope, Procedure};
use transport::{ApiRequest, HttpTransport, Transport};

pub const DEFAULT_BASE_URL: &str = "https://sweetistics.com";
pub const MIN_SEARCH_RESULTS: i64 = 1;
pub const MAX_SEARCH_RESULTS: i64 = 50;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub api_key: String,
    pub user_agent: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            user_agent: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Trim, default when blank, and drop a trailing slash.
pub fn normalize_base_url(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}

/// Client for the Sweetistics API. Each operation issues exactly one request
/// and always answers with an [`ApiResult`].
pub struct SweetisticsClient {
    api_key: String,
    user_agent: Option<String>,
    transport: Box<dyn Transport>,
}

impl SweetisticsClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(normalize_base_url(&options.base_url), options.timeout);
        Self::with_transport(&options.api_key, options.user_agent, Box::new(transport))
    }

    pub fn with_transport(
        api_key: &str,
        user_agent: Option<String>,
        transport: Box<dyn Transport>,
    ) -> Result<Self, ClientError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ClientError::MissingApiKey);
        }
        Ok(Self {
            api_key: api_key.to_string(),
            user_agent,
            transport,
        })
    }

    fn authorize(&self, request: ApiRequest) -> ApiRequest {
        let request = request.header("authorization", format!("Bearer {}", self.api_key));
        match &self.user_agent {
            Some(agent) => request.header("user-agent", agent.as_str()),
            None => request,
        }
    }

    pub async fn tweet(&self, text: &str, reply_to_tweet_id: Option<&str>) -> ApiResult<Posted> {
        ApiResult::build("tweet", self.post_tweet(text, reply_to_tweet_id).await)
    }

    pub async fn read(&self, tweet_id: &str) -> ApiResult<ReadPayload> {
        ApiResult::build("read", self.read_tweet(tweet_id).await)
    }

    /// Replies to `tweet_id`, without the tweet itself.
    pub async fn replies(&self, tweet_id: &str) -> ApiResult<Timeline> {
        ApiResult::build(
            "replies",
            self.fetch_conversation(tweet_id, RootPolicy::Exclude).await,
        )
    }

    /// The whole conversation around `tweet_id`, root included.
    pub async fn thread(&self, tweet_id: &str) -> ApiResult<Timeline> {
        ApiResult::build(
            "thread",
            self.fetch_conversation(tweet_id, RootPolicy::Include).await,
        )
    }

    /// `count` is clamped to `1..=50` before it is sent.
    pub async fn search(&self, query: &str, count: i64) -> ApiResult<Timeline> {
        ApiResult::build("search", self.search_tweets(query, count).await)
    }

    async fn post_tweet(
        &self,
        text: &str,
        reply_to_tweet_id: Option<&str>,
    ) -> Result<Posted, ClientError> {
        let mut payload = json!({ "text": text });
        if let Some(reply_to) = reply_to_tweet_id.filter(|id| !id.is_empty()) {
            payload["replyToTweetId"] = json!(reply_to);
        }

        let request = self.authorize(ApiRequest::post("/api/actions/tweet", payload));
        let response = self.transport.send(request).await?;
        let status = response.status;
        check_status(status)?;
        let body = parse_body(response.body)?;

        if body.get("success").and_then(Value::as_bool) != Some(true) {
            let reason = body
                .get("error")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| ClientError::Http(status).to_string());
            return Err(ClientError::Rejected(reason));
        }

        Ok(Posted {
            tweet_id: body
                .get("tweetId")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    async fn read_tweet(&self, tweet_id: &str) -> Result<ReadPayload, ClientError> {
        let path = format!("/api/tweets/{}", urlencoding::encode(tweet_id));
        let response = self.transport.send(self.authorize(ApiRequest::get(path))).await?;
        check_status(response.status)?;
        let data = parse_body(response.body)?;

        let has = |field: &str| data.get(field).is_some_and(is_truthy);
        if !has("id") || !has("author") {
            return Err(ClientError::MalformedPayload);
        }

        let tweet = normalize(&data, RecordShape::Single).ok_or(ClientError::MalformedPayload)?;
        Ok(ReadPayload { tweet })
    }

    async fn fetch_conversation(
        &self,
        tweet_id: &str,
        policy: RootPolicy,
    ) -> Result<Timeline, ClientError> {
        let input = json!({ "tweetId": tweet_id }).to_string();
        let request =
            ApiRequest::get("/api/trpc/tweets.getConversation").query("input", input);
        let response = self.transport.send(self.authorize(request)).await?;
        let payload = unwrap_envelope(response, Procedure::Conversation)?;

        let conversation = ConversationMap::from_payload(&payload);
        let tweets = assemble(&conversation, tweet_id, policy)?;
        Ok(Timeline { tweets })
    }

    async fn search_tweets(&self, query: &str, count: i64) -> Result<Timeline, ClientError> {
        let limit = count.clamp(MIN_SEARCH_RESULTS, MAX_SEARCH_RESULTS);
        let payload = json!({
            "query": query,
            "capabilities": [{
                "resource": "tweets",
                "source": "postgres",
                "limit": limit,
                "offset": 0,
                "detail": "summary",
                "includeRetweets": true,
            }],
        });
        let request = ApiRequest::post("/api/trpc/search.execute", json!({ "0": { "json": payload } }))
            .query("batch", "1");
        let response = self.transport.send(self.authorize(request)).await?;
        let parsed = unwrap_envelope(response, Procedure::Search)?;

        let items = parsed
            .pointer("/tweets/items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        debug!(items = items.len(), limit, "search results decoded");

        let tweets: Vec<Tweet> = items
            .iter()
            .filter_map(|item| {
                let tweet = normalize(item, RecordShape::SearchItem);
                if tweet.is_none() {
                    warn!("dropping search item without id");
                }
                tweet
            })
            .collect();
        Ok(Timeline { tweets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url(""), DEFAULT_BASE_URL);
        assert_eq!(normalize_base_url("   "), DEFAULT_BASE_URL);
        assert_eq!(
            normalize_base_url(" https://example.test/ "),
            "https://example.test"
        );
        assert_eq!(
            normalize_base_url("https://example.test"),
            "https://example.test"
        );
    }

    #[test]
    fn test_blank_api_key_is_refused() {
        let options = ClientOptions {
            api_key: "  ".to_string(),
            ..ClientOptions::default()
        };
        assert!(matches!(
            SweetisticsClient::new(options),
            Err(ClientError::MissingApiKey)
        ));
    }
}
