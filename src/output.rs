use crate::tweet::Tweet;

const WRAP_WIDTH: usize = 80;
const SEPARATOR: &str = "────────────────────────────────────────";

/// Plain-text rendering of one tweet.
pub fn format_tweet(tweet: &Tweet) -> String {
    let mut lines = Vec::new();

    let author = &tweet.author;
    if author.name.is_empty() || author.name == author.username {
        lines.push(format!("@{}", author.username));
    } else {
        lines.push(format!("@{} ({})", author.username, author.name));
    }

    for line in textwrap::wrap(&tweet.text, WRAP_WIDTH) {
        lines.push(line.into_owned());
    }

    if let Some(created_at) = &tweet.created_at {
        lines.push(format!("date: {created_at}"));
    }
    if let Some(reply_to) = &tweet.in_reply_to_status_id {
        lines.push(format!("in reply to: {reply_to}"));
    }

    let counters: Vec<String> = [
        ("replies", tweet.reply_count),
        ("retweets", tweet.retweet_count),
        ("likes", tweet.like_count),
    ]
    .iter()
    .filter_map(|(label, count)| count.map(|n| format!("{n} {label}")))
    .collect();
    if !counters.is_empty() {
        lines.push(counters.join(" · "));
    }

    lines.push(format!("id: {}", tweet.id));
    lines.join("\n")
}

pub fn format_tweets(tweets: &[Tweet], empty_message: &str) -> String {
    if tweets.is_empty() {
        return empty_message.to_string();
    }
    tweets
        .iter()
        .map(format_tweet)
        .collect::<Vec<_>>()
        .join(&format!("\n{SEPARATOR}\n"))
}
