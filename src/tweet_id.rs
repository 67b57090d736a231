/// Accept either a bare numeric status id or a status URL such as
/// `https://x.com/user/status/123?s=20` and return the id.
pub fn extract_tweet_id(input: &str) -> Option<String> {
    let input = input.trim();
    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        return Some(input.to_string());
    }

    let path = input
        .strip_prefix("https://")
        .or_else(|| input.strip_prefix("http://"))
        .unwrap_or(input);
    let path = path.strip_prefix("www.").unwrap_or(path);
    let path = path.strip_prefix("mobile.").unwrap_or(path);
    let path = path
        .strip_prefix("twitter.com/")
        .or_else(|| path.strip_prefix("x.com/"))?;

    let after_status = path.split("/status/").nth(1)?;
    let id = after_status
        .split(&['/', '?', '#'][..])
        .next()
        .unwrap_or("");
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(id.to_string())
    }
}
