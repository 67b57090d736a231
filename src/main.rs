use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde::Serialize;

use sweetbird::config::{Config, Overrides, API_KEY_ENV};
use sweetbird::logging::init_tracing;
use sweetbird::output::{format_tweet, format_tweets};
use sweetbird::tweet_id::extract_tweet_id;
use sweetbird::{ApiResult, SweetisticsClient};

#[derive(Parser)]
#[command(name = "bird")]
#[command(about = "Post, read and search tweets through the Sweetistics API", long_about = None)]
#[command(version)]
struct Cli {
    /// Sweetistics API key (overrides SWEETISTICS_API_KEY and config file)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Sweetistics base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log requests and decoding steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post a new tweet
    Tweet { text: String },
    /// Reply to a tweet
    Reply {
        /// Tweet id or URL
        tweet: String,
        text: String,
    },
    /// Read one or more tweets
    Read {
        /// Tweet ids or URLs
        #[arg(required = true)]
        tweets: Vec<String>,
    },
    /// List replies to a tweet
    Replies {
        /// Tweet id or URL
        tweet: String,
    },
    /// Show the full conversation around a tweet
    Thread {
        /// Tweet id or URL
        tweet: String,
    },
    /// Search tweets
    Search {
        query: String,
        /// Number of tweets to fetch (1-50)
        #[arg(short = 'n', long, default_value_t = 10, allow_negative_numbers = true)]
        count: i64,
    },
    /// Check credential availability
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?
        .with_env(|key| std::env::var(key).ok())
        .with_overrides(Overrides {
            base_url: cli.base_url.clone(),
            api_key: cli.api_key.clone(),
            timeout_ms: cli.timeout,
        });

    if let Commands::Check = cli.command {
        return check(&config);
    }

    let client = SweetisticsClient::new(config.client_options()).map_err(|e| {
        anyhow!("{e}. Set {API_KEY_ENV}, pass --api-key, or add api_key to {}", Config::config_path().display())
    })?;
    let json = cli.json;

    match cli.command {
        Commands::Tweet { text } => {
            let posted = unwrap_result("Failed to post tweet", client.tweet(&text, None).await)?;
            print_posted(json, "Tweet posted", posted.tweet_id.as_deref(), &posted)
        }
        Commands::Reply { tweet, text } => {
            let tweet_id = parse_tweet_id(&tweet)?;
            let posted = unwrap_result(
                "Failed to post reply",
                client.tweet(&text, Some(&tweet_id)).await,
            )?;
            print_posted(json, "Reply posted", posted.tweet_id.as_deref(), &posted)
        }
        Commands::Read { tweets } => {
            let ids = tweets
                .iter()
                .map(|t| parse_tweet_id(t))
                .collect::<Result<Vec<_>>>()?;
            let results = join_all(ids.iter().map(|id| client.read(id))).await;

            let mut read = Vec::with_capacity(results.len());
            let mut failures = 0;
            for (id, result) in ids.iter().zip(results) {
                match result.into_result() {
                    Ok(payload) => read.push(payload.tweet),
                    Err(e) => {
                        failures += 1;
                        eprintln!("Failed to read tweet {id}: {e}");
                    }
                }
            }
            if json {
                print_json(&read)?;
            } else if !read.is_empty() {
                println!("{}", format_tweets(&read, ""));
            }
            if failures > 0 {
                return Err(anyhow!("{failures} of {} tweets could not be read", ids.len()));
            }
            Ok(())
        }
        Commands::Replies { tweet } => {
            let tweet_id = parse_tweet_id(&tweet)?;
            let timeline = unwrap_result("Failed to fetch replies", client.replies(&tweet_id).await)?;
            print_tweets(json, &timeline.tweets, "No replies found.")
        }
        Commands::Thread { tweet } => {
            let tweet_id = parse_tweet_id(&tweet)?;
            let timeline = unwrap_result("Failed to fetch thread", client.thread(&tweet_id).await)?;
            print_tweets(json, &timeline.tweets, "No thread tweets found.")
        }
        Commands::Search { query, count } => {
            let timeline = unwrap_result("Search failed", client.search(&query, count).await)?;
            print_tweets(json, &timeline.tweets, "No tweets found.")
        }
        Commands::Check => Ok(()),
    }
}

fn check(config: &Config) -> Result<()> {
    println!("Credential check");
    println!("{}", "─".repeat(40));
    println!("base url: {}", config.base_url());
    println!("config: {}", Config::config_path().display());

    if !config.has_api_key() {
        return Err(anyhow!(
            "api key: not found. Set {API_KEY_ENV}, pass --api-key, or add api_key to the config file"
        ));
    }
    let shown: String = config
        .api_key
        .as_deref()
        .unwrap_or_default()
        .trim()
        .chars()
        .take(6)
        .collect();
    println!("api key: {shown}...");
    println!("\nReady to tweet!");
    Ok(())
}

fn parse_tweet_id(input: &str) -> Result<String> {
    extract_tweet_id(input)
        .ok_or_else(|| anyhow!("Invalid tweet id or URL: {input}"))
}

fn unwrap_result<T>(context: &str, result: ApiResult<T>) -> Result<T> {
    result
        .into_result()
        .map_err(|e| anyhow!(e))
        .with_context(|| context.to_string())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_posted<T: Serialize>(json: bool, label: &str, tweet_id: Option<&str>, value: &T) -> Result<()> {
    if json {
        return print_json(value);
    }
    match tweet_id {
        Some(id) => println!("{label}: https://x.com/i/status/{id}"),
        None => println!("{label}"),
    }
    Ok(())
}

fn print_tweets(json: bool, tweets: &[sweetbird::Tweet], empty_message: &str) -> Result<()> {
    if json {
        return print_json(tweets);
    }
    match tweets {
        [single] => println!("{}", format_tweet(single)),
        _ => println!("{}", format_tweets(tweets, empty_message)),
    }
    Ok(())
}
