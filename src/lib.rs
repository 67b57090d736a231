pub mod config;
pub mod conversation;
pub mod devalue;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod result;
pub mod sweetistics;
pub mod tweet;
pub mod tweet_id;

pub use error::ClientError;
pub use result::ApiResult;
pub use sweetistics::{ClientOptions, SweetisticsClient};
pub use tweet::{Posted, ReadPayload, Timeline, Tweet, TweetAuthor};
