pub mod channel_feed;

pub use channel_feed::ChannelRealtimeFeed;
