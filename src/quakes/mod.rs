//! Earthquake and plate boundary feeds.
//!
//! The feeds are fetched in two dependent stages: plate boundaries are only
//! requested once the earthquake markers are on the map.

mod client;
mod error;
mod pipeline;
mod popup;
mod quake_plugin;
mod style;
pub(crate) mod worker;

use std::time::Duration;

pub use error::*;
pub use pipeline::*;
pub use popup::*;
pub use quake_plugin::*;
pub use style::*;
use ureq::Agent;
pub use worker::*;

use crate::config::MapConfig;

#[derive(Clone)]
pub struct FeedClient {
    pub agent: Agent,
    pub user_agent: String,
}

impl Default for FeedClient {
    fn default() -> Self {
        let config = MapConfig::default();
        FeedClient::new(config.request_timeout_secs, &config.user_agent)
    }
}

impl FeedClient {
    pub fn new(timeout_secs: u64, user_agent: &str) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .build();
        let agent: Agent = config.into();
        FeedClient {
            agent,
            user_agent: user_agent.to_string(),
        }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        FeedClient::new(config.request_timeout_secs, &config.user_agent)
    }
}
