use geojson::GeoJson;

use super::{FeedClient, FeedError};

// The weekly USGS feed is a few MB; ureq's default body limit is 10 MB.
const MAX_FEED_BYTES: u64 = 64 * 1024 * 1024;

impl FeedClient {
    pub fn fetch_text(&self, url: &str) -> Result<String, FeedError> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .map_err(FeedError::from_request)?;
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_FEED_BYTES)
            .read_to_string()?;
        Ok(body)
    }

    pub fn fetch_geojson(&self, url: &str) -> Result<GeoJson, FeedError> {
        let body = self.fetch_text(url)?;
        Ok(body.parse::<GeoJson>()?)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{EARTHQUAKE_FEED_URL, PLATE_FEED_URL};
    use crate::geojson::{parse_plates, parse_quakes};

    use super::*;

    #[test]
    #[ignore]
    fn live_feeds_parse() {
        let client = FeedClient::default();
        let quakes = parse_quakes(client.fetch_geojson(EARTHQUAKE_FEED_URL).unwrap()).unwrap();
        assert!(!quakes.items.is_empty());
        let plates = parse_plates(client.fetch_geojson(PLATE_FEED_URL).unwrap()).unwrap();
        assert!(plates.items.len() > 100);
    }

    #[test]
    fn unreachable_host_is_an_http_error() {
        let client = FeedClient::new(1, "quake-map-test");
        let err = client.fetch_text("http://127.0.0.1:9/feed.json").unwrap_err();
        assert!(matches!(err, FeedError::Http(_)));
    }
}
