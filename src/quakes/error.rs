use thiserror::Error;

/// Errors produced while downloading or decoding a GeoJSON feed.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("invalid GeoJSON: {0}")]
    Parse(#[from] geojson::Error),

    #[error("expected a FeatureCollection, got a {0}")]
    NotACollection(&'static str),
}

impl FeedError {
    /// Splits status codes out of transport errors.
    pub fn from_request(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => FeedError::Status(code),
            other => FeedError::Http(other),
        }
    }
}
