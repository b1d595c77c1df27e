use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("invalid seed url {seed:?}")]
    InvalidSeed {
        seed: String,
        #[source]
        source: url::ParseError,
    },

    #[error("seed url {0:?} is not http or https")]
    UnsupportedScheme(String),

    #[error("unable to build http client")]
    Client(#[source] reqwest::Error),
}
