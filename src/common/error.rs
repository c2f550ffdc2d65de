use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{method} {url} failed: {source}"))]
    RequestError {
        url: String,
        method: String,
        source: ureq::Error,
    },
    #[snafu(display("{message}"))]
    ResponseError { message: String },

    #[snafu(display("Bad request. Description: {description}."))]
    BadRequest { description: String },
    #[snafu(display("Authorization failed. Invalid or empty token."))]
    Authentication,
    #[snafu(display("Resource not found: {message}."))]
    NotFound { message: String },
    #[snafu(display("Conflict: {message}."))]
    Conflict { message: String },
    #[snafu(display("Internal server error."))]
    Internal { status: u16 },

    #[snafu(display("DNS Record with type: {kind} not supported"))]
    UnsupportedType { kind: String },
    #[snafu(display("Malformed {kind} content {content:?}: {message}"))]
    MalformedContent {
        kind: String,
        content: String,
        message: String,
    },

    #[snafu(display("Zone {zone} does not exist in the provider"))]
    ZoneNotFound { zone: String },
    #[snafu(display("Record sets of zone {zone} have not been listed yet"))]
    ZoneNotListed { zone: String },
    #[snafu(display("No {kind} record set named {name} in zone {zone}"))]
    RRSetNotFound {
        zone: String,
        kind: String,
        name: String,
    },
    #[snafu(display("Zone {zone} already has a {kind} record named {name:?}"))]
    DuplicateRecord {
        zone: String,
        kind: String,
        name: String,
    },

    #[snafu(display("{provider}: {message}: {source}"))]
    ProviderError {
        provider: String,
        message: String,
        source: Box<dyn std::error::Error>,
    },
    #[snafu(display("{source_name}: {message}: {source}"))]
    SourceError {
        source_name: String,
        message: String,
        source: Box<dyn std::error::Error>,
    },
    #[snafu(display("Invalid configuration for {prefix}: {message}"))]
    ConfigError { message: String, prefix: String },
}

impl Error {
    /// Errors that only concern a single change and must not stop the rest
    /// of an apply pass.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::BadRequest { .. }
                | Error::Conflict { .. }
                | Error::NotFound { .. }
                | Error::Internal { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. }
                | Error::ZoneNotFound { .. }
                | Error::ZoneNotListed { .. }
                | Error::RRSetNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
