mod client;
mod config;
mod models;

pub use client::{LegacyClient, API_URL, PAGINATION_LIMIT, PROVIDER_NAME};
pub use config::Config;
