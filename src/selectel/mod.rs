mod client;
mod config;
pub mod mappings;
mod models;

pub(crate) use client::{check_response, decode};
pub use client::{SelectelClient, API_URL, PAGINATION_LIMIT, PROVIDER_NAME};
pub use config::Config;
