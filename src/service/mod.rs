mod cache;
mod models;
mod service;

pub use cache::IdentityCache;
pub use models::*;
pub use service::DNSSync;
