mod config;
mod models;
mod source;

pub use config::Config;
pub use source::JSONFileSource;

const SOURCE_NAME: &str = "JSONFile";
