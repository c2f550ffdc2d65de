use std::path::PathBuf;

#[derive(Clone, serde::Deserialize)]
pub struct Config {
    /// JSON file holding an array of zones.
    pub source: PathBuf,
}
