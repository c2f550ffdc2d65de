#[derive(Clone, serde::Deserialize)]
pub struct Config {
    /// Account token, or `@/path/to/file` holding it.
    pub token: String,
    pub base_url: Option<url::Url>,
    pub page_limit: Option<usize>,
}
