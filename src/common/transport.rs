use std::time::Duration;

use snafu::prelude::*;

use super::{RequestSnafu, ResponseSnafu, Result};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A raw HTTP response. Status codes are not interpreted here, that is the
/// business of each API client.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body as JSON. Anything that does not parse (HTML error pages, empty
    /// 204 bodies) is treated as an empty object.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }
}

/// Issues one request against an API relative to its base URL.
pub trait Transport {
    fn request(
        &self,
        method: &str,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn request(
        &self,
        method: &str,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        (**self).request(method, path, query, body)
    }
}

pub struct UreqTransport {
    agent: ureq::Agent,
    base_url: url::Url,
    auth_header: &'static str,
    token: String,
    provider: &'static str,
}

impl UreqTransport {
    pub fn new(
        base_url: url::Url,
        auth_header: &'static str,
        token: String,
        provider: &'static str,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build();
        Self {
            agent,
            base_url,
            auth_header,
            token,
            provider,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("base_url", &self.base_url.as_str())
            .field("auth_header", &self.auth_header)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Transport for UreqTransport {
    fn request(
        &self,
        method: &str,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let url = self.url(path);
        tracing::debug!(
            url = url,
            method = method,
            provider = self.provider,
            "Sending request"
        );

        let mut req = self
            .agent
            .request(method, &url)
            .set(self.auth_header, &self.token)
            .set("Content-Type", "application/json");
        for (key, value) in query {
            req = req.query(key, value);
        }

        let result = match body {
            Some(body) => req.send_json(body),
            None => req.call(),
        };
        let resp = match result {
            Ok(resp) | Err(ureq::Error::Status(_, resp)) => resp,
            Err(err) => return Err(err).context(RequestSnafu { url, method }),
        };

        let status = resp.status();
        let headers = resp
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = resp.header(&name)?.to_string();
                Some((name, value))
            })
            .collect();
        let body = resp.into_string().map_err(|err| {
            ResponseSnafu {
                message: format!("Failed to read response body from {url}: {err}"),
            }
            .build()
        })?;

        tracing::debug!(
            url = url,
            method = method,
            status = status,
            provider = self.provider,
            "Received response"
        );

        Ok(Response {
            status,
            body,
            headers,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_tolerates_non_json_bodies() {
        let html = Response::new(401, "<html><body>401 Authorization Required</body></html>");
        assert_eq!(html.json(), serde_json::json!({}));
        assert_eq!(Response::new(204, "").json(), serde_json::json!({}));
        assert_eq!(
            Response::new(200, r#"{"result": []}"#).json(),
            serde_json::json!({"result": []})
        );
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resp = Response::new(200, "").with_header("X-Total-Count", "120");
        assert_eq!(resp.header("x-total-count"), Some("120"));
        assert_eq!(resp.header("missing"), None);
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let transport = UreqTransport::new(
            "https://api.selectel.ru/domains/v2/".parse().unwrap(),
            "X-Auth-Token",
            "secret".into(),
            "test",
        );
        assert_eq!(
            transport.url("/zones/abc/rrset"),
            "https://api.selectel.ru/domains/v2/zones/abc/rrset"
        );
        assert!(!format!("{transport:?}").contains("secret"));
    }
}
