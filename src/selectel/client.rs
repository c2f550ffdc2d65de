use serde::de::DeserializeOwned;
use snafu::prelude::*;

use crate::common::{
    key_file_or_string, AuthenticationSnafu, BadRequestSnafu, ConflictSnafu, DnsClient, Error,
    InternalSnafu, NotFoundSnafu, ProviderSnafu, RemoteRRSet, RemoteZone, Response,
    ResponseSnafu, Result, Transport, UreqTransport, WireRRSet,
};

use super::models::{CreateZone, PaginatedResponse};

pub const API_URL: &str = "https://api.selectel.ru/domains/v2";

pub const PROVIDER_NAME: &str = "Selectel";

pub const PAGINATION_LIMIT: usize = 50;

const AUTH_HEADER: &str = "X-Auth-Token";

const ZONES_PATH: &str = "/zones";

fn rrsets_path(zone_id: &str) -> String {
    format!("{ZONES_PATH}/{zone_id}/rrset")
}

fn rrset_path(zone_id: &str, rrset_id: &str) -> String {
    format!("{ZONES_PATH}/{zone_id}/rrset/{rrset_id}")
}

fn description(payload: &serde_json::Value, key: &str, default: &str) -> String {
    payload
        .get(key)
        .and_then(|value| value.as_str())
        .unwrap_or(default)
        .to_string()
}

/// Maps a response onto the provider's error taxonomy, returning the JSON
/// payload of successful calls.
pub(crate) fn check_response(resp: &Response) -> Result<serde_json::Value> {
    let payload = resp.json();
    match resp.status {
        200 | 201 | 204 => Ok(payload),
        400 | 422 => BadRequestSnafu {
            description: description(&payload, "description", "Invalid payload"),
        }
        .fail(),
        401 => AuthenticationSnafu.fail(),
        404 => NotFoundSnafu {
            message: description(&payload, "error", "invalid path"),
        }
        .fail(),
        409 => ConflictSnafu {
            message: description(&payload, "error", "resource maybe already created"),
        }
        .fail(),
        status => InternalSnafu { status }.fail(),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(
    provider: &str,
    payload: serde_json::Value,
    what: &str,
) -> Result<T> {
    serde_json::from_value(payload)
        .boxed_local()
        .context(ProviderSnafu {
            provider,
            message: format!("Failed to deserialize {what}"),
        })
}

/// Client for the rrset based v2 API.
pub struct SelectelClient<T = UreqTransport> {
    transport: T,
    page_limit: usize,
}

impl<T: Transport> SelectelClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            page_limit: PAGINATION_LIMIT,
        }
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn request(
        &self,
        method: &str,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let resp = self.transport.request(method, path, query, body)?;
        check_response(&resp).map_err(|err| {
            tracing::debug!(
                provider = PROVIDER_NAME,
                method = method,
                path = path,
                status = resp.status,
                error = %err,
                "Request failed"
            );
            err
        })
    }

    /// Follows `next_offset` until the server reports no further page,
    /// keeping items in the order they were returned.
    fn request_all<I: DeserializeOwned>(&self, path: &str) -> Result<Vec<I>> {
        let mut items: Vec<I> = Vec::new();
        let mut offset = 0;
        loop {
            let payload = self.request(
                "GET",
                path,
                &[
                    ("limit", self.page_limit.to_string()),
                    ("offset", offset.to_string()),
                ],
                None,
            )?;
            let page: PaginatedResponse<I> = decode(PROVIDER_NAME, payload, path)?;
            items.extend(page.result);

            match page.next_offset {
                Some(next) if next == offset && next != 0 => {
                    return ResponseSnafu {
                        message: format!("Pagination of {path} is stuck at offset {offset}"),
                    }
                    .fail()
                }
                Some(next) if next != 0 => offset = next,
                _ => return Ok(items),
            }
        }
    }

    fn body(rrset: &WireRRSet) -> Result<serde_json::Value> {
        serde_json::to_value(rrset)
            .boxed_local()
            .context(ProviderSnafu {
                provider: PROVIDER_NAME,
                message: "Failed to serialize record set",
            })
    }
}

impl<T: Transport> DnsClient for SelectelClient<T> {
    fn list_zones(&self) -> Result<Vec<RemoteZone>> {
        self.request_all(ZONES_PATH)
    }

    fn create_zone(&self, name: &str) -> Result<RemoteZone> {
        let body = serde_json::to_value(CreateZone { name })
            .boxed_local()
            .context(ProviderSnafu {
                provider: PROVIDER_NAME,
                message: "Failed to serialize zone",
            })?;
        let payload = self.request("POST", ZONES_PATH, &[], Some(&body))?;
        decode(PROVIDER_NAME, payload, "zone")
    }

    fn list_rrsets(&self, zone_id: &str) -> Result<Vec<RemoteRRSet>> {
        self.request_all(&rrsets_path(zone_id))
    }

    fn create_rrset(&self, zone_id: &str, rrset: &WireRRSet) -> Result<RemoteRRSet> {
        let body = Self::body(rrset)?;
        let payload = self.request("POST", &rrsets_path(zone_id), &[], Some(&body))?;
        decode(PROVIDER_NAME, payload, "record set")
    }

    /// PATCH answers 204, the id stays the same.
    fn update_rrset(
        &self,
        zone_id: &str,
        rrset_id: &str,
        rrset: &WireRRSet,
    ) -> Result<Option<String>> {
        let body = Self::body(rrset)?;
        self.request("PATCH", &rrset_path(zone_id, rrset_id), &[], Some(&body))?;
        Ok(None)
    }

    fn delete_rrset(&self, zone_id: &str, rrset_id: &str) -> Result<()> {
        self.request("DELETE", &rrset_path(zone_id, rrset_id), &[], None)?;
        Ok(())
    }
}

impl TryFrom<super::Config> for SelectelClient<UreqTransport> {
    type Error = Error;

    fn try_from(value: super::Config) -> Result<Self> {
        let token = key_file_or_string(value.token, "selectel.token")?;
        let base_url = match value.base_url {
            Some(url) => url,
            None => API_URL.parse().map_err(|err| {
                crate::common::ConfigSnafu {
                    message: format!("Invalid default API URL: {err}"),
                    prefix: "selectel.base_url",
                }
                .build()
            })?,
        };
        let transport = UreqTransport::new(base_url, AUTH_HEADER, token, PROVIDER_NAME);
        Ok(SelectelClient::new(transport)
            .with_page_limit(value.page_limit.unwrap_or(PAGINATION_LIMIT)))
    }
}
