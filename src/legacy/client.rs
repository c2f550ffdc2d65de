use snafu::prelude::*;

use crate::common::{
    key_file_or_string, require_root_domain, AuthenticationSnafu, DnsClient, Error,
    ProviderSnafu, RRSetRecord, RemoteRRSet, RemoteZone, ResponseSnafu, Result, Transport,
    UreqTransport, WireRRSet,
};
use crate::selectel::{check_response, decode};

use super::models::{id_string, CreateDomain, Domain, LegacyRecord};

pub const API_URL: &str = "https://api.selectel.ru/domains/v1";

pub const PROVIDER_NAME: &str = "SelectelLegacy";

pub const PAGINATION_LIMIT: usize = 50;

const AUTH_HEADER: &str = "X-Token";

const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

const DOMAINS_PATH: &str = "/";

/// Separates member record ids inside a synthetic rrset id.
const ID_SEPARATOR: char = ',';

fn records_path(domain_id: &str) -> String {
    format!("/{domain_id}/records/")
}

fn record_path(domain_id: &str, record_id: &str) -> String {
    format!("/{domain_id}/records/{record_id}")
}

/// Client for the record based v1 API.
///
/// v1 has no record sets, so rrsets are assembled from records sharing a
/// (name, type) and carry the comma-joined ids of their members.
pub struct LegacyClient<T = UreqTransport> {
    transport: T,
    page_limit: usize,
}

impl<T: Transport> LegacyClient<T> {
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

    // v1 answers 404 for empty collections and already removed records.
    fn request(
        &self,
        method: &str,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let resp = self.transport.request(method, path, query, body)?;
        tracing::debug!(
            provider = PROVIDER_NAME,
            method = method,
            path = path,
            status = resp.status,
            "Request completed"
        );
        if resp.status == 404 {
            return Ok(serde_json::Value::Object(Default::default()));
        }
        check_response(&resp)
    }

    fn total_count(&self, path: &str) -> Result<usize> {
        let resp = self.transport.request("HEAD", path, &[], None)?;
        if resp.status == 401 {
            return AuthenticationSnafu.fail();
        }
        let header = resp.header(TOTAL_COUNT_HEADER).context(ResponseSnafu {
            message: format!("{path} did not report {TOTAL_COUNT_HEADER}"),
        })?;
        header.trim().parse::<usize>().map_err(|err| {
            ResponseSnafu {
                message: format!("Invalid {TOTAL_COUNT_HEADER} {header:?} for {path}: {err}"),
            }
            .build()
        })
    }

    /// Reads the total up front, then fetches every page.
    fn request_with_pagination<I: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Vec<I>> {
        let total = self.total_count(path)?;
        let mut items: Vec<I> = Vec::with_capacity(total);
        for offset in (0..total).step_by(self.page_limit) {
            let payload = self.request(
                "GET",
                path,
                &[
                    ("limit", self.page_limit.to_string()),
                    ("offset", offset.to_string()),
                ],
                None,
            )?;
            if payload.is_array() {
                let page: Vec<I> = decode(PROVIDER_NAME, payload, path)?;
                items.extend(page);
            }
        }
        Ok(items)
    }

    fn create_record(&self, domain_id: &str, record: &LegacyRecord) -> Result<LegacyRecord> {
        let body = serde_json::to_value(record)
            .boxed_local()
            .context(ProviderSnafu {
                provider: PROVIDER_NAME,
                message: "Failed to serialize record",
            })?;
        let payload = self.request("POST", &records_path(domain_id), &[], Some(&body))?;
        decode(PROVIDER_NAME, payload, "record")
    }

    fn create_records(
        &self,
        zone_id: &str,
        rrset: &WireRRSet,
        records: &[LegacyRecord],
    ) -> Result<RemoteRRSet> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let created = self.create_record(zone_id, record)?;
            ids.extend(created.id.as_ref().map(id_string));
        }

        Ok(RemoteRRSet {
            id: Some(ids.join(&ID_SEPARATOR.to_string())),
            zone_id: Some(zone_id.to_string()),
            name: rrset.name.clone(),
            ttl: rrset.ttl,
            kind: rrset.kind.to_string(),
            records: rrset.records.clone(),
        })
    }
}

/// Converts every content of `rrset` up front, so an unsupported value
/// leaves the provider untouched.
fn encode(rrset: &WireRRSet) -> Result<Vec<LegacyRecord>> {
    rrset
        .contents()
        .map(|content| LegacyRecord::from_content(&rrset.name, rrset.ttl, rrset.kind, content))
        .collect()
}

/// Groups records into rrsets in first-seen order.
fn group_records(domain_id: &str, records: Vec<LegacyRecord>) -> Vec<RemoteRRSet> {
    let mut rrsets: Vec<(Vec<String>, RemoteRRSet)> = Vec::new();
    for record in records {
        let name = require_root_domain(&record.name);
        let id = record.id.as_ref().map(id_string);
        let content = RRSetRecord::from(record.content());

        match rrsets
            .iter_mut()
            .find(|(_, rrset)| rrset.name == name && rrset.kind == record.kind)
        {
            Some((ids, rrset)) => {
                ids.extend(id);
                rrset.records.push(content);
            }
            None => rrsets.push((
                id.into_iter().collect(),
                RemoteRRSet {
                    id: None,
                    zone_id: Some(domain_id.to_string()),
                    name,
                    ttl: record.ttl,
                    kind: record.kind,
                    records: vec![content],
                },
            )),
        }
    }

    rrsets
        .into_iter()
        .map(|(ids, mut rrset)| {
            rrset.id = Some(ids.join(&ID_SEPARATOR.to_string()));
            rrset
        })
        .collect()
}

impl<T: Transport> DnsClient for LegacyClient<T> {
    fn list_zones(&self) -> Result<Vec<RemoteZone>> {
        let domains: Vec<Domain> = self.request_with_pagination(DOMAINS_PATH)?;
        Ok(domains
            .into_iter()
            .map(|domain| RemoteZone {
                id: id_string(&domain.id),
                name: require_root_domain(&domain.name),
            })
            .collect())
    }

    fn create_zone(&self, name: &str) -> Result<RemoteZone> {
        let body = serde_json::to_value(CreateDomain {
            name: name.trim_end_matches('.'),
            bind_zone: "",
        })
        .boxed_local()
        .context(ProviderSnafu {
            provider: PROVIDER_NAME,
            message: "Failed to serialize domain",
        })?;
        let payload = self.request("POST", DOMAINS_PATH, &[], Some(&body))?;
        let domain: Domain = decode(PROVIDER_NAME, payload, "domain")?;
        Ok(RemoteZone {
            id: id_string(&domain.id),
            name: require_root_domain(&domain.name),
        })
    }

    fn list_rrsets(&self, zone_id: &str) -> Result<Vec<RemoteRRSet>> {
        let records: Vec<LegacyRecord> = self.request_with_pagination(&records_path(zone_id))?;
        Ok(group_records(zone_id, records))
    }

    fn create_rrset(&self, zone_id: &str, rrset: &WireRRSet) -> Result<RemoteRRSet> {
        let records = encode(rrset)?;
        self.create_records(zone_id, rrset, &records)
    }

    /// Replaces the member records. The new records get new ids, which are
    /// returned joined like any other rrset id.
    fn update_rrset(
        &self,
        zone_id: &str,
        rrset_id: &str,
        rrset: &WireRRSet,
    ) -> Result<Option<String>> {
        let records = encode(rrset)?;
        self.delete_rrset(zone_id, rrset_id)?;
        Ok(self.create_records(zone_id, rrset, &records)?.id)
    }

    /// Deletes every member record. Failures of single records are logged
    /// and skipped, only authentication failures abort.
    fn delete_rrset(&self, zone_id: &str, rrset_id: &str) -> Result<()> {
        let (mut deleted, mut skipped) = (0, 0);
        for record_id in rrset_id.split(ID_SEPARATOR).filter(|id| !id.is_empty()) {
            match self.request("DELETE", &record_path(zone_id, record_id), &[], None) {
                Ok(_) => deleted += 1,
                Err(err @ Error::Authentication) => return Err(err),
                Err(err) => {
                    skipped += 1;
                    tracing::warn!(
                        provider = PROVIDER_NAME,
                        record_id = record_id,
                        error = %err,
                        "Failed to delete record"
                    );
                }
            }
        }
        tracing::debug!(
            provider = PROVIDER_NAME,
            deleted = deleted,
            skipped = skipped,
            "Deleted records"
        );
        Ok(())
    }
}

impl TryFrom<super::Config> for LegacyClient<UreqTransport> {
    type Error = Error;

    fn try_from(value: super::Config) -> Result<Self> {
        let token = key_file_or_string(value.token, "legacy.token")?;
        let base_url = match value.base_url {
            Some(url) => url,
            None => API_URL.parse().map_err(|err| {
                crate::common::ConfigSnafu {
                    message: format!("Invalid default API URL: {err}"),
                    prefix: "legacy.base_url",
                }
                .build()
            })?,
        };
        let transport = UreqTransport::new(base_url, AUTH_HEADER, token, PROVIDER_NAME);
        Ok(LegacyClient::new(transport)
            .with_page_limit(value.page_limit.unwrap_or(PAGINATION_LIMIT)))
    }
}
