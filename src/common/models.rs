use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use snafu::prelude::*;

use super::{MalformedContentSnafu, Result, UnsupportedTypeSnafu};

/// Lowest TTL the provider accepts. Every TTL written is raised to at least this.
pub const MIN_TTL: u32 = 60;

pub const DEFAULT_TTL: u32 = 3600;

pub fn floor_ttl(ttl: u32) -> u32 {
    ttl.max(MIN_TTL)
}

/// Appends the root label if missing. Idempotent.
pub fn require_root_domain(fqdn: &str) -> String {
    if fqdn.ends_with('.') {
        fqdn.to_string()
    } else {
        format!("{fqdn}.")
    }
}

pub fn unescape_semicolons(value: &str) -> String {
    value.replace("\\;", ";")
}

/// Escapes bare semicolons. Already escaped ones are left alone.
pub fn escape_semicolons(value: &str) -> String {
    unescape_semicolons(value).replace(';', "\\;")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordType {
    A,
    Aaaa,
    Alias,
    Caa,
    Cname,
    Dname,
    Mx,
    Ns,
    Srv,
    Sshfp,
    Txt,
}

impl RecordType {
    pub const ALL: [RecordType; 11] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Alias,
        RecordType::Caa,
        RecordType::Cname,
        RecordType::Dname,
        RecordType::Mx,
        RecordType::Ns,
        RecordType::Srv,
        RecordType::Sshfp,
        RecordType::Txt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Alias => "ALIAS",
            RecordType::Caa => "CAA",
            RecordType::Cname => "CNAME",
            RecordType::Dname => "DNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Srv => "SRV",
            RecordType::Sshfp => "SSHFP",
            RecordType::Txt => "TXT",
        }
    }

    /// Types holding exactly one value rather than a list.
    pub fn is_single_value(&self) -> bool {
        matches!(self, RecordType::Cname | RecordType::Alias | RecordType::Dname)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = super::Error;

    fn from_str(s: &str) -> Result<Self> {
        RecordType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .context(UnsupportedTypeSnafu { kind: s })
    }
}

impl serde::Serialize for RecordType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct MxValue {
    pub preference: u16,
    pub exchange: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct SrvValue {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct SshfpValue {
    pub algorithm: u8,
    pub fingerprint_type: u8,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct CaaValue {
    #[serde(default)]
    pub flags: u8,
    pub tag: String,
    pub value: String,
}

/// Typed payload of a record. Single-value types carry the value directly.
///
/// TXT values are kept in their declarative, semicolon-escaped form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordData {
    A(Vec<String>),
    Aaaa(Vec<String>),
    Alias(String),
    Caa(Vec<CaaValue>),
    Cname(String),
    Dname(String),
    Mx(Vec<MxValue>),
    Ns(Vec<String>),
    Srv(Vec<SrvValue>),
    Sshfp(Vec<SshfpValue>),
    Txt(Vec<String>),
}

impl RecordData {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordData::A(_) => RecordType::A,
            RecordData::Aaaa(_) => RecordType::Aaaa,
            RecordData::Alias(_) => RecordType::Alias,
            RecordData::Caa(_) => RecordType::Caa,
            RecordData::Cname(_) => RecordType::Cname,
            RecordData::Dname(_) => RecordType::Dname,
            RecordData::Mx(_) => RecordType::Mx,
            RecordData::Ns(_) => RecordType::Ns,
            RecordData::Srv(_) => RecordType::Srv,
            RecordData::Sshfp(_) => RecordType::Sshfp,
            RecordData::Txt(_) => RecordType::Txt,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecordData::Alias(_) | RecordData::Cname(_) | RecordData::Dname(_) => 1,
            RecordData::A(v) | RecordData::Aaaa(v) | RecordData::Ns(v) | RecordData::Txt(v) => {
                v.len()
            }
            RecordData::Caa(v) => v.len(),
            RecordData::Mx(v) => v.len(),
            RecordData::Srv(v) => v.len(),
            RecordData::Sshfp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The form the provider reads back: TXT semicolons escaped, hostnames
    /// with a root label.
    fn canonical(self) -> Self {
        match self {
            RecordData::Txt(v) => RecordData::Txt(v.iter().map(|t| escape_semicolons(t)).collect()),
            RecordData::Ns(v) => RecordData::Ns(v.iter().map(|h| require_root_domain(h)).collect()),
            RecordData::Alias(h) => RecordData::Alias(require_root_domain(&h)),
            RecordData::Cname(h) => RecordData::Cname(require_root_domain(&h)),
            RecordData::Dname(h) => RecordData::Dname(require_root_domain(&h)),
            RecordData::Mx(v) => RecordData::Mx(
                v.into_iter()
                    .map(|mx| MxValue {
                        exchange: require_root_domain(&mx.exchange),
                        ..mx
                    })
                    .collect(),
            ),
            RecordData::Srv(v) => RecordData::Srv(
                v.into_iter()
                    .map(|srv| SrvValue {
                        target: require_root_domain(&srv.target),
                        ..srv
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    fn sort(&mut self) {
        match self {
            RecordData::Alias(_) | RecordData::Cname(_) | RecordData::Dname(_) => {}
            RecordData::A(v) | RecordData::Aaaa(v) | RecordData::Ns(v) | RecordData::Txt(v) => {
                v.sort()
            }
            RecordData::Caa(v) => v.sort(),
            RecordData::Mx(v) => v.sort(),
            RecordData::Srv(v) => v.sort(),
            RecordData::Sshfp(v) => v.sort(),
        }
    }
}

/// A record as the declarative side sees it. `name` is relative to the zone,
/// empty for the apex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructuredRecord {
    pub name: String,
    pub ttl: u32,
    pub data: RecordData,
}

impl StructuredRecord {
    pub fn new(name: impl Into<String>, ttl: u32, mut data: RecordData) -> Self {
        data.sort();
        Self {
            name: name.into(),
            ttl,
            data,
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }

    pub fn matches(&self, other: &Self) -> bool {
        self.name == other.name && self.record_type() == other.record_type()
    }
}

impl fmt::Display for StructuredRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() { "@" } else { &self.name };
        write!(f, "{} {} ttl={}", name, self.record_type(), self.ttl)
    }
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

/// Declarative, serde-facing form of a record: `value` for single-value
/// types, `values` for the rest (either is accepted for list types).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecordSpec {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<serde_json::Value>>,
}

fn parse_values<T: DeserializeOwned>(kind: RecordType, items: Vec<serde_json::Value>) -> Result<Vec<T>> {
    ensure!(
        !items.is_empty(),
        MalformedContentSnafu {
            kind: kind.as_str(),
            content: "",
            message: "at least one value is required",
        }
    );
    items
        .into_iter()
        .map(|item| {
            let content = item.to_string();
            serde_json::from_value(item).map_err(|err| {
                MalformedContentSnafu {
                    kind: kind.as_str(),
                    content,
                    message: err.to_string(),
                }
                .build()
            })
        })
        .collect()
}

fn parse_single(kind: RecordType, mut items: Vec<serde_json::Value>) -> Result<String> {
    ensure!(
        items.len() == 1,
        MalformedContentSnafu {
            kind: kind.as_str(),
            content: format!("{items:?}"),
            message: "exactly one value is required",
        }
    );
    let mut values: Vec<String> = parse_values(kind, vec![items.remove(0)])?;
    Ok(values.remove(0))
}

impl TryFrom<RecordSpec> for StructuredRecord {
    type Error = super::Error;

    fn try_from(spec: RecordSpec) -> Result<Self> {
        let kind: RecordType = spec.kind.parse()?;
        let items = match (spec.value, spec.values) {
            (Some(value), None) => vec![value],
            (None, Some(values)) => values,
            (None, None) => Vec::new(),
            (Some(_), Some(_)) => {
                return MalformedContentSnafu {
                    kind: kind.as_str(),
                    content: spec.name,
                    message: "both value and values are set",
                }
                .fail()
            }
        };

        let data = match kind {
            RecordType::A => RecordData::A(parse_values(kind, items)?),
            RecordType::Aaaa => RecordData::Aaaa(parse_values(kind, items)?),
            RecordType::Ns => RecordData::Ns(parse_values(kind, items)?),
            RecordType::Txt => RecordData::Txt(parse_values(kind, items)?),
            RecordType::Mx => RecordData::Mx(parse_values(kind, items)?),
            RecordType::Srv => RecordData::Srv(parse_values(kind, items)?),
            RecordType::Sshfp => RecordData::Sshfp(parse_values(kind, items)?),
            RecordType::Caa => RecordData::Caa(parse_values(kind, items)?),
            RecordType::Cname => RecordData::Cname(parse_single(kind, items)?),
            RecordType::Alias => RecordData::Alias(parse_single(kind, items)?),
            RecordType::Dname => RecordData::Dname(parse_single(kind, items)?),
        };

        Ok(StructuredRecord::new(spec.name, spec.ttl, data.canonical()))
    }
}

fn to_json_values<T: serde::Serialize>(
    kind: RecordType,
    values: &[T],
) -> Result<Option<Vec<serde_json::Value>>> {
    values
        .iter()
        .map(|value| {
            serde_json::to_value(value).map_err(|err| {
                MalformedContentSnafu {
                    kind: kind.as_str(),
                    content: "",
                    message: err.to_string(),
                }
                .build()
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

impl TryFrom<&StructuredRecord> for RecordSpec {
    type Error = super::Error;

    fn try_from(record: &StructuredRecord) -> Result<Self> {
        let kind = record.record_type();
        let (value, values) = match &record.data {
            RecordData::Alias(v) | RecordData::Cname(v) | RecordData::Dname(v) => {
                (Some(serde_json::Value::String(v.clone())), None)
            }
            RecordData::A(v) | RecordData::Aaaa(v) | RecordData::Ns(v) | RecordData::Txt(v) => {
                (None, to_json_values(kind, v)?)
            }
            RecordData::Caa(v) => (None, to_json_values(kind, v)?),
            RecordData::Mx(v) => (None, to_json_values(kind, v)?),
            RecordData::Srv(v) => (None, to_json_values(kind, v)?),
            RecordData::Sshfp(v) => (None, to_json_values(kind, v)?),
        };
        Ok(Self {
            name: record.name.clone(),
            kind: kind.to_string(),
            ttl: record.ttl,
            value,
            values,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RemoteZone {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RRSetRecord {
    pub content: String,
}

impl From<String> for RRSetRecord {
    fn from(content: String) -> Self {
        Self { content }
    }
}

/// A record set as stored by the provider. `kind` stays a raw string since
/// listings include types this crate does not manage (SOA and friends).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RemoteRRSet {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub zone_id: Option<String>,
    pub name: String,
    pub ttl: u32,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub records: Vec<RRSetRecord>,
}

/// Body of create and update calls.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WireRRSet {
    pub name: String,
    pub ttl: u32,
    #[serde(rename = "type")]
    pub kind: RecordType,
    pub records: Vec<RRSetRecord>,
}

impl WireRRSet {
    pub fn contents(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.content.as_str())
    }
}

/// Remote record-set API of a DNS provider.
pub trait DnsClient {
    fn list_zones(&self) -> Result<Vec<RemoteZone>>;
    fn create_zone(&self, name: &str) -> Result<RemoteZone>;
    fn list_rrsets(&self, zone_id: &str) -> Result<Vec<RemoteRRSet>>;
    fn create_rrset(&self, zone_id: &str, rrset: &WireRRSet) -> Result<RemoteRRSet>;
    /// Replaces the whole record set. Returns the record set's new id when
    /// the provider assigned one.
    fn update_rrset(
        &self,
        zone_id: &str,
        rrset_id: &str,
        rrset: &WireRRSet,
    ) -> Result<Option<String>>;
    fn delete_rrset(&self, zone_id: &str, rrset_id: &str) -> Result<()>;
}

impl<C: DnsClient + ?Sized> DnsClient for Box<C> {
    fn list_zones(&self) -> Result<Vec<RemoteZone>> {
        (**self).list_zones()
    }

    fn create_zone(&self, name: &str) -> Result<RemoteZone> {
        (**self).create_zone(name)
    }

    fn list_rrsets(&self, zone_id: &str) -> Result<Vec<RemoteRRSet>> {
        (**self).list_rrsets(zone_id)
    }

    fn create_rrset(&self, zone_id: &str, rrset: &WireRRSet) -> Result<RemoteRRSet> {
        (**self).create_rrset(zone_id, rrset)
    }

    fn update_rrset(
        &self,
        zone_id: &str,
        rrset_id: &str,
        rrset: &WireRRSet,
    ) -> Result<Option<String>> {
        (**self).update_rrset(zone_id, rrset_id, rrset)
    }

    fn delete_rrset(&self, zone_id: &str, rrset_id: &str) -> Result<()> {
        (**self).delete_rrset(zone_id, rrset_id)
    }
}
