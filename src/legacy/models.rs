use crate::common::{
    unescape_semicolons, RecordData, RecordType, Result, UnsupportedTypeSnafu,
};
use crate::selectel::mappings::parse_contents;

/// v1 identifiers are integers, v2 ones strings. Both are kept as strings.
pub(super) fn id_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(serde::Deserialize)]
pub(super) struct Domain {
    pub id: serde_json::Value,
    pub name: String,
}

#[derive(serde::Serialize)]
pub(super) struct CreateDomain<'a> {
    pub name: &'a str,
    pub bind_zone: &'a str,
}

/// A single v1 record. Composite types spread their fields over discrete
/// keys instead of one content string.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub(super) struct LegacyRecord {
    #[serde(default, skip_serializing)]
    pub id: Option<serde_json::Value>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ttl: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint_type: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

impl LegacyRecord {
    /// The record's value in v2 content-string form.
    pub fn content(&self) -> String {
        let content = self.content.clone().unwrap_or_default();
        match self.kind.as_str() {
            "MX" => format!("{} {}", opt(&self.priority), content),
            "SRV" => format!(
                "{} {} {} {}",
                opt(&self.priority),
                opt(&self.weight),
                opt(&self.port),
                opt(&self.target)
            ),
            "SSHFP" => format!(
                "{} {} {}",
                opt(&self.algorithm),
                opt(&self.fingerprint_type),
                opt(&self.fingerprint)
            ),
            "TXT" => format!("\"{content}\""),
            _ => content,
        }
    }

    /// Builds a v1 record from one v2 content string.
    pub fn from_content(name: &str, ttl: u32, kind: RecordType, content: &str) -> Result<Self> {
        let mut record = LegacyRecord {
            name: name.to_string(),
            kind: kind.to_string(),
            ttl,
            ..Default::default()
        };

        match parse_contents(kind, &[content])? {
            RecordData::A(mut v) | RecordData::Aaaa(mut v) | RecordData::Ns(mut v) => {
                record.content = v.pop()
            }
            RecordData::Cname(v) | RecordData::Alias(v) => record.content = Some(v),
            RecordData::Txt(mut v) => record.content = v.pop().map(|v| unescape_semicolons(&v)),
            RecordData::Mx(mut v) => {
                if let Some(mx) = v.pop() {
                    record.priority = Some(mx.preference);
                    record.content = Some(mx.exchange);
                }
            }
            RecordData::Srv(mut v) => {
                if let Some(srv) = v.pop() {
                    record.priority = Some(srv.priority);
                    record.weight = Some(srv.weight);
                    record.port = Some(srv.port);
                    record.target = Some(srv.target);
                }
            }
            RecordData::Sshfp(mut v) => {
                if let Some(sshfp) = v.pop() {
                    record.algorithm = Some(sshfp.algorithm);
                    record.fingerprint_type = Some(sshfp.fingerprint_type);
                    record.fingerprint = Some(sshfp.fingerprint);
                }
            }
            RecordData::Caa(_) | RecordData::Dname(_) => {
                return UnsupportedTypeSnafu { kind: kind.as_str() }.fail()
            }
        }
        Ok(record)
    }
}
