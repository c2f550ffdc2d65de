//! Translation between structured records and Selectel record sets.
//!
//! Each record of an rrset carries one presentation-format `content` string:
//!
//! | Type | Content |
//! |---|---|
//! | A, AAAA, NS, CNAME, ALIAS, DNAME | the address or hostname |
//! | TXT | `"text"`, semicolons unescaped |
//! | MX | `preference exchange` |
//! | SRV | `priority weight port target` |
//! | SSHFP | `algorithm fingerprint_type fingerprint` |
//! | CAA | `flags tag "value"` |
//!
//! Nothing here touches the network or any state.

use std::fmt::Display;
use std::str::FromStr;

use crate::common::{
    escape_semicolons, floor_ttl, require_root_domain, unescape_semicolons, CaaValue,
    MalformedContentSnafu, MxValue, RRSetRecord, RecordData, RecordType, RemoteRRSet, Result,
    SrvValue, SshfpValue, StructuredRecord, WireRRSet, Zone,
};

/// Builds the create/update body for `record`. The TTL is raised to the
/// provider minimum.
pub fn to_wire(record: &StructuredRecord, zone: &Zone) -> WireRRSet {
    WireRRSet {
        name: zone.fqdn(&record.name),
        ttl: floor_ttl(record.ttl),
        kind: record.record_type(),
        records: to_contents(&record.data)
            .into_iter()
            .map(RRSetRecord::from)
            .collect(),
    }
}

pub fn to_contents(data: &RecordData) -> Vec<String> {
    match data {
        RecordData::A(values) | RecordData::Aaaa(values) | RecordData::Ns(values) => {
            values.clone()
        }
        RecordData::Cname(value) | RecordData::Alias(value) | RecordData::Dname(value) => {
            vec![value.clone()]
        }
        RecordData::Txt(values) => values
            .iter()
            .map(|value| format!("\"{}\"", unescape_semicolons(value)))
            .collect(),
        RecordData::Mx(values) => values
            .iter()
            .map(|v| format!("{} {}", v.preference, v.exchange))
            .collect(),
        RecordData::Srv(values) => values
            .iter()
            .map(|v| format!("{} {} {} {}", v.priority, v.weight, v.port, v.target))
            .collect(),
        RecordData::Sshfp(values) => values
            .iter()
            .map(|v| format!("{} {} {}", v.algorithm, v.fingerprint_type, v.fingerprint))
            .collect(),
        RecordData::Caa(values) => values
            .iter()
            .map(|v| format!("{} {} \"{}\"", v.flags, v.tag, v.value))
            .collect(),
    }
}

/// Reads a provider rrset back into a structured record relative to `zone`.
///
/// Fails with `UnsupportedType` for types outside [`RecordType::ALL`] and
/// `MalformedContent` when a content string does not have the expected shape.
pub fn to_structured(rrset: &RemoteRRSet, zone: &Zone) -> Result<StructuredRecord> {
    let kind: RecordType = rrset.kind.parse()?;
    let contents: Vec<&str> = rrset.records.iter().map(|r| r.content.as_str()).collect();
    let data = parse_contents(kind, &contents)?;
    Ok(StructuredRecord::new(
        zone.hostname_from_fqdn(&rrset.name),
        rrset.ttl,
        data,
    ))
}

pub fn parse_contents(kind: RecordType, contents: &[&str]) -> Result<RecordData> {
    if contents.is_empty() {
        return MalformedContentSnafu {
            kind: kind.as_str(),
            content: "",
            message: "record set has no records",
        }
        .fail();
    }

    let hostnames = || -> Vec<String> {
        contents.iter().map(|c| require_root_domain(c)).collect()
    };

    Ok(match kind {
        RecordType::A => RecordData::A(contents.iter().map(|c| c.to_string()).collect()),
        RecordType::Aaaa => RecordData::Aaaa(contents.iter().map(|c| c.to_string()).collect()),
        RecordType::Ns => RecordData::Ns(hostnames()),
        RecordType::Cname => RecordData::Cname(require_root_domain(contents[0])),
        RecordType::Alias => RecordData::Alias(require_root_domain(contents[0])),
        RecordType::Dname => RecordData::Dname(require_root_domain(contents[0])),
        RecordType::Txt => RecordData::Txt(
            contents
                .iter()
                .map(|c| escape_semicolons(c.trim_matches(|ch: char| ch == '"' || ch == '\'')))
                .collect(),
        ),
        RecordType::Mx => RecordData::Mx(
            contents
                .iter()
                .map(|c| parse_mx(c))
                .collect::<Result<_>>()?,
        ),
        RecordType::Srv => RecordData::Srv(
            contents
                .iter()
                .map(|c| parse_srv(c))
                .collect::<Result<_>>()?,
        ),
        RecordType::Sshfp => RecordData::Sshfp(
            contents
                .iter()
                .map(|c| parse_sshfp(c))
                .collect::<Result<_>>()?,
        ),
        RecordType::Caa => RecordData::Caa(
            contents
                .iter()
                .map(|c| parse_caa(c))
                .collect::<Result<_>>()?,
        ),
    })
}

fn split_exact<'a>(kind: RecordType, content: &'a str, count: usize) -> Result<Vec<&'a str>> {
    let tokens: Vec<&str> = content.split(' ').collect();
    if tokens.len() != count {
        return MalformedContentSnafu {
            kind: kind.as_str(),
            content,
            message: format!("expected {count} fields, found {}", tokens.len()),
        }
        .fail();
    }
    Ok(tokens)
}

fn parse_field<T>(kind: RecordType, content: &str, field: &str, token: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    token.parse().map_err(|err: T::Err| {
        MalformedContentSnafu {
            kind: kind.as_str(),
            content,
            message: format!("invalid {field} {token:?}: {err}"),
        }
        .build()
    })
}

fn parse_mx(content: &str) -> Result<MxValue> {
    let kind = RecordType::Mx;
    let tokens = split_exact(kind, content, 2)?;
    Ok(MxValue {
        preference: parse_field(kind, content, "preference", tokens[0])?,
        exchange: require_root_domain(tokens[1]),
    })
}

fn parse_srv(content: &str) -> Result<SrvValue> {
    let kind = RecordType::Srv;
    let tokens = split_exact(kind, content, 4)?;
    Ok(SrvValue {
        priority: parse_field(kind, content, "priority", tokens[0])?,
        weight: parse_field(kind, content, "weight", tokens[1])?,
        port: parse_field(kind, content, "port", tokens[2])?,
        target: require_root_domain(tokens[3]),
    })
}

fn parse_sshfp(content: &str) -> Result<SshfpValue> {
    let kind = RecordType::Sshfp;
    let tokens = split_exact(kind, content, 3)?;
    Ok(SshfpValue {
        algorithm: parse_field(kind, content, "algorithm", tokens[0])?,
        fingerprint_type: parse_field(kind, content, "fingerprint_type", tokens[1])?,
        fingerprint: tokens[2].to_string(),
    })
}

// The value may contain spaces, so only the first two separate fields.
fn parse_caa(content: &str) -> Result<CaaValue> {
    let kind = RecordType::Caa;
    let tokens: Vec<&str> = content.splitn(3, ' ').collect();
    if tokens.len() != 3 {
        return MalformedContentSnafu {
            kind: kind.as_str(),
            content,
            message: "expected flags, tag and value",
        }
        .fail();
    }
    let value = tokens[2];
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Ok(CaaValue {
        flags: parse_field(kind, content, "flags", tokens[0])?,
        tag: tokens[1].to_string(),
        value: value.to_string(),
    })
}
