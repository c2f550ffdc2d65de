use super::{require_root_domain, DuplicateRecordSnafu, RecordType, Result, StructuredRecord};

/// Declarative view of one zone: its FQDN and the records it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    name: String,
    records: Vec<StructuredRecord>,
}

impl Zone {
    pub fn new(name: &str) -> Self {
        Self {
            name: require_root_domain(name),
            records: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[StructuredRecord] {
        &self.records
    }

    /// Adds a record. A zone holds at most one record per (name, type).
    pub fn add_record(&mut self, record: StructuredRecord) -> Result<()> {
        if self.records.iter().any(|r| r.matches(&record)) {
            return DuplicateRecordSnafu {
                zone: self.name.as_str(),
                kind: record.record_type().as_str(),
                name: record.name,
            }
            .fail();
        }
        self.records.push(record);
        Ok(())
    }

    /// Removes the record with the same (name, type), returning it.
    pub fn remove_record(&mut self, name: &str, kind: RecordType) -> Option<StructuredRecord> {
        let index = self
            .records
            .iter()
            .position(|r| r.name == name && r.record_type() == kind)?;
        Some(self.records.remove(index))
    }

    pub fn find(&self, name: &str, kind: RecordType) -> Option<&StructuredRecord> {
        self.records
            .iter()
            .find(|r| r.name == name && r.record_type() == kind)
    }

    /// Fully qualified name of a zone-relative hostname.
    pub fn fqdn(&self, hostname: &str) -> String {
        if hostname.is_empty() {
            self.name.clone()
        } else {
            format!("{hostname}.{}", self.name)
        }
    }

    /// Inverse of [`Zone::fqdn`]. Names outside the zone come back unchanged
    /// minus the trailing dot.
    pub fn hostname_from_fqdn(&self, fqdn: &str) -> String {
        let fqdn = require_root_domain(fqdn);
        if fqdn == self.name {
            return String::new();
        }
        match fqdn.strip_suffix(&format!(".{}", self.name)) {
            Some(hostname) => hostname.to_string(),
            None => fqdn.trim_end_matches('.').to_string(),
        }
    }
}
