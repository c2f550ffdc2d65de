use std::collections::HashMap;

use snafu::OptionExt;

use crate::common::{
    require_root_domain, RRSetNotFoundSnafu, RecordType, RemoteRRSet, RemoteZone, Result,
    ZoneNotFoundSnafu, ZoneNotListedSnafu,
};

/// Run-scoped mapping of zone names to provider zones and of
/// (zone, type, fqdn) to record-set ids.
///
/// Record-set ids of a zone are only known once the zone has been listed.
/// Lookups never fetch anything themselves.
#[derive(Debug, Default)]
pub struct IdentityCache {
    zones: HashMap<String, RemoteZone>,
    order: Vec<String>,
    rrsets: HashMap<String, HashMap<(String, String), String>>,
}

impl IdentityCache {
    pub fn insert_zone(&mut self, zone: RemoteZone) {
        let name = require_root_domain(&zone.name);
        if !self.zones.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.zones.insert(name, zone);
    }

    pub fn zone(&self, name: &str) -> Option<&RemoteZone> {
        self.zones.get(&require_root_domain(name))
    }

    pub fn zone_id(&self, name: &str) -> Result<&str> {
        self.zone(name)
            .map(|zone| zone.id.as_str())
            .context(ZoneNotFoundSnafu { zone: name })
    }

    /// Zone names in the order the provider listed them.
    pub fn zone_names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn is_listed(&self, zone: &str) -> bool {
        self.rrsets.contains_key(&require_root_domain(zone))
    }

    /// Records a full listing of a zone, replacing whatever an earlier
    /// listing left. The first rrset wins when a listing reports the same
    /// (type, name) twice.
    pub fn insert_rrsets(&mut self, zone: &str, rrsets: &[RemoteRRSet]) {
        let mut ids: HashMap<(String, String), String> = HashMap::with_capacity(rrsets.len());
        for rrset in rrsets {
            if let Some(id) = &rrset.id {
                ids.entry((rrset.kind.clone(), require_root_domain(&rrset.name)))
                    .or_insert_with(|| id.clone());
            }
        }
        self.rrsets.insert(require_root_domain(zone), ids);
    }

    /// Records a single rrset of a listed zone, replacing any previous id.
    /// Zones that were never listed stay unlisted.
    pub fn insert_rrset(&mut self, zone: &str, kind: RecordType, fqdn: &str, id: String) {
        if let Some(ids) = self.rrsets.get_mut(&require_root_domain(zone)) {
            ids.insert((kind.to_string(), require_root_domain(fqdn)), id);
        }
    }

    pub fn rrset_id(&self, zone: &str, kind: RecordType, fqdn: &str) -> Result<&str> {
        let ids = self
            .rrsets
            .get(&require_root_domain(zone))
            .context(ZoneNotListedSnafu { zone })?;
        ids.get(&(kind.to_string(), require_root_domain(fqdn)))
            .map(String::as_str)
            .context(RRSetNotFoundSnafu {
                zone,
                kind: kind.as_str(),
                name: fqdn,
            })
    }
}
