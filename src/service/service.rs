use uuid::Uuid;

use crate::common::{
    diff_records, floor_ttl, Change, DnsClient, RecordData, RecordType, RemoteZone,
    Result, StructuredRecord, Zone,
};
use crate::selectel::mappings::{to_structured, to_wire};

use super::{ApplyReport, ChangeState, IdentityCache, Plan};

/// Reconciles declarative zones against a DNS provider.
pub struct DNSSync<C> {
    client: C,
    cache: IdentityCache,
}

impl<C: DnsClient> DNSSync<C> {
    /// Lists the provider's zones up front. Fails when the provider can't be
    /// reached or rejects the credentials.
    pub fn new(client: C) -> Result<Self> {
        let mut cache = IdentityCache::default();
        for zone in client.list_zones()? {
            cache.insert_zone(zone);
        }
        tracing::info!(zones = cache.zone_names().len(), "Listed zones");
        Ok(Self { client, cache })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Every zone known to the provider, with a trailing dot.
    pub fn list_zones(&self) -> Vec<String> {
        self.cache.zone_names()
    }

    /// Creates a zone and makes it visible to the rest of the run.
    pub fn create_zone(&mut self, name: &str) -> Result<RemoteZone> {
        tracing::debug!(zone = name, "Creating zone");
        let zone = self.client.create_zone(name)?;
        self.cache.insert_zone(zone.clone());
        Ok(zone)
    }

    /// Fills `zone` with the records the provider holds for it and returns
    /// whether the zone exists remotely.
    ///
    /// Record sets of unmanaged types are ignored. Malformed or duplicate ones
    /// fail the call unless `lenient` is set, in which case they are skipped.
    pub fn populate(&mut self, zone: &mut Zone, target: bool, lenient: bool) -> Result<bool> {
        tracing::debug!(
            zone = zone.name(),
            target = target,
            lenient = lenient,
            "Populating zone"
        );
        let zone_id = match self.cache.zone(zone.name()) {
            Some(remote) => remote.id.clone(),
            None => {
                tracing::info!(zone = zone.name(), records = 0, "Zone not found in provider");
                return Ok(false);
            }
        };

        let rrsets = self.client.list_rrsets(&zone_id)?;
        self.cache.insert_rrsets(zone.name(), &rrsets);

        let before = zone.records().len();
        for rrset in &rrsets {
            if rrset.kind.parse::<RecordType>().is_err() {
                continue;
            }
            let added = to_structured(rrset, zone).and_then(|record| zone.add_record(record));
            match added {
                Ok(()) => {}
                Err(err) if lenient => tracing::warn!(
                    zone = zone.name(),
                    name = rrset.name.as_str(),
                    kind = rrset.kind.as_str(),
                    error = %err,
                    "Skipping invalid record set"
                ),
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            zone = zone.name(),
            records = zone.records().len() - before,
            "Populate completed"
        );
        Ok(true)
    }

    /// False for updates that would not change anything once the provider
    /// has applied its own normalization.
    pub fn include_change(&self, change: &Change) -> bool {
        let Change::Update { existing, new } = change else {
            return true;
        };

        let mut data = new.data.clone();
        if let RecordData::Sshfp(values) = &mut data {
            for value in values.iter_mut() {
                value.fingerprint.make_ascii_lowercase();
            }
        }
        let normalized = StructuredRecord::new(new.name.clone(), floor_ttl(new.ttl), data);
        normalized != *existing
    }

    /// Computes the changes that bring the provider in line with `desired`.
    pub fn plan(&mut self, desired: &Zone) -> Result<Plan> {
        let mut existing = Zone::new(desired.name());
        let exists = self.populate(&mut existing, true, false)?;

        let changes: Vec<Change> = diff_records(&existing, desired)
            .into_iter()
            .filter(|change| self.include_change(change))
            .collect();

        tracing::info!(
            zone = desired.name(),
            exists = exists,
            changes = changes.len(),
            "Plan computed"
        );
        Ok(Plan {
            desired: desired.clone(),
            exists,
            changes,
        })
    }

    /// Applies the changes of `plan` in order.
    ///
    /// Create failures abort the pass. Update and delete failures reported by
    /// the provider are logged and the pass moves on; authentication and
    /// transport failures abort it.
    pub fn apply(&mut self, plan: &Plan) -> Result<ApplyReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("apply", run_id = %run_id, zone = plan.desired.name());
        let _enter = span.enter();

        let zone = &plan.desired;
        tracing::debug!(changes = plan.changes.len(), "Applying changes");

        let zone_id = match self.cache.zone(zone.name()) {
            Some(remote) => remote.id.clone(),
            None => self.create_zone(zone.name())?.id,
        };

        let mut report = ApplyReport::default();
        for change in &plan.changes {
            let state = self.apply_change(zone, &zone_id, change)?;
            tracing::debug!(
                kind = change.kind(),
                record = %change.record(),
                from = ?ChangeState::from(change),
                to = ?state,
                "Change processed"
            );
            report.outcomes.push(state);
            report.processed += 1;
        }

        tracing::info!(
            processed = report.processed,
            applied = report.count(ChangeState::Applied),
            skipped = report.count(ChangeState::Skipped),
            failed = report.count(ChangeState::Failed),
            "Apply completed"
        );
        Ok(report)
    }

    fn apply_change(&mut self, zone: &Zone, zone_id: &str, change: &Change) -> Result<ChangeState> {
        if !self.include_change(change) {
            return Ok(ChangeState::Skipped);
        }

        match change {
            Change::Create { new } => {
                let rrset = to_wire(new, zone);
                tracing::debug!(zone_id = zone_id, rrset = ?rrset, "Creating rrset");
                let created = self.client.create_rrset(zone_id, &rrset)?;
                if let Some(id) = created.id {
                    self.cache
                        .insert_rrset(zone.name(), rrset.kind, &rrset.name, id);
                }
                Ok(ChangeState::Applied)
            }
            Change::Update { existing, new } => {
                let rrset_id = self.rrset_id(zone, existing)?;
                let rrset = to_wire(new, zone);
                tracing::debug!(zone_id = zone_id, rrset_id = rrset_id.as_str(), "Updating rrset");
                let result = self
                    .client
                    .update_rrset(zone_id, &rrset_id, &rrset)
                    .map(|new_id| {
                        if let Some(id) = new_id {
                            self.cache
                                .insert_rrset(zone.name(), rrset.kind, &rrset.name, id);
                        }
                    });
                best_effort("update", &rrset_id, result)
            }
            Change::Delete { existing } => {
                let rrset_id = self.rrset_id(zone, existing)?;
                tracing::debug!(zone_id = zone_id, rrset_id = rrset_id.as_str(), "Deleting rrset");
                let result = self.client.delete_rrset(zone_id, &rrset_id);
                best_effort("delete", &rrset_id, result)
            }
        }
    }

    fn rrset_id(&self, zone: &Zone, record: &StructuredRecord) -> Result<String> {
        self.cache
            .rrset_id(zone.name(), record.record_type(), &zone.fqdn(&record.name))
            .map(String::from)
    }

    /// Plans and applies every zone in turn. With `dry_run` the plans are
    /// only logged. Returns the number of processed changes.
    pub fn sync(&mut self, zones: &[Zone], dry_run: bool) -> Result<usize> {
        let mut processed = 0;
        for zone in zones {
            let plan = self.plan(zone)?;
            if dry_run {
                for change in &plan.changes {
                    tracing::info!(
                        zone = zone.name(),
                        kind = change.kind(),
                        record = %change.record(),
                        "Planned change"
                    );
                }
                continue;
            }
            if plan.is_empty() && plan.exists {
                continue;
            }
            processed += self.apply(&plan)?.processed;
        }
        Ok(processed)
    }
}

fn best_effort(operation: &str, rrset_id: &str, result: Result<()>) -> Result<ChangeState> {
    match result {
        Ok(()) => Ok(ChangeState::Applied),
        Err(err) if err.is_recoverable() => {
            tracing::warn!(
                operation = operation,
                rrset_id = rrset_id,
                error = %err,
                "Provider rejected change"
            );
            Ok(ChangeState::Failed)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::common::{
        Error, MxValue, RRSetRecord, RemoteRRSet, Response, SshfpValue, WireRRSet,
    };
    use crate::selectel::check_response;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        ListZones,
        CreateZone(String),
        ListRRSets(String),
        CreateRRSet(String, serde_json::Value),
        UpdateRRSet(String, String, serde_json::Value),
        DeleteRRSet(String, String),
    }

    /// In-memory provider recording every call. `failures` maps an rrset id
    /// (or "create") to the HTTP status the provider answers with.
    #[derive(Default)]
    struct RecordingClient {
        zones: Vec<RemoteZone>,
        rrsets: HashMap<String, Vec<RemoteRRSet>>,
        failures: HashMap<String, u16>,
        renamed: HashMap<String, String>,
        calls: RefCell<Vec<Call>>,
    }

    impl RecordingClient {
        fn with_zone(mut self, id: &str, name: &str, rrsets: Vec<RemoteRRSet>) -> Self {
            self.zones.push(RemoteZone {
                id: id.into(),
                name: name.into(),
            });
            self.rrsets.insert(id.into(), rrsets);
            self
        }

        fn failing(mut self, key: &str, status: u16) -> Self {
            self.failures.insert(key.into(), status);
            self
        }

        fn renaming(mut self, old: &str, new: &str) -> Self {
            self.renamed.insert(old.into(), new.into());
            self
        }

        fn fail(&self, key: &str) -> Result<()> {
            match self.failures.get(key) {
                Some(status) => check_response(&Response::new(*status, "")).map(|_| ()),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        fn writes(&self) -> Vec<Call> {
            self.calls()
                .into_iter()
                .filter(|call| !matches!(call, Call::ListZones | Call::ListRRSets(_)))
                .collect()
        }
    }

    impl DnsClient for RecordingClient {
        fn list_zones(&self) -> Result<Vec<RemoteZone>> {
            self.calls.borrow_mut().push(Call::ListZones);
            self.fail("list")?;
            Ok(self.zones.clone())
        }

        fn create_zone(&self, name: &str) -> Result<RemoteZone> {
            self.calls.borrow_mut().push(Call::CreateZone(name.into()));
            Ok(RemoteZone {
                id: "new-zone".into(),
                name: name.into(),
            })
        }

        fn list_rrsets(&self, zone_id: &str) -> Result<Vec<RemoteRRSet>> {
            self.calls.borrow_mut().push(Call::ListRRSets(zone_id.into()));
            Ok(self.rrsets.get(zone_id).cloned().unwrap_or_default())
        }

        fn create_rrset(&self, zone_id: &str, rrset: &WireRRSet) -> Result<RemoteRRSet> {
            let body = serde_json::to_value(rrset).unwrap();
            self.calls
                .borrow_mut()
                .push(Call::CreateRRSet(zone_id.into(), body));
            self.fail("create")?;
            Ok(RemoteRRSet {
                id: Some(format!("created-{}", rrset.name)),
                zone_id: Some(zone_id.into()),
                name: rrset.name.clone(),
                ttl: rrset.ttl,
                kind: rrset.kind.to_string(),
                records: rrset.records.clone(),
            })
        }

        fn update_rrset(
            &self,
            zone_id: &str,
            rrset_id: &str,
            rrset: &WireRRSet,
        ) -> Result<Option<String>> {
            let body = serde_json::to_value(rrset).unwrap();
            self.calls.borrow_mut().push(Call::UpdateRRSet(
                zone_id.into(),
                rrset_id.into(),
                body,
            ));
            self.fail(rrset_id)?;
            Ok(self.renamed.get(rrset_id).cloned())
        }

        fn delete_rrset(&self, zone_id: &str, rrset_id: &str) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(Call::DeleteRRSet(zone_id.into(), rrset_id.into()));
            self.fail(rrset_id)
        }
    }

    fn remote(id: &str, name: &str, kind: &str, ttl: u32, contents: &[&str]) -> RemoteRRSet {
        RemoteRRSet {
            id: Some(id.into()),
            zone_id: Some("z1".into()),
            name: name.into(),
            ttl,
            kind: kind.into(),
            records: contents
                .iter()
                .map(|c| RRSetRecord::from(c.to_string()))
                .collect(),
        }
    }

    fn a(name: &str, ttl: u32, values: &[&str]) -> StructuredRecord {
        StructuredRecord::new(
            name,
            ttl,
            RecordData::A(values.iter().map(|v| v.to_string()).collect()),
        )
    }

    fn example_client() -> RecordingClient {
        RecordingClient::default().with_zone(
            "z1",
            "example.com.",
            vec![
                remote("r1", "www.example.com.", "A", 3600, &["1.1.1.1"]),
                remote("r2", "mail.example.com.", "A", 3600, &["2.2.2.2"]),
                remote("r3", "old.example.com.", "A", 3600, &["3.3.3.3"]),
                remote("r4", "example.com.", "SOA", 3600, &["ns1. admin. 1 2 3 4 5"]),
            ],
        )
    }

    fn populated(client: RecordingClient) -> (DNSSync<RecordingClient>, Zone) {
        let mut sync = DNSSync::new(client).unwrap();
        let mut zone = Zone::new("example.com.");
        assert!(sync.populate(&mut zone, true, false).unwrap());
        (sync, zone)
    }

    #[test]
    fn test_creates_missing_zone_once() {
        let mut sync = DNSSync::new(RecordingClient::default()).unwrap();
        let desired = Zone::new("example.com.");
        let plan = Plan::new(
            desired,
            vec![Change::Create {
                new: a("", 300, &["1.2.3.4"]),
            }],
        );

        let report = sync.apply(&plan).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.outcomes, vec![ChangeState::Applied]);
        assert_eq!(
            sync.client().writes(),
            vec![
                Call::CreateZone("example.com.".into()),
                Call::CreateRRSet(
                    "new-zone".into(),
                    json!({
                        "name": "example.com.",
                        "type": "A",
                        "ttl": 300,
                        "records": [{"content": "1.2.3.4"}],
                    })
                ),
            ]
        );
        assert_eq!(sync.list_zones(), vec!["example.com."]);
        assert!(matches!(
            sync.cache()
                .rrset_id("example.com.", RecordType::A, "example.com.")
                .unwrap_err(),
            Error::ZoneNotListed { .. }
        ));
    }

    #[test]
    fn test_populate() {
        let (sync, zone) = populated(example_client());
        assert_eq!(zone.records().len(), 3);
        assert_eq!(zone.find("www", RecordType::A), Some(&a("www", 3600, &["1.1.1.1"])));
        assert_eq!(
            sync.client().calls(),
            vec![Call::ListZones, Call::ListRRSets("z1".into())]
        );
    }

    #[test]
    fn test_populate_unknown_zone() {
        let mut sync = DNSSync::new(example_client()).unwrap();
        let mut zone = Zone::new("missing.org.");
        assert!(!sync.populate(&mut zone, false, false).unwrap());
        assert!(zone.records().is_empty());
        assert_eq!(sync.client().calls(), vec![Call::ListZones]);
    }

    #[test]
    fn test_populate_lenient() {
        let rrsets = vec![
            remote("r1", "example.com.", "MX", 3600, &["not-a-preference mail.example.com."]),
            remote("r2", "www.example.com.", "A", 3600, &["1.1.1.1"]),
            remote("r3", "www.example.com.", "A", 3600, &["9.9.9.9"]),
        ];
        let client = RecordingClient::default().with_zone("z1", "example.com.", rrsets);
        let mut sync = DNSSync::new(client).unwrap();

        let mut zone = Zone::new("example.com.");
        let err = sync.populate(&mut zone, false, false).unwrap_err();
        assert!(matches!(err, Error::MalformedContent { .. }));

        let mut zone = Zone::new("example.com.");
        assert!(sync.populate(&mut zone, false, true).unwrap());
        assert_eq!(zone.records(), &[a("www", 3600, &["1.1.1.1"])]);
    }

    #[test]
    fn test_ttl_floor_is_not_a_change() {
        let client = RecordingClient::default().with_zone(
            "z1",
            "example.com.",
            vec![remote("r1", "www.example.com.", "A", 60, &["1.1.1.1"])],
        );
        let (mut sync, zone) = populated(client);
        let change = Change::Update {
            existing: zone.records()[0].clone(),
            new: a("www", 30, &["1.1.1.1"]),
        };
        assert!(!sync.include_change(&change));

        let report = sync
            .apply(&Plan::new(Zone::new("example.com."), vec![change]))
            .unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.outcomes, vec![ChangeState::Skipped]);
        assert!(sync.client().writes().is_empty());
    }

    #[test]
    fn test_sshfp_fingerprint_case_is_not_a_change() {
        let sshfp = |fingerprint: &str| {
            StructuredRecord::new(
                "host",
                3600,
                RecordData::Sshfp(vec![SshfpValue {
                    algorithm: 1,
                    fingerprint_type: 1,
                    fingerprint: fingerprint.into(),
                }]),
            )
        };
        let sync = DNSSync::new(RecordingClient::default()).unwrap();
        assert!(!sync.include_change(&Change::Update {
            existing: sshfp("abcdef0123"),
            new: sshfp("ABCDEF0123"),
        }));
        assert!(sync.include_change(&Change::Update {
            existing: sshfp("abcdef0123"),
            new: sshfp("abcdef0124"),
        }));
        assert!(sync.include_change(&Change::Delete {
            existing: sshfp("abcdef0123"),
        }));
    }

    #[test]
    fn test_declared_zone_converges() {
        let client = RecordingClient::default().with_zone(
            "z1",
            "example.com.",
            vec![
                remote("r1", "example.com.", "TXT", 3600, &["\"v=spf1; -all\""]),
                remote("r2", "www.example.com.", "CNAME", 3600, &["example.com."]),
                remote("r3", "example.com.", "MX", 3600, &["10 mail.example.com."]),
                remote("r4", "_sip._tcp.example.com.", "SRV", 3600, &["10 20 5060 sip.example.com."]),
            ],
        );
        let mut sync = DNSSync::new(client).unwrap();
        let specs: Vec<crate::common::RecordSpec> = serde_json::from_value(json!([
            {"type": "TXT", "values": ["v=spf1; -all"]},
            {"name": "www", "type": "CNAME", "value": "example.com"},
            {"type": "MX", "values": [{"preference": 10, "exchange": "mail.example.com"}]},
            {"name": "_sip._tcp", "type": "SRV", "values": [
                {"priority": 10, "weight": 20, "port": 5060, "target": "sip.example.com"}
            ]},
        ]))
        .unwrap();
        let mut desired = Zone::new("example.com.");
        for spec in specs {
            desired
                .add_record(StructuredRecord::try_from(spec).unwrap())
                .unwrap();
        }

        let plan = sync.plan(&desired).unwrap();
        assert!(plan.exists);
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn test_partial_failure_keeps_going() {
        let (mut sync, zone) = populated(example_client().failing("r1", 409));
        let plan = Plan::new(
            zone.clone(),
            vec![
                Change::Update {
                    existing: zone.find("www", RecordType::A).unwrap().clone(),
                    new: a("www", 3600, &["4.4.4.4"]),
                },
                Change::Update {
                    existing: zone.find("mail", RecordType::A).unwrap().clone(),
                    new: a("mail", 3600, &["5.5.5.5"]),
                },
                Change::Delete {
                    existing: zone.find("old", RecordType::A).unwrap().clone(),
                },
            ],
        );

        let report = sync.apply(&plan).unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(
            report.outcomes,
            vec![
                ChangeState::Failed,
                ChangeState::Applied,
                ChangeState::Applied
            ]
        );
        assert_eq!(report.count(ChangeState::Failed), 1);

        let writes = sync.client().writes();
        assert_eq!(writes.len(), 3);
        assert!(matches!(&writes[0], Call::UpdateRRSet(_, id, _) if id == "r1"));
        assert!(matches!(&writes[1], Call::UpdateRRSet(_, id, _) if id == "r2"));
        assert_eq!(writes[2], Call::DeleteRRSet("z1".into(), "r3".into()));
    }

    #[test]
    fn test_fatal_errors_abort() {
        let (mut sync, zone) = populated(example_client().failing("r1", 401));
        let plan = Plan::new(
            zone.clone(),
            vec![
                Change::Delete {
                    existing: zone.find("www", RecordType::A).unwrap().clone(),
                },
                Change::Delete {
                    existing: zone.find("mail", RecordType::A).unwrap().clone(),
                },
            ],
        );
        let err = sync.apply(&plan).unwrap_err();
        assert!(matches!(err, Error::Authentication));
        assert!(!err.is_recoverable());
        assert_eq!(sync.client().writes().len(), 1);

        let (mut sync, zone) = populated(example_client().failing("create", 422));
        let plan = Plan::new(
            zone.clone(),
            vec![
                Change::Create {
                    new: a("new", 3600, &["6.6.6.6"]),
                },
                Change::Delete {
                    existing: zone.find("old", RecordType::A).unwrap().clone(),
                },
            ],
        );
        let err = sync.apply(&plan).unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
        assert_eq!(sync.client().writes().len(), 1);
    }

    #[test]
    fn test_updates_need_a_listing() {
        let mut sync = DNSSync::new(example_client()).unwrap();
        let plan = Plan::new(
            Zone::new("example.com."),
            vec![Change::Delete {
                existing: a("www", 3600, &["1.1.1.1"]),
            }],
        );
        let err = sync.apply(&plan).unwrap_err();
        assert!(matches!(err, Error::ZoneNotListed { .. }));
        assert!(sync.client().writes().is_empty());
    }

    #[test]
    fn test_plan() {
        let mut sync = DNSSync::new(example_client()).unwrap();
        let mut desired = Zone::new("example.com");
        desired.add_record(a("www", 3600, &["1.1.1.1"])).unwrap();
        desired.add_record(a("mail", 3600, &["7.7.7.7"])).unwrap();
        desired
            .add_record(StructuredRecord::new(
                "",
                3600,
                RecordData::Mx(vec![MxValue {
                    preference: 10,
                    exchange: "mail.example.com.".into(),
                }]),
            ))
            .unwrap();

        let plan = sync.plan(&desired).unwrap();
        assert!(plan.exists);
        let kinds: Vec<&str> = plan.changes.iter().map(Change::kind).collect();
        assert_eq!(kinds, vec!["delete", "update", "create"]);
        assert_eq!(plan.changes[0].record().name, "old");

        let report = sync.apply(&plan).unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.count(ChangeState::Applied), 3);
    }

    #[test]
    fn test_sync_dry_run() {
        let mut sync = DNSSync::new(example_client()).unwrap();
        let mut desired = Zone::new("example.com.");
        desired.add_record(a("www", 3600, &["8.8.8.8"])).unwrap();
        assert_eq!(sync.sync(&[desired.clone()], true).unwrap(), 0);
        assert!(sync.client().writes().is_empty());

        assert_eq!(sync.sync(&[desired], false).unwrap(), 3);
        assert_eq!(sync.client().writes().len(), 3);
    }

    #[test]
    fn test_update_refreshes_record_set_id() {
        let client = example_client().renaming("r1", "r1b");
        let (mut sync, zone) = populated(client);
        let www = zone.find("www", RecordType::A).unwrap().clone();

        let plan = Plan::new(
            zone.clone(),
            vec![Change::Update {
                existing: www.clone(),
                new: a("www", 3600, &["4.4.4.4"]),
            }],
        );
        sync.apply(&plan).unwrap();
        assert_eq!(
            sync.cache()
                .rrset_id("example.com.", RecordType::A, "www.example.com.")
                .unwrap(),
            "r1b"
        );

        let plan = Plan::new(zone, vec![Change::Delete { existing: www }]);
        sync.apply(&plan).unwrap();
        assert_eq!(
            sync.client().writes().last(),
            Some(&Call::DeleteRRSet("z1".into(), "r1b".into()))
        );
    }

    #[test]
    fn test_legacy_update_then_delete_uses_new_records() {
        use crate::common::testing::ScriptedTransport;
        use crate::legacy::LegacyClient;

        let total = |count: usize| Response::new(200, "").with_header("X-Total-Count", count.to_string());
        let ok = |body: serde_json::Value| Response::new(200, body.to_string());
        let www = |id: u32, content: &str| {
            json!({"id": id, "name": "www.example.com", "type": "A", "ttl": 3600, "content": content})
        };

        let transport = ScriptedTransport::new(vec![
            total(1),
            ok(json!([{"id": 1, "name": "example.com"}])),
            // first plan
            total(1),
            ok(json!([www(30, "1.1.1.1")])),
            // update: delete then create
            Response::new(204, ""),
            ok(www(31, "2.2.2.2")),
            // second plan
            total(1),
            ok(json!([www(31, "2.2.2.2")])),
            // delete
            Response::new(204, ""),
        ]);
        let mut sync = DNSSync::new(LegacyClient::new(transport)).unwrap();

        let mut desired = Zone::new("example.com.");
        desired.add_record(a("www", 3600, &["2.2.2.2"])).unwrap();
        let plan = sync.plan(&desired).unwrap();
        assert_eq!(sync.apply(&plan).unwrap().outcomes, vec![ChangeState::Applied]);

        let plan = sync.plan(&Zone::new("example.com.")).unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(sync.apply(&plan).unwrap().outcomes, vec![ChangeState::Applied]);

        let sent = sync.client().transport().sent();
        let last = sent.last().unwrap();
        assert_eq!(last.method, "DELETE");
        assert_eq!(last.path, "/1/records/31");
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_failed_change_is_logged() {
        let (mut sync, zone) = populated(example_client().failing("r1", 409));
        let plan = Plan::new(
            zone.clone(),
            vec![
                Change::Update {
                    existing: zone.find("www", RecordType::A).unwrap().clone(),
                    new: a("www", 3600, &["4.4.4.4"]),
                },
                Change::Delete {
                    existing: zone.find("old", RecordType::A).unwrap().clone(),
                },
            ],
        );

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let report = tracing::subscriber::with_default(subscriber, || sync.apply(&plan).unwrap());
        assert_eq!(report.processed, 2);

        let output = logs.contents();
        let warnings: Vec<&str> = output.lines().filter(|line| line.contains("WARN")).collect();
        assert_eq!(warnings.len(), 1, "{output}");
        assert!(warnings[0].contains("Provider rejected change"));
        assert!(warnings[0].contains("update"));
        assert!(warnings[0].contains("r1"));
        assert!(!warnings[0].contains("r3"));
    }

    #[test]
    fn test_best_effort() {
        let conflict = check_response(&Response::new(409, "")).map(|_| ());
        assert_eq!(
            best_effort("update", "r1", conflict).unwrap(),
            ChangeState::Failed
        );
        assert_eq!(
            best_effort("delete", "r1", Ok(())).unwrap(),
            ChangeState::Applied
        );
        let unauthorized = check_response(&Response::new(401, "")).map(|_| ());
        assert!(matches!(
            best_effort("delete", "r1", unauthorized).unwrap_err(),
            Error::Authentication
        ));
    }
}
