use crate::common::{RecordSpec, Result, StructuredRecord, Zone};

/// One zone as written in the source file.
#[derive(serde::Deserialize)]
pub(super) struct ZoneFile {
    pub zone: String,
    #[serde(default)]
    pub records: Vec<RecordSpec>,
}

impl TryFrom<ZoneFile> for Zone {
    type Error = crate::common::Error;

    fn try_from(value: ZoneFile) -> Result<Self> {
        let mut zone = Zone::new(&value.zone);
        for mut spec in value.records {
            // Ensure all the types are correctly cased
            spec.kind.make_ascii_uppercase();
            zone.add_record(StructuredRecord::try_from(spec)?)?;
        }
        Ok(zone)
    }
}
