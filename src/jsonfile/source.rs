use std::{fs::File, io::BufReader, path::PathBuf};

use snafu::ResultExt;

use crate::common::{Result, SourceSnafu, Zone};

use super::{models::ZoneFile, SOURCE_NAME};

/// Reads the desired state of every managed zone from a JSON file.
pub struct JSONFileSource {
    source: PathBuf,
}

impl JSONFileSource {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn read_zones(&self) -> Result<Vec<Zone>> {
        let file = File::open(&self.source)
            .boxed_local()
            .context(SourceSnafu {
                source_name: SOURCE_NAME,
                message: format!("Failed to open source {}", self.source.display()),
            })?;

        let reader = BufReader::new(file);
        let files: Vec<ZoneFile> = serde_json::from_reader(reader)
            .boxed_local()
            .context(SourceSnafu {
                source_name: SOURCE_NAME,
                message: "Failed to read zones from source",
            })?;

        let zones = files
            .into_iter()
            .map(Zone::try_from)
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            source = SOURCE_NAME,
            zones = zones.len(),
            records = zones.iter().map(|z| z.records().len()).sum::<usize>(),
            "Read completed",
        );
        Ok(zones)
    }
}

impl From<super::Config> for JSONFileSource {
    fn from(value: super::Config) -> Self {
        Self::new(value.source)
    }
}
