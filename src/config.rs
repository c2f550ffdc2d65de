use crate::common::{ConfigSnafu, DnsClient, Result};

/// Top-level settings: exactly one provider plus the desired-state source.
#[derive(Clone, Default, serde::Deserialize)]
pub struct Config {
    pub selectel: Option<crate::selectel::Config>,
    pub legacy: Option<crate::legacy::Config>,

    pub jsonfile: Option<crate::jsonfile::Config>,
}

impl Config {
    pub const ENV_PREFIX: &'static str = "DNSSYNC";

    /// Reads `DNSSYNC_<SECTION>__<KEY>` variables, e.g. `DNSSYNC_SELECTEL__TOKEN`.
    #[cfg(feature = "cli")]
    pub fn from_env() -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(
                ::config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(|settings| settings.try_deserialize::<Self>())
            .map_err(|err| {
                ConfigSnafu {
                    message: err.to_string(),
                    prefix: Self::ENV_PREFIX,
                }
                .build()
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        match (&self.selectel, &self.legacy) {
            (Some(_), Some(_)) => {
                return ConfigSnafu {
                    message: "only one of selectel and legacy may be configured",
                    prefix: Self::ENV_PREFIX,
                }
                .fail()
            }
            (None, None) => {
                return ConfigSnafu {
                    message: "a selectel or legacy provider is required",
                    prefix: Self::ENV_PREFIX,
                }
                .fail()
            }
            _ => {}
        }
        if self.jsonfile.is_none() {
            return ConfigSnafu {
                message: "a jsonfile source is required",
                prefix: Self::ENV_PREFIX,
            }
            .fail();
        }
        Ok(())
    }

    pub fn build_client(&self) -> Result<Box<dyn DnsClient>> {
        self.validate()?;
        if let Some(cfg) = self.selectel.clone() {
            return Ok(Box::new(crate::selectel::SelectelClient::try_from(cfg)?));
        }
        match self.legacy.clone() {
            Some(cfg) => Ok(Box::new(crate::legacy::LegacyClient::try_from(cfg)?)),
            None => ConfigSnafu {
                message: "no provider configured",
                prefix: Self::ENV_PREFIX,
            }
            .fail(),
        }
    }

    pub fn build_source(&self) -> Result<crate::jsonfile::JSONFileSource> {
        match self.jsonfile.clone() {
            Some(cfg) => Ok(cfg.into()),
            None => ConfigSnafu {
                message: "a jsonfile source is required",
                prefix: "jsonfile",
            }
            .fail(),
        }
    }

    pub fn get_service(&self) -> Result<crate::service::DNSSync<Box<dyn DnsClient>>> {
        crate::service::DNSSync::new(self.build_client()?)
    }
}
