//! Configuration surface: `{ schema, expireCheckInterval,
//! newJobCheckInterval, uuid }`.
//!
//! Ambient configuration, constructed explicitly via [`Config::builder`] or
//! loaded from the environment. With the `config` feature, [`Config`] can
//! additionally be loaded from environment variables (prefixed `PGQ_`) or a
//! TOML file via `figment`.

use std::time::Duration;

/// Which UUID variant [`crate::id::IdFactory`] should mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UuidVersion {
    V1,
    #[default]
    V4,
}

#[cfg(feature = "config")]
impl<'de> serde::Deserialize<'de> for UuidVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "v1" => Ok(UuidVersion::V1),
            "v4" => Ok(UuidVersion::V4),
            other => Err(serde::de::Error::custom(format!(
                "unknown uuid version: {other}, expected 'v1' or 'v4'"
            ))),
        }
    }
}

/// Top-level Manager configuration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct Config {
    /// Table name prefix; also the schema handed to [`crate::plans::Plans`].
    pub schema: String,
    /// How often the expiration monitor sweeps for overdue `active` jobs.
    #[cfg_attr(feature = "config", serde(with = "duration_millis"))]
    pub expire_check_interval: Duration,
    /// Default polling interval for workers that don't override it in
    /// `SubscribeOptions`.
    #[cfg_attr(feature = "config", serde(with = "duration_millis"))]
    pub new_job_check_interval: Duration,
    /// Which UUID variant new job ids use.
    pub uuid_version: UuidVersion,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: "pgq".to_string(),
            expire_check_interval: Duration::from_secs(60),
            new_job_check_interval: Duration::from_secs(1),
            uuid_version: UuidVersion::V4,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from `PGQ_`-prefixed env vars, optionally
    /// layered over a TOML file, falling back to [`Config::default`] for
    /// anything unset.
    #[cfg(feature = "config")]
    pub fn load(toml_path: Option<&str>) -> Result<Self, figment::Error> {
        use figment::providers::{Env, Format, Toml};
        use figment::Figment;

        let mut figment = Figment::from(figment::providers::Serialized::defaults(Self::default()));
        if let Some(path) = toml_path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed("PGQ_")).extract()
    }
}

#[cfg(feature = "config")]
impl serde::Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Config", 4)?;
        state.serialize_field("schema", &self.schema)?;
        state.serialize_field(
            "expire_check_interval",
            &self.expire_check_interval.as_millis(),
        )?;
        state.serialize_field(
            "new_job_check_interval",
            &self.new_job_check_interval.as_millis(),
        )?;
        state.serialize_field(
            "uuid_version",
            match self.uuid_version {
                UuidVersion::V1 => "v1",
                UuidVersion::V4 => "v4",
            },
        )?;
        state.end()
    }
}

#[cfg(feature = "config")]
mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Builder for [`Config`], preferring compile-time field names over a
/// loosely typed options bag.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: ConfigOverrides,
}

#[derive(Debug, Clone, Default)]
struct ConfigOverrides {
    schema: Option<String>,
    expire_check_interval: Option<Duration>,
    new_job_check_interval: Option<Duration>,
    uuid_version: Option<UuidVersion>,
}

impl ConfigBuilder {
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.config.schema = Some(schema.into());
        self
    }

    pub fn expire_check_interval(mut self, interval: Duration) -> Self {
        self.config.expire_check_interval = Some(interval);
        self
    }

    pub fn new_job_check_interval(mut self, interval: Duration) -> Self {
        self.config.new_job_check_interval = Some(interval);
        self
    }

    pub fn uuid_version(mut self, version: UuidVersion) -> Self {
        self.config.uuid_version = Some(version);
        self
    }

    pub fn build(self) -> Config {
        let defaults = Config::default();
        Config {
            schema: self.config.schema.unwrap_or(defaults.schema),
            expire_check_interval: self
                .config
                .expire_check_interval
                .unwrap_or(defaults.expire_check_interval),
            new_job_check_interval: self
                .config
                .new_job_check_interval
                .unwrap_or(defaults.new_job_check_interval),
            uuid_version: self.config.uuid_version.unwrap_or(defaults.uuid_version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(config.schema, "pgq");
        assert_eq!(config.expire_check_interval, Duration::from_secs(60));
        assert_eq!(config.new_job_check_interval, Duration::from_secs(1));
        assert_eq!(config.uuid_version, UuidVersion::V4);
    }

    #[test]
    fn builder_overrides_individual_fields() {
        let config = Config::builder()
            .schema("custom")
            .uuid_version(UuidVersion::V1)
            .build();
        assert_eq!(config.schema, "custom");
        assert_eq!(config.uuid_version, UuidVersion::V1);
        assert_eq!(config.expire_check_interval, Duration::from_secs(60));
    }
}
