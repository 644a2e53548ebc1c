//! src/configuration.rs
use serde_aux::field_attributes::deserialize_number_from_string;
use std::time::Duration;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub node: NodeSettings,
    pub job: JobSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct NodeSettings {
    /// IP the RPC and file servers bind; also the host part of the address
    /// this node advertises to its peers.
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_interval_ms: u64,
    pub scratch_root: String,
}

impl NodeSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct JobSettings {
    pub input_path: String,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory.");
    let config_dir = base_path.join("configuration");

    let settings = config::Config::builder()
        .add_source(config::File::from(config_dir.join("base.yaml")))
        .add_source(
            config::Environment::with_prefix("MAPRED")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
