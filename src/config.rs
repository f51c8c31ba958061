use crate::prelude::*;

use crate::options::Options;
use crate::trend::TrendSource;

use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,

    #[serde(default)]
    pub inverter: Inverter,

    #[serde(default)]
    pub poll: Poll,

    /// Per-space catalog files replacing the built-in tables.
    #[serde(default)]
    pub catalogs: HashMap<AddressSpace, PathBuf>,

    #[serde(default)]
    pub output: Output,
}

// Inverter {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inverter {
    #[serde(default = "Config::default_host")]
    pub host: String,

    #[serde(default = "Config::default_port")]
    pub port: u16,

    #[serde(default = "Config::default_unit_id")]
    pub unit_id: u8,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "Config::default_timeout")]
    pub timeout: Duration,
}

impl Default for Inverter {
    fn default() -> Self {
        Self {
            host: Config::default_host(),
            port: Config::default_port(),
            unit_id: Config::default_unit_id(),
            timeout: Config::default_timeout(),
        }
    }
}

impl Inverter {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
} // }}}

// Poll {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Poll {
    /// Zero runs a single pass.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "Config::default_interval")]
    pub interval: Duration,

    #[serde(default = "Config::default_spaces")]
    pub spaces: Vec<AddressSpace>,

    #[serde(default)]
    pub trend_source: TrendSource,
}

impl Default for Poll {
    fn default() -> Self {
        Self {
            interval: Config::default_interval(),
            spaces: Config::default_spaces(),
            trend_source: TrendSource::default(),
        }
    }
}

impl Poll {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn once(&self) -> bool {
        self.interval.is_zero()
    }

    pub fn spaces(&self) -> &[AddressSpace] {
        &self.spaces
    }

    pub fn trend_source(&self) -> TrendSource {
        self.trend_source
    }
} // }}}

// Output {{{
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Output {
    #[default]
    Table,
    Json,
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
        }
    }
} // }}}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: Self::default_loglevel(),
            inverter: Inverter::default(),
            poll: Poll::default(),
            catalogs: HashMap::new(),
            output: Output::default(),
        }
    }
}

impl Config {
    /// Reads `file` as is. [`Config::load`] validates after applying the
    /// command line.
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("config.rs:error reading {}: {}", file, err))?;

        Self::parse(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    // Values are checked by `validate` once command line overrides are in.
    fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|err| anyhow!("config.rs:error parsing config: {}", err))
    }

    /// Built-in defaults, or the file named by `-c`, with command line values
    /// applied on top. Runs before logging is set up, so nothing is logged.
    pub fn load(options: &Options) -> Result<Self> {
        let mut config = match &options.config_file {
            Some(file) => Self::new(file.clone())?,
            None => Self::default(),
        };

        config.apply(options);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, options: &Options) {
        if let Some(host) = &options.host {
            self.inverter.host = host.clone();
        }
        if let Some(port) = options.port {
            self.inverter.port = port;
        }
        if let Some(interval) = options.interval {
            self.poll.interval = Duration::from_secs(interval);
        }
        if options.once {
            self.poll.interval = Duration::ZERO;
        }
        if !options.spaces.is_empty() {
            self.poll.spaces = options.spaces.clone();
        }
        if let Some(trend_source) = options.trend_source {
            self.poll.trend_source = trend_source;
        }
        if let Some(output) = options.output {
            self.output = output;
        }
    }

    pub fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!("  Inverter:");
        info!("    Host: {}", self.inverter.host);
        info!("    Port: {}", self.inverter.port);
        info!("    Unit ID: {}", self.inverter.unit_id);
        info!("    Timeout: {}s", self.inverter.timeout.as_secs());
        info!("  Poll:");
        if self.poll.once() {
            info!("    Interval: single pass");
        } else {
            info!("    Interval: {}s", self.poll.interval.as_secs());
        }
        info!(
            "    Spaces: {}",
            self.poll
                .spaces
                .iter()
                .map(|space| space.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        info!("    Trend Source: {:?}", self.poll.trend_source);
        for (space, path) in &self.catalogs {
            info!("  Catalog[{}]: {}", space, path.display());
        }
        info!("  Output: {}", self.output);
        info!("  Log Level: {}", self.loglevel);
    }

    pub fn validate(&self) -> Result<()> {
        if self.inverter.host.is_empty() {
            return Err(anyhow!("config.rs:inverter.host cannot be empty"));
        }
        if self.inverter.port == 0 {
            return Err(anyhow!("config.rs:inverter.port must be between 1 and 65535"));
        }
        if self.inverter.timeout.is_zero() {
            return Err(anyhow!("config.rs:Invalid inverter timeout: 0"));
        }

        if self.poll.spaces.is_empty() {
            return Err(anyhow!("config.rs:poll.spaces must name at least one space"));
        }
        let mut seen = Vec::with_capacity(self.poll.spaces.len());
        for space in &self.poll.spaces {
            if seen.contains(space) {
                return Err(anyhow!("config.rs:poll.spaces lists {} twice", space));
            }
            seen.push(*space);
        }

        Ok(())
    }

    pub fn loglevel(&self) -> &str {
        &self.loglevel
    }

    pub fn inverter(&self) -> &Inverter {
        &self.inverter
    }

    pub fn poll(&self) -> &Poll {
        &self.poll
    }

    pub fn catalogs(&self) -> &HashMap<AddressSpace, PathBuf> {
        &self.catalogs
    }

    pub fn output(&self) -> Output {
        self.output
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }

    fn default_host() -> String {
        "192.168.0.100".to_string()
    }

    fn default_port() -> u16 {
        502
    }

    fn default_unit_id() -> u8 {
        1
    }

    fn default_timeout() -> Duration {
        Duration::from_secs(5)
    }

    fn default_interval() -> Duration {
        Duration::from_secs(10)
    }

    fn default_spaces() -> Vec<AddressSpace> {
        AddressSpace::all().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.inverter().host(), "192.168.0.100");
        assert_eq!(config.inverter().port(), 502);
        assert_eq!(config.inverter().unit_id(), 1);
        assert_eq!(config.inverter().timeout(), Duration::from_secs(5));
        assert_eq!(config.poll().interval(), Duration::from_secs(10));
        assert_eq!(config.poll().spaces(), &AddressSpace::all());
        assert_eq!(config.poll().trend_source(), TrendSource::Value);
        assert_eq!(config.output(), Output::Table);
        assert_eq!(config.loglevel(), "info");
    }

    #[test]
    fn full_document() {
        let config = Config::from_yaml(
            r#"
loglevel: debug
inverter:
  host: inverter.lan
  port: 1502
  unit_id: 3
  timeout: 2
poll:
  interval: 0
  spaces: [parallel, holding]
  trend_source: display
catalogs:
  parallel: /etc/solax/parallel.yaml
output: json
"#,
        )
        .unwrap();

        assert_eq!(config.inverter().host(), "inverter.lan");
        assert_eq!(config.inverter().port(), 1502);
        assert_eq!(config.inverter().unit_id(), 3);
        assert_eq!(config.inverter().timeout(), Duration::from_secs(2));
        assert!(config.poll().once());
        assert_eq!(
            config.poll().spaces(),
            &[AddressSpace::Parallel, AddressSpace::Holding]
        );
        assert_eq!(config.poll().trend_source(), TrendSource::Display);
        assert_eq!(
            config.catalogs().get(&AddressSpace::Parallel),
            Some(&PathBuf::from("/etc/solax/parallel.yaml"))
        );
        assert_eq!(config.output(), Output::Json);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(Config::from_yaml("inverter: { host: '' }").is_err());
        assert!(Config::from_yaml("inverter: { port: 0 }").is_err());
        assert!(Config::from_yaml("inverter: { timeout: 0 }").is_err());
        assert!(Config::from_yaml("poll: { spaces: [] }").is_err());
        assert!(Config::from_yaml("poll: { spaces: [input, input] }").is_err());
        assert!(Config::from_yaml("poll: { spaces: [bogus] }").is_err());
        assert!(Config::from_yaml("mqtt: {}").is_err());
    }

    #[test]
    fn validation_errors_name_the_file() {
        let err = Config::from_yaml("inverter: { port: 0 }").unwrap_err();
        assert_eq!(
            err.to_string(),
            "config.rs:inverter.port must be between 1 and 65535"
        );
    }

    #[test]
    fn command_line_overrides() {
        let options = Options::parse_from_args([
            "solax-monitor",
            "--host",
            "10.0.0.7",
            "--port",
            "5020",
            "-s",
            "input",
            "-s",
            "self_test",
            "--once",
            "--output",
            "json",
        ]);

        let mut config = Config::default();
        config.apply(&options);

        assert_eq!(config.inverter().host(), "10.0.0.7");
        assert_eq!(config.inverter().port(), 5020);
        assert_eq!(
            config.poll().spaces(),
            &[AddressSpace::Input, AddressSpace::SelfTest]
        );
        assert!(config.poll().once());
        assert_eq!(config.output(), Output::Json);
        assert!(config.validate().is_ok());
    }
}
