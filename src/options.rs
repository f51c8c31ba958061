use crate::config::Output;
use crate::register::AddressSpace;
use crate::trend::TrendSource;

use clap::Parser;

/// solax-monitor - polls a SolaX inverter and shows how its registers change
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read (built-in defaults when omitted)
    #[clap(short = 'c', long = "config")]
    pub config_file: Option<String>,

    /// Inverter host, overrides the config file
    #[clap(long = "host")]
    pub host: Option<String>,

    /// Inverter Modbus TCP port, overrides the config file
    #[clap(long = "port")]
    pub port: Option<u16>,

    /// Seconds between poll passes, 0 for a single pass
    #[clap(short = 'i', long = "interval")]
    pub interval: Option<u64>,

    /// Address space to poll, may be repeated
    #[clap(short = 's', long = "space")]
    pub spaces: Vec<AddressSpace>,

    /// Run a single pass and exit
    #[clap(long = "once")]
    pub once: bool,

    /// Optional runtime limit in seconds
    #[clap(short = 't', long = "time")]
    pub runtime: Option<u64>,

    /// Output format
    #[clap(long = "output")]
    pub output: Option<Output>,

    /// Number compared between polls to work out trends
    #[clap(long = "trend-source")]
    pub trend_source: Option<TrendSource>,

    /// Print the loaded register catalogs as YAML and exit
    #[clap(long = "dump-catalog")]
    pub dump_catalog: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }

    pub fn parse_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(args)
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::parse_from_args(["solax-monitor"])
    }
}
