pub mod catalog; // Register catalogs per address space
pub mod config; // Configuration management
pub mod coordinator; // Polling session and poll passes
pub mod decoder; // Raw words to display values
pub mod enumeration; // Code to label tables
pub mod error; // Error types
pub mod options; // Command line options parsing
pub mod prelude; // Common imports and types
pub mod presenter; // Table and JSON output
pub mod register; // Register definitions and address spaces
pub mod scheduler; // Interval driven polling
pub mod transport; // Transport trait and Modbus TCP client
pub mod trend; // Poll to poll value trends

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;

use crate::catalog::Catalog;
use crate::coordinator::{Coordinator, PollStats};
use crate::scheduler::Scheduler;
use crate::transport::ModbusTcpTransport;

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::broadcast;

/// Sets up env_logger with `level` as the default filter. `RUST_LOG` wins
/// when set.
pub fn init_logging(level: &str) {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init();

    if let Err(err) = result {
        debug!("logging already initialised: {}", err);
    }
}

#[derive(Serialize)]
struct CatalogDump<'a> {
    space: AddressSpace,
    table: RegisterTable,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    enumerations: &'a BTreeMap<String, BTreeMap<u16, String>>,
    registers: &'a [RegisterDefinition],
}

/// Writes `catalogs` as one YAML document each.
pub fn dump_catalogs<W: Write>(catalogs: &[Catalog], out: &mut W) -> Result<()> {
    for catalog in catalogs {
        let dump = CatalogDump {
            space: catalog.space(),
            table: catalog.table(),
            enumerations: catalog.enumerations(),
            registers: catalog.registers(),
        };
        writeln!(out, "---")?;
        serde_yaml::to_writer(&mut *out, &dump)?;
    }
    out.flush()?;

    Ok(())
}

/// Main application body: loads config and catalogs, then polls until
/// `shutdown_rx` fires, the runtime limit passes or the single pass is done.
pub async fn app(
    shutdown_rx: broadcast::Receiver<()>,
    options: Options,
) -> Result<PollStats> {
    let config = Config::load(&options).map_err(|err| {
        init_logging("info");
        err
    })?;
    init_logging(config.loglevel());

    info!("solax-monitor {} starting", CARGO_PKG_VERSION);
    match &options.config_file {
        Some(file) => info!("Using config file {}", file),
        None => info!("No config file given, using built-in defaults"),
    }
    config.log_summary();

    info!("Loading register catalogs...");
    let catalogs = catalog::load_catalogs(config.poll().spaces(), config.catalogs())?;

    if options.dump_catalog {
        dump_catalogs(&catalogs, &mut std::io::stdout())?;
        return Ok(PollStats::default());
    }

    let coordinator = Coordinator::new(catalogs, config.poll().trend_source());
    let transport = ModbusTcpTransport::new(config.inverter());
    let presenter = presenter::for_output(config.output());

    let mut scheduler = Scheduler::new(
        coordinator,
        Box::new(transport),
        presenter,
        config.poll().interval(),
    );

    scheduler
        .start(shutdown_rx, options.runtime.map(Duration::from_secs))
        .await?;

    let stats = scheduler.coordinator().stats().clone();
    stats.print_summary();
    info!("Shutdown complete");

    Ok(stats)
}

/// Runs the application with Ctrl-C wired to a graceful shutdown.
pub async fn run(options: Options) -> Result<PollStats> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        let _ = shutdown_tx_clone.send(());
    });

    let stats = app(shutdown_rx, options).await;
    drop(shutdown_tx);
    stats
}
