//! `plagn-router`: reads a config file, builds the Adapter/Translator topology it describes, and
//! runs one worker thread per Adapter until SIGINT/SIGTERM (§3.4, §4.6).

mod orchestrator;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use fabric_config::IniConfig;

#[derive(Parser, Debug)]
#[command(name = "plagn-router", about = "Protocol-translation fabric daemon")]
struct Args {
    /// Path to the INI-style topology config.
    #[arg(short, long, default_value = "plagn-router.conf")]
    config: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = IniConfig::from_path(&args.config).with_context(|| format!("loading {}", args.config.display()))?;
    let topology = orchestrator::build(&config)?;

    log::info!("starting {} adapter(s) from {}", topology.adapters.len(), args.config.display());
    for adapter in &topology.adapters {
        adapter.init().with_context(|| format!("initializing adapter {:?}", adapter.name()))?;
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            log::info!("shutdown signal received");
            shutdown.store(true, Ordering::SeqCst);
        })
        .context("installing signal handler")?;
    }

    let mut handles = Vec::with_capacity(topology.adapters.len());
    for adapter in topology.adapters.clone() {
        handles.push(thread::spawn(move || adapter.run()));
    }

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }

    log::info!("stopping adapters");
    for adapter in &topology.adapters {
        adapter.stop();
    }
    for handle in handles {
        let _ = handle.join();
    }

    log::info!("shutdown complete");
    Ok(())
}
