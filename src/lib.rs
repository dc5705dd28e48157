//! Exposes statically typed host objects to a dynamically typed scripting
//! runtime.
//!
//! Host classes are registered with [`types::HostClass::builder`]. The
//! [`Bridge`] introspects them once into cached [`types::TypeDescriptor`]s and
//! wraps live host objects in adapters that answer the runtime's property
//! lookup, call and construct hooks ([`value::ScriptObjectOps`]).
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

pub mod bridge;
pub mod demo;
pub mod error;
pub mod types;
pub mod utils;
pub mod value;

pub use bridge::{Bridge, BridgeConfig, ConstructorAdapter, InstanceAdapter, Instantiator, Scope};
pub use error::{BridgeError, ErrorKind};
pub use types::{HostClass, HostOperation, TypeHandle, ValueKind};
pub use value::{HostObject, HostObjectRef, HostValue, ScriptObject, ScriptObjectOps, ScriptValue};

const LOG_FILTER_VAR: &str = "HOSTBRIDGE_LOG";

/// Installs a stderr `tracing` subscriber filtered by `HOSTBRIDGE_LOG`
/// (default `warn`). Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Drive the host/script bridge against the bundled demo library"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the scripting view of a demo class
    Describe {
        /// Simple or fully qualified class name (e.g. Document, demo.geom.Point)
        type_name: String,
    },
    /// Create and discard many host objects through the bridge
    Churn {
        #[arg(short, long, default_value_t = 10_000)]
        count: usize,
        /// Identity-map insertions between sweeps (overrides the environment)
        #[arg(long)]
        sweep_threshold: Option<usize>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run_cli() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    let mut config = BridgeConfig::from_env();

    match args.command {
        Command::Describe { type_name } => {
            let Some(ty) = demo::find_class(&type_name) else {
                eprintln!("unknown class '{type_name}'");
                return ExitCode::FAILURE;
            };
            let bridge = Bridge::new(config);
            match bridge.describe(&ty) {
                Ok(descriptor) => {
                    println!("{descriptor:#?}");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Churn {
            count,
            sweep_threshold,
            json,
        } => {
            if let Some(threshold) = sweep_threshold {
                config.sweep_threshold = threshold.max(1);
            }
            let bridge = Bridge::new(config);
            match demo::churn(&bridge, count) {
                Ok(report) if json => match serde_json::to_string_pretty(&report) {
                    Ok(text) => {
                        println!("{text}");
                        ExitCode::SUCCESS
                    }
                    Err(err) => {
                        eprintln!("error: {err}");
                        ExitCode::FAILURE
                    }
                },
                Ok(report) => {
                    println!(
                        "{} iterations, {} elements created, {} still attached, {} entries swept, {} live adapters",
                        report.iterations,
                        report.elements_created,
                        report.elements_attached,
                        report.swept,
                        report.live_adapters
                    );
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
