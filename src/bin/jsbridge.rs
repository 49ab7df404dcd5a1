//! jsbridge command-line driver
//!
//! `simulate` runs a bind / reference / collect / teardown session against
//! the simulated runtime and host and reports what the bridge did.
//! `config` prints or writes the default configuration.

use clap::{Parser, Subcommand};
use jsbridge::logging::console::{self, StdOutput};
use jsbridge::logging::init_logging;
use jsbridge::sim::{self, SimHost, SimObject, SimRuntime};
use jsbridge::{BridgeConfig, ClassKind, Environment, ReferencePolicy, Variant};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "jsbridge")]
#[command(about = "Object lifecycle bridge simulator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the simulated runtime through a full binding lifecycle
    Simulate {
        /// Host objects to bind
        #[arg(short, long, default_value_t = 1000)]
        objects: usize,
        /// Run a collection after every K bindings (0 disables)
        #[arg(short = 'k', long, default_value_t = 100)]
        collect_every: usize,
        /// Objects marked persistent
        #[arg(short, long, default_value_t = 10)]
        persistent: usize,
        /// Config file (defaults to the nearest .jsbridge.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration, or write it to a file
    Config {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct Report {
    statistics: jsbridge::Statistics,
    native_live: usize,
    native_destroyed: u64,
    bridge_references: u64,
    bridge_unreferences: u64,
    double_frees: u64,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            objects,
            collect_every,
            persistent,
            config,
            json,
        } => simulate(objects, collect_every, persistent, config, json),
        Commands::Config { output } => write_config(output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn write_config(output: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    match output {
        Some(path) => {
            BridgeConfig::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => print!("{}", BridgeConfig::generate_default()),
    }
    Ok(())
}

fn simulate(
    objects: usize,
    collect_every: usize,
    persistent: usize,
    config_path: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let config = match config_path {
        Some(path) => BridgeConfig::load(&path)?,
        None => BridgeConfig::discover(),
    };
    let _guard = init_logging(config.log_config());
    if !json {
        console::register(Arc::new(StdOutput));
    }

    let host = SimHost::new();
    let probe = host.probe();
    let mut env = Environment::wrap(SimRuntime::new(), host, config);

    let node = env.register_class(ClassKind::HostObject, "Node")?;
    let resource = env.register_class(ClassKind::HostObject, "Resource")?;
    let vector = env.register_class(ClassKind::HostPrimitiveValue, "Vector2")?;

    // scene nodes are owned natively and kept alive by the tree
    for _ in 0..persistent {
        let pointer = env.host_mut().spawn(false);
        let wrapper = env.runtime_mut().new_object();
        env.bind_pointer(node, pointer, wrapper, ReferencePolicy::NoReference)?;
        env.mark_persistent(pointer);
        env.runtime_mut().release(wrapper);
    }

    let mut shared = Vec::new();
    for i in 0..objects {
        let pointer = env.host_mut().spawn(true);
        let wrapper: SimObject = env.runtime_mut().new_object();
        env.bind_host_object(resource, pointer, wrapper)?;

        // a third of the resources are also held by native code
        if i % 3 == 0 {
            sim::add_native_reference(&mut env, pointer);
            shared.push(pointer);
        }
        if i % 4 == 0 {
            let value = env.runtime_mut().new_object();
            env.bind_value_type(vector, value, Variant::Vector2([i as f32, 0.0]))?;
            env.runtime_mut().release(value);
        }

        env.runtime_mut().release(wrapper);
        if collect_every > 0 && (i + 1) % collect_every == 0 {
            env.gc();
        }
    }

    // native code lets go; the collector now decides
    for pointer in shared {
        sim::release_native_reference(&mut env, pointer);
    }
    for _ in 0..4 {
        env.update_with_elapsed(Duration::from_millis(16));
    }
    env.gc();

    let statistics = if json { env.statistics() } else { env.print_statistics() };
    drop(env);

    let report = Report {
        statistics,
        native_live: probe.live(),
        native_destroyed: probe.destroyed(),
        bridge_references: probe.bridge_references(),
        bridge_unreferences: probe.bridge_unreferences(),
        double_frees: probe.double_frees(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "native: {} live, {} destroyed, {} double frees",
            report.native_live, report.native_destroyed, report.double_frees
        );
        println!(
            "bridge references: {} taken, {} released",
            report.bridge_references, report.bridge_unreferences
        );
    }
    Ok(())
}
