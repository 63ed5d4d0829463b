//! evdev controller probe

#[macro_use] extern crate log;

use peridot_native_shim::controller::{self, Capabilities, ControllerGuid};
use peridot_native_shim::{EventDevice, ScanConfig};
use std::path::PathBuf;
use structopt::StructOpt;

/// Lists input event devices with their identity, GUID and capabilities
#[derive(StructOpt)]
#[structopt(name = "evprobe")]
pub struct Args {
    /// TOML file with scan settings
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,
    /// Directory to scan instead of the configured one
    #[structopt(long, parse(from_os_str))]
    device_dir: Option<PathBuf>,
    /// Probe only these device nodes
    #[structopt(long = "device", parse(from_os_str))]
    devices: Vec<PathBuf>,
}

fn load_config(args: &Args) -> peridot_native_shim::Result<ScanConfig> {
    let mut config = match args.config {
        Some(ref p) => ScanConfig::load(p)?,
        None => ScanConfig::default(),
    };
    if let Some(ref d) = args.device_dir {
        config.device_dir = d.clone();
    }

    Ok(config)
}

fn describe(device: &EventDevice) -> peridot_native_shim::Result<()> {
    let id = controller::probe_identity(device)?;
    let name = device.name().unwrap_or_else(|_| String::from("<unknown device name>"));
    println!("{}: {}", device.path().display(), name);
    println!(
        "  bus 0x{:04x} vendor 0x{:04x} product 0x{:04x} version 0x{:04x}",
        id.bus_type, id.vendor, id.product, id.version
    );
    println!("  guid {}", ControllerGuid::from_identity(&id));

    let caps = match Capabilities::probe(device) {
        Ok(c) => c,
        Err(e) => {
            println!("  capabilities unavailable: {e}");
            return Ok(());
        }
    };
    println!(
        "  {} axes, {} hats, {} buttons",
        caps.axes.len(),
        caps.hats.len(),
        caps.buttons.len()
    );
    for hat in &caps.hats {
        match controller::read_hat(device, hat.number) {
            Ok(d) => println!("  hat {}: 0x{:x}", hat.number, d.0),
            Err(e) => debug!("hat {}: {e}", hat.number),
        }
    }
    match controller::pressed_buttons(device, &caps) {
        Ok(held) if !held.is_empty() => println!("  held: {held:x?}"),
        Ok(_) => (),
        Err(e) => debug!("key state: {e}"),
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::from_args();

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load configuration: {e}");
            std::process::exit(2);
        }
    };
    let nodes = if args.devices.is_empty() {
        match peridot_native_shim::evdev::scan(&config) {
            Ok(n) => n,
            Err(e) => {
                error!("failed to scan {}: {e}", config.device_dir.display());
                std::process::exit(1);
            }
        }
    } else {
        args.devices.clone()
    };
    info!("probing {} device node(s)", nodes.len());

    for node in nodes {
        let r = EventDevice::open(&node).and_then(|d| describe(&d));
        if let Err(e) = r {
            warn!("{}: {e}", node.display());
        }
    }
}
