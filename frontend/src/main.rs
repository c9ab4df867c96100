use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use pocket_core::core::machine::Machine;
use pocket_machines::{Cartridge, NgpSystem};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod rom_path;

#[derive(Parser, Debug)]
#[command(name = "pocket", version, about = "Headless Neo Geo Pocket runner")]
struct Cli {
    /// Settings file (defaults to <config dir>/pocket/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a cartridge for a number of frames.
    Run(RunArgs),
    /// Print the cartridge header as JSON.
    Info {
        /// Cartridge image (.ngp/.ngc/.npc) or a ZIP containing one.
        cart: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Cartridge image (.ngp/.ngc/.npc) or a ZIP containing one.
    cart: PathBuf,

    /// Frames to emulate before exiting.
    #[arg(long, default_value_t = 60)]
    frames: u64,

    /// BIOS image; overrides the settings file.
    #[arg(long, value_name = "PATH")]
    bios: Option<PathBuf>,

    /// Restore this save state after reset.
    #[arg(long, value_name = "PATH")]
    load_state: Option<PathBuf>,

    /// Write a save state on exit.
    #[arg(long, value_name = "PATH")]
    save_state: Option<PathBuf>,

    /// Buttons held for the whole run (comma separated, e.g. `A,Right`).
    #[arg(long, value_name = "BUTTONS", value_delimiter = ',')]
    hold: Vec<String>,

    /// Print the CPU registers as JSON on exit.
    #[arg(long, default_value_t = false)]
    dump_registers: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load(cli.config.as_deref())?;

    let level = settings.log_level.as_deref().unwrap_or("info");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run(args) => run(args, settings),
        Command::Info { cart } => {
            let cart = load_cartridge(&cart)?;
            println!("{}", serde_json::to_string_pretty(cart.header())?);
            Ok(())
        }
    }
}

fn load_cartridge(path: &std::path::Path) -> Result<Cartridge> {
    let image = rom_path::load_cartridge(path)
        .with_context(|| format!("loading cartridge {}", path.display()))?;
    Ok(Cartridge::from_bytes(image)?)
}

fn run(args: RunArgs, settings: config::Settings) -> Result<()> {
    let cart = load_cartridge(&args.cart)?;
    info!(
        title = %cart.header().title,
        color = cart.header().color,
        crc32 = format_args!("{:08X}", cart.crc32()),
        "cartridge"
    );

    let bios = match args.bios.as_ref().or(settings.machine.bios.as_ref()) {
        Some(path) => Some(
            std::fs::read(path).with_context(|| format!("reading BIOS {}", path.display()))?,
        ),
        None => None,
    };
    let mut machine = NgpSystem::new(cart, bios.as_deref(), &settings.machine)?;

    if let Some(path) = &args.load_state {
        let blob = std::fs::read(path)
            .with_context(|| format!("reading save state {}", path.display()))?;
        machine
            .load_state(&blob)
            .with_context(|| format!("restoring {}", path.display()))?;
    }

    for name in &args.hold {
        let Some(button) = machine
            .input_map()
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name))
            .map(|b| b.id)
        else {
            let names: Vec<_> = machine.input_map().iter().map(|b| b.name).collect();
            bail!("unknown button {name:?} (available: {})", names.join(", "));
        };
        machine.set_input(button, true);
    }

    let mut stop = None;
    let mut frames = 0;
    while frames < args.frames {
        let report = machine.run_frame();
        for fault in &report.faults {
            warn!(frame = frames, %fault, "peripheral fault");
        }
        if let Some(fault) = report.stop {
            error!(frame = frames, %fault, "CPU stopped");
            stop = Some(fault);
            break;
        }
        frames += 1;
    }
    info!(frames, cycles = machine.clock(), "run finished");

    if let Some(path) = &args.save_state {
        std::fs::write(path, machine.save_state())
            .with_context(|| format!("writing save state {}", path.display()))?;
        info!(path = %path.display(), "state saved");
    }

    if args.dump_registers {
        println!("{}", serde_json::to_string_pretty(&machine.register_snapshot())?);
    }

    if let Some(fault) = stop {
        bail!("emulation stopped: {fault}");
    }
    Ok(())
}
