use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use server::config::{ServerConfig, DEFAULT_CONFIG_PATH};
use server::{inject_bootstrap_objects, RecordingProcs, Server};
use wire::VecCommandSerializer;

#[derive(Debug)]
struct Args {
    commands: PathBuf,
    returns: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (for development)
    // Try loading from current directory first, then from server/ directory
    if dotenvy::dotenv().is_err() {
        dotenvy::from_filename("server/.env").ok();
    }

    let config_path =
        std::env::var("WIRE_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = ServerConfig::load_or_default(&config_path)?;

    env_logger::init_from_env(
        env_logger::Env::default().default_filter_or(config.logging.filter.as_str()),
    );

    log::info!("Starting wire server...");
    log::info!("Wire version: {}", wire::wire_version());
    log::info!(
        "Limits: max command {} bytes, max allocation {} bytes",
        config.limits.max_command_size,
        config.limits.max_allocation_size
    );

    let args = parse_args()?;
    let stream = fs::read(&args.commands)
        .with_context(|| format!("failed to read command stream {}", args.commands.display()))?;
    log::info!(
        "Read {} bytes of commands from {}",
        stream.len(),
        args.commands.display()
    );

    let serializer = VecCommandSerializer::new(config.limits.max_command_size);
    let mut server = Server::new(RecordingProcs::new(), serializer, config.limits);
    inject_bootstrap_objects(&mut server)?;

    server
        .handle_commands(&stream)
        .context("command stream rejected")?;
    server.flush()?;

    let stats = server.stats();
    log::info!(
        "Handled {} commands ({} bytes), {} GPU calls, {} live objects, peak allocation {} bytes",
        stats.commands,
        stats.bytes,
        server.procs().calls().len(),
        server.objects().live_count(),
        server.peak_allocation()
    );

    let returns = server.serializer_mut().take();
    match &args.returns {
        Some(path) => {
            fs::write(path, &returns)
                .with_context(|| format!("failed to write return stream {}", path.display()))?;
            log::info!(
                "Wrote {} return commands ({} bytes) to {}",
                stats.returns,
                returns.len(),
                path.display()
            );
        }
        None => log::info!("Discarded {} return commands", stats.returns),
    }

    Ok(())
}

fn parse_args() -> anyhow::Result<Args> {
    let mut commands = None;
    let mut returns = None;

    let mut args = std::env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--returns" => returns = Some(PathBuf::from(next_arg_value(&mut args, &arg)?)),
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other if other.starts_with("--") => {
                bail!("unknown argument: {}\nUse --help to list the options.", other);
            }
            path => {
                if commands.is_some() {
                    bail!("only one command stream may be given");
                }
                commands = Some(PathBuf::from(path));
            }
        }
    }

    let commands = commands.ok_or_else(|| anyhow!("missing command stream path"))?;
    Ok(Args { commands, returns })
}

fn next_arg_value<I>(args: &mut std::iter::Peekable<I>, flag: &str) -> anyhow::Result<String>
where
    I: Iterator<Item = String>,
{
    args.next()
        .ok_or_else(|| anyhow!("missing value for {}", flag))
}

fn print_help() {
    println!(
        "server - executes a recorded wire command stream\n\n\
Usage:\n\
  cargo run --manifest-path server/Cargo.toml --bin server -- <commands.bin> [options]\n\n\
The device, queue and one bind group layout are injected as id 1, generation 0\n\
before the stream runs. Settings come from WIRE_CONFIG_PATH\n\
(default: server/config/wire.toml).\n\n\
Options:\n\
  --returns <path>    Write the return command stream to <path>\n\
  --help              Show this help\n"
    );
}
