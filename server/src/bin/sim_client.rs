use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use client::Client;
use server::BOOTSTRAP_HANDLE;
use wire::object::{BindGroupLayout, Device, Queue};
use wire::schema::*;
use wire::{CodecLimits, ObjectHandle, VecCommandSerializer, WireObject};

const COMPUTE_SHADER: &str = "\
@group(0) @binding(0) var<storage, read_write> data: array<u32>;
override scale: u32 = 1u;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    data[id.x] = data[id.x] * scale;
}
";

#[derive(Debug, Clone)]
struct SimConfig {
    output: PathBuf,
    buffer_size: u64,
}

fn main() -> anyhow::Result<()> {
    if dotenvy::dotenv().is_err() {
        dotenvy::from_filename("server/.env").ok();
    }
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cfg = parse_args()?;
    log::info!(
        "[sim-client] recording session with a {} byte buffer",
        cfg.buffer_size
    );

    let serializer = VecCommandSerializer::new(CodecLimits::default().max_command_size);
    let mut client = Client::new(serializer, CodecLimits::default());
    run_session(&mut client, cfg.buffer_size)?;
    client.flush()?;

    let stream = client.serializer_mut().take();
    fs::write(&cfg.output, &stream)
        .with_context(|| format!("failed to write {}", cfg.output.display()))?;
    log::info!(
        "[sim-client] wrote {} bytes to {} ({} requests pending)",
        stream.len(),
        cfg.output.display(),
        client.pending_requests()
    );
    Ok(())
}

fn reserve_bootstrap<T: WireObject>(
    client: &mut Client<VecCommandSerializer>,
) -> anyhow::Result<T> {
    let (object, handle): (T, ObjectHandle) = client.reserve()?;
    if handle != BOOTSTRAP_HANDLE {
        bail!(
            "{} was reserved as {}, the server injects it as {}",
            T::TYPE,
            handle,
            BOOTSTRAP_HANDLE
        );
    }
    Ok(object)
}

fn run_session(client: &mut Client<VecCommandSerializer>, buffer_size: u64) -> anyhow::Result<()> {
    let device: Device = reserve_bootstrap(client)?;
    let queue: Queue = reserve_bootstrap(client)?;
    let layout: BindGroupLayout = reserve_bootstrap(client)?;

    let module = client.create_shader_module(
        device,
        ShaderModuleDescriptor {
            chain: vec![ShaderModuleWgslDescriptor {
                code: COMPUTE_SHADER.to_string(),
            }
            .into()],
            label: Some("scale".to_string()),
        },
    )?;
    client.get_compilation_info(module)?;

    let pipeline = client.create_compute_pipeline(
        device,
        ComputePipelineDescriptor {
            chain: Vec::new(),
            label: Some("hello".to_string()),
            layout: None,
            compute: ProgrammableStageDescriptor {
                module,
                entry_point: "main".to_string(),
                constants: vec![ConstantEntry {
                    key: "scale".to_string(),
                    value: 3.0,
                }],
            },
        },
    )?;
    log::debug!("[sim-client] created pipeline {pipeline:?}");

    let storage = client.create_buffer(
        device,
        BufferDescriptor {
            label: Some("storage".to_string()),
            usage: buffer_usage::STORAGE | buffer_usage::COPY_DST,
            size: buffer_size,
            ..BufferDescriptor::default()
        },
    )?;
    let readback = client.create_buffer(
        device,
        BufferDescriptor {
            label: Some("readback".to_string()),
            usage: buffer_usage::MAP_READ | buffer_usage::COPY_DST,
            size: buffer_size,
            ..BufferDescriptor::default()
        },
    )?;

    client.create_bind_group(
        device,
        BindGroupDescriptor {
            chain: Vec::new(),
            label: None,
            layout,
            entries: vec![BindGroupEntry {
                binding: 0,
                buffer: Some(storage),
                offset: 0,
                size: buffer_size,
                ..BindGroupEntry::default()
            }],
        },
    )?;

    let len = usize::try_from(buffer_size).context("buffer size does not fit in memory")?;
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    client.queue_write_buffer(queue, storage, 0, &data)?;
    client.queue_write_buffer(queue, readback, 0, &data)?;

    let encoder = client.create_command_encoder(device, None)?;
    let commands = client.finish_encoder(
        encoder,
        Some(CommandBufferDescriptor {
            chain: Vec::new(),
            label: Some("frame".to_string()),
        }),
    )?;
    client.queue_submit(queue, &[commands])?;
    client.queue_on_submitted_work_done(queue)?;

    client.buffer_map_async(readback, MapMode::Read, 0, buffer_size)?;
    client.release(encoder)?;
    Ok(())
}

fn parse_args() -> anyhow::Result<SimConfig> {
    let mut cfg = SimConfig {
        output: PathBuf::from("commands.bin"),
        buffer_size: 256,
    };

    let mut args = std::env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--output" | "-o" => cfg.output = PathBuf::from(next_arg_value(&mut args, &arg)?),
            "--buffer-size" => {
                let value = next_arg_value(&mut args, &arg)?;
                cfg.buffer_size = value
                    .parse::<u64>()
                    .with_context(|| format!("invalid --buffer-size: {}", value))?;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                bail!("unknown argument: {}\nUse --help to list the options.", other);
            }
        }
    }

    if cfg.buffer_size % 4 != 0 {
        bail!("--buffer-size must be a multiple of 4");
    }

    Ok(cfg)
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
        "sim-client - records a representative wire session to a file\n\n\
Usage:\n\
  cargo run --manifest-path server/Cargo.toml --bin sim-client -- [options]\n\n\
Options:\n\
  --output <path>          Command stream destination (default: commands.bin)\n\
  --buffer-size <bytes>    Size of the storage and readback buffers (default: 256)\n\
  --help                   Show this help\n"
    );
}
