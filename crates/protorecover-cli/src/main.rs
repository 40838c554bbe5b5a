//! protorecover - Recover Protocol Buffer definitions from a running gRPC server
//!
//! This tool walks a server's reflection service, collects every file
//! descriptor reachable from the services it exposes and writes them back out
//! as human-readable `.proto` source files.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use prost::Message;
use protorecover_core::{
    DirectorySink, GrpcReflectionChannel, MemorySink, ProtoRenderer, ProtoSink, ProtoSyntax,
    Recovery, ReflectionResolver, RendererConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tonic::transport::Endpoint;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

/// Recover Protocol Buffer definitions from a gRPC server via reflection
#[derive(Parser, Debug)]
#[command(name = "protorecover")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Server to query, as `host:port` or a full `http://` URI
    #[arg(short, long, env = "PROTORECOVER_TARGET")]
    target: String,

    /// Output directory for recovered .proto files
    #[arg(short, long, default_value = "protos")]
    output: PathBuf,

    /// Seconds to wait for the connection to be established
    #[arg(long, default_value = "10")]
    connect_timeout: u64,

    /// Per-request deadline in seconds (no deadline if omitted)
    #[arg(long)]
    timeout: Option<u64>,

    /// Syntax to declare for descriptors that do not carry one
    #[arg(long, value_enum, default_value = "proto2")]
    default_syntax: SyntaxArg,

    /// Also write every resolved descriptor as an encoded FileDescriptorSet
    #[arg(long, value_name = "FILE", conflicts_with = "dry_run")]
    descriptor_set: Option<PathBuf>,

    /// Dry run - don't write files, just show what would be recovered
    #[arg(long)]
    dry_run: bool,

    /// Only list the resolved file names without rendering them
    #[arg(long, conflicts_with = "dry_run")]
    list_only: bool,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SyntaxArg {
    Proto2,
    Proto3,
}

impl From<SyntaxArg> for ProtoSyntax {
    fn from(arg: SyntaxArg) -> Self {
        match arg {
            SyntaxArg::Proto2 => ProtoSyntax::Proto2,
            SyntaxArg::Proto3 => ProtoSyntax::Proto3,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let channel = connect(&cli).await?;
    let resolver = ReflectionResolver::new(channel);

    if cli.list_only {
        list_files(&cli, resolver).await
    } else if cli.dry_run {
        let sink = recover(&cli, resolver, MemorySink::new()).await?;
        for (name, content) in sink.iter() {
            let path = cli.output.join(name);
            println!("Would write: {}", path.display());
            if cli.verbose > 0 {
                println!("---");
                println!("{}", content);
                println!("---");
            }
        }
        Ok(())
    } else {
        let sink = DirectorySink::new(&cli.output).overwrite(cli.force);
        let sink = recover(&cli, resolver, sink).await?;
        for path in sink.written() {
            println!("Wrote {}", path.display());
        }
        Ok(())
    }
}

/// Normalize a target into a URI the transport accepts
fn target_uri(target: &str) -> Result<String> {
    let target = target.trim();
    if target.is_empty() {
        bail!("Target must not be empty");
    }
    if target.starts_with("https://") {
        bail!("TLS targets are not supported: {}", target);
    }
    if target.starts_with("http://") {
        return Ok(target.to_string());
    }
    if !target.contains(':') {
        bail!("Invalid target '{}': expected host:port", target);
    }
    Ok(format!("http://{}", target))
}

/// Dial the target with the configured timeouts
async fn connect(cli: &Cli) -> Result<GrpcReflectionChannel> {
    let uri = target_uri(&cli.target)?;
    debug!("Connecting to {}", uri);

    let mut endpoint = Endpoint::from_shared(uri.clone())
        .with_context(|| format!("Invalid target URI: {}", uri))?
        .connect_timeout(Duration::from_secs(cli.connect_timeout));
    if let Some(secs) = cli.timeout {
        endpoint = endpoint.timeout(Duration::from_secs(secs));
    }

    let channel = GrpcReflectionChannel::connect(endpoint)
        .await
        .with_context(|| format!("Failed to connect to {}", cli.target))?;
    info!("Connected to {}", uri);
    Ok(channel)
}

/// Resolve descriptors and print their names
async fn list_files(
    cli: &Cli,
    mut resolver: ReflectionResolver<GrpcReflectionChannel>,
) -> Result<()> {
    let cache = resolver
        .resolve()
        .await
        .with_context(|| format!("Failed to resolve descriptors from {}", cli.target))?;

    for name in cache.names() {
        println!("{}", name);
    }

    if let Some(path) = &cli.descriptor_set {
        write_descriptor_set(path, resolver.cache().to_file_descriptor_set())?;
    }
    Ok(())
}

/// Run the full recovery into `sink`, returning the sink afterwards
async fn recover<S: ProtoSink>(
    cli: &Cli,
    resolver: ReflectionResolver<GrpcReflectionChannel>,
    sink: S,
) -> Result<S> {
    let renderer = ProtoRenderer::with_config(
        RendererConfig::new().default_syntax(cli.default_syntax.into()),
    );

    let mut recovery = Recovery::new(resolver, renderer, sink);
    let summary = recovery
        .run()
        .await
        .with_context(|| format!("Proto recovery from {} failed", cli.target))?;

    if summary.files_written == 0 {
        info!("Server exposed no proto descriptors");
    }
    info!(
        "Summary: {} services, {} files recovered",
        summary.services, summary.files_written
    );

    if let Some(path) = &cli.descriptor_set {
        write_descriptor_set(path, recovery.resolver().cache().to_file_descriptor_set())?;
    }

    Ok(recovery.into_sink())
}

/// Write an encoded FileDescriptorSet to disk
fn write_descriptor_set(path: &Path, set: prost_types::FileDescriptorSet) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, set.encode_to_vec())
        .with_context(|| format!("Failed to write descriptor set: {}", path.display()))?;
    println!("Wrote {} ({} files)", path.display(), set.file.len());
    Ok(())
}
