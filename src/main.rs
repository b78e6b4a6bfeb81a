use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use protoroute::VERSION;
use protoroute::codegen;

const LOG_ENV: &str = "PROTOROUTE_LOG";

fn main() -> Result<()> {
    let args: Vec<_> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("protoc-gen-protoroute");

    match args.get(1).map(String::as_str) {
        Some("--version" | "-V") => {
            println!("protoc-gen-protoroute {VERSION}");
            return Ok(());
        }
        Some("--help" | "-h") => {
            print_usage(program);
            return Ok(());
        }
        Some(other) => {
            print_usage(program);
            anyhow::bail!("unexpected argument {other:?}");
        }
        None => {}
    }

    // stdout carries the plugin protocol
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let mut request = Vec::new();
    io::stdin()
        .read_to_end(&mut request)
        .context("failed to read CodeGeneratorRequest from stdin")?;
    tracing::debug!(bytes = request.len(), "read request");

    let response = codegen::generate_from_bytes(&request)?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&response)
        .context("failed to write CodeGeneratorResponse to stdout")?;
    stdout.flush().context("failed to flush stdout")?;
    Ok(())
}

fn print_usage(program: &str) {
    eprintln!("protoc-gen-protoroute {VERSION}");
    eprintln!();
    eprintln!("protoc plugin generating axum routes and service traits from annotated RPC methods.");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  protoc --plugin=protoc-gen-protoroute=<path> --protoroute_out=<dir> <file.proto>");
    eprintln!("  {program} --version");
    eprintln!();
    eprintln!("OPTIONS (--protoroute_opt=key=value,...):");
    eprintln!("  runtime=<path>        runtime module used by generated code (default ::protoroute::rt)");
    eprintln!("  suffix=<suffix>       output file suffix (default .route.rs)");
    eprintln!("  server_suffix=<name>  service trait suffix (default HttpServer)");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  {LOG_ENV}  tracing filter for diagnostics on stderr (default warn)");
}
