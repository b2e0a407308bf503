// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wandler — local TLS file-conversion service.
//
// Entry point. Initialises logging and dispatches to the server, client, or
// certificate-generation subcommand.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use wandler_core::config::AppConfig;
use wandler_core::error::Result;
use wandler_core::types::Operation;
use wandler_net::{ConversionClient, ConversionServer};
use wandler_security::{CertificatePair, ensure_certificates};

#[derive(Parser, Debug)]
#[command(
    name = "wandler",
    version,
    about = "Local TLS file-conversion service: PDF to PNG, PNG/JPG, grayscale, resize",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the conversion server until interrupted.
    Serve {
        /// Host to bind.
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Port to bind.
        #[arg(long, default_value_t = 8443)]
        port: u16,

        /// Server certificate (generated on first run if missing).
        #[arg(long, default_value = "cert.pem")]
        cert: PathBuf,

        /// Server private key (generated on first run if missing).
        #[arg(long, default_value = "key.pem")]
        key: PathBuf,

        /// Directory for server-side copies of converted files.
        #[arg(long, default_value = "converted_files")]
        out: PathBuf,

        /// Skip server-side persistence; clients keep the only copy.
        #[arg(long)]
        no_persist: bool,
    },

    /// Convert a file through a running server.
    Convert {
        /// Source file to convert.
        input: PathBuf,

        /// Operation name.
        #[arg(value_parser = Operation::WIRE_NAMES.to_vec())]
        operation: String,

        /// Target width in pixels (resize only).
        #[arg(long)]
        width: Option<u32>,

        /// Target height in pixels (resize only).
        #[arg(long)]
        height: Option<u32>,

        /// Server host.
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Server port.
        #[arg(long, default_value_t = 8443)]
        port: u16,

        /// Server certificate to trust.
        #[arg(long, default_value = "cert.pem")]
        cert: PathBuf,

        /// Directory to write converted files into.
        #[arg(long, default_value = "converted_files")]
        out: PathBuf,

        /// Round-trip timeout in seconds.
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Generate a self-signed certificate/key pair and exit.
    Certgen {
        /// Certificate output path.
        #[arg(long, default_value = "cert.pem")]
        cert: PathBuf,

        /// Private-key output path.
        #[arg(long, default_value = "key.pem")]
        key: PathBuf,

        /// Overwrite existing files.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Serve {
            host,
            port,
            cert,
            key,
            out,
            no_persist,
        } => {
            serve(AppConfig {
                host,
                port,
                cert_path: cert,
                key_path: key,
                output_dir: out,
                server_persists_results: !no_persist,
                ..AppConfig::default()
            })
            .await
        }

        Command::Convert {
            input,
            operation,
            width,
            height,
            host,
            port,
            cert,
            out,
            timeout,
        } => {
            let operation = Operation::parse(&operation, width, height)?;
            let config = AppConfig {
                host,
                port,
                cert_path: cert,
                output_dir: out,
                request_timeout_secs: timeout,
                ..AppConfig::default()
            };

            let client = ConversionClient::new(&config)?;
            let paths = client.convert_file(&input, operation).await?;
            for path in &paths {
                println!("{}", path.display());
            }
            Ok(())
        }

        Command::Certgen { cert, key, force } => {
            if force {
                CertificatePair::generate()?.write_to(&cert, &key)?;
                info!(cert = %cert.display(), "certificate material regenerated");
            } else if ensure_certificates(&cert, &key)? {
                info!(cert = %cert.display(), "certificate material generated");
            } else {
                info!(cert = %cert.display(), "certificate material already present, use --force to regenerate");
            }
            Ok(())
        }
    }
}

/// Run the server until Ctrl-C, then stop it gracefully.
async fn serve(config: AppConfig) -> Result<()> {
    if ensure_certificates(&config.cert_path, &config.key_path)? {
        info!("generated a fresh self-signed certificate");
    }

    let mut server = ConversionServer::new(config);
    server.start().await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown requested");

    server.stop().await
}
