use ammeter_gateway::transport::{FrameCodec, Message, Montage};
use ammeter_gateway::{init_logger, serve_until, GatewayConfig, LogSink};
use anyhow::Context;
use bytes::BytesMut;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "ammeter-gateway")]
#[command(about = "Protocol gateway for ammeter concentrators")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept concentrator connections
    Serve {
        #[arg(short, long, default_value = "config/config.toml")]
        config: PathBuf,
    },
    /// Decode transport frames given as hex
    Decode {
        hex: String,
        /// Accept frames with a wrong CRC
        #[arg(long)]
        no_verify: bool,
    },
    /// Print the default configuration
    SampleConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            let config = GatewayConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            init_logger(&config.logging.level);

            let listener = TcpListener::bind(config.server.bind)
                .await
                .with_context(|| format!("binding {}", config.server.bind))?;
            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received");
                    signal.cancel();
                }
            });
            serve_until(listener, Arc::new(config), Arc::new(LogSink), shutdown).await?;
        }
        Commands::Decode { hex, no_verify } => {
            init_logger("warn");
            decode(&hex, !no_verify)?;
        }
        Commands::SampleConfig => {
            print!("{}", GatewayConfig::sample()?);
        }
    }

    Ok(())
}

fn decode(input: &str, verify_checksum: bool) -> anyhow::Result<()> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let raw = hex::decode(cleaned).context("input is not hex")?;
    let mut buf = BytesMut::from(&raw[..]);
    let mut codec = FrameCodec::with_checksum(verify_checksum);

    loop {
        let frame = match codec.decode(&mut buf) {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                println!("malformed: {e}");
                continue;
            }
        };
        println!("frame: {frame}");

        let montage = Montage::decompose(&frame.payload);
        for (i, field) in montage.fields().iter().enumerate() {
            println!("  field[{i}]: {}", hex::encode_upper(field));
        }
        for entry in montage.unread() {
            println!("  unread: {}", hex::encode_upper(entry));
        }

        match Message::decode(frame.code, &montage) {
            Ok(Some(Message::Passthrough(message))) => {
                for meter in &message.parsed {
                    match meter.data.reading() {
                        Ok(reading) => println!(
                            "  meter {} control {}: {}",
                            meter.address, meter.control, reading
                        ),
                        Err(e) => println!("  meter {}: {e}", meter.address),
                    }
                }
                if let Some(failure) = &message.failure {
                    println!("  entry {} failed: {}", failure.index, failure.error);
                }
            }
            Ok(Some(message)) => println!("  {message:?}"),
            Ok(None) => {}
            Err(e) => println!("  message error: {e}"),
        }
    }

    if !buf.is_empty() {
        println!("incomplete trailing bytes: {}", hex::encode_upper(&buf));
    }
    Ok(())
}
