//! Battleship Settlement CLI
//!
//! Usage:
//!   battleship-settle prove --session 42 --input transcript.json
//!   battleship-settle inspect --proof proof-output.json
//!   battleship-settle serve --bind 0.0.0.0:8080

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use battleship_settle::{
    core::hash::short_hex,
    ledger::{LedgerConfig, LoggingHub, SettlementLedger},
    network::{AuthConfig, ServerConfig, SettlementServer},
    proof::{prove, KeyedDigestBackend, ProofArtifact, Transcript},
    VERSION,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Verify battleship matches and settle them exactly once")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a transcript and write the proof artifacts
    Prove {
        /// Session id to bind (overrides the transcript's)
        #[arg(long)]
        session: Option<u32>,

        /// Transcript JSON; a built-in sample game when omitted
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long, default_value = "proof-output.json")]
        proof: PathBuf,

        #[arg(long, default_value = "receipt.bin")]
        receipt: PathBuf,

        /// Omit the seal
        #[arg(long)]
        unsealed: bool,
    },

    /// Strictly parse an artifact and print its public output
    Inspect {
        #[arg(long)]
        proof: PathBuf,
    },

    /// Run the settlement service
    Serve {
        /// Overrides SETTLE_BIND_ADDR
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match args.command {
        Command::Prove {
            session,
            input,
            proof,
            receipt,
            unsealed,
        } => run_prove(session, input.as_deref(), &proof, &receipt, unsealed),
        Command::Inspect { proof } => run_inspect(&proof),
        Command::Serve { bind } => run_serve(bind).await,
    }
}

fn run_prove(session: Option<u32>, input: Option<&Path>, proof: &Path, receipt: &Path, unsealed: bool) -> Result<()> {
    let mut transcript = match input {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Transcript::from_json(&json).with_context(|| format!("parsing {}", path.display()))?
        }
        None => {
            info!("no --input given, proving the built-in sample game");
            Transcript::sample(session.unwrap_or(1))
        }
    };
    if let Some(session_id) = session {
        transcript = transcript.with_session(session_id);
    }

    let backend = KeyedDigestBackend::from_env().context("loading attestation key")?;
    let proven = prove(&transcript, &backend, !unsealed).context("proving transcript")?;

    std::fs::write(proof, proven.artifact.to_json()?).with_context(|| format!("writing {}", proof.display()))?;
    std::fs::write(receipt, proven.receipt.to_bytes()?).with_context(|| format!("writing {}", receipt.display()))?;

    let output = &proven.artifact.public_output;
    info!(
        session_id = output.session_id,
        winner = output.winner,
        total_moves = output.total_moves,
        journal = %short_hex(&output.digest()),
        sealed = proven.artifact.is_sealed(),
        "wrote {} and {}",
        proof.display(),
        receipt.display()
    );
    Ok(())
}

fn run_inspect(proof: &Path) -> Result<()> {
    let json = std::fs::read_to_string(proof).with_context(|| format!("reading {}", proof.display()))?;
    let artifact = ProofArtifact::from_json(&json).with_context(|| format!("parsing {}", proof.display()))?;

    let output = &artifact.public_output;
    println!("session_id:    {}", output.session_id);
    println!("winner:        {}", output.winner);
    println!("total_moves:   {}", output.total_moves);
    println!("board_hash_p1: {}", hex::encode(output.board_hash_p1));
    println!("board_hash_p2: {}", hex::encode(output.board_hash_p2));
    println!("journal_sha256: {}", hex::encode(output.digest()));
    println!("sealed:        {}", artifact.is_sealed());
    Ok(())
}

async fn run_serve(bind: Option<SocketAddr>) -> Result<()> {
    info!("Battleship Settle v{}", VERSION);

    let mut config = ServerConfig::from_env();
    if let Some(addr) = bind {
        config.bind_addr = addr;
    }

    let ledger_config = LedgerConfig::from_env();
    if ledger_config.allow_unsealed {
        warn!("unsealed results will be accepted");
    }
    let backend = KeyedDigestBackend::from_env().context("loading attestation key")?;
    let ledger = SettlementLedger::new(Arc::new(backend), Arc::new(LoggingHub), ledger_config);
    info!(backend = %short_hex(ledger.backend_id()), "ledger ready");

    let server = Arc::new(SettlementServer::new(config, Arc::new(ledger), AuthConfig::from_env()));
    let listener = server.bind().await.context("binding settlement server")?;

    let running = server.clone();
    let serve = tokio::spawn(async move { running.serve(listener).await });

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("Ctrl-C received, shutting down");
    server.shutdown();

    match serve.await {
        Ok(result) => result.context("settlement server")?,
        Err(e) => bail!("server task failed: {}", e),
    }
    Ok(())
}
