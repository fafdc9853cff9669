use padding_oracle::{
    server::{spawn_server, OracleRequestHandler},
    AttackConfig, HttpOracle, LocalOracle, PaddingOracleAttack, RecoveredBlock, BLOCK_SIZE,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "padding-oracle",
    about = "Recover the final block of a CBC ciphertext from a padding oracle"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve a padding oracle (and encryption oracle) over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:9000")]
        address: String,
        /// AES key in hex; a random key is generated if omitted
        #[arg(long)]
        key: Option<String>,
        /// Size of the generated key
        #[arg(long, default_value_t = 128)]
        key_bits: usize,
    },
    /// Attack a padding oracle served over HTTP
    Attack {
        /// Base URL of the oracle service
        #[arg(long)]
        oracle: String,
        /// Have the service encrypt this text and attack the result
        #[arg(long, conflicts_with_all = ["iv", "ciphertext"])]
        plaintext: Option<String>,
        /// IV of the target ciphertext, in hex
        #[arg(long, requires = "ciphertext")]
        iv: Option<String>,
        /// Target ciphertext, in hex
        #[arg(long, requires = "iv")]
        ciphertext: Option<String>,
        #[arg(long)]
        parallel: bool,
    },
    /// Encrypt and attack a message in-process
    Demo {
        #[arg(long, default_value = "HELLO WORLD")]
        plaintext: String,
        #[arg(long, default_value_t = 128)]
        key_bits: usize,
        #[arg(long)]
        parallel: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match Cli::parse().command {
        Command::Serve {
            address,
            key,
            key_bits,
        } => serve(&address, key.as_deref(), key_bits),
        Command::Attack {
            oracle,
            plaintext,
            iv,
            ciphertext,
            parallel,
        } => {
            let client = HttpOracle::new(oracle);
            let attack = PaddingOracleAttack::new(&client)
                .with_config(AttackConfig::default().parallel(parallel));
            let recovered = match (plaintext, iv, ciphertext) {
                (Some(plaintext), _, _) => attack.run_encrypted(&client, plaintext.as_bytes())?,
                (None, Some(iv), Some(ciphertext)) => {
                    let iv: [u8; BLOCK_SIZE] = hex::decode(&iv)
                        .context("IV is not valid hex")?
                        .try_into()
                        .map_err(|_| anyhow::anyhow!("IV must be {} bytes", BLOCK_SIZE))?;
                    let ciphertext =
                        hex::decode(&ciphertext).context("ciphertext is not valid hex")?;
                    attack.run(&iv, &ciphertext)?
                }
                _ => bail!("either --plaintext or both --iv and --ciphertext are required"),
            };
            report(&recovered);
            Ok(())
        }
        Command::Demo {
            plaintext,
            key_bits,
            parallel,
        } => {
            let oracle = LocalOracle::random(key_bits)?;
            let recovered = PaddingOracleAttack::new(&oracle)
                .with_config(AttackConfig::default().parallel(parallel))
                .run_encrypted(&oracle, plaintext.as_bytes())?;
            report(&recovered);
            Ok(())
        }
    }
}

fn serve(address: &str, key: Option<&str>, key_bits: usize) -> Result<()> {
    let oracle = match key {
        Some(key) => LocalOracle::new(&hex::decode(key).context("key is not valid hex")?)?,
        None => LocalOracle::random(key_bits)?,
    };
    let handler = OracleRequestHandler::new(oracle);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let url = spawn_server(address, handler)
            .await
            .with_context(|| format!("could not bind {}", address))?;
        println!("Serving padding oracle at {}", url);
        tokio::signal::ctrl_c().await?;
        info!("shutting down");
        Ok::<_, anyhow::Error>(())
    })
}

fn report(recovered: &RecoveredBlock) {
    info!(
        padding_length = recovered.padding_length(),
        "recovered {} bytes",
        recovered.content().len()
    );
    println!("The last block of the message is: {}", recovered);
}
