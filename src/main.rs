use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use secrecy::{ExposeSecret, SecretString};
use xmldsig::{config::Config, dsig, keys::KeyMaterial, telemetry};

#[derive(Debug, Parser)]
#[command(name = "xmldsig", version, about = "Sign and verify enveloped XML signatures")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign an XML document with the key and certificate of a PFX file
    Sign {
        /// XML document to sign
        #[arg(long)]
        xml: PathBuf,
        /// PKCS#12 file, defaults to signing.pfx_path
        #[arg(long)]
        pfx: Option<PathBuf>,
        /// PFX password, defaults to signing.pfx_password
        #[arg(long)]
        password: Option<String>,
        /// Where to write the signed document
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Verify the enveloped signature of an XML document
    Verify {
        #[arg(long)]
        xml: PathBuf,
    },
}

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let cli = Cli::parse();
    let config = Config::load()?;
    tracing::debug!("Loaded configuration: {:?}", config);

    match cli.command {
        Command::Sign {
            xml,
            pfx,
            password,
            output,
        } => {
            let pfx = pfx.or(config.signing.pfx_path).ok_or_else(|| {
                eyre!("No PFX file given, pass --pfx or set XMLDSIG_SIGNING__PFX_PATH")
            })?;
            let password = password
                .map(SecretString::from)
                .or(config.signing.pfx_password)
                .unwrap_or_else(|| SecretString::from(""));

            let key = KeyMaterial::from_pkcs12(read(&pfx)?, password.expose_secret())
                .wrap_err_with(|| format!("Failed to load {}", pfx.display()))?;
            let signed = dsig::sign(&read(&xml)?, &key)?;

            match output.or_else(|| config.output.in_place.then_some(xml)) {
                Some(path) => {
                    fs::write(&path, &signed)
                        .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
                    println!("Successfully signed.");
                }
                None => std::io::stdout().write_all(&signed)?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { xml } => {
            if dsig::verify(&read(&xml)?) {
                println!("XML signature is valid");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("XML signature is NOT valid");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn read(path: &Path) -> color_eyre::Result<Vec<u8>> {
    fs::read(path).wrap_err_with(|| format!("Failed to read {}", path.display()))
}
