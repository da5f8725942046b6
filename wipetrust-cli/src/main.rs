// wipetrust: issue and verify data-sanitization certificates from the shell.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use wipetrust::crypto::jwk::PublicJwk;
use wipetrust::envelope::signer::SigningPolicy;
use wipetrust::envelope::validator::VerificationPolicy;
use wipetrust::{Algorithm, IssuerConfig, Issuer, KeyMaterial, Verifier, WipeResult};

#[derive(Parser)]
#[command(name = "wipetrust", about = "Signed data-sanitization certificates", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a certificate package for a completed wipe
    Issue {
        /// Wipe result JSON produced by the wipe engine
        #[arg(long)]
        input: PathBuf,
        /// Output base path; writes <out>.pdf, <out>.json, <out>_qr.png, <out>_audit.json
        #[arg(long)]
        out: PathBuf,
        /// RSA private key (PKCS#8 PEM); a fresh in-memory key is used otherwise
        #[arg(long)]
        key: Option<PathBuf>,
        /// Algorithm for a generated key (RS256 or EdDSA); a PEM key is always RS256
        #[arg(long, conflicts_with = "key")]
        algorithm: Option<Algorithm>,
        /// Issuer configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,
        /// Issue a demo certificate without a signature
        #[arg(long, conflicts_with_all = ["key", "strict"])]
        unsigned: bool,
        /// Fail instead of falling back to an unsigned certificate
        #[arg(long)]
        strict: bool,
        /// Write the signing key's public JWK here
        #[arg(long, conflicts_with = "unsigned")]
        public_key_out: Option<PathBuf>,
        /// Also write <out>_qr.svg
        #[arg(long)]
        qr_svg: bool,
    },
    /// Verify a signed certificate envelope; exits 0 if valid, 1 otherwise
    Verify {
        path: PathBuf,
        /// Reject unsigned demo certificates
        #[arg(long)]
        strict: bool,
        /// Only accept signatures by this public key (JWK JSON); repeatable
        #[arg(long = "trust-key")]
        trust_keys: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Issue {
            input,
            out,
            key,
            algorithm,
            config,
            unsigned,
            strict,
            public_key_out,
            qr_svg,
        } => cmd_issue(IssueArgs {
            input,
            out,
            key,
            algorithm,
            config,
            unsigned,
            strict,
            public_key_out,
            qr_svg,
        })
        .map(|()| true),
        Commands::Verify {
            path,
            strict,
            trust_keys,
        } => cmd_verify(&path, strict, &trust_keys),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

struct IssueArgs {
    input: PathBuf,
    out: PathBuf,
    key: Option<PathBuf>,
    algorithm: Option<Algorithm>,
    config: Option<PathBuf>,
    unsigned: bool,
    strict: bool,
    public_key_out: Option<PathBuf>,
    qr_svg: bool,
}

fn load_config(path: Option<&Path>) -> Result<IssuerConfig> {
    let config = match path {
        Some(path) => IssuerConfig::from_file(path)?,
        None => IssuerConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn cmd_issue(args: IssueArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(algorithm) = args.algorithm {
        config.algorithm = algorithm;
    }
    if args.strict {
        config.signing_policy = SigningPolicy::Strict;
    }
    debug!(
        algorithm = %config.algorithm,
        verify_domain = %config.verify_domain,
        policy = ?config.signing_policy,
        "issuer configured"
    );

    let wipe_bytes = std::fs::read(&args.input)
        .with_context(|| format!("reading wipe result {}", args.input.display()))?;
    let wipe: WipeResult = serde_json::from_slice(&wipe_bytes)
        .with_context(|| format!("parsing wipe result {}", args.input.display()))?;

    let issuer = if args.unsigned {
        Issuer::new(config, None)
    } else if let Some(key_path) = &args.key {
        let pem = std::fs::read_to_string(key_path)
            .with_context(|| format!("reading key {}", key_path.display()))?;
        let key = KeyMaterial::from_rsa_pkcs8_pem(&pem)
            .with_context(|| format!("loading key {}", key_path.display()))?;
        Issuer::new(config, Some(Arc::new(key)))
    } else {
        Issuer::with_generated_key(config)?
    };

    // Checked before any artifact is written.
    let public_key = match &args.public_key_out {
        Some(_) => Some(
            issuer
                .public_key()
                .context("no signing key: certificate would be issued unsigned")?,
        ),
        None => None,
    };

    let issuance = issuer.issue(&wipe)?;
    if args.public_key_out.is_some() && !issuance.is_signed() {
        anyhow::bail!("certificate was issued unsigned; no public key to write");
    }
    let artifacts = issuer.export_all(&issuance, &args.out)?;

    println!("Certificate ID:   {}", artifacts.certificate_id);
    println!("Verification URL: {}", artifacts.verification_url);
    println!("Signature:        {}", issuance.envelope.algorithm);
    println!("PDF:              {}", artifacts.pdf.display());
    println!("JSON:             {}", artifacts.json.display());
    println!("QR code:          {}", artifacts.qr_png.display());
    println!("Audit package:    {}", artifacts.audit.display());
    if args.qr_svg {
        let svg = issuer.export_qr_svg(&issuance, &args.out)?;
        println!("QR code (SVG):    {}", svg.display());
    }

    if let (Some(path), Some(jwk)) = (&args.public_key_out, public_key) {
        let bytes = serde_json::to_vec_pretty(&jwk)?;
        std::fs::write(path, bytes)
            .with_context(|| format!("writing public key {}", path.display()))?;
        println!("Public key:       {} ({})", path.display(), jwk.fingerprint());
    }
    Ok(())
}

fn cmd_verify(path: &Path, strict: bool, trust_keys: &[PathBuf]) -> Result<bool> {
    let policy = if strict {
        VerificationPolicy::Strict
    } else {
        VerificationPolicy::Permissive
    };
    let mut verifier = Verifier::new(policy);
    for key_path in trust_keys {
        let bytes = std::fs::read(key_path)
            .with_context(|| format!("reading trusted key {}", key_path.display()))?;
        let jwk: PublicJwk = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing trusted key {}", key_path.display()))?;
        verifier = verifier.trust_key(&jwk);
    }

    let result = verifier
        .verify_file(path)
        .with_context(|| format!("verifying {}", path.display()))?;
    println!("{}", result.summary());
    Ok(result.valid)
}
