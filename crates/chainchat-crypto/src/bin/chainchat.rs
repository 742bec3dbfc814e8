//! chainchat: command-line front end for end-to-end message encryption.
//!
//! Keys live in a local key store (see `CHAINCHAT_KEYSTORE`); results are
//! printed as JSON on stdout, logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chainchat_core::config::normalize_scope;
use chainchat_core::logging::DEFAULT_FILTER;
use chainchat_core::{init_tracing, ChainchatConfig};
use chainchat_crypto::{
    detect_payload, CryptoError, EncryptedFileMetadata, EncryptedTextEnvelope, FileKeyStore,
    KeyStore, Messenger, PayloadKind, PlainFile, PublicKey,
};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "chainchat")]
#[command(author, version, about = "End-to-end encryption for chainchat messages")]
#[command(propagate_version = true)]
struct Cli {
    /// Key store path (overrides CHAINCHAT_KEYSTORE)
    #[arg(long, global = true)]
    keystore: Option<PathBuf>,

    /// Local identity scope, e.g. your wallet address (overrides CHAINCHAT_SCOPE)
    #[arg(long, global = true)]
    scope: Option<String>,

    /// Treat the key store as passphrase-sealed
    #[arg(long, global = true)]
    sealed: bool,

    /// Passphrase for a sealed key store (overrides CHAINCHAT_PASSPHRASE)
    #[arg(long, global = true)]
    passphrase: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show (creating on first use) your messaging public key
    Whoami,

    /// Manage friends' messaging keys
    Friend {
        #[command(subcommand)]
        action: FriendAction,
    },

    /// Encrypt a text message for a friend or a raw public key
    EncryptText {
        /// Friend identifier or base64 public key
        #[arg(short, long)]
        to: String,

        /// Write the envelope here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Message text
        text: String,
    },

    /// Decrypt a text envelope addressed to you
    DecryptText {
        /// Envelope JSON file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Encrypt a file for a friend or a raw public key
    EncryptFile {
        /// Friend identifier or base64 public key
        #[arg(short, long)]
        to: String,

        /// File to encrypt
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the encrypted blob
        #[arg(short, long)]
        output: PathBuf,

        /// Output path for the metadata JSON
        #[arg(short, long)]
        meta: PathBuf,
    },

    /// Decrypt a file blob addressed to you
    DecryptFile {
        /// Metadata JSON file
        #[arg(short, long)]
        meta: PathBuf,

        /// Encrypted blob
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the restored file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Classify a fetched payload
    Detect {
        /// Payload file
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Subcommand)]
enum FriendAction {
    /// Import a friend's base64 public key
    Add { peer: String, public_key: String },
    /// Print the stored key for a friend
    Show { peer: String },
    /// Forget a friend's key
    Remove { peer: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ChainchatConfig::load()?;
    if let Some(path) = cli.keystore {
        config.keystore_path = path;
    }
    if let Some(scope) = cli.scope.as_deref() {
        config.scope = normalize_scope(scope);
    }
    if cli.sealed {
        config.sealed = true;
    }
    if cli.passphrase.is_some() {
        config.passphrase = cli.passphrase;
    }
    config.validate()?;

    let _log_guard = init_tracing(&config.log, DEFAULT_FILTER);

    if let Commands::Detect { input } = &cli.command {
        return cmd_detect(input);
    }

    let messenger = open_messenger(&config)?;

    match cli.command {
        Commands::Whoami => cmd_whoami(&messenger, &config),
        Commands::Friend { action } => cmd_friend(&messenger, action),
        Commands::EncryptText { to, output, text } => {
            cmd_encrypt_text(&messenger, &to, output.as_deref(), &text)
        }
        Commands::DecryptText { input } => cmd_decrypt_text(&messenger, &input),
        Commands::EncryptFile {
            to,
            input,
            output,
            meta,
        } => cmd_encrypt_file(&messenger, &to, &input, &output, &meta),
        Commands::DecryptFile {
            meta,
            input,
            output,
        } => cmd_decrypt_file(&messenger, &meta, &input, &output),
        Commands::Detect { .. } => Ok(()),
    }
}

fn open_messenger(config: &ChainchatConfig) -> anyhow::Result<Messenger> {
    let store: Arc<dyn KeyStore> = if config.sealed {
        let passphrase = config
            .passphrase
            .as_deref()
            .context("a passphrase is required for a sealed key store")?;
        Arc::new(FileKeyStore::open_sealed(&config.keystore_path, passphrase)?)
    } else {
        Arc::new(FileKeyStore::open(&config.keystore_path)?)
    };

    info!(
        subsystem = "cli",
        component = "keystore",
        path = %config.keystore_path.display(),
        sealed = config.sealed,
        "Key store ready"
    );

    Ok(Messenger::with_scope(store, config.scope.as_deref()))
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolve `--to` into a base64 public key: a known friend wins, otherwise
/// the argument itself must be a key.
fn resolve_recipient(messenger: &Messenger, to: &str) -> anyhow::Result<String> {
    if let Some(key) = messenger.friend_messaging_key_b64(to)? {
        return Ok(key);
    }
    if PublicKey::from_b64(to).is_ok() {
        return Ok(to.trim().to_string());
    }
    Err(CryptoError::UnknownPeer(to.trim().to_lowercase()).into())
}

fn cmd_whoami(messenger: &Messenger, config: &ChainchatConfig) -> anyhow::Result<()> {
    let keypair = messenger.get_or_create_my_keypair()?;

    print_json(&serde_json::json!({
        "public_key_b64": keypair.public.to_b64(),
        "fingerprint": keypair.public.fingerprint(),
        "scope": config.scope,
        "keystore": config.keystore_path.to_string_lossy(),
    }))
}

fn cmd_friend(messenger: &Messenger, action: FriendAction) -> anyhow::Result<()> {
    match action {
        FriendAction::Add { peer, public_key } => {
            messenger.set_friend_messaging_key_b64(&peer, &public_key)?;
            // Stored as given; warn now rather than at first send.
            let fingerprint = PublicKey::from_b64(&public_key)
                .ok()
                .map(|key| key.fingerprint());
            print_json(&serde_json::json!({
                "peer": peer.trim().to_lowercase(),
                "stored": true,
                "valid_key": fingerprint.is_some(),
                "fingerprint": fingerprint,
            }))
        }
        FriendAction::Show { peer } => {
            let key = messenger.friend_messaging_key_b64(&peer)?;
            print_json(&serde_json::json!({
                "peer": peer.trim().to_lowercase(),
                "public_key_b64": key,
            }))
        }
        FriendAction::Remove { peer } => {
            messenger.remove_friend_messaging_key(&peer)?;
            print_json(&serde_json::json!({
                "peer": peer.trim().to_lowercase(),
                "removed": true,
            }))
        }
    }
}

fn cmd_encrypt_text(
    messenger: &Messenger,
    to: &str,
    output: Option<&Path>,
    text: &str,
) -> anyhow::Result<()> {
    let recipient = resolve_recipient(messenger, to)?;
    let envelope = messenger.encrypt_text_for(&recipient, text)?;

    match output {
        Some(path) => {
            std::fs::write(path, envelope.to_json()?)
                .with_context(|| format!("writing {}", path.display()))?;
            print_json(&serde_json::json!({
                "output": path.to_string_lossy(),
                "input_size": text.len(),
            }))
        }
        None => print_json(&serde_json::to_value(&envelope)?),
    }
}

fn cmd_decrypt_text(messenger: &Messenger, input: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let envelope = EncryptedTextEnvelope::from_json(&json)?;
    let plaintext = messenger.decrypt_text_payload(&envelope, None)?;

    print_json(&serde_json::json!({
        "sender_pub_b64": envelope.sender_pub_b64,
        "plaintext": plaintext,
    }))
}

fn cmd_encrypt_file(
    messenger: &Messenger,
    to: &str,
    input: &Path,
    output: &Path,
    meta: &Path,
) -> anyhow::Result<()> {
    let recipient = resolve_recipient(messenger, to)?;
    let plain =
        PlainFile::from_path(input).with_context(|| format!("reading {}", input.display()))?;
    let encrypted = messenger.encrypt_file_for(&recipient, &plain)?;

    std::fs::write(output, &encrypted.ciphertext)
        .with_context(|| format!("writing {}", output.display()))?;
    std::fs::write(meta, encrypted.metadata.to_json()?)
        .with_context(|| format!("writing {}", meta.display()))?;

    print_json(&serde_json::json!({
        "input": input.to_string_lossy(),
        "output": output.to_string_lossy(),
        "meta": meta.to_string_lossy(),
        "mime_type": plain.mime_type,
        "input_size": plain.bytes.len(),
        "output_size": encrypted.ciphertext.len(),
    }))
}

fn cmd_decrypt_file(
    messenger: &Messenger,
    meta: &Path,
    input: &Path,
    output: &Path,
) -> anyhow::Result<()> {
    let metadata_json =
        std::fs::read_to_string(meta).with_context(|| format!("reading {}", meta.display()))?;
    let metadata = EncryptedFileMetadata::from_json(&metadata_json)?;
    let ciphertext =
        std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let decrypted = messenger.decrypt_file_blob(&metadata, &ciphertext)?;
    std::fs::write(output, &decrypted.bytes)
        .with_context(|| format!("writing {}", output.display()))?;

    print_json(&serde_json::json!({
        "output": output.to_string_lossy(),
        "original_name": decrypted.name,
        "mime_type": decrypted.mime_type,
        "input_size": ciphertext.len(),
        "output_size": decrypted.bytes.len(),
    }))
}

fn cmd_detect(input: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let kind = detect_payload(&data);

    print_json(&serde_json::json!({
        "input": input.to_string_lossy(),
        "kind": kind.as_str(),
        "encrypted": kind != PayloadKind::Plain,
    }))
}
