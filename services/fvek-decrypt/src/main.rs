//! BitLocker FVEK Decrypt
//!
//! Decrypts the AES-CCM encrypted Full Volume Encryption Key (FVEK) listed in
//! `dislocker-metadata` output, using a Volume Master Key captured by
//! lpc-sniffer, and writes a key file for `dislocker --fvek`.

mod decrypt;
mod report;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use decrypt::{decrypt_aes_ccm, extract_fvek, fvek_file_contents};
use report::parse_report;

#[derive(Parser, Debug)]
#[command(author, version, about = "Decrypts BitLocker Full Volume Encryption Keys (FVEK)")]
struct CliOptions {
    /// File with dislocker-metadata output of the BitLocker-encrypted partition
    #[arg(short, long)]
    filename: PathBuf,

    /// File with the sniffed BitLocker Volume Master Key (VMK)
    #[arg(short, long)]
    keyfile: PathBuf,

    /// FVEK file to create for use with dislocker
    #[arg(short, long, default_value = "fvek.bin")]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   BitLocker FVEK Decrypt v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let opts = CliOptions::parse();
    run(&opts)
}

/// Parse, decrypt and write the FVEK file. Nothing is written unless decryption succeeds.
fn run(opts: &CliOptions) -> Result<()> {
    let vmk = fs::read(&opts.keyfile).with_context(|| {
        format!(
            "could not read the Volume Master Key (VMK) from {}",
            opts.keyfile.display()
        )
    })?;

    let report = fs::read_to_string(&opts.filename)
        .with_context(|| format!("could not read {}", opts.filename.display()))?;
    let encrypted = parse_report(&report)
        .with_context(|| format!("could not parse FVEK datum in {}", opts.filename.display()))?;

    info!("Found encrypted FVEK datum ({} bytes)", encrypted.size);
    info!("Extracted nonce: {}", hex::encode(encrypted.nonce));
    info!("Extracted MAC: {}", hex::encode(encrypted.mac));
    info!("Extracted payload: {}", hex::encode(&encrypted.ciphertext));

    let plaintext = decrypt_aes_ccm(&vmk, &encrypted.nonce, &encrypted.ciphertext, &encrypted.mac)
        .context("could not decrypt the encrypted Full Volume Encryption Key (FVEK)")?;
    let fvek = extract_fvek(&plaintext)?;
    info!("Decrypted Full Volume Encryption Key (FVEK): {}", hex::encode(fvek));

    fs::write(&opts.output, fvek_file_contents(fvek))
        .with_context(|| format!("could not write {}", opts.output.display()))?;
    info!(
        "Created FVEK file '{}' for use with dislocker",
        opts.output.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decrypt::{encrypt_aes_ccm, DecryptError};
    use crate::report::render_report;

    const NONCE: [u8; 12] = [0x11; 12];

    struct Fixture {
        _dir: tempfile::TempDir,
        opts: CliOptions,
        fvek: Vec<u8>,
    }

    fn fixture(sniffed_vmk: &[u8]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let vmk: Vec<u8> = (0x20u8..0x40).collect();
        let fvek: Vec<u8> = (0u8..32).map(|b| b.wrapping_mul(13)).collect();

        let mut key_structure = vec![0u8; 12];
        key_structure.extend_from_slice(&fvek);
        let (ciphertext, mac) = encrypt_aes_ccm(&vmk, &NONCE, &key_structure);

        let opts = CliOptions {
            filename: dir.path().join("metadata.txt"),
            keyfile: dir.path().join("vmk.bin"),
            output: dir.path().join("fvek.bin"),
        };
        fs::write(&opts.filename, render_report(&NONCE, &mac, &ciphertext)).unwrap();
        fs::write(&opts.keyfile, sniffed_vmk).unwrap();

        Fixture {
            _dir: dir,
            opts,
            fvek,
        }
    }

    #[test]
    fn test_cli_args() {
        let opts = CliOptions::parse_from(["fvek-decrypt", "-f", "dump.txt", "-k", "vmk.bin"]);
        assert_eq!(opts.filename, PathBuf::from("dump.txt"));
        assert_eq!(opts.keyfile, PathBuf::from("vmk.bin"));
        assert_eq!(opts.output, PathBuf::from("fvek.bin"));
    }

    #[test]
    fn test_writes_fvek_file() {
        let vmk: Vec<u8> = (0x20u8..0x40).collect();
        let fx = fixture(&vmk);

        run(&fx.opts).unwrap();

        let written = fs::read(&fx.opts.output).unwrap();
        assert_eq!(written, fvek_file_contents(&fx.fvek));
        assert_eq!(&written[2..34], fx.fvek.as_slice());
    }

    #[test]
    fn test_wrong_vmk_writes_nothing() {
        let fx = fixture(&[0x55; 32]);

        let err = run(&fx.opts).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DecryptError>(),
            Some(&DecryptError::AuthenticationFailed)
        );
        assert!(!fx.opts.output.exists());
    }

    #[test]
    fn test_missing_key_file() {
        let fx = fixture(&[0u8; 32]);
        fs::remove_file(&fx.opts.keyfile).unwrap();

        assert!(run(&fx.opts).is_err());
        assert!(!fx.opts.output.exists());
    }
}
