use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

use super::{Crypto, Decrypted, PrivateKey, PublicKey, VerifiedKey};

const UNVERIFIED_SIGNATURE: &str = "The message signature could not be verified";

/// [`Crypto`] backed by an installed `gpg` binary and its keyring.
#[derive(Debug, Clone)]
pub struct GpgCrypto {
    program: String,
}

struct ProcessOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl GpgCrypto {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str], input: Option<String>) -> AppResult<ProcessOutput> {
        debug!(program = %self.program, ?args, "running gpg");
        let mut child = Command::new(&self.program)
            .arg("--batch")
            .args(args)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| AppError::Crypto(format!("failed to start {}: {err}", self.program)))?;

        let writer = match (child.stdin.take(), input) {
            (Some(mut stdin), Some(input)) => Some(tokio::spawn(async move {
                stdin.write_all(input.as_bytes()).await
            })),
            _ => None,
        };

        let output = child.wait_with_output().await?;
        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => debug!(error = %err, "gpg closed its input early"),
                Err(err) => return Err(AppError::Crypto(err.to_string())),
            }
        }

        Ok(ProcessOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn list_key(&self, listing: &str, email: &str) -> AppResult<Option<PublicKey>> {
        let output = self.run(&["--with-colons", listing, email], None).await?;
        if !output.success {
            return Ok(None);
        }
        Ok(parse_key_listing(&output.stdout))
    }

    async fn remote_key(&self, email: &str) -> Option<PublicKey> {
        let output = self
            .run(&["--with-colons", "--locate-external-keys", email], None)
            .await;
        match output {
            Ok(output) if output.success => parse_key_listing(&output.stdout),
            Ok(output) => {
                debug!(email, stderr = %output.stderr.trim(), "no remote key published");
                None
            }
            Err(err) => {
                warn!(email, error = %err, "remote key lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl Crypto for GpgCrypto {
    async fn private_key(&self, email: &str) -> AppResult<PrivateKey> {
        self.list_key("--list-secret-keys", email)
            .await?
            .map(|key| PrivateKey {
                fingerprint: key.fingerprint,
            })
            .ok_or_else(|| AppError::MissingKey(format!("no private key for {email}")))
    }

    async fn public_key(&self, email: &str) -> AppResult<Option<PublicKey>> {
        self.list_key("--list-keys", email).await
    }

    async fn verified_public_key(&self, email: &str) -> AppResult<VerifiedKey> {
        let local = self.public_key(email).await?;
        let remote = self.remote_key(email).await;
        Ok(VerifiedKey { local, remote })
    }

    async fn encrypt_sign(
        &self,
        plaintext: &str,
        recipients: &[PublicKey],
        signer: &PrivateKey,
    ) -> AppResult<String> {
        let mut args = vec![
            "--armor",
            "--trust-model",
            "always",
            "--local-user",
            signer.fingerprint.as_str(),
        ];
        for recipient in recipients {
            args.push("--recipient");
            args.push(recipient.fingerprint.as_str());
        }
        args.push("--sign");
        args.push("--encrypt");

        let output = self.run(&args, Some(plaintext.to_string())).await?;
        if !output.success {
            return Err(AppError::Crypto(last_error_line(&output.stderr)));
        }
        Ok(output.stdout)
    }

    async fn decrypt_verify(
        &self,
        ciphertext: &str,
        recipient: &PrivateKey,
        sender: &PublicKey,
    ) -> AppResult<Decrypted> {
        debug!(recipient = %recipient.fingerprint, "decrypting message");
        let output = self
            .run(&["--status-fd", "2", "--decrypt"], Some(ciphertext.to_string()))
            .await?;
        if !output.success {
            return Err(AppError::Crypto(last_error_line(&output.stderr)));
        }

        let warning = (!signed_by(&output.stderr, &sender.fingerprint))
            .then(|| UNVERIFIED_SIGNATURE.to_string());

        Ok(Decrypted {
            content: output.stdout,
            warning,
        })
    }
}

/// First fingerprint and user id of a `--with-colons` key listing.
fn parse_key_listing(listing: &str) -> Option<PublicKey> {
    let mut fingerprint = None;
    let mut user_id = None;

    for line in listing.lines() {
        let fields = line.split(':').collect::<Vec<_>>();
        match fields.first().copied() {
            Some("fpr") if fingerprint.is_none() => {
                fingerprint = fields.get(9).map(|value| value.to_string());
            }
            Some("uid") if user_id.is_none() => {
                user_id = fields.get(9).map(|value| value.to_string());
            }
            _ => {}
        }
    }

    Some(PublicKey {
        fingerprint: fingerprint.filter(|value| !value.is_empty())?,
        user_id: user_id.unwrap_or_default(),
    })
}

/// True when the status output carries a valid signature whose primary key
/// fingerprint matches `fingerprint`.
fn signed_by(status: &str, fingerprint: &str) -> bool {
    status
        .lines()
        .filter_map(|line| line.strip_prefix("[GNUPG:] VALIDSIG "))
        .any(|rest| {
            let fields = rest.split_whitespace().collect::<Vec<_>>();
            fields.first() == Some(&fingerprint) || fields.last() == Some(&fingerprint)
        })
}

fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .filter(|line| !line.starts_with("[GNUPG:]") && !line.trim().is_empty())
        .last()
        .map(|line| line.trim_start_matches("gpg: ").to_string())
        .unwrap_or_else(|| "gpg failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
tru::1:1700000000:0:3:1:5
pub:u:255:22:1234567890ABCDEF:1700000000:::u:::scESC:::::ed25519:::0:
fpr:::::::::0123456789ABCDEF0123456789ABCDEF01234567:
uid:u::::1700000000::HASH::Alice <a@x.com>::::::::::0:
sub:u:255:18:FEDCBA0987654321:1700000000::::::e:::::cv25519::
fpr:::::::::FFFF456789ABCDEF0123456789ABCDEF0123FFFF:
";

    #[test]
    fn parses_primary_fingerprint_and_uid() {
        let key = parse_key_listing(LISTING).expect("key");
        assert_eq!(key.fingerprint, "0123456789ABCDEF0123456789ABCDEF01234567");
        assert_eq!(key.user_id, "Alice <a@x.com>");
    }

    #[test]
    fn empty_listing_has_no_key() {
        assert!(parse_key_listing("").is_none());
    }

    #[test]
    fn signature_must_match_sender() {
        let status = "[GNUPG:] GOODSIG 1234 Alice\n[GNUPG:] VALIDSIG AAAA 2024-01-01 1700000000 0 4 0 22 8 00 BBBB\n";
        assert!(signed_by(status, "BBBB"));
        assert!(signed_by(status, "AAAA"));
        assert!(!signed_by(status, "CCCC"));
    }

    #[test]
    fn error_line_skips_status_output() {
        let stderr = "[GNUPG:] ENC_TO 1234\ngpg: decryption failed: No secret key\n[GNUPG:] END\n";
        assert_eq!(last_error_line(stderr), "decryption failed: No secret key");
    }
}
