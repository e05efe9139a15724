//! OpenPGP operations the mail engine delegates to an external provider.

pub mod gpg;

use async_trait::async_trait;

use crate::error::AppResult;

pub use gpg::GpgCrypto;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub fingerprint: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub fingerprint: String,
}

/// Plaintext plus any non-fatal verification warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    pub content: String,
    pub warning: Option<String>,
}

/// Result of a trust-on-first-use lookup: the locally cached key and the
/// copy currently published remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedKey {
    pub local: Option<PublicKey>,
    pub remote: Option<PublicKey>,
}

impl VerifiedKey {
    pub fn preferred(&self) -> Option<&PublicKey> {
        self.remote.as_ref().or(self.local.as_ref())
    }

    pub fn changed(&self) -> bool {
        match (&self.local, &self.remote) {
            (Some(local), Some(remote)) => local.fingerprint != remote.fingerprint,
            _ => false,
        }
    }
}

#[async_trait]
pub trait Crypto: Send + Sync {
    async fn private_key(&self, email: &str) -> AppResult<PrivateKey>;

    async fn public_key(&self, email: &str) -> AppResult<Option<PublicKey>>;

    async fn verified_public_key(&self, email: &str) -> AppResult<VerifiedKey>;

    /// Encrypts to every key in `recipients` and signs with `signer`,
    /// returning ascii-armored ciphertext.
    async fn encrypt_sign(
        &self,
        plaintext: &str,
        recipients: &[PublicKey],
        signer: &PrivateKey,
    ) -> AppResult<String>;

    async fn decrypt_verify(
        &self,
        ciphertext: &str,
        recipient: &PrivateKey,
        sender: &PublicKey,
    ) -> AppResult<Decrypted>;
}
