use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{info, trace};

/// Completion priority for addresses the owner has written to.
pub const OWNER_PRIORITY: u32 = 5;
/// Completion priority for everyone else seen in the mailbox.
pub const DEFAULT_PRIORITY: u32 = 1;

/// Address-book collaborator fed by indexing and key verification.
pub trait Contacts: Send + Sync {
    fn add_candidate(&self, address: &str, priority: u32);

    /// Records that the key published for `address` no longer matches the
    /// locally cached one.
    fn key_changed(&self, address: &str, previous: &str, current: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub address: String,
    pub priority: u32,
    pub fingerprint: Option<String>,
    pub key_changed: bool,
}

/// In-memory [`Contacts`] with accumulated priorities for autocompletion.
#[derive(Debug, Default)]
pub struct ContactBook {
    entries: Mutex<HashMap<String, Contact>>,
}

impl ContactBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &str) -> Option<Contact> {
        self.entries().get(&normalize(address)).cloned()
    }

    /// Contacts whose address starts with `prefix`, highest priority first.
    /// An address equal to the prefix is already complete and is left out.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<Contact> {
        let prefix = normalize(prefix);
        let mut matches = self
            .entries()
            .values()
            .filter(|contact| contact.address.starts_with(&prefix) && contact.address != prefix)
            .cloned()
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.address.cmp(&b.address))
        });
        matches.truncate(limit);
        matches
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Contact>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Contacts for ContactBook {
    fn add_candidate(&self, address: &str, priority: u32) {
        let address = normalize(address);
        if address.is_empty() {
            return;
        }
        trace!(%address, priority, "completion candidate");
        let mut entries = self.entries();
        let contact = entries.entry(address.clone()).or_insert_with(|| Contact {
            address,
            ..Contact::default()
        });
        contact.priority += priority;
    }

    fn key_changed(&self, address: &str, previous: &str, current: &str) {
        info!(address, previous, current, "public key changed");
        let address = normalize(address);
        let mut entries = self.entries();
        let contact = entries.entry(address.clone()).or_insert_with(|| Contact {
            address,
            ..Contact::default()
        });
        contact.fingerprint = Some(current.to_string());
        contact.key_changed = true;
    }
}

fn normalize(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}
