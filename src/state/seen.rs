//! Dedup store: normalized URL keys and their content fingerprints

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// Lowercase hex SHA-256 digest of a fetched body
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Hashes raw body bytes
    pub fn of_bytes(body: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(body);
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps a stored digest, rejecting anything that is not 64 lowercase hex chars
    pub fn from_hex(digest: &str) -> Option<Self> {
        let valid = digest.len() == 64
            && digest
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self(digest.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every normalized URL the crawl has admitted, with its fingerprint if known
///
/// Append-only during a crawl. Insertion order is kept so that the reverse
/// fingerprint index can be rebuilt with the same first-writer-wins owners
/// after a reload.
#[derive(Debug, Clone, Default)]
pub struct SeenRegistry {
    entries: HashMap<String, Option<ContentFingerprint>>,
    order: Vec<String>,
    by_fingerprint: HashMap<ContentFingerprint, String>,
}

impl SeenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a registry from `(key, fingerprint)` pairs in insertion order
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<ContentFingerprint>)>,
    {
        let mut registry = Self::new();
        for (key, fingerprint) in entries {
            registry.record(key, fingerprint);
        }
        registry
    }

    /// Returns true if the key is already present, or the fingerprint is
    /// `Some` and already owned by another key
    pub fn is_duplicate(&self, key: &str, fingerprint: Option<&ContentFingerprint>) -> bool {
        if self.entries.contains_key(key) {
            return true;
        }
        fingerprint
            .map(|fp| self.by_fingerprint.contains_key(fp))
            .unwrap_or(false)
    }

    /// Records a key unconditionally
    ///
    /// Overwriting an existing key replaces its fingerprint. The reverse index
    /// keeps the first key that claimed a fingerprint; when that key moves to
    /// new content, the next key in insertion order still holding the old
    /// fingerprint takes it over.
    pub fn record(&mut self, key: String, fingerprint: Option<ContentFingerprint>) {
        match self.entries.get(&key).cloned() {
            None => self.order.push(key.clone()),
            Some(Some(old))
                if fingerprint.as_ref() != Some(&old)
                    && self.by_fingerprint.get(&old) == Some(&key) =>
            {
                self.by_fingerprint.remove(&old);
                if let Some(heir) = self.next_holder(&old, &key) {
                    self.by_fingerprint.insert(old, heir);
                }
            }
            Some(_) => {}
        }

        if let Some(fp) = &fingerprint {
            self.by_fingerprint
                .entry(fp.clone())
                .or_insert_with(|| key.clone());
        }

        self.entries.insert(key, fingerprint);
    }

    fn next_holder(&self, fingerprint: &ContentFingerprint, except: &str) -> Option<String> {
        self.order
            .iter()
            .find(|key| {
                key.as_str() != except
                    && self.entries.get(key.as_str()).and_then(Option::as_ref) == Some(fingerprint)
            })
            .cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn fingerprint(&self, key: &str) -> Option<&ContentFingerprint> {
        self.entries.get(key).and_then(|fp| fp.as_ref())
    }

    /// Returns the key that first recorded this fingerprint
    pub fn owner_of(&self, fingerprint: &ContentFingerprint) -> Option<&str> {
        self.by_fingerprint.get(fingerprint).map(String::as_str)
    }

    /// Iterates entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ContentFingerprint>)> {
        self.order.iter().map(move |key| {
            let fingerprint = self.entries.get(key).and_then(|fp| fp.as_ref());
            (key.as_str(), fingerprint)
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that carry a fingerprint
    pub fn fingerprinted(&self) -> usize {
        self.entries.values().filter(|fp| fp.is_some()).count()
    }
}

impl PartialEq for SeenRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.entries == other.entries
    }
}

impl Eq for SeenRegistry {}
