//! Hash-stamped output names for cache busting.
//!
//! Output templates may embed the `@hash` token; it is substituted with a
//! content digest of the final bytes, so browsers re-fetch exactly when the
//! content changes. Resolved names are published to a registry keyed by the
//! original template, for downstream consumers (template rendering layers)
//! that need "the current name of build target X" without recomputing.

use dashmap::DashMap;

/// Placeholder token recognized inside output templates.
pub const HASH_TOKEN: &str = "@hash";

/// 128-bit content digest as lowercase hex (first half of blake3).
pub fn content_digest(content: &[u8]) -> String {
    hex::encode(&blake3::hash(content).as_bytes()[..16])
}

/// Substitute the hash token in a name template.
///
/// Returns the resolved name and the digest that was stamped in, or the
/// template unchanged and `None` when it carries no token.
pub fn resolve_name(template: &str, content: &[u8]) -> (String, Option<String>) {
    if !template.contains(HASH_TOKEN) {
        return (template.to_owned(), None);
    }
    let digest = content_digest(content);
    (template.replace(HASH_TOKEN, &digest), Some(digest))
}

/// Template → resolved-name lookup, owned by the build session.
///
/// Every target gets an entry, hashed or not, so consumers can resolve any
/// configured output by its template.
#[derive(Debug, Default)]
pub struct NameRegistry {
    names: DashMap<String, String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the resolved name for a template.
    pub fn publish(&self, template: &str, resolved: &str) {
        self.names.insert(template.to_owned(), resolved.to_owned());
    }

    /// Current resolved name for a template, if published.
    pub fn get(&self, template: &str) -> Option<String> {
        self.names.get(template).map(|r| r.value().clone())
    }

    /// Snapshot of all entries, sorted by template for stable output.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<_> = self
            .names
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        entries.sort();
        entries
    }
}
