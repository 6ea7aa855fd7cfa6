//! Revalidation ledger for generated post pages
//!
//! Records when each post page was last written so the preview server can
//! tell a fresh page from one that should be fetched and rendered again.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Cache directory name, relative to the site directory
pub const CACHE_DIR: &str = ".blog-cache";

/// Cache file name
const CACHE_FILE: &str = ".blog-cache/db.json";

/// A generated post page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    /// Output path relative to public dir
    pub output_path: String,
    /// Generation time (as unix timestamp)
    pub generated_at: u64,
    /// Hash of the rendered HTML
    pub content_hash: u64,
}

/// Generated post pages keyed by slug
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageLedger {
    /// Version of the cache format
    pub version: u32,
    pub pages: HashMap<String, PageEntry>,
}

impl PageLedger {
    /// Current cache format version
    const VERSION: u32 = 1;

    /// Create a new ledger with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Load the ledger from disk, or create a new empty one
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = base_dir.join(CACHE_FILE);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            match serde_json::from_str::<PageLedger>(&content) {
                Ok(ledger) if ledger.version == Self::VERSION => return ledger,
                Ok(_) => tracing::info!("Cache version mismatch, starting a new ledger"),
                Err(e) => tracing::warn!("Ignoring unreadable cache {:?}: {}", cache_path, e),
            }
        }
        Self::new()
    }

    /// Save the ledger to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        fs::create_dir_all(base_dir.join(CACHE_DIR))?;

        let cache_path = base_dir.join(CACHE_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(cache_path, content)?;
        Ok(())
    }

    /// Record a freshly written page. Returns false if the HTML did not change.
    pub fn record(&mut self, slug: &str, output_path: &str, html: &str, now: u64) -> bool {
        let content_hash = hash_content(html);
        let changed = self
            .pages
            .get(slug)
            .map(|entry| entry.content_hash != content_hash)
            .unwrap_or(true);

        self.pages.insert(
            slug.to_string(),
            PageEntry {
                output_path: output_path.to_string(),
                generated_at: now,
                content_hash,
            },
        );
        changed
    }

    /// Whether a page exists and is younger than `max_age`
    pub fn is_fresh(&self, slug: &str, now: u64, max_age: Duration) -> bool {
        self.pages
            .get(slug)
            .map(|entry| now.saturating_sub(entry.generated_at) < max_age.as_secs())
            .unwrap_or(false)
    }

    /// Forget a page, e.g. after its post was removed from the CMS
    pub fn remove(&mut self, slug: &str) -> Option<PageEntry> {
        self.pages.remove(slug)
    }
}

/// Calculate a hash of content string
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Current time as a unix timestamp
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_hash_content() {
        let hash1 = hash_content("hello world");
        let hash2 = hash_content("hello world");
        let hash3 = hash_content("hello world!");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_freshness_window() {
        let mut ledger = PageLedger::new();
        ledger.record("hello", "post/hello/index.html", "<p>hi</p>", 1_000);

        assert!(ledger.is_fresh("hello", 1_000, HOUR));
        assert!(ledger.is_fresh("hello", 1_000 + 3599, HOUR));
        assert!(!ledger.is_fresh("hello", 1_000 + 3600, HOUR));
        assert!(!ledger.is_fresh("other", 1_000, HOUR));
    }

    #[test]
    fn test_record_reports_changes() {
        let mut ledger = PageLedger::new();
        assert!(ledger.record("a", "post/a/index.html", "v1", 1));
        assert!(!ledger.record("a", "post/a/index.html", "v1", 2));
        assert!(ledger.record("a", "post/a/index.html", "v2", 3));
        assert_eq!(ledger.pages["a"].generated_at, 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut ledger = PageLedger::new();
        ledger.record("hello", "post/hello/index.html", "<p>hi</p>", 42);
        ledger.save(dir.path()).unwrap();

        let loaded = PageLedger::load(dir.path());
        assert_eq!(loaded.version, PageLedger::VERSION);
        assert_eq!(loaded.pages, ledger.pages);
    }

    #[test]
    fn test_load_missing_or_corrupt() {
        let dir = TempDir::new().unwrap();
        assert!(PageLedger::load(dir.path()).pages.is_empty());

        fs::create_dir_all(dir.path().join(CACHE_DIR)).unwrap();
        fs::write(dir.path().join(CACHE_FILE), "not json").unwrap();
        let ledger = PageLedger::load(dir.path());
        assert!(ledger.pages.is_empty());
        assert_eq!(ledger.version, PageLedger::VERSION);
    }
}
