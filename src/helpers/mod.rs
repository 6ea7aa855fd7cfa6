//! Helper functions for templates
//!
//! These turn domain values (dates, uids, cursors) into the strings the
//! templates display.

mod date;
mod html;
mod url;

pub use self::date::*;
pub use self::html::*;
pub use self::url::*;

use chrono::{DateTime, FixedOffset};

use crate::config::SiteConfig;

/// Collection of all helper functions bound to a site configuration
#[derive(Clone)]
pub struct Helpers {
    config: SiteConfig,
}

impl Helpers {
    /// Create a new helpers instance
    pub fn new(config: SiteConfig) -> Self {
        Self { config }
    }

    /// Get url_for helper
    pub fn url_for(&self, path: &str) -> String {
        url_for(&self.config, path)
    }

    /// Get post_url helper
    pub fn post_url(&self, uid: &str) -> String {
        post_url(&self.config, uid)
    }

    /// Get page_url helper
    pub fn page_url(&self, n: usize) -> String {
        page_url(&self.config, n)
    }

    /// Get more_url helper
    pub fn more_url(&self, cursor: &str) -> String {
        more_url(&self.config, cursor)
    }

    /// Format a publication date in the site language and timezone
    pub fn date(&self, date: Option<&DateTime<FixedOffset>>) -> String {
        format_publication_date(
            date,
            &self.config.date_format,
            &self.config.language,
            self.config.tz(),
        )
    }

    /// Machine-readable form of a publication date for `<time datetime>`
    pub fn date_attr(&self, date: Option<&DateTime<FixedOffset>>) -> String {
        date.map(date_xml).unwrap_or_default()
    }
}
