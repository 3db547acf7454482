//! Links that are never saved

use async_trait::async_trait;
use std::collections::HashSet;
use url::Url;

use super::traits::{MediaResolver, ResolveResult, path_segments, registrable_domain};
use crate::media::Metadata;

/// Excludes configured domains, category index pages and deletion placeholders
///
/// Sits first in the chain so nothing downstream ever fetches these links.
#[derive(Debug, Default, Clone)]
pub struct Denylist {
    domains: HashSet<String>,
}

impl Denylist {
    /// Build a denylist from registrable domains (`example.com`)
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    fn is_denied_domain(&self, url: &Url) -> bool {
        registrable_domain(url).is_some_and(|domain| self.domains.contains(&domain))
    }
}

/// `reddit.com/r/<name>` with optional trailing slash
fn is_category_index(url: &Url) -> bool {
    if registrable_domain(url).as_deref() != Some("reddit.com") {
        return false;
    }
    match path_segments(url).as_slice() {
        ["r", name] | ["r", name, ""] => {
            !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Imgur serves this image in place of deleted content
fn is_removed_placeholder(url: &Url) -> bool {
    registrable_domain(url).as_deref() == Some("imgur.com") && url.path() == "/removed.png"
}

#[async_trait]
impl MediaResolver for Denylist {
    fn name(&self) -> &'static str {
        "denylist"
    }

    fn matches(&self, url: &Url) -> bool {
        self.is_denied_domain(url) || is_category_index(url) || is_removed_placeholder(url)
    }

    async fn resolve(&self, _metadata: &Metadata, url: &Url) -> ResolveResult {
        if is_removed_placeholder(url) {
            ResolveResult::NotFound
        } else {
            ResolveResult::Ignored
        }
    }
}
