//! Tab identity: content fingerprints and normalized titles.
//!
//! A tab's hash is derived from its base url (query and fragment stripped)
//! and a lossy normalization of its title, so that "(2) Chat" and "Chat" on
//! the same page are the same tab as far as groups are concerned.

use crate::tabs::Tab;
use md5::{Digest, Md5};
use url::Url;

const NULL_ORIGIN: &str = "null";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabFingerprint {
    pub hash: String,
    pub origin: String,
    pub base_url: String,
}

/// Keep ascii letters and spaces, collapse whitespace runs, trim. Case is
/// preserved.
pub fn normalize_for_hashing(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| if c.is_ascii_alphabetic() || c == ' ' { c } else { ' ' })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns `None` until both url and title are known.
pub fn compute_hash(url: Option<&str>, title: Option<&str>) -> Option<TabFingerprint> {
    let url = url?;
    let title = title?;
    let normalized = normalize_for_hashing(title);
    let (origin, base_url) =
        url_parts(url).unwrap_or_else(|| (NULL_ORIGIN.to_string(), NULL_ORIGIN.to_string()));
    let hash = md5_hex(&hash_input(&base_url, &normalized));
    Some(TabFingerprint {
        hash,
        origin,
        base_url,
    })
}

/// Fill in the derived identity fields of a tab. Safe to call repeatedly;
/// the result only depends on `url` and `title`.
pub fn augment_tab(mut tab: Tab) -> Tab {
    if let Some(title) = tab.title.take() {
        let title = title_without_url(&title);
        tab.normalized_title = Some(normalize_for_hashing(&title));
        tab.title = Some(title);
    }

    match compute_hash(tab.url.as_deref(), tab.title.as_deref()) {
        Some(fp) => {
            tab.hash = Some(fp.hash);
            tab.origin = Some(fp.origin);
            tab.base_url = Some(fp.base_url);
        }
        None => {
            tab.hash = None;
            match tab.url.as_deref().and_then(url_parts) {
                Some((origin, base_url)) => {
                    tab.origin = Some(origin);
                    tab.base_url = Some(base_url);
                }
                None => {
                    tab.origin = None;
                    tab.base_url = None;
                }
            }
        }
    }
    tab
}

fn hash_input(base_url: &str, normalized_title: &str) -> String {
    if normalized_title.is_empty() {
        base_url.to_string()
    } else {
        format!("{} {}", base_url, normalized_title)
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

fn url_parts(raw: &str) -> Option<(String, String)> {
    let mut parsed = Url::parse(raw).ok()?;
    let origin = parsed.origin().ascii_serialization();
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some((origin, parsed.to_string()))
}

// pages titled with their own url can leak tokens from the query string
fn title_without_url(title: &str) -> String {
    match Url::parse(title.trim()) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {
            format!("{}{}", u.origin().ascii_serialization(), u.path())
        }
        _ => title.to_string(),
    }
}
