//! Target parsing: otype detection and input collection.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;

use machinae_lookup::TargetInfo;

use crate::error::Result;

/// Observable types a target can be forced to with `-O`.
pub const OTYPES: [&str; 8] = ["ipv4", "ipv6", "fqdn", "email", "sslfp", "hash", "url", "mac"];

/// Otype given to targets nothing recognises; no site supports it.
pub const UNKNOWN: &str = "unknown";

const HASH_LENGTHS: [usize; 4] = [32, 40, 64, 128];

/// Work out what kind of observable `target` is.
pub fn detect_otype(target: &str) -> Option<&'static str> {
    let target = target.trim();
    if target.parse::<Ipv4Addr>().is_ok() {
        Some("ipv4")
    } else if target.parse::<Ipv6Addr>().is_ok() {
        Some("ipv6")
    } else if is_mac(target) {
        Some("mac")
    } else if is_sslfp(target) {
        Some("sslfp")
    } else if is_hash(target) {
        Some("hash")
    } else if is_url(target) {
        Some("url")
    } else if is_email(target) {
        Some("email")
    } else if is_fqdn(target) {
        Some("fqdn")
    } else {
        None
    }
}

/// Build the [`TargetInfo`] for one raw target.
///
/// `forced` overrides detection. URL targets without a scheme get `http://`.
pub fn target_info(raw: &str, forced: Option<&str>) -> TargetInfo {
    let raw = raw.trim();
    let (otype, detected) = match forced {
        Some(otype) => (otype.to_owned(), false),
        None => (detect_otype(raw).unwrap_or(UNKNOWN).to_owned(), true),
    };
    let target = if otype == "url" && !(raw.starts_with("http://") || raw.starts_with("https://")) {
        format!("http://{raw}")
    } else {
        raw.to_owned()
    };
    TargetInfo::new(target, otype, detected)
}

/// Collect targets: lines of `infile` first, then `positional`.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns an error if `infile` cannot be read.
pub fn collect(
    infile: Option<&Path>,
    positional: &[String],
    forced: Option<&str>,
) -> Result<Vec<TargetInfo>> {
    let mut raw = Vec::new();
    if let Some(path) = infile {
        let content = std::fs::read_to_string(path)?;
        raw.extend(content.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_owned));
    }
    raw.extend(positional.iter().map(|t| t.trim().to_owned()).filter(|t| !t.is_empty()));

    let targets: Vec<TargetInfo> = raw.iter().map(|t| target_info(t, forced)).collect();
    tracing::debug!(count = targets.len(), "collected targets");
    Ok(targets)
}

fn hex_octets(s: &str, sep: char) -> Option<usize> {
    let mut count = 0;
    for part in s.split(sep) {
        if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        count += 1;
    }
    Some(count)
}

fn is_mac(s: &str) -> bool {
    hex_octets(s, ':') == Some(6) || hex_octets(s, '-') == Some(6)
}

fn is_sslfp(s: &str) -> bool {
    matches!(hex_octets(s, ':'), Some(20 | 32))
}

fn is_hash(s: &str) -> bool {
    HASH_LENGTHS.contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_url(s: &str) -> bool {
    if s.contains("://") {
        return url::Url::parse(s).is_ok_and(|u| u.host_str().is_some());
    }
    match s.split_once('/') {
        Some((host, _)) => {
            let host = host.rsplit_once(':').map_or(host, |(h, port)| {
                if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
                    h
                } else {
                    host
                }
            });
            is_fqdn(host) || host.parse::<Ipv4Addr>().is_ok()
        }
        None => false,
    }
}

fn is_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !local.chars().any(char::is_whitespace) && is_fqdn(domain)
        }
        None => false,
    }
}

fn is_fqdn(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = s.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let label_ok = |label: &&str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    };
    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));
    tld_ok && labels.iter().all(label_ok)
}
