//! Plain-text formats: the banner layout and the one-line-per-site layout.

use machinae_lookup::{ResultSet, SiteOutcome};

use super::defang;

const RULE_WIDTH: usize = 80;

pub(super) fn normal(set: &ResultSet, defanged: bool) -> String {
    let escape = |value: &str| {
        if defanged {
            defang(value)
        } else {
            value.to_owned()
        }
    };
    let info = &set.target_info;
    let rule = "*".repeat(RULE_WIDTH);

    let mut out = String::new();
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!("* Information for {}\n", escape(&info.target)));
    out.push_str(&format!(
        "* Observable type: {} (Auto-detected: {})\n",
        info.otype, info.otype_detected
    ));
    out.push_str(&format!("{rule}\n"));
    if set.entries.is_empty() {
        out.push_str("No sites handle this observable type. Try running with --list-sites\n");
    }
    out.push('\n');

    for entry in &set.entries {
        let site = entry.descriptor().display_name();
        match entry {
            SiteOutcome::Error(error) => {
                out.push_str(&format!("[!] Error from {site}: {}\n", error.error));
            }
            SiteOutcome::Results(found) if found.results.is_empty() => {
                out.push_str(&format!("[-] No {site} Results\n"));
            }
            SiteOutcome::Results(found) => {
                out.push_str(&format!("[+] {site} Results\n"));
                for finding in &found.results {
                    let value = escape(&finding.value);
                    match finding.pretty_name {
                        Some(ref label) => out.push_str(&format!("    [-] {label}: {value}\n")),
                        None => out.push_str(&format!("    [-] {value}\n")),
                    }
                }
            }
        }
    }
    out.push('\n');
    out
}

pub(super) fn short(set: &ResultSet) -> String {
    let target = &set.target_info.target;
    let mut out = String::new();
    for entry in &set.entries {
        let site = entry.descriptor().display_name();
        let line = match entry {
            SiteOutcome::Error(error) => format!("{target} [{site}] error: {}", error.error),
            SiteOutcome::Results(found) if found.results.is_empty() => {
                format!("{target} [{site}] no results")
            }
            SiteOutcome::Results(found) => {
                let values: Vec<&str> = found.results.iter().map(|f| f.value.as_str()).collect();
                format!("{target} [{site}] {}", values.join(", "))
            }
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}
