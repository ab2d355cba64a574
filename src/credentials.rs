//! Loading the `--auth` credentials file.
//!
//! The file is TOML with one table per credentials entry; sites refer to an
//! entry by name from their `request.auth` key.

use std::path::Path;

use machinae_lookup::Credentials;

use crate::error::{MachinaeError, Result};

/// Load credentials from `path`.
///
/// A path that does not point at a file yields no credentials, so a shared
/// command line keeps working on machines without the file.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: Option<&Path>) -> Result<Credentials> {
    let Some(path) = path.filter(|p| p.is_file()) else {
        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "credentials file not found, continuing without");
        }
        return Ok(Credentials::default());
    };

    let content = std::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content)
        .map_err(|e| MachinaeError::Config(format!("{}: {e}", path.display())))?;
    let serde_json::Value::Object(entries) =
        serde_json::to_value(table).map_err(|e| MachinaeError::Config(e.to_string()))?
    else {
        return Err(MachinaeError::Config("credentials file is not a table".into()));
    };

    tracing::debug!(entries = entries.len(), "loaded credentials");
    Ok(Credentials::new(entries))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn no_path_means_no_credentials() {
        assert!(load(None).unwrap().is_empty());
    }

    #[test]
    fn missing_file_means_no_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let creds = load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(creds.is_empty());
    }

    #[test]
    fn loads_named_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.toml");
        std::fs::write(
            &path,
            "[shodan]\nheader = \"X-Key\"\nvalue = \"abc\"\n\n[passivetotal]\nusername = \"u\"\npassword = \"p\"\n",
        )
        .unwrap();

        let creds = load(Some(&path)).unwrap();
        assert_eq!(creds.get("shodan").unwrap()["value"], "abc");
        assert_eq!(creds.get("passivetotal").unwrap()["username"], "u");
        assert!(creds.get("virustotal").is_none());
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.toml");
        std::fs::write(&path, "shodan = [").unwrap();
        assert!(matches!(load(Some(&path)), Err(MachinaeError::Config(_))));
    }
}
