//! Rendering result sets for humans and machines.
//!
//! A [`Format`] renders one [`ResultSet`] at a time; [`write_stream`] pulls
//! records from the lookup stream and writes each one as soon as it arrives.

mod json;
mod text;

pub use json::record as json_record;

use std::fmt;
use std::str::FromStr;

use futures::{Stream, StreamExt};
use machinae_lookup::ResultSet;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{MachinaeError, Result};

/// Output format selected with `-o`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// Banner per target, one block per site.
    #[default]
    Normal,
    /// One JSON object per target, one per line.
    Json,
    /// [`Format::Normal`] with values defanged.
    Defanged,
    /// One line per site.
    Short,
}

impl Format {
    /// Render one record.
    ///
    /// # Errors
    ///
    /// Returns [`MachinaeError::Output`] if the record cannot be serialized.
    pub fn render(self, set: &ResultSet) -> Result<String> {
        match self {
            Self::Normal => Ok(text::normal(set, false)),
            Self::Defanged => Ok(text::normal(set, true)),
            Self::Short => Ok(text::short(set)),
            Self::Json => json::render(set),
        }
    }
}

impl FromStr for Format {
    type Err = MachinaeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "N" => Ok(Self::Normal),
            "J" => Ok(Self::Json),
            "D" => Ok(Self::Defanged),
            "S" => Ok(Self::Short),
            other => Err(MachinaeError::Config(format!(
                "unknown output format {other:?} (expected N, J, D or S)"
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Normal => "N",
            Self::Json => "J",
            Self::Defanged => "D",
            Self::Short => "S",
        };
        f.write_str(code)
    }
}

/// Make an indicator safe to paste: `.` → `[.]`, `http` → `hxxp`, `@` → `[@]`.
pub fn defang(value: &str) -> String {
    value
        .replace("http", "hxxp")
        .replace('.', "[.]")
        .replace('@', "[@]")
}

/// Write every record of `sets` to `out` as it arrives, returning how many
/// were written.
///
/// # Errors
///
/// Returns an error if rendering or writing fails.
pub async fn write_stream<S, W>(sets: S, format: Format, out: &mut W) -> Result<usize>
where
    S: Stream<Item = ResultSet>,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut sets = std::pin::pin!(sets);
    let mut written = 0;
    while let Some(set) = sets.next().await {
        let rendered = format.render(&set)?;
        out.write_all(rendered.as_bytes()).await?;
        out.flush().await?;
        written += 1;
        tracing::debug!(observable = %set.target_info.target, entries = set.entries.len(), "record written");
    }
    Ok(written)
}
