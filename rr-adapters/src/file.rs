//! Session dump files
//!
//! A dump is one [`Session`] serialized as JSON, optionally zstd-compressed
//! (`.json.zst`). Dumps are how a session fetched once from a timing
//! provider is replayed again without the network.

use anyhow::{bail, Context, Result};
use rr_core::adapter::SessionSource;
use rr_core::model::Session;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DumpFormat {
    Json,
    JsonZstd,
}

impl DumpFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if name.ends_with(".json.zst") {
            Ok(DumpFormat::JsonZstd)
        } else if name.ends_with(".json") {
            Ok(DumpFormat::Json)
        } else {
            bail!("unsupported session dump extension: {}", path.display())
        }
    }
}

/// Loads a session from a dump file on disk
pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.trim_end_matches(".zst").trim_end_matches(".json").to_string())
            .unwrap_or_else(|| "file".to_string());
        Self { name, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Session> {
        let format = DumpFormat::from_path(&self.path)?;
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open session dump {}", self.path.display()))?;

        let reader: Box<dyn Read> = match format {
            DumpFormat::Json => Box::new(BufReader::new(file)),
            DumpFormat::JsonZstd => Box::new(
                zstd::Decoder::new(file).context("Failed to start zstd decoder")?,
            ),
        };

        let session: Session = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse session dump {}", self.path.display()))?;

        info!(
            "Loaded session dump {}: {} ({} laps, {} drivers)",
            self.path.display(),
            session.info.event_name,
            session.total_laps(),
            session.results.len()
        );
        Ok(session)
    }
}

/// Write `session` as a dump; the format follows the file extension
pub fn save(session: &Session, path: &Path) -> Result<()> {
    let format = DumpFormat::from_path(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create session dump {}", path.display()))?;

    match format {
        DumpFormat::Json => {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, session).context("Failed to write session JSON")?;
            writer.flush()?;
        }
        DumpFormat::JsonZstd => {
            let mut encoder = zstd::Encoder::new(file, ZSTD_LEVEL)
                .context("Failed to start zstd encoder")?;
            serde_json::to_writer(&mut encoder, session).context("Failed to write session JSON")?;
            encoder.finish()?.flush()?;
        }
    }

    info!("Saved session dump {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_format_from_extension() {
        assert_eq!(DumpFormat::from_path(Path::new("a/b.json")).unwrap(), DumpFormat::Json);
        assert_eq!(
            DumpFormat::from_path(Path::new("2024_R1.JSON.ZST")).unwrap(),
            DumpFormat::JsonZstd
        );
        assert!(DumpFormat::from_path(Path::new("race.csv")).is_err());
    }

    #[test]
    fn test_file_source_name_strips_extension() {
        assert_eq!(FileSource::new("/tmp/2024_bahrain.json.zst").name(), "2024_bahrain");
        assert_eq!(FileSource::new("monaco.json").name(), "monaco");
    }

    #[test]
    fn test_missing_file_is_error() {
        let source = FileSource::new("/nonexistent/session.json");
        let err = source.load().unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }
}
