//! Session source trait definition

use crate::model::Session;
use anyhow::Result;

/// Trait for providers of race session data
///
/// Each source is responsible for:
/// - Locating its data (a file, a generator, a remote cache)
/// - Converting it to the unified `Session` tables
///
/// The engine never mutates what a source returns.
pub trait SessionSource: Send + Sync {
    /// Get the name of this source (e.g., "demo", "monza-2024.json")
    fn name(&self) -> &str;

    /// Load the full session
    ///
    /// This may block on disk I/O or heavy generation; async callers should
    /// run it on a blocking thread.
    fn load(&self) -> Result<Session>;
}
