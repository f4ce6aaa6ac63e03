//! Durable token storage.
//!
//! A single JSON file holds the current [`Token`]. Each write goes through
//! its own uniquely named temporary sibling that is fsynced and renamed
//! over the target, so a reader sees either the previous or the new file,
//! never a torn one, even with several writers in flight.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{OAuthError, Result};
use crate::token::Token;

/// Default token file name within the config directory.
pub const TOKEN_FILE: &str = "token.json";

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// File-backed token store.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`TOKEN_FILE`] inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(TOKEN_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the stored token. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<Token>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(OAuthError::Storage(format!(
                    "Failed to read token file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let token: Token = serde_json::from_str(&content)
            .map_err(|e| OAuthError::Serialization(format!("Failed to parse token file: {}", e)))?;

        Ok(Some(token))
    }

    /// Persist `token`, replacing any previous one atomically.
    pub fn save(&self, token: &Token) -> Result<()> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => {
                ensure_private_dir(dir)?;
                dir
            }
            None => Path::new("."),
        };

        let json = serde_json::to_vec_pretty(token)
            .map_err(|e| OAuthError::Serialization(format!("Failed to serialize token: {}", e)))?;

        replace_file(dir, &self.path, &json).map_err(|e| {
            OAuthError::Storage(format!(
                "Failed to write token file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!(path = %self.path.display(), "Token saved");
        Ok(())
    }

    /// Remove the stored token. A missing file is not an error.
    pub fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Token deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OAuthError::Storage(format!(
                "Failed to delete token file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

fn ensure_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        OAuthError::Storage(format!(
            "Failed to create token directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(DIR_MODE)).map_err(|e| {
            OAuthError::Storage(format!(
                "Failed to restrict token directory {}: {}",
                dir.display(),
                e
            ))
        })?;
    }

    Ok(())
}

/// Write `contents` to a fresh owner-only temp file in `dir`, then rename it
/// over `target`. The temp file is removed on any failure.
fn replace_file(dir: &Path, target: &Path, contents: &[u8]) -> std::io::Result<()> {
    let prefix = format!(
        ".{}.",
        target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| TOKEN_FILE.to_string())
    );

    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(FILE_MODE));
    }

    let mut tmp = builder.tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}
