//! Per-session host directories mounted into the container.
//!
//! Two requests with the same session id share a directory. Nothing here
//! locks it.

use crate::error::ExecError;
use std::path::{Path, PathBuf};

pub const DEFAULT_SESSION: &str = "default";

const MAX_SESSION_ID_LEN: usize = 128;

/// Accept only plain names so an id can never point outside `sessions_root`.
pub fn validate_session_id(id: &str) -> Result<(), ExecError> {
    let plain = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if plain {
        Ok(())
    } else {
        Err(ExecError::InvalidSession(id.to_string()))
    }
}

/// Resolve (and create if absent) the absolute host directory for a session.
pub async fn ensure_session_dir(
    sessions_root: &Path,
    session_id: Option<&str>,
) -> Result<PathBuf, ExecError> {
    let id = session_id.unwrap_or(DEFAULT_SESSION);
    validate_session_id(id)?;

    let dir = std::path::absolute(sessions_root.join(id))?;
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ids_are_accepted() {
        for id in ["default", "abc-123", "user_7.notebook", "A"] {
            assert!(validate_session_id(id).is_ok(), "{id}");
        }
    }

    #[test]
    fn path_like_ids_are_rejected() {
        let too_long = "x".repeat(129);
        for id in ["", ".", "..", "../etc", "a/b", "a\\b", "with space", too_long.as_str()] {
            assert!(
                matches!(validate_session_id(id), Err(ExecError::InvalidSession(_))),
                "{id:?}"
            );
        }
    }

    #[tokio::test]
    async fn creates_absolute_directory_once() {
        let root = tempfile::tempdir().unwrap();
        let dir = ensure_session_dir(root.path(), Some("s1")).await.unwrap();
        assert!(dir.is_absolute());
        assert!(dir.is_dir());
        assert_eq!(dir.file_name().unwrap(), "s1");

        std::fs::write(dir.join("state.pkl"), b"kept").unwrap();
        let again = ensure_session_dir(root.path(), Some("s1")).await.unwrap();
        assert_eq!(again, dir);
        assert_eq!(std::fs::read(again.join("state.pkl")).unwrap(), b"kept");
    }

    #[tokio::test]
    async fn missing_id_uses_default_session() {
        let root = tempfile::tempdir().unwrap();
        let dir = ensure_session_dir(root.path(), None).await.unwrap();
        assert_eq!(dir.file_name().unwrap(), DEFAULT_SESSION);
    }
}
