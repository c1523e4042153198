/*
[INPUT]:  Session and profile records, a data directory
[OUTPUT]: Atomically persisted JSON state, tolerant of corruption
[POS]:    State layer - file-backed session vault and profile record
[UPDATE]: When persisted record shapes or file layout change
*/

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stride_client::{Result, Session, SessionVault, StrideError};
use tokio::fs;

/// Who is signed in, kept alongside the session so `whoami` works
/// without a network call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub signed_in_at: DateTime<Utc>,
}

/// JSON-file persistence under the data directory.
///
/// Writes are atomic (temp file + rename). A corrupt or unreadable
/// record is treated as absent, never as a startup failure.
#[derive(Debug, Clone)]
pub struct FileVault {
    session_path: PathBuf,
    profile_path: PathBuf,
}

impl FileVault {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            session_path: data_dir.join("session.json"),
            profile_path: data_dir.join("profile.json"),
        }
    }

    pub async fn load_profile(&self) -> Option<Profile> {
        read_json(&self.profile_path).await
    }

    pub async fn store_profile(&self, profile: &Profile) -> Result<()> {
        write_json_atomic(&self.profile_path, profile).await
    }

    pub async fn clear_profile(&self) -> Result<()> {
        remove_if_present(&self.profile_path).await
    }
}

#[async_trait]
impl SessionVault for FileVault {
    async fn load(&self) -> Result<Option<Session>> {
        Ok(read_json(&self.session_path).await)
    }

    async fn store(&self, session: &Session) -> Result<()> {
        write_json_atomic(&self.session_path, session).await
    }

    async fn clear(&self) -> Result<()> {
        remove_if_present(&self.session_path).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read state file");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "corrupt state file; ignoring");
            None
        }
    }
}

async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| StrideError::Storage(format!("create {}: {err}", parent.display())))?;
    }
    let content = serde_json::to_string_pretty(value)?;

    // Atomic write: write to temp file then rename
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)
        .await
        .map_err(|err| StrideError::Storage(format!("write {}: {err}", temp_path.display())))?;
    fs::rename(&temp_path, path)
        .await
        .map_err(|err| StrideError::Storage(format!("rename to {}: {err}", path.display())))?;
    Ok(())
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StrideError::Storage(format!(
            "remove {}: {err}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::path::PathBuf;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("stride-vault-test-{}", uuid::Uuid::new_v4()))
    }

    fn sample_session() -> Session {
        Session {
            access_token: "token-1".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            user_id: "user-1".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_session_roundtrip() {
        let dir = scratch_dir();
        let vault = FileVault::new(&dir);

        assert!(vault.load().await.unwrap().is_none());

        let session = sample_session();
        vault.store(&session).await.unwrap();
        assert_eq!(vault.load().await.unwrap(), Some(session));

        vault.clear().await.unwrap();
        assert!(vault.load().await.unwrap().is_none());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_corrupt_session_file_reads_as_absent() {
        let dir = scratch_dir();
        let vault = FileVault::new(&dir);

        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("session.json"), "{not json at all")
            .await
            .unwrap();

        assert!(vault.load().await.unwrap().is_none());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = scratch_dir();
        let vault = FileVault::new(&dir);

        vault.clear().await.unwrap();
        vault.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_profile_roundtrip() {
        let dir = scratch_dir();
        let vault = FileVault::new(&dir);

        let profile = Profile {
            user_id: "user-1".to_string(),
            email: Some("dev@example.com".to_string()),
            signed_in_at: Utc::now(),
        };
        vault.store_profile(&profile).await.unwrap();
        assert_eq!(vault.load_profile().await, Some(profile));

        vault.clear_profile().await.unwrap();
        assert!(vault.load_profile().await.is_none());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
