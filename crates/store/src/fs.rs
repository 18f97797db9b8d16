use std::path::Path;

use tempfile::NamedTempFile;

/// Write-temp-then-rename within the same directory: the target path never
/// observes a partially written file (§6.4, §9).
pub async fn atomic_write_async(target: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = target.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "target has no parent")
    })?;
    tokio::fs::create_dir_all(parent).await?;

    let temp = NamedTempFile::new_in(parent)?;
    tokio::fs::write(temp.path(), content).await?;
    temp.persist(target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn atomic_write_creates_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("new_file.json");

        atomic_write_async(&target, br#"{"key": "value"}"#)
            .await
            .unwrap();

        assert_eq!(
            tokio::fs::read_to_string(&target).await.unwrap(),
            r#"{"key": "value"}"#
        );
    }

    #[tokio::test]
    async fn atomic_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested").join("dir").join("file.json");

        atomic_write_async(&target, b"content").await.unwrap();

        assert_eq!(tokio::fs::read_to_string(&target).await.unwrap(), "content");
    }

    #[tokio::test]
    async fn atomic_write_overwrites_existing() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("file.json");
        tokio::fs::write(&target, "old").await.unwrap();

        atomic_write_async(&target, b"new").await.unwrap();

        assert_eq!(tokio::fs::read_to_string(&target).await.unwrap(), "new");
    }
}
