//! GitHubDownloader - 저장소 아카이브 다운로드 및 압축 해제

use super::source::GitHubRef;
use async_trait::async_trait;
use futures::StreamExt;
use pawnctl_foundation::{AddonSettings, Error, Result};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const ARCHIVE_NAME: &str = "archive.tar.gz";

/// 원격 저장소 내용을 대상 디렉토리에 풀어 놓는 쪽
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// `target` 아래에 저장소 최상위 내용을 배치한다 (기존 항목은 덮어씀)
    async fn fetch(&self, source: &GitHubRef, target: &Path) -> Result<()>;
}

// ============================================================================
// GitHubDownloader
// ============================================================================

/// GitHub tarball 다운로더
pub struct GitHubDownloader {
    client: Client,
    api_base: String,
}

impl GitHubDownloader {
    pub fn new(settings: &AddonSettings) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::limited(10))
            .timeout(settings.download_timeout())
            .user_agent(concat!("pawnctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_base: settings.github_api_url().to_string(),
        })
    }

    /// URL을 파일로 스트리밍 저장
    async fn download_file(&self, url: &str, dest: &Path) -> Result<()> {
        debug!("Downloading {} to {:?}", url, dest);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(Error::NotFound(format!(
                    "Repository or ref not found: {}",
                    url
                )))
            }
            status => {
                return Err(Error::Http(format!(
                    "Failed to download {}: HTTP {}",
                    url, status
                )))
            }
        }

        let mut file = fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Http(e.to_string()))?;
            written += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!("Downloaded {} bytes", written);
        Ok(())
    }

    async fn fetch_into(&self, url: &str, work_dir: &Path, target: &Path) -> Result<()> {
        let archive = work_dir.join(ARCHIVE_NAME);
        self.download_file(url, &archive).await?;
        extract_tarball(&archive, work_dir).await?;
        let root = find_single_root(work_dir).await?;
        fs::create_dir_all(target).await?;
        move_contents(&root, target).await
    }
}

#[async_trait]
impl ArchiveFetcher for GitHubDownloader {
    async fn fetch(&self, source: &GitHubRef, target: &Path) -> Result<()> {
        let url = source.tarball_url(&self.api_base);
        info!("Fetching {} into {:?}", source, target);

        // 같은 파일시스템에서 rename 하도록 대상 옆에 작업 디렉토리를 둔다
        let parent = target.parent().unwrap_or(target);
        fs::create_dir_all(parent).await?;
        let work_dir = parent.join(format!(".pawnctl-download-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&work_dir).await?;

        let result = self.fetch_into(&url, &work_dir, target).await;

        if let Err(e) = fs::remove_dir_all(&work_dir).await {
            warn!("Could not remove temporary directory {:?}: {}", work_dir, e);
        }
        result
    }
}

// ============================================================================
// 유틸리티
// ============================================================================

/// tar -xzf 로 압축 해제
pub(crate) async fn extract_tarball(archive: &Path, dest: &Path) -> Result<()> {
    debug!("Extracting {:?} to {:?}", archive, dest);

    let output = tokio::process::Command::new("tar")
        .arg("-xzf")
        .arg(archive)
        .arg("-C")
        .arg(dest)
        .output()
        .await?;

    if !output.status.success() {
        return Err(Error::Internal(format!(
            "Failed to extract archive: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

/// 압축 해제 결과의 유일한 최상위 디렉토리
pub(crate) async fn find_single_root(dir: &Path) -> Result<PathBuf> {
    let mut roots = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            roots.push(entry.path());
        }
    }

    match roots.len() {
        1 => Ok(roots.remove(0)),
        0 => Err(Error::NotFound("No directory found after extraction".into())),
        n => Err(Error::Validation(format!(
            "Expected a single top-level directory in archive, found {}",
            n
        ))),
    }
}

/// `src` 의 항목을 `dest` 로 옮긴다 (같은 이름은 덮어씀)
pub(crate) async fn move_contents(src: &Path, dest: &Path) -> Result<()> {
    let mut entries = fs::read_dir(src).await?;
    while let Some(entry) = entries.next_entry().await? {
        let to = dest.join(entry.file_name());
        if let Ok(existing) = fs::symlink_metadata(&to).await {
            if existing.is_dir() {
                fs::remove_dir_all(&to).await?;
            } else {
                fs::remove_file(&to).await?;
            }
        }
        fs::rename(entry.path(), &to).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_move_contents_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("owner-repo-abc123");
        let dest = dir.path().join("target");
        fs::create_dir_all(src.join("filterscripts")).await.unwrap();
        fs::create_dir_all(dest.join("filterscripts")).await.unwrap();
        fs::write(src.join("package.json"), "{\"new\":true}").await.unwrap();
        fs::write(src.join("filterscripts").join("fresh.pwn"), "").await.unwrap();
        fs::write(dest.join("package.json"), "{}").await.unwrap();
        fs::write(dest.join("filterscripts").join("stale.pwn"), "").await.unwrap();
        fs::write(dest.join("keep.txt"), "kept").await.unwrap();

        move_contents(&src, &dest).await.unwrap();

        assert_eq!(
            fs::read_to_string(dest.join("package.json")).await.unwrap(),
            "{\"new\":true}"
        );
        assert!(dest.join("filterscripts").join("fresh.pwn").exists());
        assert!(!dest.join("filterscripts").join("stale.pwn").exists());
        assert!(dest.join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_find_single_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_single_root(dir.path()).await.is_err());

        fs::write(dir.path().join(ARCHIVE_NAME), b"").await.unwrap();
        fs::create_dir(dir.path().join("repo-main")).await.unwrap();
        assert_eq!(
            find_single_root(dir.path()).await.unwrap(),
            dir.path().join("repo-main")
        );

        fs::create_dir(dir.path().join("other")).await.unwrap();
        assert!(find_single_root(dir.path()).await.is_err());
    }
}
