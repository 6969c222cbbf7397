//! Install Layer - addon 설치/업데이트/제거
//!
//! - `source`: 설치 소스 문자열 파싱 (로컬 경로 / GitHub)
//! - `downloader`: GitHub tarball 다운로드와 압축 해제
//! - `installer`: 설치 흐름, 백업/롤백 업데이트, 제거

mod downloader;
mod installer;
mod source;

pub use downloader::{ArchiveFetcher, GitHubDownloader};
pub use installer::{AddonInstaller, AddonUpdate, UpdateSummary};
pub use source::{AddonSource, GitHubRef};
