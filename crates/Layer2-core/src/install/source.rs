//! AddonSource - 설치 소스 문자열 파싱

use lazy_static::lazy_static;
use pawnctl_foundation::{Error, Result};
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use url::Url;

lazy_static! {
    /// `owner/repo` 또는 `owner/repo@ref`
    static ref SHORTHAND: Regex =
        Regex::new(r"^([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)(?:@(\S+))?$").expect("valid regex");

    /// Windows 드라이브 접두사 (`C:\`, `d:/`)
    static ref DRIVE_PREFIX: Regex = Regex::new(r"^[A-Za-z]:[\\/]").expect("valid regex");
}

const LOCAL_PREFIXES: &[&str] = &["./", "../", "/", "~", ".\\", "..\\"];

// ============================================================================
// GitHubRef
// ============================================================================

/// GitHub 저장소 참조
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRef {
    pub owner: String,
    pub repo: String,
    /// 브랜치/태그/커밋 (없으면 저장소 기본 브랜치)
    pub git_ref: Option<String>,
}

impl GitHubRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        let repo = repo.into();
        let repo = repo.strip_suffix(".git").map(String::from).unwrap_or(repo);
        Self {
            owner: owner.into(),
            repo,
            git_ref: None,
        }
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        let git_ref = git_ref.into();
        self.git_ref = (!git_ref.is_empty()).then_some(git_ref);
        self
    }

    /// API tarball 주소
    pub fn tarball_url(&self, api_base: &str) -> String {
        let base = api_base.trim_end_matches('/');
        match &self.git_ref {
            Some(git_ref) => format!(
                "{}/repos/{}/{}/tarball/{}",
                base, self.owner, self.repo, git_ref
            ),
            None => format!("{}/repos/{}/{}/tarball", base, self.owner, self.repo),
        }
    }

    /// 레지스트리에 남기는 저장소 주소 (ref 포함)
    pub fn html_url(&self) -> String {
        match &self.git_ref {
            Some(git_ref) => format!(
                "https://github.com/{}/{}/tree/{}",
                self.owner, self.repo, git_ref
            ),
            None => format!("https://github.com/{}/{}", self.owner, self.repo),
        }
    }
}

impl fmt::Display for GitHubRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)?;
        if let Some(git_ref) = &self.git_ref {
            write!(f, "@{}", git_ref)?;
        }
        Ok(())
    }
}

// ============================================================================
// AddonSource
// ============================================================================

/// 설치 소스
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddonSource {
    /// 로컬 디렉토리 (제자리에서 로드)
    Local(PathBuf),
    /// GitHub 저장소 (아카이브 다운로드)
    GitHub(GitHubRef),
}

impl AddonSource {
    /// 소스 문자열 파싱
    ///
    /// 경로 표식으로 시작하면 로컬, `owner/repo[@ref]`, `github:` 접두사,
    /// github.com URL이면 원격으로 본다.
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        if source.is_empty() {
            return Err(Error::InvalidInput("Addon source is empty".into()));
        }

        if is_local_path(source) {
            return Ok(Self::Local(expand_home(source)));
        }

        if let Some(rest) = source.strip_prefix("github:") {
            return parse_shorthand(rest)
                .map(Self::GitHub)
                .ok_or_else(|| unsupported(source));
        }

        if source.starts_with("http://") || source.starts_with("https://") {
            return parse_github_url(source)
                .map(Self::GitHub)
                .ok_or_else(|| unsupported(source));
        }

        parse_shorthand(source)
            .map(Self::GitHub)
            .ok_or_else(|| unsupported(source))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl fmt::Display for AddonSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::GitHub(github) => write!(f, "github:{}", github),
        }
    }
}

fn unsupported(source: &str) -> Error {
    Error::InvalidInput(format!(
        "Unsupported addon source '{}': use a local path (./dir), owner/repo[@ref] or a GitHub URL",
        source
    ))
}

fn is_local_path(source: &str) -> bool {
    LOCAL_PREFIXES.iter().any(|p| source.starts_with(p)) || DRIVE_PREFIX.is_match(source)
}

fn expand_home(source: &str) -> PathBuf {
    if let Some(rest) = source.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches(['/', '\\']));
        }
    }
    PathBuf::from(source)
}

/// 설치 디렉토리 이름이 되므로 `.`/`..`/빈 이름은 거부
fn plain_names(github: GitHubRef) -> Option<GitHubRef> {
    let usable = |name: &str| !name.is_empty() && name != "." && name != "..";
    (usable(&github.owner) && usable(&github.repo)).then_some(github)
}

fn parse_shorthand(source: &str) -> Option<GitHubRef> {
    let caps = SHORTHAND.captures(source)?;
    let github = plain_names(GitHubRef::new(&caps[1], &caps[2]))?;
    Some(match caps.get(3) {
        Some(git_ref) => github.with_ref(git_ref.as_str()),
        None => github,
    })
}

/// `https://github.com/owner/repo[.git][/tree/<ref>]`
fn parse_github_url(source: &str) -> Option<GitHubRef> {
    let url = Url::parse(source).ok()?;
    let host = url.host_str()?;
    if host != "github.com" && host != "www.github.com" {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [owner, repo] => plain_names(GitHubRef::new(*owner, *repo)),
        [owner, repo, "tree", rest @ ..] if !rest.is_empty() => {
            plain_names(GitHubRef::new(*owner, *repo)).map(|github| github.with_ref(rest.join("/")))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github(source: &str) -> GitHubRef {
        match AddonSource::parse(source).unwrap() {
            AddonSource::GitHub(github) => github,
            other => panic!("expected GitHub source, got {:?}", other),
        }
    }

    #[test]
    fn test_local_markers() {
        for source in ["./addons/timer", "../shared", "/opt/addons/x", ".\\addons", "C:\\addons\\x"] {
            assert!(AddonSource::parse(source).unwrap().is_local(), "{}", source);
        }
    }

    #[test]
    fn test_remote_forms() {
        let plain = github("pawn-lang/samp-stdlib");
        assert_eq!(plain.owner, "pawn-lang");
        assert_eq!(plain.repo, "samp-stdlib");
        assert!(plain.git_ref.is_none());

        assert_eq!(github("owner/repo@v1.2.0").git_ref.as_deref(), Some("v1.2.0"));
        assert_eq!(github("github:owner/repo@main").git_ref.as_deref(), Some("main"));

        let url = github("https://github.com/owner/repo.git");
        assert_eq!(url.repo, "repo");
        assert!(url.git_ref.is_none());

        let tree = github("https://github.com/owner/repo/tree/feature/hooks");
        assert_eq!(tree.git_ref.as_deref(), Some("feature/hooks"));
    }

    #[test]
    fn test_html_url_round_trips() {
        let original = GitHubRef::new("owner", "repo").with_ref("v2");
        assert_eq!(github(&original.html_url()), original);
        assert_eq!(
            original.tarball_url("https://api.github.com/"),
            "https://api.github.com/repos/owner/repo/tarball/v2"
        );
        assert_eq!(
            GitHubRef::new("owner", "repo").tarball_url("https://api.github.com"),
            "https://api.github.com/repos/owner/repo/tarball"
        );
    }

    #[test]
    fn test_unsupported_sources() {
        for source in ["", "just-a-name", "https://gitlab.com/owner/repo", "a/b/c"] {
            assert!(AddonSource::parse(source).is_err(), "{}", source);
        }
    }

    #[test]
    fn test_dot_names_rejected() {
        for source in [
            "owner/..",
            "owner/.",
            "./..",
            "github:../repo",
            "github:owner/..@main",
            "owner/.git",
        ] {
            assert!(
                !matches!(AddonSource::parse(source), Ok(AddonSource::GitHub(_))),
                "{}",
                source
            );
        }
        assert_eq!(github("owner/.dotfiles").repo, ".dotfiles");
    }
}
