//! SemVer - 버전 비교 및 제약 조건 해석
//!
//! 지원하는 제약 조건:
//! - 정확한 버전: `1.2.3`, `=1.2.3`
//! - 비교: `>`, `>=`, `<`, `<=`
//! - caret: `^1.2.3` (가장 왼쪽의 0이 아닌 자리 고정, major가 0이면 tilde와 동일)
//! - tilde: `~1.2.3`, `~1.2`, `~1` (major 고정, minor가 주어지면 minor도 고정)
//! - x-range: `1.x`, `1.2`, `*`
//! - 공백으로 구분된 복합 범위 (`>=1.0.0 <2.0.0`), `||` 대안

use pawnctl_foundation::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Version
// ============================================================================

/// 시맨틱 버전 (build 메타데이터는 무시)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// 버전 문자열 파싱 (예: "1.2.3", "v2.0.0-beta.1", "1.0.0+build.5")
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let body = body.split('+').next().unwrap_or_default();

        let (core, pre) = match body.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some(_) => return Err(invalid_version(s)),
            None => (body, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(invalid_version(s));
        }

        let number = |part: &str| part.parse::<u64>().map_err(|_| invalid_version(s));
        Ok(Self {
            major: number(parts[0])?,
            minor: number(parts[1])?,
            patch: number(parts[2])?,
            pre,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }
}

fn invalid_version(s: &str) -> Error {
    Error::InvalidInput(format!("Invalid version: '{}'", s))
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                // pre-release가 있는 쪽이 먼저
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// pre-release 식별자 비교: 점 단위, 숫자끼리는 수치 비교, 숫자가 문자보다 앞
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny).then_with(|| x.cmp(y)),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

// ============================================================================
// PartialVersion - 제약 조건용 (생략/와일드카드 허용)
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
}

#[derive(Debug, Clone)]
struct PartialVersion {
    parts: Partial,
    pre: Option<String>,
}

impl PartialVersion {
    fn parse(s: &str) -> Option<Self> {
        let body = s.strip_prefix('v').unwrap_or(s);
        let body = body.split('+').next().unwrap_or_default();
        if body.is_empty() {
            return None;
        }

        let (core, pre) = match body.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some(_) => return None,
            None => (body, None),
        };

        let mut numbers = [None, None, None];
        let pieces: Vec<&str> = core.split('.').collect();
        if pieces.len() > 3 {
            return None;
        }
        let mut wildcard = false;
        for (slot, piece) in numbers.iter_mut().zip(pieces.iter()) {
            if wildcard || matches!(*piece, "x" | "X" | "*") {
                wildcard = true;
                continue;
            }
            *slot = Some(piece.parse::<u64>().ok()?);
        }

        Some(Self {
            parts: Partial {
                major: numbers[0],
                minor: numbers[1],
                patch: numbers[2],
            },
            pre,
        })
    }

    fn is_full(&self) -> bool {
        self.parts.major.is_some() && self.parts.minor.is_some() && self.parts.patch.is_some()
    }

    /// 생략된 자리를 0으로 채운 하한
    fn floor(&self) -> Version {
        Version {
            major: self.parts.major.unwrap_or(0),
            minor: self.parts.minor.unwrap_or(0),
            patch: self.parts.patch.unwrap_or(0),
            pre: self.pre.clone(),
        }
    }

    /// 생략된 자리 직전 자리를 올린 상한 (x-range의 배타적 상한)
    ///
    /// major가 `u64::MAX` 이면 상한이 없다.
    fn next_ceiling(&self) -> Option<Version> {
        match (self.parts.major, self.parts.minor, self.parts.patch) {
            (None, _, _) => None,
            (Some(major), None, _) => major_ceiling(major),
            (Some(major), Some(minor), None) => minor_ceiling(major, minor),
            (Some(_), Some(_), Some(_)) => None,
        }
    }
}

// ============================================================================
// Comparator / VersionReq
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Comparator {
    Eq(Version),
    Gt(Version),
    Gte(Version),
    Lt(Version),
    Lte(Version),
}

impl Comparator {
    fn matches(&self, version: &Version) -> bool {
        match self {
            Comparator::Eq(v) => version == v,
            Comparator::Gt(v) => version > v,
            Comparator::Gte(v) => version >= v,
            Comparator::Lt(v) => version < v,
            Comparator::Lte(v) => version <= v,
        }
    }
}

/// 파싱된 버전 제약 조건
///
/// `alternatives` 중 하나라도 (AND로 묶인 비교자를) 모두 만족하면 통과한다.
/// 빈 비교자 목록은 모든 버전을 허용한다.
#[derive(Debug, Clone)]
pub struct VersionReq {
    raw: String,
    alternatives: Vec<Vec<Comparator>>,
}

impl VersionReq {
    /// 제약 조건 문자열 파싱
    pub fn parse(constraint: &str) -> Result<Self> {
        let raw = constraint.trim().to_string();
        let mut alternatives = Vec::new();

        for alternative in raw.split("||") {
            let tokens = join_operator_tokens(alternative);
            let mut comparators = Vec::new();
            for token in tokens {
                parse_token(&token, &mut comparators)
                    .ok_or_else(|| Error::InvalidInput(format!("Invalid constraint: '{}'", raw)))?;
            }
            alternatives.push(comparators);
        }

        Ok(Self { raw, alternatives })
    }

    /// 버전이 제약 조건을 만족하는지 확인
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|comparators| comparators.iter().all(|c| c.matches(version)))
    }

    /// 정확히 하나의 버전으로 고정된 제약이면 그 버전
    pub fn exact_pin(&self) -> Option<&Version> {
        match self.alternatives.as_slice() {
            [only] => match only.as_slice() {
                [Comparator::Eq(v)] => Some(v),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for VersionReq {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// ">= 1.0.0" 처럼 연산자와 버전이 떨어져 있으면 하나의 토큰으로 합친다
fn join_operator_tokens(alternative: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending: Option<String> = None;

    for word in alternative.split_whitespace() {
        if let Some(op) = pending.take() {
            tokens.push(format!("{}{}", op, word));
        } else if matches!(word, ">" | ">=" | "<" | "<=" | "=" | "^" | "~") {
            pending = Some(word.to_string());
        } else {
            tokens.push(word.to_string());
        }
    }
    if let Some(op) = pending {
        tokens.push(op);
    }
    tokens
}

fn parse_token(token: &str, out: &mut Vec<Comparator>) -> Option<()> {
    if matches!(token, "*" | "x" | "X" | "latest") {
        return Some(());
    }

    let (op, rest) = split_operator(token);
    let partial = PartialVersion::parse(rest)?;

    match op {
        "" | "=" => {
            if partial.is_full() {
                out.push(Comparator::Eq(partial.floor()));
            } else if partial.parts.major.is_some() {
                out.push(Comparator::Gte(partial.floor()));
                out.extend(partial.next_ceiling().map(Comparator::Lt));
            }
        }
        ">" => match partial.next_ceiling() {
            Some(ceiling) => out.push(Comparator::Gte(ceiling)),
            None if partial.is_full() => out.push(Comparator::Gt(partial.floor())),
            // ">*": 만족하는 버전 없음
            None => out.push(Comparator::Lt(Version::new(0, 0, 0))),
        },
        ">=" => out.push(Comparator::Gte(partial.floor())),
        "<" => out.push(Comparator::Lt(partial.floor())),
        "<=" => match partial.next_ceiling() {
            Some(ceiling) => out.push(Comparator::Lt(ceiling)),
            None if partial.is_full() => out.push(Comparator::Lte(partial.floor())),
            None => {}
        },
        "^" => {
            let floor = partial.floor();
            let ceiling = if floor.major > 0 {
                major_ceiling(floor.major)
            } else {
                // major 0: tilde와 동일
                tilde_ceiling(&partial)
            };
            out.push(Comparator::Gte(floor));
            out.extend(ceiling.map(Comparator::Lt));
        }
        "~" => {
            out.push(Comparator::Gte(partial.floor()));
            out.extend(tilde_ceiling(&partial).map(Comparator::Lt));
        }
        _ => return None,
    }
    Some(())
}

fn tilde_ceiling(partial: &PartialVersion) -> Option<Version> {
    let major = partial.parts.major.unwrap_or(0);
    match partial.parts.minor {
        Some(minor) => minor_ceiling(major, minor),
        None => major_ceiling(major),
    }
}

fn major_ceiling(major: u64) -> Option<Version> {
    major.checked_add(1).map(|next| Version::new(next, 0, 0))
}

/// minor가 끝까지 차면 다음 major가 상한
fn minor_ceiling(major: u64, minor: u64) -> Option<Version> {
    match minor.checked_add(1) {
        Some(next) => Some(Version::new(major, next, 0)),
        None => major_ceiling(major),
    }
}

fn split_operator(token: &str) -> (&str, &str) {
    for op in [">=", "<=", ">", "<", "=", "^", "~"] {
        if let Some(rest) = token.strip_prefix(op) {
            return (op, rest.trim());
        }
    }
    ("", token)
}

// ============================================================================
// 편의 함수
// ============================================================================

/// 두 버전 문자열 비교 (major → minor → patch → pre-release)
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

/// 버전이 제약 조건을 만족하는지 확인 (파싱 실패는 불만족)
pub fn satisfies(version: &str, constraint: &str) -> bool {
    match (Version::parse(version), VersionReq::parse(constraint)) {
        (Ok(version), Ok(req)) => req.matches(&version),
        _ => false,
    }
}

/// 모든 제약 조건을 만족하는 가장 높은 버전
pub fn find_best_version<V, C>(versions: V, constraints: C) -> Option<String>
where
    V: IntoIterator,
    V::Item: AsRef<str>,
    C: IntoIterator,
    C::Item: AsRef<str>,
{
    let reqs: Vec<VersionReq> = constraints
        .into_iter()
        .filter_map(|c| VersionReq::parse(c.as_ref()).ok())
        .collect();

    versions
        .into_iter()
        .filter_map(|raw| {
            let raw = raw.as_ref().to_string();
            Version::parse(&raw).ok().map(|v| (v, raw))
        })
        .filter(|(v, _)| reqs.iter().all(|req| req.matches(v)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw)
}

/// 제약 조건이 단일 버전 고정인지 확인
pub fn exact_pin(constraint: &str) -> Option<Version> {
    VersionReq::parse(constraint)
        .ok()
        .and_then(|req| req.exact_pin().cloned())
}

/// 두 제약 조건의 호환 여부
///
/// 서로 다른 버전으로 고정된 두 제약만 비호환으로 판단한다.
/// (`^1.0.0`과 `^2.0.0`처럼 범위가 겹치지 않는 경우도 현재는 호환으로 본다)
pub fn constraints_compatible(a: &str, b: &str) -> bool {
    match (exact_pin(a), exact_pin(b)) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

/// 제약 조건 충돌
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintConflict {
    pub first: String,
    pub second: String,
    pub reason: String,
}

/// 제약 조건 목록의 쌍별 충돌 탐지
pub fn detect_conflicts<C>(constraints: C) -> Vec<ConstraintConflict>
where
    C: IntoIterator,
    C::Item: AsRef<str>,
{
    let list: Vec<String> = constraints
        .into_iter()
        .map(|c| c.as_ref().trim().to_string())
        .collect();
    let mut conflicts = Vec::new();

    for (i, first) in list.iter().enumerate() {
        for second in &list[i + 1..] {
            if !constraints_compatible(first, second) {
                conflicts.push(ConstraintConflict {
                    first: first.clone(),
                    second: second.clone(),
                    reason: format!("'{}' and '{}' pin different versions", first, second),
                });
            }
        }
    }

    conflicts
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        let v = Version::parse("v1.2.3-beta.1+build.7").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
        assert_eq!(v.pre.as_deref(), Some("beta.1"));
        assert_eq!(v.to_string(), "1.2.3-beta.1");

        assert!(Version::parse("1.2").is_err());
        assert!(Version::parse("1.2.x").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn test_ceiling_at_component_limit() {
        let max = u64::MAX;
        let top = format!("{}.0.0", max);
        assert!(satisfies(&top, &format!("^{}", top)));
        assert!(satisfies(&format!("{}.5.1", max), &format!("~{}", max)));
        assert!(satisfies(&format!("{}.9.9", max), &format!("{}.x", max)));
        assert!(!satisfies(&format!("{}.9.9", max), &format!(">{}.x", max)));

        let edge_minor = format!("1.{}.0", max);
        assert!(satisfies(&format!("1.{}.3", max), &format!("~{}", edge_minor)));
        assert!(satisfies(&format!("0.{}.7", max), &format!("^0.{}.0", max)));
        assert!(!satisfies("2.0.0", &format!("~{}", edge_minor)));
        assert!(satisfies(&format!("1.{}.4", max), &format!("<=1.{}", max)));
    }

    #[test]
    fn test_compare_order() {
        assert_eq!(compare("1.0.0", "1.0.0").unwrap(), Ordering::Equal);
        assert_eq!(compare("1.0.0", "2.0.0").unwrap(), Ordering::Less);
        assert_eq!(compare("1.10.0", "1.9.9").unwrap(), Ordering::Greater);
        assert_eq!(compare("1.0.0-alpha", "1.0.0").unwrap(), Ordering::Less);
        assert_eq!(compare("1.0.0-alpha.2", "1.0.0-alpha.10").unwrap(), Ordering::Less);
        assert_eq!(compare("1.0.0-alpha", "1.0.0-beta").unwrap(), Ordering::Less);
        assert!(compare("nope", "1.0.0").is_err());
    }

    #[test]
    fn test_compare_is_total_order() {
        let samples = [
            "0.0.1", "0.1.0", "1.0.0-alpha", "1.0.0-alpha.1", "1.0.0-1", "1.0.0-beta",
            "1.0.0", "1.0.1", "1.2.3", "2.0.0-rc.1", "2.0.0", "10.0.0",
        ];
        let versions: Vec<Version> = samples.iter().map(|s| Version::parse(s).unwrap()).collect();

        for a in &versions {
            assert_eq!(a.cmp(a), Ordering::Equal);
            for b in &versions {
                assert_eq!(a.cmp(b), b.cmp(a).reverse());
                for c in &versions {
                    if a < b && b < c {
                        assert!(a < c);
                    }
                }
            }
        }
    }

    #[test]
    fn test_satisfies_caret_and_tilde() {
        assert!(satisfies("1.2.3", "^1.0.0"));
        assert!(!satisfies("2.0.0", "^1.0.0"));
        assert!(satisfies("1.2.3", "~1.2.0"));
        assert!(!satisfies("1.3.0", "~1.2.0"));
        assert!(satisfies("1.9.0", "~1"));
        assert!(!satisfies("2.0.0", "~1"));
    }

    #[test]
    fn test_caret_zero_major_acts_like_tilde() {
        assert!(satisfies("0.2.5", "^0.2.3"));
        assert!(!satisfies("0.3.0", "^0.2.3"));
        assert!(!satisfies("0.2.2", "^0.2.3"));
        assert!(satisfies("0.0.9", "^0.0.3"));
        assert!(!satisfies("0.1.0", "^0.0.3"));
    }

    #[test]
    fn test_satisfies_compound_ranges() {
        assert!(satisfies("1.5.0", ">=1.0.0 <2.0.0"));
        assert!(!satisfies("2.0.0", ">=1.0.0 <2.0.0"));
        assert!(satisfies("1.5.0", ">= 1.0.0 < 2.0.0"));
        assert!(satisfies("3.1.0", "^1.0.0 || ^3.0.0"));
        assert!(!satisfies("2.1.0", "^1.0.0 || ^3.0.0"));
    }

    #[test]
    fn test_satisfies_comparators_and_ranges() {
        assert!(satisfies("1.2.3", "1.2.3"));
        assert!(satisfies("1.2.3", "=1.2.3"));
        assert!(!satisfies("1.2.4", "1.2.3"));
        assert!(satisfies("1.2.4", ">1.2.3"));
        assert!(!satisfies("1.2.3", ">1.2.3"));
        assert!(satisfies("1.2.3", "<=1.2.3"));
        assert!(satisfies("1.2.9", "1.2.x"));
        assert!(!satisfies("1.3.0", "1.2"));
        assert!(satisfies("1.3.0", ">1.2"));
        assert!(!satisfies("1.2.5", ">1.2"));
        assert!(satisfies("9.9.9", "*"));
        assert!(satisfies("9.9.9", ""));
        assert!(!satisfies("garbage", "*"));
        assert!(!satisfies("1.0.0", ">>1.0.0"));
    }

    #[test]
    fn test_find_best_version() {
        let versions = ["1.0.0", "1.4.2", "1.9.0", "2.0.0", "2.1.0-beta"];
        assert_eq!(
            find_best_version(versions, ["^1.0.0"]),
            Some("1.9.0".to_string())
        );
        assert_eq!(
            find_best_version(versions, [">=1.2.0", "<1.5.0"]),
            Some("1.4.2".to_string())
        );
        assert_eq!(find_best_version(versions, ["^3.0.0"]), None);
        assert_eq!(
            find_best_version(versions, Vec::<String>::new()),
            Some("2.1.0-beta".to_string())
        );
    }

    #[test]
    fn test_detect_conflicts_exact_pins_only() {
        let conflicts = detect_conflicts(["1.0.0", "=2.0.0", "^1.0.0"]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].first, "1.0.0");
        assert_eq!(conflicts[0].second, "=2.0.0");

        // 범위끼리는 겹치지 않아도 호환으로 본다
        assert!(detect_conflicts(["^1.0.0", "^2.0.0"]).is_empty());
        assert!(detect_conflicts(["1.0.0", "1.0.0"]).is_empty());
    }

    #[test]
    fn test_exact_pin() {
        assert_eq!(exact_pin("=1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(exact_pin("1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(exact_pin("^1.2.3"), None);
        assert_eq!(exact_pin("1.2"), None);
    }
}
