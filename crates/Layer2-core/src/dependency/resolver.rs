//! DependencyResolver - 의존성 해석, 설치 순서, 충돌 진단

use super::graph::DependencyGraph;
use crate::addon::AddonInfo;
use crate::semver;
use async_trait::async_trait;
use pawnctl_foundation::Result;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

// ============================================================================
// 결과 타입
// ============================================================================

/// 구조적 충돌
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DependencyConflict {
    /// 현재 경로 안에서 다시 만난 이름 (cycle은 시작 이름으로 닫힘)
    Circular { cycle: Vec<String> },

    /// 같은 이름에 서로 다른 버전이 알려짐
    VersionMismatch { addon: String, versions: Vec<String> },

    /// 같은 의존성에 대한 양립 불가 제약
    IncompatibleConstraints {
        dependency: String,
        first: String,
        second: String,
        reason: String,
    },
}

impl DependencyConflict {
    pub fn message(&self) -> String {
        match self {
            Self::Circular { cycle } => {
                format!("Circular dependency detected: {}", cycle.join(" -> "))
            }
            Self::VersionMismatch { addon, versions } => format!(
                "Multiple versions of '{}' are known: {}",
                addon,
                versions.join(", ")
            ),
            Self::IncompatibleConstraints {
                dependency,
                first,
                second,
                reason,
            } => format!(
                "Incompatible constraints on '{}': {} vs {} ({})",
                dependency, first, second, reason
            ),
        }
    }

    pub fn involves(&self, name: &str) -> bool {
        match self {
            Self::Circular { cycle } => cycle.iter().any(|n| n == name),
            Self::VersionMismatch { addon, .. } => addon == name,
            Self::IncompatibleConstraints { dependency, .. } => dependency == name,
        }
    }
}

/// 설치된 버전이 제약을 만족하지 않음
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionConflict {
    pub dependency: String,
    pub constraint: String,
    pub required_by: String,
    pub available: String,
}

/// `resolve_dependencies` 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyResolution {
    pub root: String,
    /// 루트를 포함해 도달 가능한 이름 (방문 순서)
    pub resolved: Vec<String>,
    pub missing: Vec<String>,
    pub conflicts: Vec<DependencyConflict>,
    pub version_conflicts: Vec<VersionConflict>,
}

impl DependencyResolution {
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty() && self.conflicts.is_empty() && self.version_conflicts.is_empty()
    }
}

/// `validate_dependencies` 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyValidation {
    pub valid: bool,
    pub issues: Vec<String>,
}

/// 자동 설치 옵션
#[derive(Debug, Clone, Default)]
pub struct AutoInstallOptions {
    /// 누락 이름 앞에 붙일 소스 접두사 (예: GitHub owner `"pawn-lang/"`)
    pub source_prefix: Option<String>,
    /// 설치 없이 계획만
    pub dry_run: bool,
    /// 이미 설치된 이름도 다시 설치
    pub force: bool,
}

impl AutoInstallOptions {
    pub fn source_for(&self, name: &str) -> String {
        match &self.source_prefix {
            Some(prefix) => format!("{}{}", prefix, name),
            None => name.to_string(),
        }
    }
}

/// 자동 설치 보고
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutoInstallReport {
    pub installed: Vec<String>,
    /// (이름, 에러 메시지)
    pub failed: Vec<(String, String)>,
    /// dry run에서 설치했을 이름
    pub planned: Vec<String>,
}

/// 누락 의존성을 실제로 설치하는 쪽
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    async fn install_dependency(&self, source: &str, options: &AutoInstallOptions) -> Result<AddonInfo>;
}

// ============================================================================
// DependencyResolver
// ============================================================================

/// 알려진 addon 스냅샷 위의 의존성 해석기
pub struct DependencyResolver {
    graph: DependencyGraph,
}

impl DependencyResolver {
    pub fn new(addons: &[AddonInfo]) -> Self {
        Self {
            graph: DependencyGraph::build(addons),
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// 루트에서 깊이 우선으로 해석
    ///
    /// 순환은 현재 경로 기준으로만 판단하며, 기록 후 그 가지만 멈춘다.
    pub fn resolve_dependencies(&self, root: &str) -> DependencyResolution {
        let mut resolution = DependencyResolution {
            root: root.to_string(),
            ..Default::default()
        };

        let mut visited = HashSet::new();
        let mut path = Vec::new();
        self.visit(root, &mut path, &mut visited, &mut resolution);

        self.detect_version_mismatches(&mut resolution);
        self.check_constraints(&mut resolution);

        debug!(
            "Resolved '{}': {} reachable, {} missing, {} conflict(s), {} version conflict(s)",
            root,
            resolution.resolved.len(),
            resolution.missing.len(),
            resolution.conflicts.len(),
            resolution.version_conflicts.len()
        );
        resolution
    }

    fn visit(
        &self,
        name: &str,
        path: &mut Vec<String>,
        visited: &mut HashSet<String>,
        resolution: &mut DependencyResolution,
    ) {
        if let Some(start) = path.iter().position(|n| n == name) {
            let mut cycle: Vec<String> = path[start..].to_vec();
            cycle.push(name.to_string());
            let conflict = DependencyConflict::Circular { cycle };
            if !resolution.conflicts.contains(&conflict) {
                warn!("{}", conflict.message());
                resolution.conflicts.push(conflict);
            }
            return;
        }

        let Some(node) = self.graph.get(name) else {
            if !resolution.missing.iter().any(|m| m == name) {
                resolution.missing.push(name.to_string());
            }
            return;
        };

        if !visited.insert(name.to_string()) {
            return;
        }
        resolution.resolved.push(name.to_string());

        path.push(name.to_string());
        for dependency in &node.dependencies {
            self.visit(dependency, path, visited, resolution);
        }
        path.pop();
    }

    fn detect_version_mismatches(&self, resolution: &mut DependencyResolution) {
        for name in &resolution.resolved {
            if let Some(node) = self.graph.get(name) {
                if node.versions.len() > 1 {
                    resolution.conflicts.push(DependencyConflict::VersionMismatch {
                        addon: name.clone(),
                        versions: node.versions.clone(),
                    });
                }
            }
        }
    }

    fn check_constraints(&self, resolution: &mut DependencyResolution) {
        // 의존성 → [(요구한 addon, 제약)]
        let mut aggregated: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
        for name in &resolution.resolved {
            let Some(node) = self.graph.get(name) else {
                continue;
            };
            for (dependency, constraint) in &node.constraints {
                aggregated
                    .entry(dependency.as_str())
                    .or_default()
                    .push((node.name.as_str(), constraint.as_str()));
            }
        }

        for (dependency, requirements) in aggregated {
            let mut distinct: Vec<&str> = Vec::new();
            for (_, constraint) in &requirements {
                if !distinct.contains(constraint) {
                    distinct.push(constraint);
                }
            }
            if distinct.len() > 1 {
                for conflict in semver::detect_conflicts(&distinct) {
                    resolution
                        .conflicts
                        .push(DependencyConflict::IncompatibleConstraints {
                            dependency: dependency.to_string(),
                            first: conflict.first,
                            second: conflict.second,
                            reason: conflict.reason,
                        });
                }
            }

            let Some(available) = self.graph.get(dependency).and_then(|n| n.version()) else {
                continue;
            };
            for (required_by, constraint) in requirements {
                if !semver::satisfies(available, constraint) {
                    resolution.version_conflicts.push(VersionConflict {
                        dependency: dependency.to_string(),
                        constraint: constraint.to_string(),
                        required_by: required_by.to_string(),
                        available: available.to_string(),
                    });
                }
            }
        }
    }

    // ========================================================================
    // 순서
    // ========================================================================

    /// 설치 순서: 의존성이 먼저, 형제는 발견 순서 그대로
    pub fn get_installation_order(&self, resolution: &DependencyResolution) -> Vec<String> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        for name in &resolution.resolved {
            self.install_visit(name, &mut visited, &mut order);
        }
        order
    }

    fn install_visit(&self, name: &str, visited: &mut HashSet<String>, order: &mut Vec<String>) {
        if !self.graph.contains(name) || !visited.insert(name.to_string()) {
            return;
        }
        for dependency in self.graph.dependencies_of(name) {
            self.install_visit(dependency, visited, order);
        }
        order.push(name.to_string());
    }

    /// 제거 순서: 의존하는 addon이 먼저, 대상은 마지막
    pub fn get_uninstallation_order(&self, name: &str) -> Vec<String> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        self.uninstall_visit(name, &mut visited, &mut order);
        order
    }

    fn uninstall_visit(&self, name: &str, visited: &mut HashSet<String>, order: &mut Vec<String>) {
        if !self.graph.contains(name) || !visited.insert(name.to_string()) {
            return;
        }
        for dependent in self.graph.dependents_of(name) {
            self.uninstall_visit(dependent, visited, order);
        }
        order.push(name.to_string());
    }

    // ========================================================================
    // 검증 / 설치 / 제안
    // ========================================================================

    /// 직접 의존성이 존재하고 활성화되어 있으며 제약을 만족하는지
    pub fn validate_dependencies(&self, name: &str) -> DependencyValidation {
        let Some(node) = self.graph.get(name) else {
            return DependencyValidation {
                valid: false,
                issues: vec![format!("Addon '{}' is not installed", name)],
            };
        };

        let mut issues = Vec::new();
        for dependency in &node.dependencies {
            let Some(target) = self.graph.get(dependency) else {
                issues.push(format!("Missing dependency: {}", dependency));
                continue;
            };
            if !target.enabled {
                issues.push(format!("Dependency '{}' is disabled", dependency));
            }
            if let (Some(constraint), Some(version)) =
                (node.constraints.get(dependency), target.version())
            {
                if !semver::satisfies(version, constraint) {
                    issues.push(format!(
                        "Dependency '{}' version {} does not satisfy {}",
                        dependency, version, constraint
                    ));
                }
            }
        }

        DependencyValidation {
            valid: issues.is_empty(),
            issues,
        }
    }

    /// 누락 의존성을 하나씩 설치 (개별 실패는 기록만)
    pub async fn auto_install_dependencies(
        &self,
        resolution: &DependencyResolution,
        installer: &dyn DependencyInstaller,
        options: &AutoInstallOptions,
    ) -> AutoInstallReport {
        let mut report = AutoInstallReport::default();

        let mut targets: Vec<String> = resolution.missing.clone();
        if options.force {
            for name in &resolution.resolved {
                if name != &resolution.root && !targets.contains(name) {
                    targets.push(name.clone());
                }
            }
        }

        for name in targets {
            let source = options.source_for(&name);
            if options.dry_run {
                info!("[dry-run] Would install dependency '{}' from {}", name, source);
                report.planned.push(name);
                continue;
            }

            match installer.install_dependency(&source, options).await {
                Ok(installed) => {
                    info!("Installed dependency '{}' ({})", installed.name, installed.version);
                    report.installed.push(name);
                }
                Err(e) => {
                    warn!("Failed to install dependency '{}': {}", name, e);
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        report
    }

    /// 해석 결과를 사람이 읽을 해결책 목록으로 (누락 → 충돌 → 버전 순)
    pub fn suggest_solutions(&self, resolution: &DependencyResolution) -> Vec<String> {
        let mut suggestions = Vec::new();

        for missing in &resolution.missing {
            suggestions.push(format!(
                "Install missing dependency '{}': pawnctl addon install <owner>/{}",
                missing, missing
            ));
        }

        for conflict in &resolution.conflicts {
            let suggestion = match conflict {
                DependencyConflict::Circular { cycle } => format!(
                    "Break the dependency cycle {} by removing one of its edges",
                    cycle.join(" -> ")
                ),
                DependencyConflict::VersionMismatch { addon, versions } => format!(
                    "Keep a single version of '{}' (found {}): pawnctl addon uninstall {} and reinstall the one you need",
                    addon,
                    versions.join(", "),
                    addon
                ),
                DependencyConflict::IncompatibleConstraints {
                    dependency,
                    first,
                    second,
                    ..
                } => format!(
                    "Align the constraints on '{}': dependents require both {} and {}",
                    dependency, first, second
                ),
            };
            suggestions.push(suggestion);
        }

        for conflict in &resolution.version_conflicts {
            suggestions.push(format!(
                "Update '{}' to a version matching {} (required by '{}', installed {}): pawnctl addon update {}",
                conflict.dependency,
                conflict.constraint,
                conflict.required_by,
                conflict.available,
                conflict.dependency
            ));
        }

        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::AddonMetadata;
    use pawnctl_foundation::Error;
    use std::sync::Mutex;

    fn addon(name: &str, version: &str, deps: &[&str]) -> AddonInfo {
        let mut metadata = AddonMetadata::new(name, version);
        for dep in deps {
            metadata = metadata.with_dependency(*dep);
        }
        AddonInfo::from_metadata(&metadata)
    }

    fn constrained(name: &str, version: &str, constraints: &[(&str, &str)]) -> AddonInfo {
        let mut metadata = AddonMetadata::new(name, version);
        for (dep, constraint) in constraints {
            metadata = metadata.with_constraint(*dep, *constraint);
        }
        AddonInfo::from_metadata(&metadata)
    }

    #[test]
    fn test_cycle_is_reported_not_followed() {
        let resolver = DependencyResolver::new(&[
            addon("a", "1.0.0", &["b"]),
            addon("b", "1.0.0", &["c"]),
            addon("c", "1.0.0", &["a"]),
        ]);

        let resolution = resolver.resolve_dependencies("a");
        assert_eq!(resolution.resolved, vec!["a", "b", "c"]);
        assert_eq!(resolution.conflicts.len(), 1);

        let conflict = &resolution.conflicts[0];
        assert!(conflict.involves("a"));
        assert_eq!(
            conflict.message(),
            "Circular dependency detected: a -> b -> c -> a"
        );

        // 순환이 있어도 순서 계산은 끝난다
        assert_eq!(resolver.get_installation_order(&resolution).len(), 3);
    }

    #[test]
    fn test_diamond_resolves_each_once_in_dependency_order() {
        let resolver = DependencyResolver::new(&[
            addon("a", "1.0.0", &["b", "c"]),
            addon("b", "1.0.0", &["d"]),
            addon("c", "1.0.0", &["d"]),
            addon("d", "1.0.0", &[]),
        ]);

        let resolution = resolver.resolve_dependencies("a");
        let mut resolved = resolution.resolved.clone();
        resolved.sort();
        assert_eq!(resolved, vec!["a", "b", "c", "d"]);
        assert!(resolution.conflicts.is_empty());

        let order = resolver.get_installation_order(&resolution);
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("d") < pos("b"));
        assert!(pos("d") < pos("c"));
        assert!(pos("b") < pos("a"));
        assert!(pos("c") < pos("a"));
        assert_eq!(order, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_shared_dependency_in_separate_branches_is_not_a_cycle() {
        let resolver = DependencyResolver::new(&[
            addon("a", "1.0.0", &["b", "c"]),
            addon("b", "1.0.0", &["c"]),
            addon("c", "1.0.0", &[]),
        ]);
        assert!(resolver.resolve_dependencies("a").conflicts.is_empty());
    }

    #[test]
    fn test_missing_and_unknown_root() {
        let resolver = DependencyResolver::new(&[addon("a", "1.0.0", &["ghost", "mapper"])]);

        let resolution = resolver.resolve_dependencies("a");
        assert_eq!(resolution.missing, vec!["ghost", "mapper"]);
        assert!(!resolution.is_satisfied());

        let unknown = resolver.resolve_dependencies("nobody");
        assert!(unknown.resolved.is_empty());
        assert_eq!(unknown.missing, vec!["nobody"]);
    }

    #[test]
    fn test_constraint_checks() {
        let resolver = DependencyResolver::new(&[
            addon("root", "1.0.0", &["app", "admin"]),
            constrained("app", "1.0.0", &[("sscanf", "2.8.3"), ("logger", "^2.0.0")]),
            constrained("admin", "1.0.0", &[("sscanf", "=2.13.0")]),
            addon("sscanf", "2.13.0", &[]),
            addon("logger", "1.4.0", &[]),
        ]);

        let resolution = resolver.resolve_dependencies("root");
        assert!(resolution.conflicts.iter().any(|c| matches!(
            c,
            DependencyConflict::IncompatibleConstraints { dependency, .. } if dependency == "sscanf"
        )));

        let failing: Vec<_> = resolution
            .version_conflicts
            .iter()
            .map(|v| (v.dependency.as_str(), v.required_by.as_str()))
            .collect();
        assert!(failing.contains(&("sscanf", "app")));
        assert!(failing.contains(&("logger", "app")));
        assert!(!failing.contains(&("sscanf", "admin")));

        let suggestions = resolver.suggest_solutions(&resolution);
        assert!(suggestions.iter().any(|s| s.contains("pawnctl addon update logger")));
    }

    #[test]
    fn test_version_mismatch_among_duplicates() {
        let resolver = DependencyResolver::new(&[
            addon("a", "1.0.0", &["b"]),
            addon("b", "1.0.0", &[]),
            addon("b", "1.1.0", &[]),
        ]);
        let resolution = resolver.resolve_dependencies("a");
        assert_eq!(
            resolution.conflicts,
            vec![DependencyConflict::VersionMismatch {
                addon: "b".into(),
                versions: vec!["1.0.0".into(), "1.1.0".into()],
            }]
        );
    }

    #[test]
    fn test_uninstallation_order_puts_dependents_first() {
        let resolver = DependencyResolver::new(&[
            addon("core", "1.0.0", &[]),
            addon("mid", "1.0.0", &["core"]),
            addon("top", "1.0.0", &["mid"]),
        ]);
        assert_eq!(
            resolver.get_uninstallation_order("core"),
            vec!["top", "mid", "core"]
        );
        assert!(resolver.get_uninstallation_order("ghost").is_empty());
    }

    #[test]
    fn test_validate_dependencies() {
        let mut disabled = addon("streamer", "2.9.0", &[]);
        disabled.enabled = false;
        let resolver = DependencyResolver::new(&[
            addon("gamemode", "1.0.0", &["streamer", "mysql"]),
            disabled,
            addon("ok", "1.0.0", &[]),
        ]);

        let validation = resolver.validate_dependencies("gamemode");
        assert!(!validation.valid);
        assert_eq!(
            validation.issues,
            vec![
                "Dependency 'streamer' is disabled".to_string(),
                "Missing dependency: mysql".to_string(),
            ]
        );
        assert!(resolver.validate_dependencies("ok").valid);
        assert!(!resolver.validate_dependencies("ghost").valid);
    }

    struct FlakyInstaller {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DependencyInstaller for FlakyInstaller {
        async fn install_dependency(&self, source: &str, _: &AutoInstallOptions) -> Result<AddonInfo> {
            self.calls.lock().unwrap().push(source.to_string());
            if source.ends_with("broken") {
                return Err(Error::NotFound("repository broken".into()));
            }
            let name = source.rsplit('/').next().unwrap_or(source);
            Ok(AddonInfo::from_metadata(&AddonMetadata::new(name, "1.0.0")))
        }
    }

    #[tokio::test]
    async fn test_auto_install_reports_partial_success() {
        let resolver = DependencyResolver::new(&[addon("a", "1.0.0", &["mysql", "broken"])]);
        let resolution = resolver.resolve_dependencies("a");
        let installer = FlakyInstaller {
            calls: Mutex::new(Vec::new()),
        };
        let options = AutoInstallOptions {
            source_prefix: Some("pawn-lang/".into()),
            ..Default::default()
        };

        let report = resolver
            .auto_install_dependencies(&resolution, &installer, &options)
            .await;
        assert_eq!(report.installed, vec!["mysql"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "broken");
        assert_eq!(
            *installer.calls.lock().unwrap(),
            vec!["pawn-lang/mysql", "pawn-lang/broken"]
        );

        let dry = AutoInstallOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = resolver
            .auto_install_dependencies(&resolution, &installer, &dry)
            .await;
        assert_eq!(report.planned, vec!["mysql", "broken"]);
        assert!(report.installed.is_empty());
    }
}
