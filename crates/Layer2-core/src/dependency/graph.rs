//! DependencyGraph - 알려진 모든 addon의 의존성 그래프

use crate::addon::AddonInfo;
use std::collections::{BTreeMap, HashMap};

/// 그래프 노드
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyNode {
    pub name: String,

    /// 같은 이름으로 알려진 버전들 (보통 1개)
    pub versions: Vec<String>,

    pub enabled: bool,

    /// 정방향 간선
    pub dependencies: Vec<String>,

    /// 역방향 간선 (그래프에 있는 addon만)
    pub dependents: Vec<String>,

    /// 의존성 이름 → 버전 제약
    pub constraints: BTreeMap<String, String>,
}

impl DependencyNode {
    /// 대표 버전 (먼저 알려진 버전)
    pub fn version(&self) -> Option<&str> {
        self.versions.first().map(String::as_str)
    }
}

/// 의존성 그래프
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashMap<String, DependencyNode>,
    /// 삽입 순서
    order: Vec<String>,
}

impl DependencyGraph {
    /// addon 정보 목록으로 그래프 구성
    ///
    /// 역방향 간선은 구성 시점의 정방향 간선과 정확히 대응한다.
    pub fn build(addons: &[AddonInfo]) -> Self {
        let mut graph = Self::default();

        for addon in addons {
            let node = match graph.nodes.get_mut(&addon.name) {
                Some(node) => node,
                None => {
                    graph.order.push(addon.name.clone());
                    graph
                        .nodes
                        .entry(addon.name.clone())
                        .or_insert_with(|| DependencyNode {
                            name: addon.name.clone(),
                            enabled: addon.enabled,
                            ..Default::default()
                        })
                }
            };

            if !node.versions.contains(&addon.version) {
                node.versions.push(addon.version.clone());
            }

            let declared = addon
                .dependencies
                .iter()
                .chain(addon.dependency_constraints.keys());
            for dependency in declared {
                if !node.dependencies.contains(dependency) {
                    node.dependencies.push(dependency.clone());
                }
            }
            for (dependency, constraint) in &addon.dependency_constraints {
                node.constraints
                    .entry(dependency.clone())
                    .or_insert_with(|| constraint.clone());
            }
        }

        let edges: Vec<(String, String)> = graph
            .order
            .iter()
            .filter_map(|name| graph.nodes.get(name))
            .flat_map(|node| {
                node.dependencies
                    .iter()
                    .map(move |dependency| (node.name.clone(), dependency.clone()))
            })
            .collect();

        for (dependent, dependency) in edges {
            if let Some(target) = graph.nodes.get_mut(&dependency) {
                if !target.dependents.contains(&dependent) {
                    target.dependents.push(dependent);
                }
            }
        }

        graph
    }

    pub fn get(&self, name: &str) -> Option<&DependencyNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// 노드 이름 (삽입 순서)
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|node| node.dependencies.as_slice())
            .unwrap_or(&[])
    }

    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|node| node.dependents.as_slice())
            .unwrap_or(&[])
    }
}
