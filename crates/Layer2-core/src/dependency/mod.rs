//! Dependency Layer - addon 간 의존성 그래프와 해석
//!
//! 알려진 addon 정보의 스냅샷으로 그래프를 만들고, 루트에서 도달 가능한
//! 이름을 모아 누락/순환/버전 충돌을 구조화된 결과로 돌려준다.
//! 해석은 실패하지 않으며 문제는 모두 결과에 담긴다.

mod graph;
mod resolver;

pub use graph::{DependencyGraph, DependencyNode};
pub use resolver::{
    AutoInstallOptions, AutoInstallReport, DependencyConflict, DependencyInstaller,
    DependencyResolution, DependencyResolver, DependencyValidation, VersionConflict,
};
