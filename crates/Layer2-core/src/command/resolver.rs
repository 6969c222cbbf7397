//! CommandResolver - addon 명령어 충돌 해결
//!
//! 같은 이름의 명령어 후보를 모두 보관하고, 우선순위가 가장 높은 후보를
//! 활성 명령어로 선택한다. 우선순위가 같으면 먼저 등록된 후보가 이긴다.
//! 충돌은 진단용 로그에 누적되며 조회는 상태를 바꾸지 않는다.

use super::program::CommandProgram;
use super::types::AddonCommand;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

// ============================================================================
// 결과 타입
// ============================================================================

/// 충돌 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictReason {
    /// 새 후보가 더 높은 우선순위로 이김
    HigherPriority,
    /// 새 후보가 더 낮은 우선순위로 거부됨
    LowerPriority,
    /// 동일 우선순위 (먼저 등록된 후보 유지)
    Tie,
}

/// 충돌 기록
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandConflict {
    pub name: String,
    pub winner: String,
    pub loser: String,
    pub winner_priority: i32,
    pub loser_priority: i32,
    pub reason: ConflictReason,
}

/// `register_command` 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// 이름의 첫 후보
    Added,
    /// 같은 addon의 이전 선언을 교체
    Updated,
    /// 기존 활성 후보를 밀어냄
    Replaced { previous: String },
    /// 기존 활성 후보에 밀림
    Rejected { winner: String },
}

/// 통계 (진단용)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandStats {
    pub total_candidates: usize,
    pub active: usize,
    pub overrides: usize,
    pub additions: usize,
    pub conflicts: usize,
    pub by_addon: BTreeMap<String, usize>,
}

/// `register_addon_commands_with_program` 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramSyncReport {
    pub overridden: Vec<String>,
    pub added: Vec<String>,
    pub skipped: Vec<String>,
}

// ============================================================================
// CommandResolver
// ============================================================================

struct Candidate {
    command: AddonCommand,
    seq: u64,
}

/// 명령어 충돌 해결기
#[derive(Default)]
pub struct CommandResolver {
    candidates: BTreeMap<String, Vec<Candidate>>,
    conflicts: Vec<CommandConflict>,
    next_seq: u64,
}

impl CommandResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn winner_of(candidates: &[Candidate]) -> Option<&Candidate> {
        candidates.iter().reduce(|best, candidate| {
            if candidate.command.priority > best.command.priority
                || (candidate.command.priority == best.command.priority
                    && candidate.seq < best.seq)
            {
                candidate
            } else {
                best
            }
        })
    }

    /// 명령어 후보 등록
    pub fn register_command(&mut self, command: AddonCommand) -> RegistrationOutcome {
        let name = command.name.clone();
        let owner = command.owner().to_string();
        let seq = self.next_seq;
        self.next_seq += 1;

        let candidates = self.candidates.entry(name.clone()).or_default();

        if let Some(existing) = candidates
            .iter_mut()
            .find(|candidate| candidate.command.owner() == owner)
        {
            debug!("Addon '{}' re-registered command '{}'", owner, name);
            existing.command = command;
            return RegistrationOutcome::Updated;
        }

        let Some(current) = Self::winner_of(candidates) else {
            candidates.push(Candidate { command, seq });
            return RegistrationOutcome::Added;
        };

        let current_owner = current.command.owner().to_string();
        let current_priority = current.command.priority;
        let new_priority = command.priority;

        let (conflict, outcome) = if new_priority > current_priority {
            warn!(
                "Command '{}' from addon '{}' (priority {}) replaces addon '{}' (priority {})",
                name, owner, new_priority, current_owner, current_priority
            );
            (
                CommandConflict {
                    name: name.clone(),
                    winner: owner.clone(),
                    loser: current_owner.clone(),
                    winner_priority: new_priority,
                    loser_priority: current_priority,
                    reason: ConflictReason::HigherPriority,
                },
                RegistrationOutcome::Replaced {
                    previous: current_owner,
                },
            )
        } else {
            let reason = if new_priority == current_priority {
                ConflictReason::Tie
            } else {
                ConflictReason::LowerPriority
            };
            warn!(
                "Command '{}' from addon '{}' (priority {}) ignored; addon '{}' keeps it (priority {}, {:?})",
                name, owner, new_priority, current_owner, current_priority, reason
            );
            (
                CommandConflict {
                    name: name.clone(),
                    winner: current_owner.clone(),
                    loser: owner.clone(),
                    winner_priority: current_priority,
                    loser_priority: new_priority,
                    reason,
                },
                RegistrationOutcome::Rejected {
                    winner: current_owner,
                },
            )
        };

        candidates.push(Candidate { command, seq });
        self.conflicts.push(conflict);
        outcome
    }

    /// addon의 모든 명령어 등록 (소유자 지정)
    pub fn register_addon_commands(
        &mut self,
        addon: &str,
        commands: Vec<AddonCommand>,
    ) -> Vec<RegistrationOutcome> {
        commands
            .into_iter()
            .map(|command| self.register_command(command.from_addon(addon)))
            .collect()
    }

    /// addon의 후보 제거 (다음 후보가 활성화됨)
    pub fn unregister_addon(&mut self, addon: &str) -> usize {
        let mut removed = 0;
        for candidates in self.candidates.values_mut() {
            let before = candidates.len();
            candidates.retain(|candidate| candidate.command.owner() != addon);
            removed += before - candidates.len();
        }
        self.candidates.retain(|_, candidates| !candidates.is_empty());
        self.conflicts
            .retain(|conflict| conflict.winner != addon && conflict.loser != addon);

        if removed > 0 {
            debug!("Unregistered {} command(s) from addon '{}'", removed, addon);
        }
        removed
    }

    /// 이름의 활성 명령어
    pub fn resolve(&self, name: &str) -> Option<&AddonCommand> {
        self.candidates
            .get(name)
            .and_then(|candidates| Self::winner_of(candidates))
            .map(|candidate| &candidate.command)
    }

    /// 모든 활성 명령어 (이름순)
    pub fn resolved_commands(&self) -> Vec<AddonCommand> {
        self.candidates
            .values()
            .filter_map(|candidates| Self::winner_of(candidates))
            .map(|candidate| candidate.command.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
        self.conflicts.clear();
    }

    /// 활성 명령어를 호스트 명령어 표면에 반영
    ///
    /// - override: 호스트 원본을 fallback으로 갖는 체인
    /// - add: fallback 없는 새 명령어
    /// - override 선언 없이 호스트 명령어와 이름이 겹치면 건너뜀
    pub async fn register_addon_commands_with_program(
        &self,
        program: &CommandProgram,
    ) -> ProgramSyncReport {
        program.reset_addon_commands().await;
        let mut report = ProgramSyncReport::default();

        for command in self.resolved_commands() {
            let owner = command.owner().to_string();
            let is_host = program.is_host_command(&command.name).await;

            if command.override_existing && is_host {
                match program
                    .override_command(
                        &command.name,
                        &command.description,
                        &owner,
                        command.handler.clone(),
                    )
                    .await
                {
                    Ok(()) => report.overridden.push(command.name.clone()),
                    Err(e) => {
                        warn!("Failed to override '{}': {}", command.name, e);
                        report.skipped.push(command.name.clone());
                    }
                }
                continue;
            }

            if is_host {
                warn!(
                    "Addon '{}' command '{}' collides with a built-in command and does not declare override; skipping",
                    owner, command.name
                );
                report.skipped.push(command.name.clone());
                continue;
            }

            if command.override_existing {
                debug!(
                    "Addon '{}' declares override for '{}' but no built-in exists; adding",
                    owner, command.name
                );
            }

            match program
                .add_command(
                    &command.name,
                    &command.description,
                    &owner,
                    command.handler.clone(),
                )
                .await
            {
                Ok(()) => report.added.push(command.name.clone()),
                Err(e) => {
                    warn!("Failed to add '{}': {}", command.name, e);
                    report.skipped.push(command.name.clone());
                }
            }
        }

        report
    }

    // ========================================================================
    // 진단 (읽기 전용)
    // ========================================================================

    pub fn get_command_conflicts(&self) -> &[CommandConflict] {
        &self.conflicts
    }

    pub fn get_stats(&self) -> CommandStats {
        let resolved = self.resolved_commands();
        let mut by_addon = BTreeMap::new();
        for command in &resolved {
            *by_addon.entry(command.owner().to_string()).or_insert(0) += 1;
        }

        CommandStats {
            total_candidates: self.candidates.values().map(Vec::len).sum(),
            active: resolved.len(),
            overrides: resolved.iter().filter(|c| c.override_existing).count(),
            additions: resolved.iter().filter(|c| !c.override_existing).count(),
            conflicts: self.conflicts.len(),
            by_addon,
        }
    }
}
