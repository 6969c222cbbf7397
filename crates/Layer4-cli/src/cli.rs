//! Subcommand handlers

use crate::AddonAction;
use pawnctl_core::{
    AddonInfo, AddonManager, AutoInstallOptions, CommandOrigin, DependencyResolution,
};
use serde_json::Value;

pub async fn run_addon(manager: &AddonManager, action: AddonAction) -> anyhow::Result<()> {
    match action {
        AddonAction::Install { source, deps_from } => install(manager, &source, deps_from).await,
        AddonAction::Uninstall { name } => {
            let info = manager.uninstall(&name).await?;
            println!("✓ Uninstalled {} v{}", info.name, info.version);
            Ok(())
        }
        AddonAction::List => list(manager).await,
        AddonAction::Enable { name } => {
            let info = manager.enable(&name).await?;
            println!("✓ Enabled {} v{}", info.name, info.version);
            Ok(())
        }
        AddonAction::Disable { name } => {
            manager.disable(&name).await?;
            println!("✓ Disabled {}", name);
            Ok(())
        }
        AddonAction::Search { query } => search(manager, &query).await,
        AddonAction::Info { name } => info(manager, &name).await,
        AddonAction::Update { name, all } => update(manager, name, all).await,
        AddonAction::Deps { name } => deps(manager, &name).await,
        AddonAction::Errors { name, clear } => errors(manager, name, clear).await,
        AddonAction::Recover { name } => {
            let info = manager.recover(&name).await?;
            println!("✓ Recovered {} v{}", info.name, info.version);
            Ok(())
        }
    }
}

async fn install(
    manager: &AddonManager,
    source: &str,
    deps_from: Option<String>,
) -> anyhow::Result<()> {
    let report = manager.install(source).await?;
    println!(
        "✓ Installed {} v{} ({})",
        report.addon.name, report.addon.version, report.addon.source
    );

    if report.resolution.is_satisfied() {
        return Ok(());
    }
    print_resolution(&report.resolution);

    match deps_from {
        Some(owner) => {
            let options = AutoInstallOptions {
                source_prefix: Some(format!("{}/", owner.trim_end_matches('/'))),
                ..Default::default()
            };
            let auto = manager
                .install_missing_dependencies(&report.addon.name, &options)
                .await?;
            for name in &auto.installed {
                println!("  ✓ dependency {}", name);
            }
            for (name, error) in &auto.failed {
                println!("  ✗ dependency {}: {}", name, error);
            }
        }
        None => {
            println!("\nSuggestions:");
            for suggestion in &report.suggestions {
                println!("  - {}", suggestion);
            }
        }
    }
    Ok(())
}

async fn list(manager: &AddonManager) -> anyhow::Result<()> {
    let addons = manager.list().await?;
    if addons.is_empty() {
        println!("No addons installed.");
        return Ok(());
    }

    println!("\n📦 Addons\n");
    print_table(&addons);
    println!();
    Ok(())
}

async fn search(manager: &AddonManager, query: &str) -> anyhow::Result<()> {
    let hits = manager.search(query).await?;
    if hits.is_empty() {
        println!("No addons matching '{}'.", query);
        return Ok(());
    }
    print_table(&hits);
    Ok(())
}

async fn info(manager: &AddonManager, name: &str) -> anyhow::Result<()> {
    let info = manager.info(name).await?;

    println!("\n{} v{}", info.name, info.version);
    if !info.description.is_empty() {
        println!("  {}", info.description);
    }
    println!("  author:   {}", display_or_dash(&info.author));
    println!("  license:  {}", display_or_dash(&info.license));
    println!("  source:   {}", info.source);
    println!("  status:   {}", status_label(&info));
    if let Some(path) = &info.path {
        println!("  path:     {}", path.display());
    }
    if let Some(url) = &info.github_url {
        println!("  github:   {}", url);
    }
    if !info.dependencies.is_empty() {
        println!("  requires: {}", info.dependencies.join(", "));
    }
    for (dependency, constraint) in &info.dependency_constraints {
        println!("            {} {}", dependency, constraint);
    }
    if let Some(error) = &info.last_error {
        println!("  last error: {}", error);
    }
    println!();
    Ok(())
}

async fn update(manager: &AddonManager, name: Option<String>, all: bool) -> anyhow::Result<()> {
    if all || name.is_none() {
        let summary = manager.update_all().await?;
        for update in &summary.updated {
            println!("✓ {} {} → {}", update.name, update.from, update.to);
        }
        for (name, error) in &summary.failed {
            println!("✗ {}: {}", name, error);
        }
        if summary.updated.is_empty() && summary.failed.is_empty() {
            println!("No GitHub addons to update.");
        }
        return Ok(());
    }

    if let Some(name) = name {
        let update = manager.update(&name).await?;
        println!("✓ {} {} → {}", update.name, update.from, update.to);
    }
    Ok(())
}

async fn deps(manager: &AddonManager, name: &str) -> anyhow::Result<()> {
    let resolution = manager.resolve_dependencies(name).await?;
    let order = manager.installation_order(name).await?;

    println!("\nInstall order: {}", order.join(" → "));
    if resolution.is_satisfied() {
        println!("✓ All dependencies satisfied");
        return Ok(());
    }
    print_resolution(&resolution);

    println!("\nSuggestions:");
    for suggestion in manager.suggest_solutions(name).await? {
        println!("  - {}", suggestion);
    }
    Ok(())
}

async fn errors(manager: &AddonManager, name: Option<String>, clear: bool) -> anyhow::Result<()> {
    match (name, clear) {
        (Some(name), true) => {
            manager.clear_errors(&name).await?;
            println!("✓ Cleared errors for {}", name);
        }
        (None, true) => {
            for summary in manager.error_summary().await {
                manager.clear_errors(&summary.addon).await?;
            }
            println!("✓ Cleared all errors");
        }
        (Some(name), false) => {
            let records = manager.errors(&name).await;
            if records.is_empty() {
                println!("No errors recorded for {}.", name);
            }
            for record in records {
                println!("{}  {}", record.time.format("%Y-%m-%d %H:%M:%S"), record.message);
            }
        }
        (None, false) => {
            let summary = manager.error_summary().await;
            if summary.is_empty() {
                println!("No errors recorded.");
            }
            for entry in summary {
                println!(
                    "{:<24} {:>3}  {}",
                    entry.addon, entry.count, entry.last_error
                );
            }
        }
    }
    Ok(())
}

pub async fn run_command(
    manager: &AddonManager,
    name: &str,
    args: Vec<String>,
) -> anyhow::Result<()> {
    manager.run_command(name, args).await?;
    Ok(())
}

pub async fn list_commands(manager: &AddonManager) -> anyhow::Result<()> {
    for command in manager.commands().await? {
        let origin = match &command.origin {
            CommandOrigin::Host => "built-in".to_string(),
            CommandOrigin::Addon { addon } => format!("addon {}", addon),
            CommandOrigin::Override { addon } => format!("overridden by {}", addon),
        };
        println!("{:<16} {:<28} {}", command.name, origin, command.description);
    }

    for conflict in manager.command_conflicts().await {
        println!(
            "  ! '{}': {} (priority {}) shadows {} (priority {})",
            conflict.name,
            conflict.winner,
            conflict.winner_priority,
            conflict.loser,
            conflict.loser_priority
        );
    }
    Ok(())
}

pub async fn emit(manager: &AddonManager, name: &str, data: Option<&str>) -> anyhow::Result<()> {
    let data = match data {
        Some(raw) => serde_json::from_str(raw)?,
        None => Value::Null,
    };
    let report = manager.emit_custom(name, data).await?;
    println!(
        "Event '{}': {} handler(s), {} failed",
        name,
        report.executed,
        report.failed()
    );
    for failure in &report.failures {
        println!("  ✗ {}: {}", failure.addon, failure.message);
    }
    Ok(())
}

// ============================================================================
// 출력
// ============================================================================

fn print_table(addons: &[AddonInfo]) {
    println!(
        "{:<24} {:<10} {:<10} {:<11} {}",
        "Name", "Version", "Source", "Status", "Description"
    );
    println!("{}", "-".repeat(80));
    for addon in addons {
        println!(
            "{:<24} {:<10} {:<10} {:<11} {}",
            addon.name,
            addon.version,
            addon.source.to_string(),
            status_label(addon),
            truncate(&addon.description, 40)
        );
    }
}

fn print_resolution(resolution: &DependencyResolution) {
    for missing in &resolution.missing {
        println!("  ✗ missing dependency: {}", missing);
    }
    for conflict in &resolution.conflicts {
        println!("  ✗ {}", conflict.message());
    }
    for conflict in &resolution.version_conflicts {
        println!(
            "  ✗ {} requires {} {} (installed: {})",
            conflict.required_by,
            conflict.dependency,
            conflict.constraint,
            conflict.available
        );
    }
}

fn status_label(info: &AddonInfo) -> &'static str {
    match (info.installed, info.enabled, info.last_error.is_some()) {
        (false, _, _) => "available",
        (true, false, true) => "quarantined",
        (true, false, false) => "disabled",
        (true, true, true) => "error",
        (true, true, false) => "enabled",
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
