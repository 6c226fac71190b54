use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use chrono::Local;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use notify::event::ModifyKind;
use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use tracing_subscriber::EnvFilter;

use sortwise_core::config::{resolve_base_dir, Config};
use sortwise_core::resolve::{FileOrganizeResult, PreviewSnapshot};
use sortwise_core::rule::{RuleAction, RuleMatcher, RuleSet};
use sortwise_core::{
    BatchReport, ChangeKind, LocalFs, OrganizerSession, RefreshGate, Result, ScanOptions,
    SortError, UndoLog, WatchEvent,
};

mod args;
use args::{CategoriesAction, Cli, Commands, ConfigAction, GroupBy, RulesAction, Shell};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = resolve_base_dir(cli.base_dir.as_deref()).and_then(|base_dir| {
        match cli.command {
            Commands::Preview {
                dir,
                recursive,
                group_by,
                all,
            } => handle_preview(&base_dir, &dir, recursive, group_by, all),
            Commands::Organize {
                dir,
                recursive,
                dry_run,
            } => {
                if dry_run {
                    handle_preview(&base_dir, &dir, recursive, GroupBy::Folder, false)
                } else {
                    handle_organize(&base_dir, &dir, recursive)
                }
            }
            Commands::Undo { dry_run } => handle_undo(&base_dir, dry_run),
            Commands::Rules { action } => handle_rules(action, &base_dir),
            Commands::Categories { action } => handle_categories(action, &base_dir),
            Commands::Config { action } => handle_config(action, &base_dir),
            Commands::Watch {
                dir,
                recursive,
                debounce_ms,
            } => handle_watch(&base_dir, &dir, recursive, debounce_ms),
            Commands::Completions { shell } => {
                handle_completions(shell);
                Ok(())
            }
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "sortwise=debug,sortwise_core=debug"
    } else {
        "sortwise=info,sortwise_core=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let shell = match shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::PowerShell => clap_complete::Shell::PowerShell,
        Shell::Elvish => clap_complete::Shell::Elvish,
    };
    generate(shell, &mut cmd, "sortwise", &mut io::stdout());
}

// ============================================================================
// Shared setup
// ============================================================================

fn canonical_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(SortError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    Ok(dir.canonicalize()?)
}

fn load_rules(base_dir: &Path, config: &Config) -> Result<RuleSet> {
    let path = config.rules_path(base_dir);
    let rules = RuleSet::load(&path)?;
    for warning in rules.validate() {
        tracing::warn!("{}", warning);
    }
    if rules.rules.is_empty() {
        println!(
            "{} No rules in {}. Create samples with: sortwise rules init",
            "[WARN]".yellow(),
            path.display()
        );
    }
    Ok(rules)
}

fn scan_options(config: &Config, recursive: bool) -> ScanOptions {
    let mut options = config.scan_options();
    options.recursive |= recursive;
    options
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for u in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = u;
    }
    format!("{:.1} {}", value, unit)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// preview / organize / undo
// ============================================================================

fn handle_preview(
    base_dir: &Path,
    dir: &Path,
    recursive: bool,
    group_by: GroupBy,
    all: bool,
) -> Result<()> {
    let dir = canonical_dir(dir)?;
    let config = Config::load(base_dir)?;
    let rules = load_rules(base_dir, &config)?;
    let session = OrganizerSession::new(LocalFs, config.category_store());

    let files = session.scan(&dir, &scan_options(&config, recursive))?;
    let snapshot = PreviewSnapshot::build(session.preview(&dir, &files, &rules.rules));

    println!();
    let groups: Vec<(String, &Vec<usize>)> = match group_by {
        GroupBy::Folder => snapshot
            .by_folder
            .iter()
            .map(|(folder, idx)| (folder.display().to_string(), idx))
            .collect(),
        GroupBy::Category => snapshot
            .by_category
            .iter()
            .map(|(category, idx)| (category.clone(), idx))
            .collect(),
    };

    for (label, indices) in groups {
        println!("{} ({})", label.cyan().bold(), indices.len());
        for &i in indices {
            print_preview_line(&snapshot.results[i]);
        }
        println!();
    }

    if all {
        let unmatched: Vec<&FileOrganizeResult> =
            snapshot.results.iter().filter(|r| !r.is_matched()).collect();
        if !unmatched.is_empty() {
            println!("{} ({})", "Unmatched".dimmed().bold(), unmatched.len());
            for r in unmatched {
                println!("  {}", display_name(&r.source).dimmed());
            }
            println!();
        }
    }

    println!(
        "{} {} of {} files would be organized ({}), {} unmatched",
        "Preview:".green(),
        snapshot.organized_files,
        snapshot.total_files,
        format_size(snapshot.organized_bytes),
        snapshot.unmatched_files
    );
    Ok(())
}

fn print_preview_line(result: &FileOrganizeResult) {
    let targets: Vec<String> = result
        .destinations
        .iter()
        .map(|d| {
            if d.is_trash() {
                d.path.display().to_string().red().to_string()
            } else {
                format!("{} {}", d.action.label().dimmed(), d.path.display())
            }
        })
        .collect();
    println!(
        "  {} -> {}  {}",
        display_name(&result.source),
        targets.join(", "),
        format!("[{}]", result.rule_names.join(" > ")).dimmed()
    );
}

fn handle_organize(base_dir: &Path, dir: &Path, recursive: bool) -> Result<()> {
    let dir = canonical_dir(dir)?;
    let config = Config::load(base_dir)?;
    let rules = load_rules(base_dir, &config)?;
    let session = OrganizerSession::new(LocalFs, config.category_store());

    let files = session.scan(&dir, &scan_options(&config, recursive))?;
    let report = session.organize(&dir, &files, &rules.rules)?;

    let undo_path = Config::undo_path(base_dir);
    if report.undo_log.is_empty() {
        UndoLog::discard(&undo_path)?;
    } else {
        report.undo_log.save(&undo_path)?;
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!();
    for result in &report.results {
        for taken in &result.actions_taken {
            let to = taken
                .to
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "trash".to_string());
            println!(
                "  {:<22} {} -> {}",
                taken.action.label().green(),
                display_name(&taken.from),
                to
            );
        }
    }
    for error in &report.errors {
        println!(
            "  {} {}: {}",
            "[FAILED]".red(),
            error.path.display(),
            error.message
        );
    }

    println!();
    println!(
        "{} {} organized, {} unchanged, {} unmatched, {} failed",
        "Done:".green().bold(),
        report.succeeded,
        report.unchanged,
        report.unmatched,
        report.failed
    );
    if !report.undo_log.is_empty() {
        println!("Revert with: sortwise undo");
    }
}

fn handle_undo(base_dir: &Path, dry_run: bool) -> Result<()> {
    let undo_path = Config::undo_path(base_dir);
    let log = UndoLog::load(&undo_path)?
        .filter(|log| !log.is_empty())
        .ok_or(SortError::NothingToUndo)?;

    if dry_run {
        println!();
        println!(
            "Last run: {} in {} ({} files)",
            log.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            log.root.display(),
            log.len()
        );
        for entry in log.entries.iter().rev() {
            match entry.final_path() {
                Some(final_path) if final_path != entry.original_path() => println!(
                    "  {} -> {}",
                    final_path.display(),
                    entry.original_path().display()
                ),
                Some(_) => {}
                None => println!(
                    "  {} {}",
                    "[manual]".yellow(),
                    entry.original_path().display()
                ),
            }
            for copy in &entry.copies {
                println!("  {} {}", "remove".red(), copy.display());
            }
        }
        return Ok(());
    }

    let config = Config::load(base_dir)?;
    let session = OrganizerSession::new(LocalFs, config.category_store());
    session.restore_undo_log(log)?;
    let result = session.undo()?;
    UndoLog::discard(&undo_path)?;

    println!();
    for manual in &result.manual_restore {
        println!(
            "  {} {} was moved to the trash; restore it from there",
            "[manual]".yellow(),
            manual.original.display()
        );
    }
    for error in &result.errors {
        println!("  {} {}", "[FAILED]".red(), error);
    }
    println!(
        "{} {} restored, {} copies removed, {} folders removed",
        "Undone:".green().bold(),
        result.restored,
        result.copies_removed,
        result.folders_removed
    );
    Ok(())
}

// ============================================================================
// rules / categories / config
// ============================================================================

fn handle_rules(action: RulesAction, base_dir: &Path) -> Result<()> {
    let config = Config::load(base_dir)?;
    let path = config.rules_path(base_dir);

    match action {
        RulesAction::List => {
            let set = RuleSet::load(&path)?;
            if set.rules.is_empty() {
                println!("No rules found.");
                println!();
                println!("Create samples with: sortwise rules init");
                return Ok(());
            }

            let active = RuleMatcher::new(&set.rules);
            println!();
            for (order, rule) in active.rules().iter().enumerate() {
                println!(
                    "  {:>2}. {} {}",
                    order + 1,
                    rule.name.cyan().bold(),
                    format!("(id: {}, priority: {})", rule.id, rule.priority).dimmed()
                );
                let actions: Vec<String> = rule
                    .actions
                    .iter()
                    .map(|a| match a.value() {
                        Some(v) => format!("{} '{}'", a.kind(), v),
                        None => a.kind().to_string(),
                    })
                    .collect();
                println!(
                    "      {} condition(s), {} group(s) -> {}",
                    rule.conditions.len(),
                    rule.nested_groups.len(),
                    actions.join(", ")
                );
            }

            let inactive: Vec<_> = set
                .rules
                .iter()
                .filter(|r| !active.rules().iter().any(|a| std::ptr::eq(*a, *r)))
                .collect();
            if !inactive.is_empty() {
                println!();
                println!("Inactive:");
                for rule in inactive {
                    let reason = if !rule.enabled { "disabled" } else { "invalid" };
                    println!("  {} {}", rule.name.dimmed(), format!("({})", reason).dimmed());
                }
            }
            println!();
        }
        RulesAction::Show { id } => {
            let set = RuleSet::load(&path)?;
            print!("{}", set.rule_toml(&id)?);
        }
        RulesAction::Validate => {
            let set = RuleSet::load(&path)?;
            let store = config.category_store();
            let mut warnings = set.validate();
            for rule in &set.rules {
                for action in &rule.actions {
                    if let RuleAction::MoveToCategory(id) = action {
                        let id = id.trim();
                        if !id.is_empty() && store.get(id).is_none() {
                            let missing = SortError::CategoryNotFound { id: id.to_string() };
                            warnings.push(format!("rule '{}': {}", rule.name, missing));
                        }
                    }
                }
            }
            if warnings.is_empty() {
                println!("{} {} rule(s) OK", "Valid:".green(), set.rules.len());
            } else {
                for warning in &warnings {
                    println!("  {} {}", "[WARN]".yellow(), warning);
                }
                return Err(SortError::InvalidRule {
                    name: path.display().to_string(),
                    reason: format!("{} problem(s) found", warnings.len()),
                });
            }
        }
        RulesAction::Init => {
            let path = RuleSet::init(&path)?;
            println!("{} {}", "Initialized:".green(), path.display());
        }
        RulesAction::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn handle_categories(action: CategoriesAction, base_dir: &Path) -> Result<()> {
    match action {
        CategoriesAction::List => {
            let store = Config::load(base_dir)?.category_store();
            println!();
            for category in store.all() {
                println!(
                    "  {} {} -> {}",
                    category.id.cyan().bold(),
                    format!("({})", category.name).dimmed(),
                    category.destination
                );
                println!("      {}", category.extensions.join(", "));
            }
            println!();
        }
    }
    Ok(())
}

fn handle_config(action: ConfigAction, base_dir: &Path) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load(base_dir)?;
            match config.get(&key) {
                Some(value) => {
                    println!("{}", value);
                }
                None => {
                    return Err(SortError::ConfigKeyNotFound { key });
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load(base_dir)?;
            config.set(&key, &value)?;
            config.save(base_dir)?;
            println!("{} {} = {}", "Set:".green(), key, value);
        }
        ConfigAction::List => {
            let config = Config::load(base_dir)?;
            println!();
            for (key, value) in config.list() {
                println!("{} = {}", key.cyan(), value);
            }
            println!();
        }
        ConfigAction::Path => {
            let path = Config::path(base_dir);
            println!("{}", path.display());
        }
        ConfigAction::Init => {
            let path = Config::init(base_dir)?;
            println!("{} {}", "Initialized:".green(), path.display());
        }
    }

    Ok(())
}

// ============================================================================
// watch
// ============================================================================

fn change_kind(kind: &EventKind) -> ChangeKind {
    match kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Renamed,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => ChangeKind::Other,
    }
}

fn watch_error(e: notify::Error) -> SortError {
    SortError::Watch(e.to_string())
}

fn handle_watch(
    base_dir: &Path,
    dir: &Path,
    recursive: bool,
    debounce_ms: Option<u64>,
) -> Result<()> {
    let dir = canonical_dir(dir)?;
    let config = Config::load(base_dir)?;
    let options = scan_options(&config, recursive);
    let quiet = debounce_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.debounce());

    let session = OrganizerSession::new(LocalFs, config.category_store());
    let mut gate = RefreshGate::new();

    let (tx, rx) = mpsc::channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(quiet, None, tx).map_err(watch_error)?;
    let mode = if options.recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    debouncer.watch(&dir, mode).map_err(watch_error)?;

    println!(
        "{} {} (Ctrl+C to stop)",
        "Watching".green().bold(),
        dir.display()
    );
    organize_pass(base_dir, &config, &session, &dir, &options)?;

    loop {
        match rx.recv_timeout(quiet) {
            Ok(Ok(events)) => {
                for event in events {
                    let kind = change_kind(&event.kind);
                    for path in &event.paths {
                        if *path == dir || session.is_own_change(path) {
                            continue;
                        }
                        if gate.on_event(&WatchEvent::new(path.clone(), kind)) {
                            tracing::debug!(path = %path.display(), ?kind, "change detected");
                        }
                    }
                }
            }
            Ok(Err(errors)) => {
                for e in errors {
                    tracing::warn!(error = %e, "watcher error");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(SortError::Watch("watcher stopped".to_string()));
            }
        }

        if gate.poll(session.is_busy()) {
            if let Err(e) = organize_pass(base_dir, &config, &session, &dir, &options) {
                tracing::warn!(error = %e, "organize pass failed");
            }
        }
    }
}

/// One scan + organize of the watched folder. Rules are re-read each pass.
fn organize_pass(
    base_dir: &Path,
    config: &Config,
    session: &OrganizerSession<LocalFs>,
    dir: &Path,
    options: &ScanOptions,
) -> Result<()> {
    let rules = RuleSet::load(&config.rules_path(base_dir))?;
    let files = session.scan(dir, options)?;
    if files.is_empty() {
        tracing::debug!("nothing new to organize");
        return Ok(());
    }
    let report = session.organize(dir, &files, &rules.rules)?;

    let undo_path = Config::undo_path(base_dir);
    if report.undo_log.is_empty() {
        UndoLog::discard(&undo_path)?;
    } else {
        report.undo_log.save(&undo_path)?;
    }
    if report.succeeded > 0 || report.failed > 0 {
        print_report(&report);
    }
    Ok(())
}
