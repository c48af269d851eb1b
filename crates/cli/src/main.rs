// FieldTuner CLI - inspect and edit the game's settings profile

mod exit_codes;
mod process;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use fieldtuner_config::AppSettings;
use fieldtuner_core::{FieldTunerError, PresetCatalog, Resource, SettingsRegistry};
use fieldtuner_editor::{EditSession, SaveOutcome, SessionParts};
use fieldtuner_io::{locate, BackupStore, ConfigDocument};

use exit_codes::{error_exit_code, EXIT_SUCCESS, EXIT_USAGE};
use process::ProcessGuard;

#[derive(Parser)]
#[command(name = "fieldtuner")]
#[command(about = "Inspect and edit the game's PROFSAVE settings profile")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to edit (default: settings file, then auto-discovery)
    #[arg(long, global = true, env = "FIELDTUNER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Backup directory (default: from settings)
    #[arg(long, global = true, value_name = "PATH")]
    backup_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered text-format config files, newest first
    Locate,

    /// Show documented settings with their current values
    Show {
        /// Only this category
        #[arg(long, short = 'c')]
        category: Option<String>,

        /// Include keys that are not documented
        #[arg(long)]
        all: bool,
    },

    /// Show one setting: value and metadata
    Get {
        key: String,
    },

    /// Search settings by name, key, category or alias
    Search {
        query: String,
    },

    /// List categories and subcategories
    Categories,

    /// Change settings and save (a backup is taken first)
    #[command(after_help = "\
Examples:
  fieldtuner set GstRender.VSyncMode=0
  fieldtuner set GstRender.FrameRateLimit=144.000000 GstRender.FullscreenMode=2
  fieldtuner set GstRender.VSyncMode=0 --dry-run")]
    Set {
        /// KEY=VALUE pairs
        #[arg(required = true, value_name = "KEY=VALUE")]
        assignments: Vec<String>,

        /// Print the changes without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// List built-in presets
    Presets,

    /// Apply a preset and save
    Apply {
        preset: String,

        /// Print the changes without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage backups
    #[command(subcommand)]
    Backup(BackupCommands),
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Back up the config file now
    Create {
        /// Short description, part of the backup id
        #[arg(long, short = 'd', default_value = "manual")]
        description: String,
    },

    /// List backups, newest first
    List,

    /// Restore a backup over the config file (the current file is backed up first)
    Restore {
        id: String,
    },

    /// Delete a backup permanently
    Delete {
        id: String,
    },

    /// Remove old backups
    Cleanup {
        /// Backups to keep (default: from settings)
        #[arg(long)]
        keep: Option<usize>,

        /// Also remove backups older than this many days
        #[arg(long, value_name = "DAYS")]
        older_than_days: Option<u32>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = Context {
        settings: AppSettings::load(),
        config: cli.config,
        backup_dir: cli.backup_dir,
    };

    let result = match cli.command {
        Commands::Locate => cmd_locate(),
        Commands::Show { category, all } => cmd_show(&ctx, category, all),
        Commands::Get { key } => cmd_get(&ctx, &key),
        Commands::Search { query } => cmd_search(&query),
        Commands::Categories => cmd_categories(),
        Commands::Set { assignments, dry_run } => cmd_set(&ctx, &assignments, dry_run),
        Commands::Presets => cmd_presets(),
        Commands::Apply { preset, dry_run } => cmd_apply(&ctx, &preset, dry_run),
        Commands::Backup(command) => match command {
            BackupCommands::Create { description } => cmd_backup_create(&ctx, &description),
            BackupCommands::List => cmd_backup_list(&ctx),
            BackupCommands::Restore { id } => cmd_backup_restore(&ctx, &id),
            BackupCommands::Delete { id } => cmd_backup_delete(&ctx, &id),
            BackupCommands::Cleanup { keep, older_than_days } => {
                cmd_backup_cleanup(&ctx, keep, older_than_days)
            }
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: bool) {
    let env = env_logger::Env::new().filter_or("FIELDTUNER_LOG", "warn");
    let mut builder = env_logger::Builder::from_env(env);
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<FieldTunerError> for CliError {
    fn from(err: FieldTunerError) -> Self {
        let hint = match &err {
            FieldTunerError::Format { .. } => {
                Some("run `fieldtuner locate` to find a text-format profile".to_string())
            }
            FieldTunerError::Precondition(_) => {
                Some("close the game, then run the command again".to_string())
            }
            FieldTunerError::NotFound { resource: Resource::Backup, .. } => {
                Some("run `fieldtuner backup list` to see available backups".to_string())
            }
            FieldTunerError::NotFound { resource: Resource::Preset, .. } => {
                Some("run `fieldtuner presets` to see available presets".to_string())
            }
            _ => None,
        };
        Self { code: error_exit_code(&err), message: err.to_string(), hint }
    }
}

/// Settings plus command-line overrides. Built once in `main`.
struct Context {
    settings: AppSettings,
    config: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
}

impl Context {
    fn config_path(&self) -> Result<PathBuf, CliError> {
        if let Some(path) = self.config.clone().or_else(|| self.settings.config_path.clone()) {
            return Ok(path);
        }
        locate::detect().ok_or_else(|| {
            CliError::from(FieldTunerError::not_found(
                Resource::ConfigFile,
                "no text-format PROFSAVE_profile under Documents",
            ))
            .with_hint("pass --config <PATH>")
        })
    }

    fn backups(&self) -> Result<BackupStore, CliError> {
        let root = self
            .backup_dir
            .clone()
            .unwrap_or_else(|| self.settings.backup_dir());
        Ok(BackupStore::open(root)?)
    }

    fn session(&self) -> Result<EditSession, CliError> {
        let registry = SettingsRegistry::builtin()?;
        let presets = PresetCatalog::builtin(&registry)?;
        let parts = SessionParts {
            registry,
            presets,
            backups: self.backups()?,
            guard: Box::new(ProcessGuard::new(&self.settings.guarded_processes)),
            policy: self.settings.validation,
            keep_count: self.settings.keep_count,
        };
        Ok(EditSession::open(self.config_path()?, parts)?)
    }
}

/// Split `KEY=VALUE`. The value may itself contain `=` and spaces.
fn parse_assignment(arg: &str) -> Result<(&str, &str), CliError> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(CliError::args(format!("expected KEY=VALUE, got {:?}", arg))),
    }
}

// ============================================================================
// locate
// ============================================================================

fn cmd_locate() -> Result<(), CliError> {
    let found = locate::discover();
    if found.is_empty() {
        return Err(CliError::from(FieldTunerError::not_found(
            Resource::ConfigFile,
            "no text-format PROFSAVE_profile under Documents",
        )));
    }
    for path in found {
        println!("{}", path.display());
    }
    Ok(())
}

// ============================================================================
// show / get / search / categories
// ============================================================================

fn cmd_show(ctx: &Context, category: Option<String>, all: bool) -> Result<(), CliError> {
    let registry = SettingsRegistry::builtin()?;
    let doc = ConfigDocument::load(ctx.config_path()?)?;

    let wanted = category.as_deref().map(str::to_lowercase);
    let mut current = String::new();
    for setting in registry.iter() {
        if wanted.as_deref().is_some_and(|c| setting.category.to_lowercase() != c) {
            continue;
        }
        if setting.category != current {
            println!("\n[{}]", setting.category);
            current = setting.category.clone();
        }
        let value = match doc.get(&setting.key) {
            Some(raw) => setting
                .option_label(raw)
                .map(|label| format!("{label} ({raw})"))
                .unwrap_or_else(|| raw.to_string()),
            None => format!("(not set, default {})", setting.default_display()),
        };
        println!("  {:<40} {:<28} {}", setting.key, setting.name, value);
    }

    if all && wanted.is_none() {
        let undocumented: Vec<(&str, &str)> =
            doc.entries().filter(|(k, _)| !registry.contains(k)).collect();
        if !undocumented.is_empty() {
            println!("\n[Undocumented]");
            for (key, raw) in undocumented {
                println!("  {:<40} {}", key, raw);
            }
        }
    }
    Ok(())
}

fn cmd_get(ctx: &Context, key: &str) -> Result<(), CliError> {
    let registry = SettingsRegistry::builtin()?;
    let doc = ConfigDocument::load(ctx.config_path()?)?;
    let setting = registry.lookup(key);
    let raw = doc.get(key);

    if setting.is_none() && raw.is_none() {
        return Err(FieldTunerError::not_found(Resource::Setting, key).into());
    }

    println!("{} = {}", key, raw.unwrap_or("(not set)"));
    if let Some(setting) = setting {
        println!("  name:     {}", setting.name);
        println!("  category: {} / {}", setting.category, setting.subcategory);
        println!("  type:     {}", setting.kind);
        if let Some([min, max]) = setting.range {
            println!("  range:    {min} ..= {max}");
        }
        for option in &setting.options {
            println!("  option:   {} = {}", option.value, option.label);
        }
        println!("  default:  {}", setting.default);
        if !setting.tooltip.is_empty() {
            println!("  {}", setting.tooltip);
        }
    } else {
        println!("  (undocumented setting)");
    }
    Ok(())
}

fn cmd_search(query: &str) -> Result<(), CliError> {
    let registry = SettingsRegistry::builtin()?;
    let hits = registry.search(query);
    if hits.is_empty() {
        println!("no settings match {:?}", query);
        return Ok(());
    }
    for setting in hits {
        println!(
            "{:<40} {:<28} {} / {}",
            setting.key, setting.name, setting.category, setting.subcategory
        );
    }
    Ok(())
}

fn cmd_categories() -> Result<(), CliError> {
    let registry = SettingsRegistry::builtin()?;
    for category in registry.categories() {
        println!("{} ({})", category, registry.by_category(category).len());
        for sub in registry.subcategories(category) {
            println!("  {}", sub);
        }
    }
    Ok(())
}

// ============================================================================
// set / presets / apply
// ============================================================================

fn print_pending(session: &EditSession) {
    for (key, change) in session.pending() {
        let flag = if session.flagged().contains(key) { "  (flagged)" } else { "" };
        println!(
            "  {}: {} -> {}{}",
            key,
            change.old.as_deref().unwrap_or("(new)"),
            change.new,
            flag
        );
    }
}

fn finish(session: &mut EditSession, dry_run: bool) -> Result<(), CliError> {
    print_pending(session);
    if dry_run {
        println!("dry run: nothing written");
        return Ok(());
    }
    match session.save()? {
        SaveOutcome::Unchanged => println!("no changes"),
        SaveOutcome::Saved { backup, changes } => {
            println!("saved {} change(s) to {}", changes, session.path().display());
            if let Some(backup) = backup {
                println!("backup: {}", backup.id);
            }
        }
    }
    Ok(())
}

fn cmd_set(ctx: &Context, assignments: &[String], dry_run: bool) -> Result<(), CliError> {
    let pairs = assignments
        .iter()
        .map(|a| parse_assignment(a))
        .collect::<Result<Vec<_>, _>>()?;

    let mut session = ctx.session()?;
    for (key, value) in pairs {
        session.set_value(key, value)?;
    }
    finish(&mut session, dry_run)
}

fn cmd_presets() -> Result<(), CliError> {
    let registry = SettingsRegistry::builtin()?;
    let presets = PresetCatalog::builtin(&registry)?;
    for preset in presets.iter() {
        println!("{:<12} {} {} ({} settings)", preset.id, preset.icon, preset.name, preset.settings.len());
        if !preset.description.is_empty() {
            println!("             {}", preset.description);
        }
    }
    Ok(())
}

fn cmd_apply(ctx: &Context, preset: &str, dry_run: bool) -> Result<(), CliError> {
    let mut session = ctx.session()?;
    let report = session.apply_preset(preset)?;
    println!("{}", report.message());
    finish(&mut session, dry_run)
}

// ============================================================================
// backup
// ============================================================================

fn cmd_backup_create(ctx: &Context, description: &str) -> Result<(), CliError> {
    let store = ctx.backups()?;
    let handle = store.create(ctx.config_path()?, description)?;
    println!("created {}", handle.id);
    Ok(())
}

fn cmd_backup_list(ctx: &Context) -> Result<(), CliError> {
    let backups = ctx.backups()?.list()?;
    if backups.is_empty() {
        println!("no backups in {}", ctx.backups()?.root().display());
        return Ok(());
    }
    for backup in backups {
        println!(
            "{:<56} {}  {:>9}  {}",
            backup.id,
            backup.created.format("%Y-%m-%d %H:%M:%S"),
            backup.size_display(),
            backup.description
        );
    }
    Ok(())
}

fn cmd_backup_restore(ctx: &Context, id: &str) -> Result<(), CliError> {
    let mut session = ctx.session()?;
    let report = session.restore_backup(id)?;
    println!("{}", report.message());
    Ok(())
}

fn cmd_backup_delete(ctx: &Context, id: &str) -> Result<(), CliError> {
    ctx.backups()?.delete(id)?;
    println!("deleted {}", id);
    Ok(())
}

fn cmd_backup_cleanup(ctx: &Context, keep: Option<usize>, older_than_days: Option<u32>) -> Result<(), CliError> {
    let store = ctx.backups()?;
    let mut removed = store.cleanup(keep.unwrap_or(ctx.settings.keep_count))?;
    if let Some(days) = older_than_days {
        removed += store.cleanup_older_than(chrono::Duration::days(i64::from(days)))?;
    }
    println!("removed {} backup(s)", removed);
    Ok(())
}
