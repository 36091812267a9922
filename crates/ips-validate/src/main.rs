//! Library manifest validator
//!
//! Checks `library.json` and every `module.json` below the given folders
//! against the host naming rules. Exits non-zero when any folder fails.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ips_config::{validate_library, validate_module, ValidationIssue};

#[derive(Parser, Debug)]
#[command(name = "ips-validate", version, about = "Validate library and module manifests")]
struct Cli {
    /// Library folders (or module folders with --module)
    #[arg(required = true)]
    dirs: Vec<PathBuf>,

    /// Treat every folder as a single module folder
    #[arg(long)]
    module: bool,

    /// Log every checked folder
    #[arg(short, long)]
    verbose: bool,
}

fn validate(dir: &Path, module: bool) -> Result<Vec<ValidationIssue>> {
    let issues = if module {
        validate_module(dir)
    } else {
        validate_library(dir)
    };
    issues.with_context(|| format!("cannot validate {}", dir.display()))
}

/// Validate all folders; returns the number of failed folders
fn run(dirs: &[PathBuf], module: bool) -> usize {
    let mut failed = 0;
    for dir in dirs {
        debug!("Checking {}", dir.display());
        match validate(dir, module) {
            Ok(issues) if issues.is_empty() => info!("{}: ok", dir.display()),
            Ok(issues) => {
                failed += 1;
                for issue in &issues {
                    error!("{}", issue);
                }
            }
            Err(e) => {
                failed += 1;
                error!("{:#}", e);
            }
        }
    }
    failed
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let failed = run(&cli.dirs, cli.module);
    if failed > 0 {
        error!("{} of {} folders failed validation", failed, cli.dirs.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_test_library(prefix: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("library.json"),
            serde_json::json!({
                "id": "{11111111-2222-3333-4444-555555555555}",
                "author": "Jane",
                "name": "Demo",
                "url": "https://example.org",
                "version": "1.0",
                "build": 1,
                "date": 0
            })
            .to_string(),
        )
        .unwrap();
        let module = dir.path().join("Demo");
        fs::create_dir_all(&module).unwrap();
        fs::write(
            module.join("module.json"),
            serde_json::json!({
                "id": "{AAAAAAAA-0000-0000-0000-000000000000}",
                "name": "Demo Device",
                "type": 3,
                "vendor": "",
                "aliases": [],
                "url": "https://example.org",
                "parentRequirements": [],
                "childRequirements": [],
                "implemented": [],
                "prefix": prefix
            })
            .to_string(),
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_counts_failed_folders() {
        let good = make_test_library("DEMO");
        let bad = make_test_library("demo");
        let dirs = vec![good.path().to_path_buf(), bad.path().to_path_buf()];
        assert_eq!(run(&dirs, false), 1);
    }

    #[test]
    fn test_single_module_folder() {
        let library = make_test_library("DEMO");
        assert_eq!(run(&[library.path().join("Demo")], true), 0);
    }

    #[test]
    fn test_missing_library_json_fails() {
        let empty = TempDir::new().unwrap();
        assert!(validate(empty.path(), false).is_err());
        assert_eq!(run(&[empty.path().to_path_buf()], false), 1);
    }

    #[test]
    fn test_cli_requires_a_folder() {
        assert!(Cli::try_parse_from(["ips-validate"]).is_err());
        let cli = Cli::try_parse_from(["ips-validate", "--module", "a", "b"]).unwrap();
        assert!(cli.module);
        assert_eq!(cli.dirs.len(), 2);
    }
}
