//! Common test utilities

use brisk::interp::{interpolate_in, load_interpolated, Passed};
use brisk::runner::{task_registry, Context, Verbosity};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Create a temporary directory with a brisk.yml file
pub fn create_test_config(content: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("brisk.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Create a test config in a subdirectory
pub fn create_test_config_in_subdir(content: &str) -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("brisk.yml");
    let sub_dir = temp_dir.path().join("subdir");

    fs::write(&config_path, content).unwrap();
    fs::create_dir(&sub_dir).unwrap();

    (temp_dir, config_path, sub_dir)
}

/// Passed values from positional args and `name=value` flags
pub fn passed(args: &[&str], flags: &[(&str, &str)]) -> Passed {
    Passed {
        args: args.iter().map(|a| a.to_string()).collect(),
        flags: flags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
    }
}

/// A silent context rooted at `dir`
pub fn context_in(dir: &Path) -> Context {
    Context::new()
        .with_working_dir(dir.to_path_buf())
        .with_verbosity(Verbosity::Silent)
}

/// Interpolate, load and execute `task` the way the CLI does
pub fn run_task(yaml: &str, task: &str, passed: &Passed, dir: &Path) -> brisk::Result<()> {
    let ctx = context_in(dir);
    let interpolated = interpolate_in(&ctx, yaml, passed, task)?;
    let config = load_interpolated(&interpolated)?;

    let tasks = task_registry(config)?;
    let selected = tasks[task].clone().with_vars(interpolated.vars);
    let mut ctx = ctx.with_tasks(tasks);
    selected.execute(&mut ctx)?;
    Ok(())
}
