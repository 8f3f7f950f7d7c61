//! Error paths and configuration handling

use crate::common::seeded_repo;
use crate::sfeed;
use anyhow::Result;
use tempfile::TempDir;

#[test]
fn test_commands_outside_repository_fail() -> Result<()> {
    let dir = TempDir::new()?;
    let result = sfeed!(dir.path(), "status").assert_failure()?;
    assert!(result.contains_stderr("no .sfeed directory found"));
    Ok(())
}

#[test]
fn test_init_twice_fails() -> Result<()> {
    let dir = TempDir::new()?;
    sfeed!(dir.path(), "init").assert_success()?;
    let again = sfeed!(dir.path(), "init").assert_failure()?;
    assert!(again.contains_stderr("already initialized"));
    Ok(())
}

#[test]
fn test_commands_work_from_subdirectory() -> Result<()> {
    let dir = TempDir::new()?;
    seeded_repo(dir.path(), &[("a", "nested")])?;
    let nested = dir.path().join("deep").join("er");
    std::fs::create_dir_all(&nested)?;

    let got = sfeed!(&nested, "get", "a").assert_success()?;
    assert_eq!(got.stdout.trim(), "nested");
    Ok(())
}

#[test]
fn test_missing_items() -> Result<()> {
    let dir = TempDir::new()?;
    sfeed!(dir.path(), "init").assert_success()?;

    let get = sfeed!(dir.path(), "get", "ghost").assert_failure()?;
    assert!(get.contains_stderr("Item not found: ghost"));

    let delete = sfeed!(dir.path(), "delete", "ghost").assert_failure()?;
    assert!(delete.contains_stderr("Item not found: ghost"));
    Ok(())
}

#[test]
fn test_put_reads_stdin_and_file() -> Result<()> {
    let dir = TempDir::new()?;
    sfeed!(dir.path(), "init").assert_success()?;

    sfeed!(dir.path(), "put", "piped")
        .stdin("from stdin")
        .assert_success()?;
    let file = dir.path().join("body.txt");
    std::fs::write(&file, "from file")?;
    let path = file.to_string_lossy().to_string();
    sfeed!(dir.path(), "put", "filed", "--file", &path).assert_success()?;

    let piped = sfeed!(dir.path(), "get", "piped").assert_success()?;
    assert_eq!(piped.stdout.trim(), "from stdin");
    let filed = sfeed!(dir.path(), "get", "filed").assert_success()?;
    assert_eq!(filed.stdout.trim(), "from file");
    Ok(())
}

#[test]
fn test_config_get_set_validate() -> Result<()> {
    let dir = TempDir::new()?;
    sfeed!(dir.path(), "init").assert_success()?;

    let batch = sfeed!(dir.path(), "config", "get", "consumer.batch_size").assert_success()?;
    assert_eq!(batch.stdout.trim(), "256");

    sfeed!(dir.path(), "config", "set", "consumer.batch_size", "1").assert_success()?;
    let batch = sfeed!(dir.path(), "config", "get", "consumer.batch_size").assert_success()?;
    assert_eq!(batch.stdout.trim(), "1");

    sfeed!(dir.path(), "config", "set", "consumer.batch_size", "0").assert_failure()?;
    sfeed!(dir.path(), "config", "get", "no.such.key").assert_failure()?;
    Ok(())
}

#[test]
fn test_sync_with_batch_of_one() -> Result<()> {
    let dir = TempDir::new()?;
    seeded_repo(dir.path(), &[("a", "x"), ("b", "y"), ("c", "z")])?;

    let sync = sfeed!(dir.path(), "sync", "--batch-size", "1").assert_success()?;
    assert!(sync.contains_stdout("3 indexed, 0 removed in 3 batches"));
    Ok(())
}
