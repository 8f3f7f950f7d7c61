//! Write, page, sync and search on a single epoch

use crate::common::seeded_repo;
use crate::sfeed;
use anyhow::Result;
use tempfile::TempDir;

#[test]
fn test_changes_pages_are_contiguous() -> Result<()> {
    let dir = TempDir::new()?;
    seeded_repo(dir.path(), &[("a", "alpha"), ("b", "beta"), ("c", "gamma")])?;

    let first = sfeed!(dir.path(), "changes", "--from", "0", "--limit", "2", "--json")
        .assert_success()?
        .json()?;
    assert_eq!(first["epoch"], 1);
    assert_eq!(first["from"], 1);
    assert_eq!(first["to"], 2);
    assert_eq!(first["changed"], serde_json::json!(["a", "b"]));

    let second = sfeed!(dir.path(), "changes", "--from", "2", "--limit", "2", "--json")
        .assert_success()?
        .json()?;
    assert_eq!(second["from"], 3);
    assert_eq!(second["to"], 3);
    assert_eq!(second["changed"], serde_json::json!(["c"]));

    let idle = sfeed!(dir.path(), "changes", "--from", "3").assert_success()?;
    assert!(idle.contains_stdout("Caught up at revision 3 (epoch 1)"));

    Ok(())
}

#[test]
fn test_repeated_writes_collapse_in_a_page() -> Result<()> {
    let dir = TempDir::new()?;
    seeded_repo(dir.path(), &[("a", "one"), ("a", "two"), ("b", "three")])?;

    let page = sfeed!(dir.path(), "changes", "--json")
        .assert_success()?
        .json()?;
    assert_eq!(page["changed"], serde_json::json!(["a", "b"]));
    assert_eq!(page["to"], 3);

    Ok(())
}

#[test]
fn test_sync_then_search() -> Result<()> {
    let dir = TempDir::new()?;
    seeded_repo(
        dir.path(),
        &[("doc-1", "rust change feed"), ("doc-2", "semantic index")],
    )?;

    let sync = sfeed!(dir.path(), "sync").assert_success()?;
    assert!(sync.contains_stdout("Synced to revision 2 (epoch 1): 2 indexed, 0 removed"));

    let hits = sfeed!(dir.path(), "search", "feed").assert_success()?;
    assert!(hits.contains_stdout("doc-1"));
    assert!(!hits.contains_stdout("doc-2"));

    let status = sfeed!(dir.path(), "status").assert_success()?;
    assert!(status.contains_stdout("up to date"));

    Ok(())
}

#[test]
fn test_incremental_sync_applies_deletes() -> Result<()> {
    let dir = TempDir::new()?;
    seeded_repo(dir.path(), &[("a", "apple pie"), ("b", "apple tart")])?;
    sfeed!(dir.path(), "sync").assert_success()?;

    sfeed!(dir.path(), "delete", "a").assert_success()?;
    let sync = sfeed!(dir.path(), "sync").assert_success()?;
    assert!(sync.contains_stdout("Synced to revision 3 (epoch 1): 0 indexed, 1 removed"));

    let hits = sfeed!(dir.path(), "search", "apple").assert_success()?;
    assert!(hits.contains_stdout("b"));
    assert!(!hits.stdout.lines().any(|line| line.starts_with("a ")));

    sfeed!(dir.path(), "get", "a").assert_failure()?;
    Ok(())
}

#[test]
fn test_get_prints_content_and_metadata() -> Result<()> {
    let dir = TempDir::new()?;
    seeded_repo(dir.path(), &[("note", "hello world")])?;

    let plain = sfeed!(dir.path(), "get", "note").assert_success()?;
    assert_eq!(plain.stdout, "hello world\n");

    let meta = sfeed!(dir.path(), "get", "note", "--json")
        .assert_success()?
        .json()?;
    assert_eq!(meta["revision"], 1);
    assert_eq!(meta["size"], 11);
    assert_eq!(meta["content_hash"].as_str().map(str::len), Some(64));

    Ok(())
}
