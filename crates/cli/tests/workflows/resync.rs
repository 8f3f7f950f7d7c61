//! Epoch changes and retention horizons force consumers to start over

use crate::common::seeded_repo;
use crate::sfeed;
use anyhow::Result;
use tempfile::TempDir;

#[test]
fn test_rebuild_starts_new_epoch() -> Result<()> {
    let dir = TempDir::new()?;
    seeded_repo(dir.path(), &[("a", "one"), ("b", "two"), ("c", "three")])?;
    sfeed!(dir.path(), "sync").assert_success()?;
    sfeed!(dir.path(), "delete", "b").assert_success()?;

    let rebuild = sfeed!(dir.path(), "rebuild", "-y").assert_success()?;
    assert!(rebuild.contains_stdout("epoch 2, 2 items"));

    let page = sfeed!(dir.path(), "changes", "--json")
        .assert_success()?
        .json()?;
    assert_eq!(page["epoch"], 2);
    assert_eq!(page["from"], 1);
    assert_eq!(page["to"], 2);
    assert_eq!(page["changed"], serde_json::json!(["a", "c"]));

    let sync = sfeed!(dir.path(), "sync").assert_success()?;
    assert!(sync.contains_stdout("Epoch changed (1 -> 2)"));
    assert!(sync.contains_stdout("Synced to revision 2 (epoch 2)"));

    let hits = sfeed!(dir.path(), "search", "two").assert_success()?;
    assert!(hits.contains_stdout("No items match"));

    Ok(())
}

#[test]
fn test_rebuild_prompt_can_abort() -> Result<()> {
    let dir = TempDir::new()?;
    seeded_repo(dir.path(), &[("a", "one")])?;

    let aborted = sfeed!(dir.path(), "rebuild").stdin("n\n").assert_success()?;
    assert!(aborted.contains_stdout("Aborted"));

    let page = sfeed!(dir.path(), "changes", "--json")
        .assert_success()?
        .json()?;
    assert_eq!(page["epoch"], 1);
    Ok(())
}

#[test]
fn test_gc_past_consumer_forces_resync() -> Result<()> {
    let dir = TempDir::new()?;
    sfeed!(dir.path(), "init").assert_success()?;
    sfeed!(dir.path(), "config", "set", "store.retain_revisions", "1").assert_success()?;
    for (id, content) in [("a", "first"), ("b", "second")] {
        sfeed!(dir.path(), "put", id, "--content", content).assert_success()?;
    }
    sfeed!(dir.path(), "sync").assert_success()?;

    sfeed!(dir.path(), "delete", "a").assert_success()?;
    sfeed!(dir.path(), "put", "c", "--content", "third").assert_success()?;
    sfeed!(dir.path(), "put", "d", "--content", "fourth").assert_success()?;

    let gc = sfeed!(dir.path(), "gc").assert_success()?;
    assert!(gc.contains_stdout("Tombstones purged:          1"));

    let stale = sfeed!(dir.path(), "changes", "--from", "2").assert_failure()?;
    assert!(stale.contains_stderr("predates retained history"));

    let sync = sfeed!(dir.path(), "sync").assert_success()?;
    assert!(sync.contains_stdout("Revision 2 predates horizon 3"));
    assert!(sync.contains_stdout("Synced to revision 5 (epoch 1): 3 indexed"));

    let hits = sfeed!(dir.path(), "search", "first").assert_success()?;
    assert!(hits.contains_stdout("No items match"));
    Ok(())
}

#[test]
fn test_replaced_store_forces_resync() -> Result<()> {
    let dir = TempDir::new()?;
    seeded_repo(dir.path(), &[("a", "one"), ("b", "two"), ("c", "three")])?;
    sfeed!(dir.path(), "sync").assert_success()?;

    // A new store starts over at epoch 1 with its own source id
    std::fs::remove_dir_all(dir.path().join(".sfeed").join("store"))?;
    for id in ["p", "q", "r", "s", "t"] {
        sfeed!(dir.path(), "put", id, "--content", "fresh").assert_success()?;
    }

    let status = sfeed!(dir.path(), "status").assert_success()?;
    assert!(status.contains_stdout("resync pending"));

    let sync = sfeed!(dir.path(), "sync").assert_success()?;
    assert!(sync.contains_stdout("Store replaced"));
    assert!(sync.contains_stdout("Synced to revision 5 (epoch 1): 5 indexed"));

    let hits = sfeed!(dir.path(), "search", "fresh").assert_success()?;
    for id in ["p", "q", "r", "s", "t"] {
        assert!(hits.contains_stdout(&format!("{}  ", id)));
    }
    let gone = sfeed!(dir.path(), "search", "one").assert_success()?;
    assert!(gone.contains_stdout("No items match"));
    Ok(())
}

#[test]
fn test_changes_past_head_fails() -> Result<()> {
    let dir = TempDir::new()?;
    seeded_repo(dir.path(), &[("a", "one")])?;

    let ahead = sfeed!(dir.path(), "changes", "--from", "5").assert_failure()?;
    assert!(ahead.contains_stderr("ahead of head 1"));
    Ok(())
}
