//! Streaming writes through `sfeed follow`

use crate::sfeed;
use anyhow::Result;
use tempfile::TempDir;

#[test]
fn test_follow_applies_stdin_and_indexes() -> Result<()> {
    let dir = TempDir::new()?;
    sfeed!(dir.path(), "init").assert_success()?;

    let script = "\
# seed
put x hello world
put y other words

delete x
bogus line
";
    let follow = sfeed!(dir.path(), "follow", "--interval-ms", "20")
        .stdin(script)
        .assert_success()?;
    assert!(follow.contains_stdout("Put x at revision 1"));
    assert!(follow.contains_stdout("Deleted x at revision 3"));
    assert!(follow.contains_stdout("Followed to revision 3: 3 writes"));

    let gone = sfeed!(dir.path(), "search", "hello").assert_success()?;
    assert!(gone.contains_stdout("No items match"));

    let kept = sfeed!(dir.path(), "search", "words").assert_success()?;
    assert!(kept.contains_stdout("y"));
    assert!(!kept.contains_stdout("behind the store"));

    Ok(())
}
