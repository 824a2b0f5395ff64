use mirror_meta::{patch, Config, Entry, Error, FileKind, LogRole, PathIndex};
use test_log::test;

const T1: &str = "2026-07-01T03:00:00Z";
const T2: &str = "2026-08-01T03:00:00Z";

fn entry(name: &str, size: u64) -> Entry {
    let mut entry = Entry::new(PathIndex::from([name]), FileKind::Regular);
    entry.size = Some(size);
    entry.mtime = Some(1_750_000_000);
    entry.uid = Some(1000);
    entry.gid = Some(1000);
    entry.perms = Some(0o644);
    entry
}

fn write_snapshot(
    store: &mirror_meta::Manager,
    time: &str,
    entries: &[Entry],
) -> mirror_meta::Result<()> {
    let mut writer = store.writer_at(LogRole::Snapshot, time)?;

    for entry in entries {
        writer.write(entry)?;
    }

    writer.close()
}

fn old_state() -> Vec<Entry> {
    vec![entry("changed", 1), entry("deleted", 5), entry("same", 7)]
}

fn new_state() -> Vec<Entry> {
    vec![entry("changed", 2), entry("created", 3), entry("same", 7)]
}

#[test]
fn tombstones_are_preserved_in_logs_and_hidden_by_patch() -> mirror_meta::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Config::new(dir.path()).open()?;

    write_snapshot(&store, T1, &[entry("x", 1)])?;
    write_snapshot(
        &store,
        T2,
        &[Entry::tombstone(PathIndex::from(["x"])), entry("y", 1)],
    )?;

    let store = Config::new(dir.path()).open()?;

    // the tombstone itself survives a log round-trip
    let newest = store
        .metadata_at(T2, None)?
        .expect("snapshot was written")
        .collect::<mirror_meta::Result<Vec<_>>>()?;
    assert_eq!(
        vec![Entry::tombstone(PathIndex::from(["x"])), entry("y", 1)],
        newest,
    );

    // and hides the older record when patching, newest first
    let merged = patch(vec![
        store.metadata_at(T2, None)?.expect("snapshot was written"),
        store.metadata_at(T1, None)?.expect("snapshot was written"),
    ])
    .collect::<mirror_meta::Result<Vec<_>>>()?;
    assert_eq!(vec![entry("y", 1)], merged);

    Ok(())
}

#[test]
fn diff_conversion_reconstructs_the_old_snapshot() -> mirror_meta::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Config::new(dir.path()).open()?;

    write_snapshot(&store, T1, &old_state())?;
    write_snapshot(&store, T2, &new_state())?;

    let store = Config::new(dir.path()).open()?;
    let diff_path = store.write_diff(T1, T2)?;
    assert_eq!(
        format!("mirror_metadata.{T1}.diff.gz"),
        diff_path
            .file_name()
            .expect("diff path has a file name")
            .to_string_lossy(),
    );

    // reclaiming the superseded snapshot is the caller's move
    std::fs::remove_file(dir.path().join(format!("mirror_metadata.{T1}.snapshot.gz")))?;

    let store = Config::new(dir.path()).open()?;
    let restored = patch(vec![
        store.metadata_at(T1, None)?.expect("diff log exists"),
        store.metadata_at(T2, None)?.expect("snapshot exists"),
    ])
    .collect::<mirror_meta::Result<Vec<_>>>()?;

    assert_eq!(old_state(), restored);

    Ok(())
}

#[test]
fn diff_log_carries_only_differences() -> mirror_meta::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Config::new(dir.path()).open()?;

    write_snapshot(&store, T1, &old_state())?;
    write_snapshot(&store, T2, &new_state())?;

    let store = Config::new(dir.path()).open()?;
    store.write_diff(T1, T2)?;
    std::fs::remove_file(dir.path().join(format!("mirror_metadata.{T1}.snapshot.gz")))?;

    let store = Config::new(dir.path()).open()?;
    let diff = store
        .metadata_at(T1, None)?
        .expect("diff log exists")
        .collect::<mirror_meta::Result<Vec<_>>>()?;

    assert_eq!(
        vec![
            entry("changed", 1),
            Entry::tombstone(PathIndex::from(["created"])),
            entry("deleted", 5),
        ],
        diff,
    );

    Ok(())
}

#[test]
fn diff_conversion_needs_both_snapshots() -> mirror_meta::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Config::new(dir.path()).open()?;

    write_snapshot(&store, T1, &old_state())?;

    let store = Config::new(dir.path()).open()?;
    match store.write_diff(T1, T2).err() {
        Some(Error::MissingSnapshot(time)) => assert_eq!(T2, time),
        other => panic!("expected MissingSnapshot, got {other:?}"),
    }

    Ok(())
}

#[test]
fn three_way_history_merge() -> mirror_meta::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Config::new(dir.path()).open()?;

    let t0 = "2026-06-01T03:00:00Z";
    write_snapshot(&store, t0, &[entry("a", 1), entry("b", 1), entry("c", 1)])?;
    write_snapshot(&store, T1, &[entry("b", 2)])?;
    write_snapshot(
        &store,
        T2,
        &[Entry::tombstone(PathIndex::from(["c"])), entry("d", 4)],
    )?;

    let store = Config::new(dir.path()).open()?;
    let merged = patch(vec![
        store.metadata_at(T2, None)?.expect("snapshot exists"),
        store.metadata_at(T1, None)?.expect("snapshot exists"),
        store.metadata_at(t0, None)?.expect("snapshot exists"),
    ])
    .collect::<mirror_meta::Result<Vec<_>>>()?;

    assert_eq!(
        vec![entry("a", 1), entry("b", 2), entry("d", 4)],
        merged,
    );

    Ok(())
}
