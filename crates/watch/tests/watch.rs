use osurec_cache::{CATALOG_FILE_NAME, Database, MapIndex, SONGS_DIR_NAME};
use osurec_config::Config;
use osurec_format::{Beatmap, CatalogWriter, ReplayHeader};
use osurec_watch::error::ErrorKind;
use osurec_watch::{BeatmapDecoder, Correlator, CorrelatorOptions, Recorder, ReplayDecoder};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::Span;

const HASH_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const HASH_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const HASH_C: &str = "cccccccccccccccccccccccccccccccc";

/// An installation indexing two maps, of which only the first is on disk.
fn install(dir: &Path) -> PathBuf {
    let root = dir.join("osu!");
    let folder = root.join(SONGS_DIR_NAME).join("1 Artist - Title");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::create_dir_all(root.join("Data").join("r")).unwrap();
    std::fs::write(
        folder.join("Artist - Title (Mapper) [Insane].osu"),
        "osu file format v14\n\n[Metadata]\nArtist:Artist\nTitle:Title\nVersion:Insane\n",
    )
    .unwrap();
    CatalogWriter::new("peppy")
        .record(HASH_A, "1 Artist - Title", "Artist - Title (Mapper) [Insane].osu")
        .record(HASH_B, "2 Other - Song", "Other - Song (Mapper) [Hard].osu")
        .write_to_path(root.join(CATALOG_FILE_NAME))
        .unwrap();
    root
}

fn replay(dir: &Path, name: &str, hash: &str) {
    std::fs::write(dir.join(name), ReplayHeader::for_beatmap(hash).encode()).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_replays_are_resolved_as_they_appear() {
    let dir = tempfile::tempdir().unwrap();
    let root = install(dir.path());
    let replays = root.join("Data").join("r");
    let config = Config {
        osu_root: Some(root),
        data_dir: Some(dir.path().join("data")),
        settle_delay_ms: 100,
        ..Config::default()
    };
    let db = Database::connect(config.database_path()).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<(Option<Beatmap>, ReplayHeader)>();
    let mut recorder = Recorder::open(
        &db,
        &config,
        move |map, replay| {
            let _ = tx.send((map, replay));
        },
        Span::none(),
    )
    .await
    .unwrap();
    assert_eq!(recorder.index().len().await.unwrap(), 2);
    recorder.start().unwrap();

    replay(&replays, "known.osr", HASH_A);
    replay(&replays, "unknown.osr", HASH_C);
    replay(&replays, "deleted-map.osr", HASH_B);
    replay(&replays, "not-a-replay.txt", HASH_A);

    let mut delivered = Vec::new();
    for _ in 0..2 {
        delivered.push(timeout(Duration::from_secs(10), rx.recv()).await.unwrap().unwrap());
    }
    delivered.sort_by(|a, b| a.1.beatmap_hash.cmp(&b.1.beatmap_hash));

    let (map, known) = &delivered[0];
    assert_eq!(known.beatmap_hash, HASH_A);
    assert_eq!(map.as_ref().unwrap().to_string(), "Artist - Title [Insane]");
    let (map, unknown) = &delivered[1];
    assert_eq!(unknown.beatmap_hash, HASH_C);
    assert!(map.is_none());

    // The deleted map and the non-replay never arrive.
    assert!(timeout(Duration::from_secs(1), rx.recv()).await.is_err());

    recorder.stop().await;
    replay(&replays, "after-stop.osr", HASH_A);
    assert!(timeout(Duration::from_millis(500), rx.recv()).await.is_err());
    db.close().await;
}

#[tokio::test]
async fn test_watching_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let root = install(dir.path());
    let db = Database::connect_in_memory().await.unwrap();
    let index = MapIndex::open(&db, &root, root.join(CATALOG_FILE_NAME), Span::none()).await.unwrap();
    let correlator =
        Correlator::new(index, ReplayDecoder, BeatmapDecoder, |_, _| {}, CorrelatorOptions::default());

    let missing = dir.path().join("replays");
    let error = correlator.watch(&missing).unwrap_err();
    assert_eq!(*error, ErrorKind::ReplayDirNotFound(missing));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_waits_for_results_still_settling() {
    let dir = tempfile::tempdir().unwrap();
    let root = install(dir.path());
    let replays = root.join("Data").join("r");
    let config = Config {
        osu_root: Some(root),
        data_dir: Some(dir.path().join("data")),
        settle_delay_ms: 400,
        ..Config::default()
    };
    let db = Database::connect(config.database_path()).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<(Option<Beatmap>, ReplayHeader)>();
    let mut recorder = Recorder::open(
        &db,
        &config,
        move |map, replay| {
            let _ = tx.send((map, replay));
        },
        Span::none(),
    )
    .await
    .unwrap();
    recorder.start().unwrap();

    replay(&replays, "settling.osr", HASH_A);
    tokio::time::sleep(Duration::from_millis(150)).await;
    recorder.stop().await;
    db.close().await;

    // Delivered before stop returned, so closing the pool didn't cut it off.
    let (map, replay) = rx.try_recv().unwrap();
    assert_eq!(replay.beatmap_hash, HASH_A);
    assert!(map.is_some());
}
