//! Local download records
//!
//! No bytes are transferred. A spawned task walks each record from PENDING
//! through DOWNLOADING to COMPLETED, persisting progress as it goes.

use rand::{distr::Alphanumeric, Rng};
use redb::{Database, ReadableDatabase, ReadableTable};
use std::sync::Arc;
use std::time::Duration;

use crate::database::{chapter_key, get_doc, TABLE_CHAPTERS, TABLE_DOWNLOADS};
use crate::error::{AppError, AppResult};
use crate::model::{DownloadItem, DownloadStatus};

const PROGRESS_STEP: u8 = 10;
const RUN_ID_LEN: usize = 12;

/// Reads one download record
///
/// # Returns
///
/// * `Ok(Some(item))` - the stored record
/// * `Ok(None)` - nothing was queued for this chapter
pub fn get(db: &Database, story_id: &str, chapter: u32) -> AppResult<Option<DownloadItem>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_DOWNLOADS)?;
    get_doc(&table, &chapter_key(story_id, chapter))
}

/// Every download record, ordered by story and chapter
///
/// Storage errors are returned; records that fail to decode are logged and
/// skipped.
pub fn list(db: &Database) -> AppResult<Vec<DownloadItem>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_DOWNLOADS)?;

    let mut items = Vec::new();
    for entry in table.iter()? {
        let (key, value) = entry?;
        match serde_json::from_str::<DownloadItem>(value.value()) {
            Ok(item) => items.push(item),
            Err(err) => tracing::warn!(key = key.value(), %err, "skipping undecodable download"),
        }
    }
    Ok(items)
}

/// Returns whether a record was removed; a running simulation stops on its
/// next step
pub fn remove(db: &Database, story_id: &str, chapter: u32) -> AppResult<bool> {
    let write_txn = db.begin_write()?;
    let removed = {
        let mut table = write_txn.open_table(TABLE_DOWNLOADS)?;
        let removed = table.remove(chapter_key(story_id, chapter).as_str())?.is_some();
        removed
    };
    write_txn.commit()?;
    Ok(removed)
}

/// Queues a chapter for download and starts the progress simulation
///
/// A record that is already pending, downloading or completed is returned
/// unchanged. A record in ERROR is restarted from zero. Every start gets a
/// fresh `run_id`, so a loop left over from a removed record stops instead of
/// advancing its replacement. Must be called from within a tokio runtime.
///
/// # Returns
///
/// * `Ok(item)` - the queued (or already present) record
/// * `Err(AppError::NotFound)` - the chapter does not exist
pub fn enqueue(
    db: Arc<Database>,
    story_id: &str,
    chapter: u32,
    tick: Duration,
) -> AppResult<DownloadItem> {
    {
        let read_txn = db.begin_read()?;
        let chapters = read_txn.open_table(TABLE_CHAPTERS)?;
        if chapters.get(chapter_key(story_id, chapter).as_str())?.is_none() {
            return Err(AppError::not_found(
                "chapter",
                format!("{}/{}", story_id, chapter),
            ));
        }
    }

    let item = DownloadItem {
        story_id: story_id.to_string(),
        chapter,
        progress: 0,
        status: DownloadStatus::Pending,
        run_id: rand::rng()
            .sample_iter(&Alphanumeric)
            .take(RUN_ID_LEN)
            .map(char::from)
            .collect(),
    };

    // Check and insert under one write lock so a double tap queues once.
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_DOWNLOADS)?;
        let key = chapter_key(story_id, chapter);
        if let Some(existing) = get_doc::<DownloadItem, _>(&table, &key)? {
            if existing.status != DownloadStatus::Error {
                return Ok(existing);
            }
        }
        table.insert(key.as_str(), serde_json::to_string(&item)?.as_str())?;
    }
    write_txn.commit()?;
    tracing::info!(story_id, chapter, run_id = %item.run_id, "download queued");

    tokio::spawn(simulate(db, item.clone(), tick));
    Ok(item)
}

async fn simulate(db: Arc<Database>, mut item: DownloadItem, tick: Duration) {
    let mut interval = tokio::time::interval(tick.max(Duration::from_millis(1)));
    // The first tick completes immediately.
    interval.tick().await;

    while item.status != DownloadStatus::Completed {
        interval.tick().await;

        let worker_db = db.clone();
        let step = item.clone();
        let outcome = tokio::task::spawn_blocking(move || advance(&worker_db, &step)).await;

        match outcome {
            Ok(Ok(Some(next))) => item = next,
            Ok(Ok(None)) => {
                tracing::debug!(
                    story_id = %item.story_id,
                    chapter = item.chapter,
                    run_id = %item.run_id,
                    "download removed or replaced, stopping"
                );
                return;
            }
            Ok(Err(err)) => {
                tracing::error!(
                    story_id = %item.story_id,
                    chapter = item.chapter,
                    %err,
                    "download failed"
                );
                let worker_db = db.clone();
                let failed = item.clone();
                match tokio::task::spawn_blocking(move || mark_failed(&worker_db, &failed)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => tracing::error!(%err, "could not record download failure"),
                    Err(err) => tracing::error!(%err, "download failure task panicked"),
                }
                return;
            }
            Err(err) => {
                tracing::error!(%err, "download task panicked");
                return;
            }
        }
    }

    tracing::info!(story_id = %item.story_id, chapter = item.chapter, "download completed");
}

/// Applies one progress step
///
/// Returns `None` when the record no longer exists or now belongs to another
/// run.
fn advance(db: &Database, item: &DownloadItem) -> AppResult<Option<DownloadItem>> {
    let write_txn = db.begin_write()?;
    let next = {
        let mut table = write_txn.open_table(TABLE_DOWNLOADS)?;
        let key = chapter_key(&item.story_id, item.chapter);
        let Some(mut current) = get_doc::<DownloadItem, _>(&table, &key)? else {
            return Ok(None);
        };
        if current.run_id != item.run_id {
            return Ok(None);
        }

        current.progress = current.progress.saturating_add(PROGRESS_STEP).min(100);
        current.status = if current.progress >= 100 {
            DownloadStatus::Completed
        } else {
            DownloadStatus::Downloading
        };
        table.insert(key.as_str(), serde_json::to_string(&current)?.as_str())?;
        current
    };
    write_txn.commit()?;

    tracing::debug!(
        story_id = %next.story_id,
        chapter = next.chapter,
        progress = next.progress,
        "download progress"
    );
    Ok(Some(next))
}

/// Flags the record as ERROR, unless it was removed or restarted meanwhile
fn mark_failed(db: &Database, item: &DownloadItem) -> AppResult<()> {
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_DOWNLOADS)?;
        let key = chapter_key(&item.story_id, item.chapter);
        let Some(mut current) = get_doc::<DownloadItem, _>(&table, &key)? else {
            return Ok(());
        };
        if current.run_id != item.run_id {
            return Ok(());
        }
        current.status = DownloadStatus::Error;
        table.insert(key.as_str(), serde_json::to_string(&current)?.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}
