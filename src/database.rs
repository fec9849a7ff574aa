//! Database initialization and table definitions
//!
//! This module handles the setup of the embedded redb database that plays the
//! role of the document store. Every collection is a table whose values are
//! JSON documents serialized as strings.

use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::DisplayList;
use crate::reader::ReaderRegistry;

/// Story documents
///
/// Key: story id (20 alphanumeric characters)
/// Value: JSON-serialized `Story`
pub const TABLE_STORIES: TableDefinition<&str, &str> = TableDefinition::new("stories");

/// Chapter documents, the `stories/{id}/chapters` subcollection
///
/// Key: composite key "{story_id}:{number:08}" so a prefix range yields
/// chapters in number order
/// Value: JSON-serialized `Chapter`
pub const TABLE_CHAPTERS: TableDefinition<&str, &str> = TableDefinition::new("chapters");

/// Genre documents keyed by numeric genre id
pub const TABLE_GENRES: TableDefinition<u64, &str> = TableDefinition::new("genres");

pub const TABLE_BANNERS: TableDefinition<&str, &str> = TableDefinition::new("banners");
pub const TABLE_NEW_UPDATES: TableDefinition<&str, &str> = TableDefinition::new("new_updates");
pub const TABLE_MOST_VIEWED: TableDefinition<&str, &str> = TableDefinition::new("most_viewed");
pub const TABLE_COMPLETED_STORIES: TableDefinition<&str, &str> =
    TableDefinition::new("completed_stories");
pub const TABLE_FAVORITES: TableDefinition<&str, &str> = TableDefinition::new("favorites");
pub const TABLE_TRENDING_LIST: TableDefinition<&str, &str> = TableDefinition::new("trending_list");
pub const TABLE_NEW_RELEASES: TableDefinition<&str, &str> = TableDefinition::new("new_releases");

/// Admin grants keyed by user id
pub const TABLE_ADMINS: TableDefinition<&str, &str> = TableDefinition::new("admins");

/// User profiles keyed by user id
pub const TABLE_USERS: TableDefinition<&str, &str> = TableDefinition::new("users");

/// Read history keyed "{user_id}:{story_id}", latest chapter wins
pub const TABLE_READ_HISTORY: TableDefinition<&str, &str> = TableDefinition::new("read_history");

/// Feedback messages keyed by generated id
pub const TABLE_APP_FEEDBACK: TableDefinition<&str, &str> = TableDefinition::new("app_feedback");

/// Per-user likes keyed "{story_id}:{user_id}"
pub const TABLE_STORY_LIKES: TableDefinition<&str, &str> = TableDefinition::new("story_likes");

/// Per-user ratings keyed "{story_id}:{user_id}"
pub const TABLE_STORY_RATINGS: TableDefinition<&str, &str> = TableDefinition::new("story_ratings");

/// Personal favorites keyed "{user_id}:{story_id}"
pub const TABLE_USER_FAVORITES: TableDefinition<&str, &str> =
    TableDefinition::new("user_favorites");

/// Comments keyed "{story_id}:{timestamp_micros}:{comment_id}"
pub const TABLE_COMMENTS: TableDefinition<&str, &str> = TableDefinition::new("comments");

/// Local download records keyed "{story_id}:{chapter:08}"
pub const TABLE_DOWNLOADS: TableDefinition<&str, &str> = TableDefinition::new("downloads");

/// Local key-value preferences
pub const TABLE_SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

const DOCUMENT_TABLES: [TableDefinition<&str, &str>; 18] = [
    TABLE_STORIES,
    TABLE_CHAPTERS,
    TABLE_BANNERS,
    TABLE_NEW_UPDATES,
    TABLE_MOST_VIEWED,
    TABLE_COMPLETED_STORIES,
    TABLE_FAVORITES,
    TABLE_TRENDING_LIST,
    TABLE_NEW_RELEASES,
    TABLE_ADMINS,
    TABLE_USERS,
    TABLE_READ_HISTORY,
    TABLE_APP_FEEDBACK,
    TABLE_STORY_LIKES,
    TABLE_STORY_RATINGS,
    TABLE_USER_FAVORITES,
    TABLE_COMMENTS,
    TABLE_DOWNLOADS,
];

/// Table backing a display list
pub fn display_list_table(
    list: DisplayList,
) -> TableDefinition<'static, &'static str, &'static str> {
    match list {
        DisplayList::Banners => TABLE_BANNERS,
        DisplayList::NewUpdates => TABLE_NEW_UPDATES,
        DisplayList::MostViewed => TABLE_MOST_VIEWED,
        DisplayList::CompletedStories => TABLE_COMPLETED_STORIES,
        DisplayList::Favorites => TABLE_FAVORITES,
        DisplayList::TrendingList => TABLE_TRENDING_LIST,
        DisplayList::NewReleases => TABLE_NEW_RELEASES,
    }
}

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the embedded database
    pub db: Arc<Database>,

    pub config: Arc<Config>,

    /// In-memory reader sessions, one per user
    pub readers: ReaderRegistry,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            readers: ReaderRegistry::default(),
        }
    }
}

/// Initializes the embedded database and creates every collection table
///
/// # Example
///
/// ```no_run
/// # use mangashelf::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        for table in DOCUMENT_TABLES {
            write_txn.open_table(table)?;
        }
        write_txn.open_table(TABLE_GENRES)?;
        write_txn.open_table(TABLE_SETTINGS)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Separator between the parts of a composite key
pub const KEY_SEPARATOR: char = ':';

/// Checks that `part` can be embedded in a composite key
///
/// A part containing the separator would make "{a}:" a prefix of another
/// owner's keys, so prefix scans would return foreign records.
///
/// # Returns
///
/// * `Ok(part)` - the part unchanged
/// * `Err(AppError::BadRequest)` - the part is empty or contains ':'
pub fn key_part(part: &str) -> AppResult<&str> {
    if part.is_empty() || part.contains(KEY_SEPARATOR) {
        return Err(AppError::BadRequest(format!(
            "identifier '{}' must be non-empty and must not contain '{}'",
            part, KEY_SEPARATOR
        )));
    }
    Ok(part)
}

/// Composite key "{left}:{right}"; both parts are validated with `key_part`
pub fn pair_key(left: &str, right: &str) -> AppResult<String> {
    Ok(format!("{}{}{}", key_part(left)?, KEY_SEPARATOR, key_part(right)?))
}

/// Composite key of a chapter (or a download of it) under its story
pub fn chapter_key(story_id: &str, number: u32) -> String {
    format!("{}:{:08}", story_id, number)
}

/// Bounds matching every composite key that starts with "{prefix}:"
///
/// ';' sorts directly after ':' so the upper bound excludes nothing else.
/// The prefix itself must pass `key_part`.
pub fn prefix_range(prefix: &str) -> AppResult<(String, String)> {
    let prefix = key_part(prefix)?;
    Ok((format!("{}:", prefix), format!("{};", prefix)))
}

/// Decodes one JSON document
pub fn decode<T: DeserializeOwned>(raw: &str) -> AppResult<T> {
    Ok(serde_json::from_str(raw)?)
}

/// Reads a single document by key
pub fn get_doc<T, R>(table: &R, key: &str) -> AppResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static str>,
{
    match table.get(key)? {
        Some(guard) => Ok(Some(decode(guard.value())?)),
        None => Ok(None),
    }
}

/// Collects every document whose key starts with "{prefix}:"
///
/// Documents that fail to decode are logged and skipped so one bad record
/// does not hide the rest of a listing.
pub fn scan_prefix<T, R>(table: &R, prefix: &str) -> AppResult<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static str>,
{
    let (start, end) = prefix_range(prefix)?;
    let mut docs = Vec::new();
    for entry in table.range(start.as_str()..end.as_str())? {
        let (key, value) = entry?;
        match serde_json::from_str::<T>(value.value()) {
            Ok(doc) => docs.push(doc),
            Err(err) => tracing::warn!(key = key.value(), %err, "skipping undecodable document"),
        }
    }
    Ok(docs)
}

/// Keys whose composite form starts with "{prefix}:"
pub fn keys_with_prefix<R>(table: &R, prefix: &str) -> AppResult<Vec<String>>
where
    R: ReadableTable<&'static str, &'static str>,
{
    let (start, end) = prefix_range(prefix)?;
    let mut keys = Vec::new();
    for entry in table.range(start.as_str()..end.as_str())? {
        let (key, _) = entry?;
        keys.push(key.value().to_string());
    }
    Ok(keys)
}
