//! Read side of the catalog
//!
//! Translates stored documents into typed stories, chapters and genres, and
//! assembles the home-screen sections from the display-list collections.

use redb::{Database, ReadableDatabase, ReadableTable};
use std::sync::Arc;

use crate::database::{
    chapter_key, display_list_table, get_doc, scan_prefix, TABLE_CHAPTERS, TABLE_GENRES,
    TABLE_STORIES,
};
use crate::error::{AppError, AppResult};
use crate::model::{Chapter, DisplayList, Genre, HomeFeed, Membership, Story, StoryDetail};

/// Stories that belong to a display list, in insertion order
///
/// Memberships pointing at a story that no longer exists are skipped.
pub fn list_section(db: &Database, list: DisplayList) -> AppResult<Vec<Story>> {
    let read_txn = db.begin_read()?;
    let members = read_txn.open_table(display_list_table(list))?;
    let stories = read_txn.open_table(TABLE_STORIES)?;

    let mut memberships = Vec::new();
    for entry in members.iter()? {
        let (key, value) = entry?;
        let mut membership: Membership = serde_json::from_str(value.value()).unwrap_or_default();
        // The key is authoritative; the document body may be empty.
        membership.story_id = key.value().to_string();
        memberships.push(membership);
    }
    memberships.sort_by_key(|m| m.added_at);

    let mut section = Vec::with_capacity(memberships.len());
    for membership in memberships {
        match get_doc::<Story, _>(&stories, &membership.story_id) {
            Ok(Some(story)) => section.push(story),
            Ok(None) => {
                tracing::debug!(%list, story_id = %membership.story_id, "dangling membership")
            }
            Err(err) => {
                tracing::warn!(%list, story_id = %membership.story_id, %err, "skipping story")
            }
        }
    }
    Ok(section)
}

/// Loads the four home-screen sections concurrently
///
/// The feed is only produced when every section loads; the first failure is
/// returned and nothing partial is shown.
pub async fn home_feed(db: Arc<Database>) -> AppResult<HomeFeed> {
    let fetch = |list: DisplayList| {
        let db = db.clone();
        async move {
            tokio::task::spawn_blocking(move || list_section(&db, list))
                .await
                .unwrap_or_else(|err| Err(err.into()))
        }
    };

    let (banners, new_updates, most_viewed, completed_stories) = tokio::try_join!(
        fetch(DisplayList::Banners),
        fetch(DisplayList::NewUpdates),
        fetch(DisplayList::MostViewed),
        fetch(DisplayList::CompletedStories),
    )?;

    Ok(HomeFeed {
        banners,
        new_updates,
        most_viewed,
        completed_stories,
    })
}

/// Every story in the catalog
///
/// Storage errors are returned to the caller. A story document that fails to
/// decode is logged and skipped so one bad record does not hide the rest.
pub fn list_stories(db: &Database) -> AppResult<Vec<Story>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_STORIES)?;

    let mut stories = Vec::new();
    for entry in table.iter()? {
        let (key, value) = entry?;
        match serde_json::from_str::<Story>(value.value()) {
            Ok(story) => stories.push(story),
            Err(err) => tracing::warn!(story_id = key.value(), %err, "skipping undecodable story"),
        }
    }
    Ok(stories)
}

/// Looks a story up by id
///
/// # Arguments
///
/// * `db` - Reference to the database
/// * `story_id` - Store-assigned story id
///
/// # Returns
///
/// * `Ok(Some(story))` - the story document
/// * `Ok(None)` - no story has this id
/// * `Err(AppError)` - the store failed or the document is malformed
pub fn find_story(db: &Database, story_id: &str) -> AppResult<Option<Story>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_STORIES)?;
    get_doc(&table, story_id)
}

/// A story with all of its chapters ordered by number
pub fn get_story_by_id(db: &Database, story_id: &str) -> AppResult<StoryDetail> {
    let read_txn = db.begin_read()?;
    let stories = read_txn.open_table(TABLE_STORIES)?;
    let story: Story =
        get_doc(&stories, story_id)?.ok_or_else(|| AppError::not_found("story", story_id))?;

    let chapters = read_txn.open_table(TABLE_CHAPTERS)?;
    let chapters = scan_prefix(&chapters, story_id)?;

    Ok(StoryDetail { story, chapters })
}

/// Chapters of a story ordered by number; `NotFound` for an unknown story
pub fn list_chapters(db: &Database, story_id: &str) -> AppResult<Vec<Chapter>> {
    Ok(get_story_by_id(db, story_id)?.chapters)
}

/// A single chapter by its number
///
/// # Returns
///
/// * `Ok(chapter)` - the chapter with its page URLs
/// * `Err(AppError::NotFound)` - the story has no chapter with that number
pub fn get_chapter(db: &Database, story_id: &str, number: u32) -> AppResult<Chapter> {
    let read_txn = db.begin_read()?;
    let chapters = read_txn.open_table(TABLE_CHAPTERS)?;
    get_doc(&chapters, &chapter_key(story_id, number))?
        .ok_or_else(|| AppError::not_found("chapter", format!("{}/{}", story_id, number)))
}

/// Every genre, ordered by id
pub fn list_genres(db: &Database) -> AppResult<Vec<Genre>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_GENRES)?;

    let mut genres = Vec::new();
    for entry in table.iter()? {
        let (key, value) = entry?;
        let mut genre: Genre = match serde_json::from_str(value.value()) {
            Ok(genre) => genre,
            Err(err) => {
                tracing::warn!(genre_id = key.value(), %err, "skipping undecodable genre");
                continue;
            }
        };
        genre.id = key.value();
        genres.push(genre);
    }
    Ok(genres)
}

/// Stories tagged with the given genre id
pub fn stories_by_genre(db: &Database, genre_id: u64) -> AppResult<Vec<Story>> {
    let mut stories = list_stories(db)?;
    stories.retain(|story| story.genre_ids.contains(&genre_id));
    Ok(stories)
}
