//! Upload and administration workflow
//!
//! Story creation and updates write the story document and its display-list
//! memberships inside one write transaction, so membership is never left
//! half applied. Chapter numbers are assigned inside a write transaction as
//! well: redb runs write transactions one at a time, which makes the
//! read-modify-write of `lastChapterNumber` atomic.

use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use redb::{Database, ReadableDatabase, ReadableTable, Table, WriteTransaction};
use std::collections::BTreeSet;

use crate::database::{
    chapter_key, display_list_table, get_doc, keys_with_prefix, TABLE_CHAPTERS, TABLE_COMMENTS,
    TABLE_GENRES, TABLE_STORIES, TABLE_STORY_LIKES, TABLE_STORY_RATINGS,
};
use crate::error::{AppError, AppResult};
use crate::model::{
    Chapter, CreateStoryRequest, DisplayList, Genre, Membership, NewChapterRequest, Story,
    UpdateStoryRequest,
};

const STORY_ID_LEN: usize = 20;
const DEFAULT_STATUS: &str = "ongoing";

/// Creates a story and adds it to the requested display lists
///
/// # Validation
///
/// Title, author and cover URL must be non-empty and at least one existing
/// genre must be selected.
///
/// # Returns
///
/// * `Ok(Story)` - the stored story with its generated id
/// * `Err(AppError::BadRequest)` - validation failed; nothing is written
pub fn create_story(db: &Database, request: CreateStoryRequest) -> AppResult<Story> {
    require_text("title", &request.title)?;
    require_text("author", &request.author)?;
    require_text("cover", &request.cover_url)?;
    if request.genre_ids.is_empty() {
        return Err(AppError::BadRequest("select at least one genre".to_string()));
    }

    let now = Utc::now();
    let write_txn = db.begin_write()?;
    let story = {
        let genres = resolve_genres(&write_txn, &request.genre_ids)?;
        let mut stories = write_txn.open_table(TABLE_STORIES)?;
        let id = allocate_story_id(&stories)?;

        let story = Story {
            id,
            title: request.title.trim().to_string(),
            author: request.author.trim().to_string(),
            status: request
                .status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            cover_url: request.cover_url.trim().to_string(),
            genres: genres.iter().map(|g| g.name.clone()).collect(),
            genre_ids: genres.iter().map(|g| g.id).collect(),
            description: request.description,
            created_at: Some(now),
            updated_at: Some(now),
            ..Story::default()
        };
        put_story(&mut stories, &story)?;
        story
    };

    let desired: BTreeSet<DisplayList> = request.display_lists.into_iter().collect();
    let (added, _) = reconcile_memberships(&write_txn, &story.id, &desired)?;
    write_txn.commit()?;

    tracing::info!(story_id = %story.id, title = %story.title, ?added, "story created");
    Ok(story)
}

/// Merges the provided fields into a story and, when asked, brings its
/// display-list membership in line with the desired set
pub fn update_story(
    db: &Database,
    story_id: &str,
    request: UpdateStoryRequest,
) -> AppResult<Story> {
    for (field, value) in [
        ("title", &request.title),
        ("author", &request.author),
        ("cover", &request.cover_url),
    ] {
        if let Some(value) = value {
            require_text(field, value)?;
        }
    }
    if matches!(&request.genre_ids, Some(ids) if ids.is_empty()) {
        return Err(AppError::BadRequest("select at least one genre".to_string()));
    }

    let write_txn = db.begin_write()?;
    let story = {
        let genres = match &request.genre_ids {
            Some(ids) => Some(resolve_genres(&write_txn, ids)?),
            None => None,
        };

        let mut stories = write_txn.open_table(TABLE_STORIES)?;
        let mut story: Story =
            get_doc(&stories, story_id)?.ok_or_else(|| AppError::not_found("story", story_id))?;

        if let Some(title) = request.title {
            story.title = title.trim().to_string();
        }
        if let Some(author) = request.author {
            story.author = author.trim().to_string();
        }
        if let Some(cover_url) = request.cover_url {
            story.cover_url = cover_url.trim().to_string();
        }
        if let Some(status) = request.status {
            story.status = status;
        }
        if let Some(description) = request.description {
            story.description = description;
        }
        if let Some(genres) = genres {
            story.genres = genres.iter().map(|g| g.name.clone()).collect();
            story.genre_ids = genres.iter().map(|g| g.id).collect();
        }
        story.updated_at = Some(Utc::now());

        put_story(&mut stories, &story)?;
        story
    };

    if let Some(lists) = request.display_lists {
        let desired: BTreeSet<DisplayList> = lists.into_iter().collect();
        let (added, removed) = reconcile_memberships(&write_txn, story_id, &desired)?;
        tracing::info!(story_id, ?added, ?removed, "display lists reconciled");
    }
    write_txn.commit()?;

    tracing::info!(story_id, "story updated");
    Ok(story)
}

/// Appends a chapter numbered `lastChapterNumber + 1`
///
/// Concurrent submissions for the same story queue on the write lock, so
/// each one observes the number committed by the previous one.
///
/// # Arguments
///
/// * `db` - Reference to the database
/// * `story_id` - Story receiving the chapter
/// * `request` - Optional title and the page URLs (at least one)
///
/// # Returns
///
/// * `Ok(Chapter)` - the stored chapter; `id` and `number` are equal
/// * `Err(AppError::BadRequest)` - no pages were given
/// * `Err(AppError::NotFound)` - the story does not exist
pub fn add_chapter(
    db: &Database,
    story_id: &str,
    request: NewChapterRequest,
) -> AppResult<Chapter> {
    let pages: Vec<String> = request
        .pages
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if pages.is_empty() {
        return Err(AppError::BadRequest("a chapter needs at least one page".to_string()));
    }

    let write_txn = db.begin_write()?;
    let chapter = {
        let mut stories = write_txn.open_table(TABLE_STORIES)?;
        let mut story: Story =
            get_doc(&stories, story_id)?.ok_or_else(|| AppError::not_found("story", story_id))?;

        let number = story
            .last_chapter_number
            .checked_add(1)
            .ok_or_else(|| AppError::Conflict("chapter numbers exhausted".to_string()))?;
        let title = match request.title.trim() {
            "" => format!("Chapter {}", number),
            title => title.to_string(),
        };
        let now = Utc::now();
        let chapter = Chapter {
            id: number,
            number,
            title,
            upload_date: now.format("%Y-%m-%d").to_string(),
            pages,
        };

        let mut chapters = write_txn.open_table(TABLE_CHAPTERS)?;
        let key = chapter_key(story_id, number);
        if chapters.get(key.as_str())?.is_some() {
            return Err(AppError::Conflict(format!(
                "chapter {} already exists for story '{}'",
                number, story_id
            )));
        }
        chapters.insert(key.as_str(), serde_json::to_string(&chapter)?.as_str())?;

        story.last_chapter_number = number;
        story.updated_at = Some(now);
        put_story(&mut stories, &story)?;
        chapter
    };
    write_txn.commit()?;

    tracing::info!(story_id, number = chapter.number, "chapter added");
    Ok(chapter)
}

/// Removes a story with its chapters, memberships, likes, ratings and comments
pub fn delete_story(db: &Database, story_id: &str) -> AppResult<()> {
    let write_txn = db.begin_write()?;
    {
        let mut stories = write_txn.open_table(TABLE_STORIES)?;
        if stories.remove(story_id)?.is_none() {
            return Err(AppError::not_found("story", story_id));
        }

        for table in [TABLE_CHAPTERS, TABLE_STORY_LIKES, TABLE_STORY_RATINGS, TABLE_COMMENTS] {
            let mut table = write_txn.open_table(table)?;
            for key in keys_with_prefix(&table, story_id)? {
                table.remove(key.as_str())?;
            }
        }
    }
    reconcile_memberships(&write_txn, story_id, &BTreeSet::new())?;
    write_txn.commit()?;

    tracing::info!(story_id, "story deleted");
    Ok(())
}

/// Display lists that currently contain the story
pub fn display_lists_of(db: &Database, story_id: &str) -> AppResult<Vec<DisplayList>> {
    let read_txn = db.begin_read()?;
    let mut lists = Vec::new();
    for list in DisplayList::ALL {
        let table = read_txn.open_table(display_list_table(list))?;
        if table.get(story_id)?.is_some() {
            lists.push(list);
        }
    }
    Ok(lists)
}

/// Creates a genre with the next free id; names are unique ignoring case
pub fn create_genre(db: &Database, name: &str) -> AppResult<Genre> {
    let name = name.trim();
    require_text("genre name", name)?;

    let write_txn = db.begin_write()?;
    let genre = {
        let mut genres = write_txn.open_table(TABLE_GENRES)?;

        let mut last_id = 0;
        for entry in genres.iter()? {
            let (key, value) = entry?;
            last_id = last_id.max(key.value());
            let existing: Genre = serde_json::from_str(value.value()).unwrap_or_default();
            if existing.name.eq_ignore_ascii_case(name) {
                return Err(AppError::Conflict(format!("genre '{}' already exists", name)));
            }
        }

        let genre = Genre {
            id: last_id + 1,
            name: name.to_string(),
        };
        genres.insert(genre.id, serde_json::to_string(&genre)?.as_str())?;
        genre
    };
    write_txn.commit()?;

    tracing::info!(genre_id = genre.id, name = %genre.name, "genre created");
    Ok(genre)
}

fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}

fn put_story(
    stories: &mut Table<'_, &'static str, &'static str>,
    story: &Story,
) -> AppResult<()> {
    stories.insert(story.id.as_str(), serde_json::to_string(story)?.as_str())?;
    Ok(())
}

fn allocate_story_id(stories: &Table<'_, &'static str, &'static str>) -> AppResult<String> {
    loop {
        let id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(STORY_ID_LEN)
            .map(char::from)
            .collect();
        if stories.get(id.as_str())?.is_none() {
            return Ok(id);
        }
    }
}

/// Looks up every selected genre, keeping the caller's order
fn resolve_genres(write_txn: &WriteTransaction, ids: &[u64]) -> AppResult<Vec<Genre>> {
    let table = write_txn.open_table(TABLE_GENRES)?;
    let mut seen = BTreeSet::new();
    let mut genres = Vec::with_capacity(ids.len());
    for &id in ids {
        if !seen.insert(id) {
            continue;
        }
        let raw = table
            .get(id)?
            .map(|guard| guard.value().to_string())
            .ok_or_else(|| AppError::BadRequest(format!("unknown genre id {}", id)))?;
        let mut genre: Genre = serde_json::from_str(&raw)?;
        genre.id = id;
        genres.push(genre);
    }
    Ok(genres)
}

/// Adds the story to every desired list it is missing from and removes it
/// from every list it should no longer be in
///
/// Returns the lists that were added and removed.
fn reconcile_memberships(
    write_txn: &WriteTransaction,
    story_id: &str,
    desired: &BTreeSet<DisplayList>,
) -> AppResult<(Vec<DisplayList>, Vec<DisplayList>)> {
    let mut added = Vec::new();
    let mut removed = Vec::new();

    for list in DisplayList::ALL {
        let mut table = write_txn.open_table(display_list_table(list))?;
        let present = table.get(story_id)?.is_some();
        let wanted = desired.contains(&list);

        if present && !wanted {
            table.remove(story_id)?;
            removed.push(list);
        } else if !present && wanted {
            let membership = Membership {
                story_id: story_id.to_string(),
                added_at: Some(Utc::now()),
            };
            table.insert(story_id, serde_json::to_string(&membership)?.as_str())?;
            added.push(list);
        }
    }

    Ok((added, removed))
}
