//! Reader-side writes: likes, views, ratings, favorites, read history,
//! comments and app feedback
//!
//! Each operation touches a narrow set of fields. Concurrent writers resolve
//! as last-write-wins.

use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use crate::database::{
    chapter_key, get_doc, pair_key, scan_prefix, TABLE_APP_FEEDBACK, TABLE_CHAPTERS,
    TABLE_COMMENTS, TABLE_READ_HISTORY, TABLE_STORIES, TABLE_STORY_LIKES, TABLE_STORY_RATINGS,
    TABLE_USER_FAVORITES,
};
use crate::error::{AppError, AppResult};
use crate::model::{
    Comment, CommentRequest, Favorite, Feedback, FeedbackRequest, LikeResponse, RatingResponse,
    ReadHistory, Story,
};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

#[derive(Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct LikeDoc {
    liked_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct RatingDoc {
    score: u8,
}

fn random_id(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Loads a story inside a write transaction, applies `apply`, writes it back
fn modify_story<F>(write_txn: &WriteTransaction, story_id: &str, apply: F) -> AppResult<Story>
where
    F: FnOnce(&mut Story),
{
    let mut stories = write_txn.open_table(TABLE_STORIES)?;
    let mut story: Story =
        get_doc(&stories, story_id)?.ok_or_else(|| AppError::not_found("story", story_id))?;
    apply(&mut story);
    stories.insert(story_id, serde_json::to_string(&story)?.as_str())?;
    Ok(story)
}

fn ensure_story(db: &Database, story_id: &str) -> AppResult<Story> {
    let read_txn = db.begin_read()?;
    let stories = read_txn.open_table(TABLE_STORIES)?;
    get_doc(&stories, story_id)?.ok_or_else(|| AppError::not_found("story", story_id))
}

/// Likes the story for `user_id`, or removes the like when already present
///
/// The like marker and the story's `likeCount` change in one transaction, so
/// toggling twice restores the original count.
///
/// # Arguments
///
/// * `db` - Reference to the database
/// * `user_id` - Signed-in user; must not contain ':'
/// * `story_id` - Story to like or unlike
///
/// # Returns
///
/// * `Ok(LikeResponse)` - whether the story is now liked and the new count
/// * `Err(AppError::NotFound)` - the story does not exist
pub fn toggle_like(db: &Database, user_id: &str, story_id: &str) -> AppResult<LikeResponse> {
    let write_txn = db.begin_write()?;
    let key = pair_key(story_id, user_id)?;

    let liked = {
        let mut likes = write_txn.open_table(TABLE_STORY_LIKES)?;
        let already = likes.remove(key.as_str())?.is_some();
        if !already {
            let doc = LikeDoc {
                liked_at: Some(Utc::now()),
            };
            likes.insert(key.as_str(), serde_json::to_string(&doc)?.as_str())?;
        }
        !already
    };

    let story = modify_story(&write_txn, story_id, |story| {
        story.like_count = if liked {
            story.like_count.saturating_add(1)
        } else {
            story.like_count.saturating_sub(1)
        };
    })?;
    write_txn.commit()?;

    tracing::debug!(story_id, user_id, liked, "like toggled");
    Ok(LikeResponse {
        liked,
        like_count: story.like_count,
    })
}

/// Increments the view counter and returns the new value
pub fn record_view(db: &Database, story_id: &str) -> AppResult<u64> {
    let write_txn = db.begin_write()?;
    let story = modify_story(&write_txn, story_id, |story| {
        story.view_count = story.view_count.saturating_add(1);
    })?;
    write_txn.commit()?;
    Ok(story.view_count)
}

/// Stores the user's score and sets the story rating to the mean score
pub fn rate_story(
    db: &Database,
    user_id: &str,
    story_id: &str,
    score: u8,
) -> AppResult<RatingResponse> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(AppError::BadRequest(format!(
            "score must be between {} and {}",
            MIN_SCORE, MAX_SCORE
        )));
    }

    let write_txn = db.begin_write()?;
    let scores: Vec<RatingDoc> = {
        let mut ratings = write_txn.open_table(TABLE_STORY_RATINGS)?;
        let doc = RatingDoc { score };
        ratings.insert(
            pair_key(story_id, user_id)?.as_str(),
            serde_json::to_string(&doc)?.as_str(),
        )?;
        scan_prefix(&ratings, story_id)?
    };

    let count = scores.len() as u64;
    let total: u64 = scores.iter().map(|r| u64::from(r.score)).sum();
    let story = modify_story(&write_txn, story_id, |story| {
        story.rating = total as f64 / count as f64;
        story.rating_count = count;
    })?;
    write_txn.commit()?;

    Ok(RatingResponse {
        rating: story.rating,
        rating_count: story.rating_count,
    })
}

/// Adds a story to the user's favorites; adding it again is a no-op
///
/// # Arguments
///
/// * `db` - Reference to the database
/// * `user_id` - Owner of the favorite; must not contain ':'
/// * `story_id` - Story to remember
///
/// # Returns
///
/// * `Ok(Favorite)` - the stored favorite
/// * `Err(AppError::NotFound)` - the story does not exist
/// * `Err(AppError::BadRequest)` - an id cannot be used as a key part
pub fn add_favorite(db: &Database, user_id: &str, story_id: &str) -> AppResult<Favorite> {
    ensure_story(db, story_id)?;

    let favorite = Favorite {
        user_id: user_id.to_string(),
        story_id: story_id.to_string(),
        created_at: Some(Utc::now()),
    };

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_USER_FAVORITES)?;
        table.insert(
            pair_key(user_id, story_id)?.as_str(),
            serde_json::to_string(&favorite)?.as_str(),
        )?;
    }
    write_txn.commit()?;
    Ok(favorite)
}

/// Returns whether a favorite was removed
pub fn remove_favorite(db: &Database, user_id: &str, story_id: &str) -> AppResult<bool> {
    let write_txn = db.begin_write()?;
    let removed = {
        let mut table = write_txn.open_table(TABLE_USER_FAVORITES)?;
        let removed = table.remove(pair_key(user_id, story_id)?.as_str())?.is_some();
        removed
    };
    write_txn.commit()?;
    Ok(removed)
}

/// Favorite stories of a user; favorites of deleted stories are skipped
pub fn list_favorites(db: &Database, user_id: &str) -> AppResult<Vec<Story>> {
    let read_txn = db.begin_read()?;
    let favorites = read_txn.open_table(TABLE_USER_FAVORITES)?;
    let stories = read_txn.open_table(TABLE_STORIES)?;

    let mut result = Vec::new();
    for favorite in scan_prefix::<Favorite, _>(&favorites, user_id)? {
        if let Some(story) = get_doc::<Story, _>(&stories, &favorite.story_id)? {
            result.push(story);
        }
    }
    Ok(result)
}

/// Remembers the chapter a user opened; one entry per (user, story)
pub fn record_history(
    db: &Database,
    user_id: &str,
    story_id: &str,
    chapter_id: u32,
) -> AppResult<ReadHistory> {
    {
        let read_txn = db.begin_read()?;
        let chapters = read_txn.open_table(TABLE_CHAPTERS)?;
        if chapters.get(chapter_key(story_id, chapter_id).as_str())?.is_none() {
            return Err(AppError::not_found(
                "chapter",
                format!("{}/{}", story_id, chapter_id),
            ));
        }
    }

    let entry = ReadHistory {
        user_id: user_id.to_string(),
        story_id: story_id.to_string(),
        chapter_id,
        read_at: Some(Utc::now()),
    };

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_READ_HISTORY)?;
        table.insert(
            pair_key(user_id, story_id)?.as_str(),
            serde_json::to_string(&entry)?.as_str(),
        )?;
    }
    write_txn.commit()?;
    Ok(entry)
}

/// Read history of a user, most recent first
pub fn list_history(db: &Database, user_id: &str) -> AppResult<Vec<ReadHistory>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_READ_HISTORY)?;
    let mut entries: Vec<ReadHistory> = scan_prefix(&table, user_id)?;
    entries.sort_by(|a, b| b.read_at.cmp(&a.read_at));
    Ok(entries)
}

/// Forgets the user's history entry for a story
///
/// Returns whether an entry was removed.
pub fn delete_history(db: &Database, user_id: &str, story_id: &str) -> AppResult<bool> {
    let write_txn = db.begin_write()?;
    let removed = {
        let mut table = write_txn.open_table(TABLE_READ_HISTORY)?;
        let removed = table.remove(pair_key(user_id, story_id)?.as_str())?.is_some();
        removed
    };
    write_txn.commit()?;
    Ok(removed)
}

/// Posts a comment on a story, optionally tied to a chapter
///
/// # Returns
///
/// * `Ok(Comment)` - the stored comment with its generated id
/// * `Err(AppError::BadRequest)` - the content is blank
/// * `Err(AppError::NotFound)` - the story does not exist
pub fn add_comment(
    db: &Database,
    user_id: &str,
    user_name: &str,
    story_id: &str,
    request: CommentRequest,
) -> AppResult<Comment> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("comment cannot be empty".to_string()));
    }
    ensure_story(db, story_id)?;

    let now = Utc::now();
    let comment = Comment {
        id: random_id(12),
        story_id: story_id.to_string(),
        chapter_id: request.chapter_id,
        user_id: user_id.to_string(),
        user_name: user_name.to_string(),
        content: content.to_string(),
        created_at: Some(now),
    };

    // Zero-padded micros keep the prefix scan in posting order.
    let key = format!("{}:{:020}:{}", story_id, now.timestamp_micros(), comment.id);
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_COMMENTS)?;
        table.insert(key.as_str(), serde_json::to_string(&comment)?.as_str())?;
    }
    write_txn.commit()?;
    Ok(comment)
}

/// Comments on a story, oldest first
pub fn list_comments(db: &Database, story_id: &str) -> AppResult<Vec<Comment>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_COMMENTS)?;
    scan_prefix(&table, story_id)
}

/// Stores app feedback; anonymous callers are allowed
pub fn submit_feedback(
    db: &Database,
    user_id: Option<&str>,
    request: FeedbackRequest,
) -> AppResult<Feedback> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("feedback message is required".to_string()));
    }

    let feedback = Feedback {
        id: random_id(20),
        user_id: user_id.map(String::from),
        email: request.email.filter(|e| !e.trim().is_empty()),
        message: message.to_string(),
        created_at: Some(Utc::now()),
    };

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_APP_FEEDBACK)?;
        table.insert(
            feedback.id.as_str(),
            serde_json::to_string(&feedback)?.as_str(),
        )?;
    }
    write_txn.commit()?;

    tracing::info!(feedback_id = %feedback.id, "feedback received");
    Ok(feedback)
}
