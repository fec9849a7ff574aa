//! Data models for the catalog
//!
//! Documents are stored as camelCase JSON. Every stored document type uses
//! `#[serde(default)]` so a record with missing fields decodes to empty/zero
//! values instead of failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A catalog entry (comic/manga series)
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Story {
    /// Identifier assigned by the store when the story is created
    pub id: String,
    pub title: String,
    pub author: String,

    /// Free text, usually "ongoing", "completed" or "dropped"
    pub status: String,

    /// Mean of all user ratings
    pub rating: f64,
    pub rating_count: u64,
    pub cover_url: String,
    pub like_count: u64,
    pub view_count: u64,

    /// Denormalized genre names
    pub genres: Vec<String>,
    pub genre_ids: Vec<u64>,
    pub description: String,

    /// Highest chapter number ever assigned to this story
    pub last_chapter_number: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A story together with its ordered chapters
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StoryDetail {
    #[serde(flatten)]
    pub story: Story,
    pub chapters: Vec<Chapter>,
}

/// One chapter of a story; `id` always equals `number`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Chapter {
    pub id: u32,
    pub number: u32,
    pub title: String,
    pub upload_date: String,

    /// Page image URLs in reading order
    pub pages: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// Named collections whose membership drives the home-screen sections
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DisplayList {
    Banners,
    NewUpdates,
    MostViewed,
    CompletedStories,
    Favorites,
    TrendingList,
    NewReleases,
}

impl DisplayList {
    pub const ALL: [DisplayList; 7] = [
        DisplayList::Banners,
        DisplayList::NewUpdates,
        DisplayList::MostViewed,
        DisplayList::CompletedStories,
        DisplayList::Favorites,
        DisplayList::TrendingList,
        DisplayList::NewReleases,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayList::Banners => "banners",
            DisplayList::NewUpdates => "new_updates",
            DisplayList::MostViewed => "most_viewed",
            DisplayList::CompletedStories => "completed_stories",
            DisplayList::Favorites => "favorites",
            DisplayList::TrendingList => "trending_list",
            DisplayList::NewReleases => "new_releases",
        }
    }
}

impl fmt::Display for DisplayList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DisplayList::ALL
            .into_iter()
            .find(|list| list.as_str() == s)
            .ok_or_else(|| format!("unknown display list '{}'", s))
    }
}

/// Document stored in a display-list collection under the story id
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Membership {
    pub story_id: String,
    pub added_at: Option<DateTime<Utc>>,
}

/// The four sections shown on the home screen
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HomeFeed {
    pub banners: Vec<Story>,
    pub new_updates: Vec<Story>,
    pub most_viewed: Vec<Story>,
    pub completed_stories: Vec<Story>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub avatar_url: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Favorite {
    pub user_id: String,
    pub story_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Last chapter a user opened in a story
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadHistory {
    pub user_id: String,
    pub story_id: String,
    pub chapter_id: u32,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub story_id: String,
    pub chapter_id: Option<u32>,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub message: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DownloadStatus {
    #[default]
    Pending,
    Downloading,
    Completed,
    Error,
}

/// Locally persisted download record
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DownloadItem {
    pub story_id: String,
    pub chapter: u32,

    /// 0 to 100
    pub progress: u8,
    pub status: DownloadStatus,

    /// Identifies the progress loop that owns this record; a new value is
    /// assigned on every (re)enqueue
    pub run_id: String,
}

/// Request payload for creating a story
///
/// # Example
/// ```json
/// {
///   "title": "Solo Climber",
///   "author": "K. Min",
///   "coverUrl": "https://cdn.example.com/solo.jpg",
///   "genreIds": [1, 4],
///   "displayLists": ["banners", "new_releases"]
/// }
/// ```
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateStoryRequest {
    pub title: String,
    pub author: String,
    pub cover_url: String,
    pub status: Option<String>,
    pub description: String,
    pub genre_ids: Vec<u64>,
    pub display_lists: Vec<DisplayList>,
}

/// Partial update; absent fields are left untouched
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateStoryRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub genre_ids: Option<Vec<u64>>,

    /// Desired membership set; `None` leaves membership alone
    pub display_lists: Option<Vec<DisplayList>>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct NewChapterRequest {
    pub title: String,
    pub pages: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreateGenreRequest {
    pub name: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RatingRequest {
    pub score: u8,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub rating: f64,
    pub rating_count: u64,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileRequest {
    pub display_name: String,
    pub avatar_url: String,
    pub email: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    pub chapter_id: u32,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CommentRequest {
    pub content: String,
    pub chapter_id: Option<u32>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub message: String,
    pub email: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub story_id: String,
    pub chapter: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DarkModeSetting {
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_with_missing_fields_defaults_to_zero_values() {
        let story: Story = serde_json::from_str(r#"{"id":"abc","title":"Only title"}"#).unwrap();
        assert_eq!(story.id, "abc");
        assert_eq!(story.title, "Only title");
        assert!(story.author.is_empty());
        assert_eq!(story.like_count, 0);
        assert_eq!(story.last_chapter_number, 0);
        assert!(story.genres.is_empty());
    }

    #[test]
    fn display_list_names_match_collections() {
        for list in DisplayList::ALL {
            assert_eq!(list.as_str().parse::<DisplayList>(), Ok(list));
            let json = serde_json::to_string(&list).unwrap();
            assert_eq!(json, format!("\"{}\"", list.as_str()));
        }
        assert!("top_rated".parse::<DisplayList>().is_err());
    }

    #[test]
    fn download_status_uses_upper_case_names() {
        let json = serde_json::to_string(&DownloadStatus::Downloading).unwrap();
        assert_eq!(json, "\"DOWNLOADING\"");
    }
}
