//! Per-request session snapshots and user profiles
//!
//! A snapshot is derived from the store for every request instead of being
//! cached, so granting or revoking admin rights takes effect immediately.

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde_json::json;

use crate::database::{get_doc, key_part, TABLE_ADMINS, TABLE_USERS};
use crate::error::{AppError, AppResult};
use crate::model::{ProfileRequest, UserProfile};

/// Header carrying the signed-in user id
pub const USER_HEADER: &str = "x-user-id";

/// Who is making the current request
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: Option<String>,
    pub display_name: String,
    pub avatar_url: String,
    pub email: String,
    pub is_admin: bool,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The signed-in user id, or `Unauthorized`
    pub fn require_user(&self) -> AppResult<&str> {
        self.user_id
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("sign in required".to_string()))
    }

    /// The signed-in admin id, or `Unauthorized`/`Forbidden`
    pub fn require_admin(&self) -> AppResult<&str> {
        let user_id = self.require_user()?;
        if !self.is_admin {
            return Err(AppError::Forbidden("admin rights required".to_string()));
        }
        Ok(user_id)
    }

    /// Name shown next to comments
    pub fn author_name(&self) -> &str {
        match (self.display_name.as_str(), self.user_id.as_deref()) {
            ("", Some(id)) => id,
            ("", None) => "anonymous",
            (name, _) => name,
        }
    }
}

/// Builds the snapshot for `user_id` from the users and admins collections
///
/// # Arguments
///
/// * `db` - Reference to the database
/// * `user_id` - Raw `X-User-Id` header value, if any
///
/// # Returns
///
/// * `Ok(Session)` - anonymous when the header is absent or blank
/// * `Err(AppError::BadRequest)` - the id contains ':' and cannot be used as a
///   key part
pub fn resolve(db: &Database, user_id: Option<&str>) -> AppResult<Session> {
    let Some(user_id) = user_id.map(str::trim).filter(|id| !id.is_empty()) else {
        return Ok(Session::anonymous());
    };
    let user_id = key_part(user_id)?;

    let read_txn = db.begin_read()?;
    let users = read_txn.open_table(TABLE_USERS)?;
    let admins = read_txn.open_table(TABLE_ADMINS)?;

    let profile: UserProfile = get_doc(&users, user_id)?.unwrap_or_default();
    let is_admin = admins.get(user_id)?.is_some();

    Ok(Session {
        user_id: Some(user_id.to_string()),
        display_name: profile.display_name,
        avatar_url: profile.avatar_url,
        email: profile.email,
        is_admin,
    })
}

/// Creates or replaces the profile of `user_id`
pub fn upsert_profile(
    db: &Database,
    user_id: &str,
    request: ProfileRequest,
) -> AppResult<UserProfile> {
    let profile = UserProfile {
        id: user_id.to_string(),
        display_name: request.display_name.trim().to_string(),
        avatar_url: request.avatar_url.trim().to_string(),
        email: request.email.trim().to_string(),
    };

    let write_txn = db.begin_write()?;
    {
        let mut users = write_txn.open_table(TABLE_USERS)?;
        users.insert(user_id, serde_json::to_string(&profile)?.as_str())?;
    }
    write_txn.commit()?;
    Ok(profile)
}

/// Records `user_id` in the admins collection
pub fn grant_admin(db: &Database, user_id: &str) -> AppResult<()> {
    let write_txn = db.begin_write()?;
    {
        let mut admins = write_txn.open_table(TABLE_ADMINS)?;
        let doc = json!({ "grantedAt": Utc::now() });
        admins.insert(user_id, doc.to_string().as_str())?;
    }
    write_txn.commit()?;

    tracing::info!(user_id, "admin granted");
    Ok(())
}
