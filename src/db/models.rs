use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

impl User {
    pub const COLUMNS: &'static str = "id, name, display_name, description, password";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            display_name: row.get(2)?,
            description: row.get(3)?,
            password_hash: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Livestream {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub start_at: i64,
    pub end_at: i64,
}

impl Livestream {
    pub const COLUMNS: &'static str = "id, user_id, title, description, start_at, end_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            start_at: row.get(4)?,
            end_at: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub id: i64,
    pub emoji_name: String,
    pub user_id: i64,
    pub livestream_id: i64,
    pub created_at: i64,
}

impl Reaction {
    pub const COLUMNS: &'static str = "id, emoji_name, user_id, livestream_id, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            emoji_name: row.get(1)?,
            user_id: row.get(2)?,
            livestream_id: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

/// Soft-delete state of a livecomment. `Hidden` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn from_deleted_flag(is_deleted: bool) -> Self {
        if is_deleted {
            Visibility::Hidden
        } else {
            Visibility::Visible
        }
    }

    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Livecomment {
    pub id: i64,
    pub user_id: i64,
    pub livestream_id: i64,
    pub comment: String,
    pub tip: i64,
    pub created_at: i64,
    pub visibility: Visibility,
}

impl Livecomment {
    pub const COLUMNS: &'static str =
        "id, user_id, livestream_id, comment, tip, created_at, is_deleted";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            livestream_id: row.get(2)?,
            comment: row.get(3)?,
            tip: row.get(4)?,
            created_at: row.get(5)?,
            visibility: Visibility::from_deleted_flag(row.get(6)?),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivecommentReport {
    pub id: i64,
    pub user_id: i64,
    pub livestream_id: i64,
    pub livecomment_id: i64,
    pub created_at: i64,
}

impl LivecommentReport {
    pub const COLUMNS: &'static str = "id, user_id, livestream_id, livecomment_id, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            livestream_id: row.get(2)?,
            livecomment_id: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

/// A banned word registered by a streamer for one livestream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannedWord {
    pub id: i64,
    pub user_id: i64,
    pub livestream_id: i64,
    pub word: String,
    pub created_at: i64,
}

impl BannedWord {
    pub const COLUMNS: &'static str = "id, user_id, livestream_id, word, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            livestream_id: row.get(2)?,
            word: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl Tag {
    pub const COLUMNS: &'static str = "id, name";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}
