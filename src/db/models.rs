use rusqlite::Row;
use serde::Serialize;

/// The two flat roles a user can hold. Fixed at signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Consumer,
    Creator,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Consumer => "consumer",
            Role::Creator => "creator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "consumer" => Some(Role::Consumer),
            "creator" => Some(Role::Creator),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub pw_hash: String,
    pub role: Role,
    pub created_at: String,
}

impl User {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let role: String = row.get(3)?;
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            pw_hash: row.get(2)?,
            role: Role::parse(&role).unwrap_or(Role::Consumer),
            created_at: row.get(4)?,
        })
    }
}

/// A catalog entry. `kind` decides which of youtube_id / file_url is
/// meaningful. `uploader_id` is absent for seeded rows.
#[derive(Debug, Clone, Serialize)]
pub struct Video {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub producer: Option<String>,
    pub genre: Option<String>,
    pub age: Option<String>,
    pub kind: String,
    pub youtube_id: Option<String>,
    pub file_url: Option<String>,
    pub views: i64,
    pub likes: i64,
    pub created_at: String,
    #[serde(skip_serializing)]
    pub uploader_id: Option<i64>,
}

impl Video {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Video {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            publisher: row.get(3)?,
            producer: row.get(4)?,
            genre: row.get(5)?,
            age: row.get(6)?,
            kind: row.get(7)?,
            youtube_id: row.get(8)?,
            file_url: row.get(9)?,
            views: row.get(10)?,
            likes: row.get(11)?,
            created_at: row.get(12)?,
            uploader_id: row.get(13)?,
        })
    }
}

/// Comment author is a free-text display name, not a User reference.
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    #[serde(skip_serializing)]
    pub video_id: i64,
    pub user: String,
    pub text: String,
    pub created_at: String,
}

impl Comment {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Comment {
            id: row.get(0)?,
            video_id: row.get(1)?,
            user: row.get(2)?,
            text: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}
