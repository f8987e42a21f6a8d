//! Catalog queries and mutations. Everything here takes a plain
//! connection so the logic is testable without the HTTP layer.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::models::{Comment, Video};
use crate::db::now_utc;
use crate::error::{AppError, AppResult};

const VIDEO_COLUMNS: &str = "id, title, description, publisher, producer, genre, age, \
     kind, youtube_id, file_url, views, likes, created_at, uploader_id";

/// Query-string filters for GET /api/videos.
#[derive(Debug, Default, Deserialize)]
pub struct VideoQuery {
    pub q: Option<String>,
    pub genre: Option<String>,
    pub sort: Option<String>,
}

/// Body for POST /api/videos/youtube. Everything but the URL is optional.
#[derive(Debug, Deserialize)]
pub struct NewYoutubeVideo {
    pub youtube_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub producer: Option<String>,
    pub genre: Option<String>,
    pub age: Option<String>,
}

/// A fully materialized video: stored fields plus the computed average
/// rating (one decimal, null when unrated) and its comments, oldest first.
#[derive(Debug, Serialize)]
pub struct VideoDetail {
    #[serde(flatten)]
    pub video: Video,
    pub rating: Option<f64>,
    pub comments: Vec<Comment>,
}

/// Pull a video id out of common YouTube URL shapes, or accept a bare
/// 11-12 character id verbatim.
pub fn parse_youtube_id(url: &str) -> Option<String> {
    let u = url.trim();
    for marker in ["v=", "youtu.be/", "/embed/"] {
        if let Some(pos) = u.find(marker) {
            let rest = &u[pos + marker.len()..];
            let end = rest.find(['&', '?', '/']).unwrap_or(rest.len());
            let id: String = rest[..end].chars().take(32).collect();
            return if id.is_empty() { None } else { Some(id) };
        }
    }
    if u.len() == 11 || u.len() == 12 {
        return Some(u.to_string());
    }
    None
}

pub fn list_videos(conn: &Connection, query: &VideoQuery) -> AppResult<Vec<VideoDetail>> {
    let mut sql = format!("SELECT {} FROM videos", VIDEO_COLUMNS);
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<String> = Vec::new();

    if let Some(q) = non_blank(query.q.as_deref()) {
        clauses.push("(lower(title) LIKE ? OR lower(genre) LIKE ? OR lower(publisher) LIKE ?)");
        let pattern = format!("%{}%", q.to_lowercase());
        args.extend([pattern.clone(), pattern.clone(), pattern]);
    }
    if let Some(genre) = non_blank(query.genre.as_deref()) {
        clauses.push("lower(genre) = ?");
        args.push(genre.to_lowercase());
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    sql.push_str(" ORDER BY ");
    sql.push_str(match query.sort.as_deref() {
        Some("likes") => "likes DESC, created_at DESC",
        Some("views") => "views DESC, created_at DESC",
        _ => "created_at DESC",
    });

    let mut stmt = conn.prepare(&sql)?;
    let videos = stmt
        .query_map(params_from_iter(args.iter()), Video::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    videos.into_iter().map(|v| materialize(conn, v)).collect()
}

pub fn video_detail(conn: &Connection, video_id: i64) -> AppResult<VideoDetail> {
    let video = conn
        .query_row(
            &format!("SELECT {} FROM videos WHERE id = ?1", VIDEO_COLUMNS),
            params![video_id],
            Video::from_row,
        )
        .optional()?
        .ok_or(AppError::NotFound)?;
    materialize(conn, video)
}

pub fn add_youtube_video(
    conn: &Connection,
    req: &NewYoutubeVideo,
    uploader_id: i64,
) -> AppResult<VideoDetail> {
    let url = req.youtube_url.as_deref().unwrap_or("");
    let youtube_id = parse_youtube_id(url)
        .ok_or_else(|| AppError::InvalidInput("Invalid YouTube URL".into()))?;

    let title = non_blank(req.title.as_deref()).unwrap_or("Untitled");
    let age = non_blank(req.age.as_deref()).unwrap_or("PG");

    conn.execute(
        "INSERT INTO videos (title, description, publisher, producer, genre, age, \
         kind, youtube_id, created_at, uploader_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'youtube', ?7, ?8, ?9)",
        params![
            title,
            req.description,
            req.publisher,
            req.producer,
            req.genre,
            age,
            youtube_id,
            now_utc(),
            uploader_id,
        ],
    )?;

    video_detail(conn, conn.last_insert_rowid())
}

/// Atomic increment; returns the new like count.
pub fn like_video(conn: &Connection, video_id: i64) -> AppResult<i64> {
    let changed = conn.execute(
        "UPDATE videos SET likes = likes + 1 WHERE id = ?1",
        params![video_id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound);
    }
    Ok(conn.query_row(
        "SELECT likes FROM videos WHERE id = ?1",
        params![video_id],
        |row| row.get(0),
    )?)
}

pub fn add_comment(
    conn: &Connection,
    video_id: i64,
    author: Option<&str>,
    text: &str,
) -> AppResult<VideoDetail> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidInput("text required".into()));
    }
    let author = non_blank(author).unwrap_or("guest");

    ensure_video(conn, video_id)?;
    conn.execute(
        "INSERT INTO comments (video_id, user, text, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![video_id, author, text, now_utc()],
    )?;

    video_detail(conn, video_id)
}

/// One rating per (video, author): the UNIQUE index plus ON CONFLICT makes
/// the upsert a single atomic statement.
pub fn rate_video(
    conn: &Connection,
    video_id: i64,
    author: Option<&str>,
    value: i64,
) -> AppResult<VideoDetail> {
    if !(1..=5).contains(&value) {
        return Err(AppError::InvalidInput("value 1..5 required".into()));
    }
    let author = non_blank(author).unwrap_or("guest");

    ensure_video(conn, video_id)?;
    conn.execute(
        "INSERT INTO ratings (video_id, user, value, created_at) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(video_id, user) DO UPDATE SET value = excluded.value",
        params![video_id, author, value, now_utc()],
    )?;

    video_detail(conn, video_id)
}

fn materialize(conn: &Connection, video: Video) -> AppResult<VideoDetail> {
    let rating = average_rating(conn, video.id)?;
    let comments = comments_for(conn, video.id)?;
    Ok(VideoDetail {
        video,
        rating,
        comments,
    })
}

fn average_rating(conn: &Connection, video_id: i64) -> AppResult<Option<f64>> {
    let avg: Option<f64> = conn.query_row(
        "SELECT AVG(value) FROM ratings WHERE video_id = ?1",
        params![video_id],
        |row| row.get(0),
    )?;
    Ok(avg.map(|a| (a * 10.0).round() / 10.0))
}

fn comments_for(conn: &Connection, video_id: i64) -> AppResult<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT id, video_id, user, text, created_at FROM comments \
         WHERE video_id = ?1 ORDER BY created_at ASC, id ASC",
    )?;
    let comments = stmt
        .query_map(params![video_id], Comment::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

fn ensure_video(conn: &Connection, video_id: i64) -> AppResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM videos WHERE id = ?1)",
        params![video_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(AppError::NotFound);
    }
    Ok(())
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("../migrations/001_initial.sql"))
            .unwrap();
        conn
    }

    fn insert_video(conn: &Connection, title: &str, genre: &str, likes: i64, views: i64, created_at: &str) -> i64 {
        conn.execute(
            "INSERT INTO videos (title, publisher, genre, age, kind, youtube_id, views, likes, created_at) \
             VALUES (?1, 'SportsTV', ?2, 'PG', 'youtube', 'YEyWIyPfQWA', ?3, ?4, ?5)",
            params![title, genre, views, likes, created_at],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    // -- Identifier extraction --

    #[test]
    fn extracts_id_from_watch_url() {
        assert_eq!(
            parse_youtube_id("https://www.youtube.com/watch?v=YEyWIyPfQWA").as_deref(),
            Some("YEyWIyPfQWA")
        );
    }

    #[test]
    fn extracts_id_from_short_url() {
        assert_eq!(
            parse_youtube_id("https://youtu.be/YEyWIyPfQWA").as_deref(),
            Some("YEyWIyPfQWA")
        );
    }

    #[test]
    fn extracts_id_from_embed_url_with_query() {
        assert_eq!(
            parse_youtube_id("https://www.youtube.com/embed/YEyWIyPfQWA?x=1").as_deref(),
            Some("YEyWIyPfQWA")
        );
    }

    #[test]
    fn watch_url_with_extra_params_stops_at_ampersand() {
        assert_eq!(
            parse_youtube_id("https://www.youtube.com/watch?v=YEyWIyPfQWA&t=42").as_deref(),
            Some("YEyWIyPfQWA")
        );
    }

    #[test]
    fn bare_eleven_char_id_passes_through() {
        assert_eq!(parse_youtube_id("YEyWIyPfQWA").as_deref(), Some("YEyWIyPfQWA"));
        assert_eq!(parse_youtube_id("YEyWIyPfQWAx").as_deref(), Some("YEyWIyPfQWAx"));
    }

    #[test]
    fn rejects_short_strings_and_unknown_shapes() {
        assert_eq!(parse_youtube_id("abcde"), None);
        assert_eq!(parse_youtube_id("https://example.com/video/123456"), None);
        assert_eq!(parse_youtube_id(""), None);
    }

    #[test]
    fn markers_are_checked_in_priority_order() {
        // v= wins even when youtu.be/ also appears.
        assert_eq!(
            parse_youtube_id("https://youtu.be/IGNORED?v=YEyWIyPfQWA").as_deref(),
            Some("YEyWIyPfQWA")
        );
    }

    #[test]
    fn extracted_id_is_capped_at_32_chars() {
        let long = format!("v={}", "a".repeat(50));
        assert_eq!(parse_youtube_id(&long).unwrap().len(), 32);
    }

    // -- Listing, filtering, sorting --

    #[test]
    fn list_default_sort_is_latest_first() {
        let conn = test_conn();
        let older = insert_video(&conn, "Old", "Sports", 0, 0, "2024-01-01T00:00:00.000000Z");
        let newer = insert_video(&conn, "New", "Sports", 0, 0, "2024-02-01T00:00:00.000000Z");

        let listed = list_videos(&conn, &VideoQuery::default()).unwrap();
        assert_eq!(
            listed.iter().map(|v| v.video.id).collect::<Vec<_>>(),
            vec![newer, older]
        );
    }

    #[test]
    fn likes_sort_breaks_ties_by_created_at_desc() {
        let conn = test_conn();
        let older = insert_video(&conn, "A", "Sports", 10, 0, "2024-01-01T00:00:00.000000Z");
        let newer = insert_video(&conn, "B", "Sports", 10, 0, "2024-02-01T00:00:00.000000Z");
        let top = insert_video(&conn, "C", "Sports", 99, 0, "2023-01-01T00:00:00.000000Z");

        let query = VideoQuery {
            sort: Some("likes".into()),
            ..Default::default()
        };
        let listed = list_videos(&conn, &query).unwrap();
        assert_eq!(
            listed.iter().map(|v| v.video.id).collect::<Vec<_>>(),
            vec![top, newer, older]
        );
    }

    #[test]
    fn views_sort_is_descending() {
        let conn = test_conn();
        let low = insert_video(&conn, "A", "Sports", 0, 5, "2024-01-01T00:00:00.000000Z");
        let high = insert_video(&conn, "B", "Sports", 0, 500, "2024-01-02T00:00:00.000000Z");

        let query = VideoQuery {
            sort: Some("views".into()),
            ..Default::default()
        };
        let listed = list_videos(&conn, &query).unwrap();
        assert_eq!(
            listed.iter().map(|v| v.video.id).collect::<Vec<_>>(),
            vec![high, low]
        );
    }

    #[test]
    fn search_matches_genre_case_insensitively() {
        let conn = test_conn();
        let cricket = insert_video(&conn, "Cricket", "Sports", 0, 0, "2024-01-01T00:00:00.000000Z");
        insert_video(&conn, "Cooking", "Food", 0, 0, "2024-01-02T00:00:00.000000Z");

        let query = VideoQuery {
            q: Some("sport".into()),
            ..Default::default()
        };
        let listed = list_videos(&conn, &query).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].video.id, cricket);
    }

    #[test]
    fn search_matches_title_and_publisher() {
        let conn = test_conn();
        insert_video(&conn, "Cricket Highlights", "Sports", 0, 0, "2024-01-01T00:00:00.000000Z");

        for q in ["CRICKET", "sportstv"] {
            let query = VideoQuery {
                q: Some(q.into()),
                ..Default::default()
            };
            assert_eq!(list_videos(&conn, &query).unwrap().len(), 1, "q={}", q);
        }
    }

    #[test]
    fn genre_filter_is_exact_and_composes_with_search() {
        let conn = test_conn();
        let cricket = insert_video(&conn, "Cricket", "Sports", 0, 0, "2024-01-01T00:00:00.000000Z");
        insert_video(&conn, "Sporty Cooking", "Food", 0, 0, "2024-01-02T00:00:00.000000Z");

        let query = VideoQuery {
            q: Some("c".into()),
            genre: Some("SPORTS".into()),
            ..Default::default()
        };
        let listed = list_videos(&conn, &query).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].video.id, cricket);

        let query = VideoQuery {
            genre: Some("sport".into()),
            ..Default::default()
        };
        assert!(list_videos(&conn, &query).unwrap().is_empty());
    }

    // -- Ratings --

    #[test]
    fn average_of_three_ratings_rounds_to_one_decimal() {
        let conn = test_conn();
        let id = insert_video(&conn, "V", "Sports", 0, 0, "2024-01-01T00:00:00.000000Z");

        rate_video(&conn, id, Some("a"), 3).unwrap();
        rate_video(&conn, id, Some("b"), 4).unwrap();
        let detail = rate_video(&conn, id, Some("c"), 5).unwrap();
        assert_eq!(detail.rating, Some(4.0));

        let half = insert_video(&conn, "W", "Sports", 0, 0, "2024-01-01T00:00:00.000000Z");
        rate_video(&conn, half, Some("a"), 3).unwrap();
        let detail = rate_video(&conn, half, Some("b"), 4).unwrap();
        assert_eq!(detail.rating, Some(3.5));
    }

    #[test]
    fn unrated_video_has_null_rating() {
        let conn = test_conn();
        let id = insert_video(&conn, "V", "Sports", 0, 0, "2024-01-01T00:00:00.000000Z");
        assert_eq!(video_detail(&conn, id).unwrap().rating, None);
    }

    #[test]
    fn rating_upsert_keeps_one_row_with_latest_value() {
        let conn = test_conn();
        let id = insert_video(&conn, "V", "Sports", 0, 0, "2024-01-01T00:00:00.000000Z");

        rate_video(&conn, id, Some("bob"), 2).unwrap();
        let detail = rate_video(&conn, id, Some("bob"), 5).unwrap();
        assert_eq!(detail.rating, Some(5.0));

        let (count, value): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), value FROM ratings WHERE video_id = ?1 AND user = 'bob'",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(value, 5);
    }

    #[test]
    fn rating_value_must_be_in_range() {
        let conn = test_conn();
        let id = insert_video(&conn, "V", "Sports", 0, 0, "2024-01-01T00:00:00.000000Z");
        for bad in [0, 6, -1] {
            assert!(matches!(
                rate_video(&conn, id, Some("a"), bad),
                Err(AppError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn rating_unknown_video_is_not_found() {
        let conn = test_conn();
        assert!(matches!(
            rate_video(&conn, 999, Some("a"), 3),
            Err(AppError::NotFound)
        ));
    }

    // -- Likes --

    #[test]
    fn likes_increment_by_exactly_one_per_call() {
        let conn = test_conn();
        let id = insert_video(&conn, "V", "Sports", 80, 0, "2024-01-01T00:00:00.000000Z");
        assert_eq!(like_video(&conn, id).unwrap(), 81);
        assert_eq!(like_video(&conn, id).unwrap(), 82);
        assert_eq!(like_video(&conn, id).unwrap(), 83);
    }

    #[test]
    fn like_unknown_video_is_not_found() {
        let conn = test_conn();
        assert!(matches!(like_video(&conn, 999), Err(AppError::NotFound)));
    }

    // -- Comments --

    #[test]
    fn comments_default_author_and_order_oldest_first() {
        let conn = test_conn();
        let id = insert_video(&conn, "V", "Sports", 0, 0, "2024-01-01T00:00:00.000000Z");

        add_comment(&conn, id, None, "first").unwrap();
        let detail = add_comment(&conn, id, Some("alice"), "second").unwrap();

        let authors: Vec<&str> = detail.comments.iter().map(|c| c.user.as_str()).collect();
        let texts: Vec<&str> = detail.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(authors, vec!["guest", "alice"]);
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn blank_comment_text_is_invalid() {
        let conn = test_conn();
        let id = insert_video(&conn, "V", "Sports", 0, 0, "2024-01-01T00:00:00.000000Z");
        assert!(matches!(
            add_comment(&conn, id, None, "   "),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn comment_on_unknown_video_is_not_found() {
        let conn = test_conn();
        assert!(matches!(
            add_comment(&conn, 999, None, "hi"),
            Err(AppError::NotFound)
        ));
    }

    // -- Adding videos --

    #[test]
    fn add_youtube_video_applies_defaults() {
        let conn = test_conn();
        conn.execute(
            "INSERT INTO users (username, pw_hash, role, created_at) \
             VALUES ('carol', 'h', 'creator', ?1)",
            params![now_utc()],
        )
        .unwrap();

        let req = NewYoutubeVideo {
            youtube_url: Some("https://youtu.be/YEyWIyPfQWA".into()),
            title: None,
            description: None,
            publisher: None,
            producer: None,
            genre: None,
            age: None,
        };
        let detail = add_youtube_video(&conn, &req, 1).unwrap();
        assert_eq!(detail.video.title, "Untitled");
        assert_eq!(detail.video.age.as_deref(), Some("PG"));
        assert_eq!(detail.video.kind, "youtube");
        assert_eq!(detail.video.youtube_id.as_deref(), Some("YEyWIyPfQWA"));
        assert_eq!(detail.video.uploader_id, Some(1));
        assert_eq!(detail.rating, None);
        assert!(detail.comments.is_empty());
    }

    #[test]
    fn add_youtube_video_rejects_bad_url() {
        let conn = test_conn();
        let req = NewYoutubeVideo {
            youtube_url: Some("not a url".into()),
            title: None,
            description: None,
            publisher: None,
            producer: None,
            genre: None,
            age: None,
        };
        assert!(matches!(
            add_youtube_video(&conn, &req, 1),
            Err(AppError::InvalidInput(_))
        ));
    }
}
