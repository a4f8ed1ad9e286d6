//! Narrow data-access layer over SQLite.
//!
//! Every function takes a borrowed connection (a `Transaction` derefs to one)
//! so callers decide the transaction boundary. Bulk functions take the full
//! id set and bind it in chunks of at most [`MAX_BOUND_IDS`], staying under
//! SQLite's host parameter limit. Score aggregates group over the whole table.
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;

use crate::db::models::{
    BannedWord, Livecomment, LivecommentReport, Livestream, Reaction, Tag, User,
};
use crate::error::AppResult;

/// Ids bound per `IN (...)` statement. SQLite caps host parameters at 32766.
pub const MAX_BOUND_IDS: usize = 500;

/// `?, ?, ?` for an `IN (...)` clause of `n` values.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Runs `sql` (with `{}` standing for the placeholder list) once per chunk of
/// ids and collects the rows.
fn select_in<T, F>(conn: &Connection, sql: &str, ids: &[i64], mut map: F) -> AppResult<Vec<T>>
where
    F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
    let mut out = Vec::new();
    for chunk in ids.chunks(MAX_BOUND_IDS) {
        let sql = sql.replace("{}", &placeholders(chunk.len()));
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), &mut map)?;
        for row in rows {
            out.push(row?);
        }
    }
    Ok(out)
}

/// SQLite treats a negative LIMIT as "no limit".
fn limit_value(limit: Option<u32>) -> i64 {
    limit.map(i64::from).unwrap_or(-1)
}

fn grouped_i64(conn: &Connection, sql: &str) -> AppResult<HashMap<i64, i64>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
    Ok(rows.collect::<Result<HashMap<_, _>, _>>()?)
}

// --- Users ---

pub fn user_by_id(conn: &Connection, id: i64) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS);
    Ok(conn.query_row(&sql, params![id], User::from_row).optional()?)
}

pub fn user_by_name(conn: &Connection, name: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE name = ?1", User::COLUMNS);
    Ok(conn.query_row(&sql, params![name], User::from_row).optional()?)
}

pub fn users_by_ids(conn: &Connection, ids: &[i64]) -> AppResult<HashMap<i64, User>> {
    let sql = format!("SELECT {} FROM users WHERE id IN ({{}})", User::COLUMNS);
    let users = select_in(conn, &sql, ids, User::from_row)?;
    Ok(users.into_iter().map(|user| (user.id, user)).collect())
}

/// `(id, name)` of every user; the ranking population.
pub fn all_user_names(conn: &Connection) -> AppResult<Vec<(i64, String)>> {
    let mut stmt = conn.prepare("SELECT id, name FROM users")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn insert_user(
    conn: &Connection,
    name: &str,
    display_name: &str,
    description: &str,
    password_hash: &str,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO users (name, display_name, description, password) VALUES (?1, ?2, ?3, ?4)",
        params![name, display_name, description, password_hash],
    )?;
    Ok(conn.last_insert_rowid())
}

// --- Themes & icons ---

pub fn upsert_theme(conn: &Connection, user_id: i64, dark_mode: bool) -> AppResult<()> {
    conn.execute(
        "INSERT INTO themes (user_id, dark_mode) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET dark_mode = excluded.dark_mode",
        params![user_id, dark_mode],
    )?;
    Ok(())
}

pub fn themes_for(conn: &Connection, user_ids: &[i64]) -> AppResult<HashMap<i64, bool>> {
    let rows = select_in(
        conn,
        "SELECT user_id, dark_mode FROM themes WHERE user_id IN ({})",
        user_ids,
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, bool>(1)?)),
    )?;
    Ok(rows.into_iter().collect())
}

pub fn icon_image(conn: &Connection, user_id: i64) -> AppResult<Option<Vec<u8>>> {
    Ok(conn
        .query_row(
            "SELECT image FROM icons WHERE user_id = ?1 ORDER BY id DESC LIMIT 1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn icons_for(conn: &Connection, user_ids: &[i64]) -> AppResult<HashMap<i64, Vec<u8>>> {
    let rows = select_in(
        conn,
        "SELECT user_id, image FROM icons WHERE user_id IN ({}) ORDER BY id ASC",
        user_ids,
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)),
    )?;
    // A user's rows all land in one chunk in ascending id order, so the
    // newest icon wins the insert
    Ok(rows.into_iter().collect())
}

/// Replaces the user's icon and returns the new icon id.
pub fn replace_icon(conn: &Connection, user_id: i64, image: &[u8]) -> AppResult<i64> {
    conn.execute("DELETE FROM icons WHERE user_id = ?1", params![user_id])?;
    conn.execute(
        "INSERT INTO icons (user_id, image) VALUES (?1, ?2)",
        params![user_id, image],
    )?;
    Ok(conn.last_insert_rowid())
}

// --- Livestreams ---

pub fn livestream_by_id(conn: &Connection, id: i64) -> AppResult<Option<Livestream>> {
    let sql = format!("SELECT {} FROM livestreams WHERE id = ?1", Livestream::COLUMNS);
    Ok(conn
        .query_row(&sql, params![id], Livestream::from_row)
        .optional()?)
}

pub fn livestreams_by_ids(conn: &Connection, ids: &[i64]) -> AppResult<HashMap<i64, Livestream>> {
    let sql = format!("SELECT {} FROM livestreams WHERE id IN ({{}})", Livestream::COLUMNS);
    let livestreams = select_in(conn, &sql, ids, Livestream::from_row)?;
    Ok(livestreams
        .into_iter()
        .map(|livestream| (livestream.id, livestream))
        .collect())
}

pub fn livestreams_owned_by(conn: &Connection, user_id: i64) -> AppResult<Vec<Livestream>> {
    let sql = format!(
        "SELECT {} FROM livestreams WHERE user_id = ?1 ORDER BY id",
        Livestream::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], Livestream::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Every livestream id; the ranking population.
pub fn all_livestream_ids(conn: &Connection) -> AppResult<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM livestreams")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn insert_livestream(
    conn: &Connection,
    user_id: i64,
    title: &str,
    description: &str,
    start_at: i64,
    end_at: i64,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO livestreams (user_id, title, description, start_at, end_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, title, description, start_at, end_at],
    )?;
    Ok(conn.last_insert_rowid())
}

// --- Viewers ---

pub fn insert_viewer(
    conn: &Connection,
    user_id: i64,
    livestream_id: i64,
    created_at: i64,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO livestream_viewers_history (user_id, livestream_id, created_at)
         VALUES (?1, ?2, ?3)",
        params![user_id, livestream_id, created_at],
    )?;
    Ok(())
}

pub fn delete_viewer(conn: &Connection, user_id: i64, livestream_id: i64) -> AppResult<()> {
    conn.execute(
        "DELETE FROM livestream_viewers_history WHERE user_id = ?1 AND livestream_id = ?2",
        params![user_id, livestream_id],
    )?;
    Ok(())
}

// --- Reactions ---

pub fn insert_reaction(
    conn: &Connection,
    user_id: i64,
    livestream_id: i64,
    emoji_name: &str,
    created_at: i64,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO reactions (user_id, livestream_id, emoji_name, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, livestream_id, emoji_name, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn reaction_by_id(conn: &Connection, id: i64) -> AppResult<Option<Reaction>> {
    let sql = format!("SELECT {} FROM reactions WHERE id = ?1", Reaction::COLUMNS);
    Ok(conn
        .query_row(&sql, params![id], Reaction::from_row)
        .optional()?)
}

/// Newest first; ties on `created_at` fall back to insertion order.
pub fn reactions_for(
    conn: &Connection,
    livestream_id: i64,
    limit: Option<u32>,
) -> AppResult<Vec<Reaction>> {
    let sql = format!(
        "SELECT {} FROM reactions WHERE livestream_id = ?1
         ORDER BY created_at DESC, id DESC LIMIT ?2",
        Reaction::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![livestream_id, limit_value(limit)], Reaction::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

// --- Livecomments ---

pub fn insert_livecomment(
    conn: &Connection,
    user_id: i64,
    livestream_id: i64,
    comment: &str,
    tip: i64,
    created_at: i64,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO livecomments (user_id, livestream_id, comment, tip, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, livestream_id, comment, tip, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn livecomment_by_id(conn: &Connection, id: i64) -> AppResult<Option<Livecomment>> {
    let sql = format!("SELECT {} FROM livecomments WHERE id = ?1", Livecomment::COLUMNS);
    Ok(conn
        .query_row(&sql, params![id], Livecomment::from_row)
        .optional()?)
}

pub fn livecomments_by_ids(
    conn: &Connection,
    ids: &[i64],
) -> AppResult<HashMap<i64, Livecomment>> {
    let sql = format!("SELECT {} FROM livecomments WHERE id IN ({{}})", Livecomment::COLUMNS);
    let comments = select_in(conn, &sql, ids, Livecomment::from_row)?;
    Ok(comments.into_iter().map(|comment| (comment.id, comment)).collect())
}

/// Visible comments of a livestream, newest first.
pub fn visible_livecomments(
    conn: &Connection,
    livestream_id: i64,
    limit: Option<u32>,
) -> AppResult<Vec<Livecomment>> {
    let sql = format!(
        "SELECT {} FROM livecomments WHERE livestream_id = ?1 AND is_deleted = 0
         ORDER BY created_at DESC, id DESC LIMIT ?2",
        Livecomment::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![livestream_id, limit_value(limit)],
        Livecomment::from_row,
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Marks the given comments hidden, one statement per chunk of ids.
/// Returns rows changed.
pub fn hide_livecomments(conn: &Connection, ids: &[i64]) -> AppResult<usize> {
    let mut changed = 0;
    for chunk in ids.chunks(MAX_BOUND_IDS) {
        let sql = format!(
            "UPDATE livecomments SET is_deleted = 1 WHERE is_deleted = 0 AND id IN ({})",
            placeholders(chunk.len())
        );
        changed += conn.execute(&sql, params_from_iter(chunk.iter()))?;
    }
    Ok(changed)
}

// --- Reports ---

pub fn insert_report(
    conn: &Connection,
    user_id: i64,
    livestream_id: i64,
    livecomment_id: i64,
    created_at: i64,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO livecomment_reports (user_id, livestream_id, livecomment_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, livestream_id, livecomment_id, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn report_by_id(conn: &Connection, id: i64) -> AppResult<Option<LivecommentReport>> {
    let sql = format!(
        "SELECT {} FROM livecomment_reports WHERE id = ?1",
        LivecommentReport::COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![id], LivecommentReport::from_row)
        .optional()?)
}

pub fn reports_for(conn: &Connection, livestream_id: i64) -> AppResult<Vec<LivecommentReport>> {
    let sql = format!(
        "SELECT {} FROM livecomment_reports WHERE livestream_id = ?1 ORDER BY id",
        LivecommentReport::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![livestream_id], LivecommentReport::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

// --- Banned words ---

pub fn insert_banned_word(
    conn: &Connection,
    user_id: i64,
    livestream_id: i64,
    word: &str,
    created_at: i64,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO ng_words (user_id, livestream_id, word, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, livestream_id, word, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn banned_words_for(conn: &Connection, livestream_id: i64) -> AppResult<Vec<BannedWord>> {
    let sql = format!(
        "SELECT {} FROM ng_words WHERE livestream_id = ?1",
        BannedWord::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![livestream_id], BannedWord::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn banned_words_registered_by(
    conn: &Connection,
    user_id: i64,
    livestream_id: i64,
) -> AppResult<Vec<BannedWord>> {
    let sql = format!(
        "SELECT {} FROM ng_words WHERE user_id = ?1 AND livestream_id = ?2
         ORDER BY created_at DESC, id DESC",
        BannedWord::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id, livestream_id], BannedWord::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

// --- Tags ---

pub fn all_tags(conn: &Connection) -> AppResult<Vec<Tag>> {
    let sql = format!("SELECT {} FROM tags ORDER BY id", Tag::COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], Tag::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

// --- Bulk score aggregates ---
//
// One grouped query over the whole table per metric. Entities with nothing to
// count are absent from the map.

pub fn reaction_counts_by_livestream(conn: &Connection) -> AppResult<HashMap<i64, i64>> {
    grouped_i64(
        conn,
        "SELECT livestream_id, COUNT(*) FROM reactions GROUP BY livestream_id",
    )
}

pub fn tip_sums_by_livestream(conn: &Connection) -> AppResult<HashMap<i64, i64>> {
    grouped_i64(
        conn,
        "SELECT livestream_id, IFNULL(SUM(tip), 0) FROM livecomments
         WHERE is_deleted = 0 GROUP BY livestream_id",
    )
}

pub fn reaction_counts_by_owner(conn: &Connection) -> AppResult<HashMap<i64, i64>> {
    grouped_i64(
        conn,
        "SELECT l.user_id, COUNT(r.id) FROM reactions r
         INNER JOIN livestreams l ON r.livestream_id = l.id
         GROUP BY l.user_id",
    )
}

pub fn tip_sums_by_owner(conn: &Connection) -> AppResult<HashMap<i64, i64>> {
    grouped_i64(
        conn,
        "SELECT l.user_id, IFNULL(SUM(lc.tip), 0) FROM livecomments lc
         INNER JOIN livestreams l ON lc.livestream_id = l.id
         WHERE lc.is_deleted = 0 GROUP BY l.user_id",
    )
}

// --- Statistics aggregates ---

pub fn count_reactions_on_owned(conn: &Connection, user_id: i64) -> AppResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM reactions r
         INNER JOIN livestreams l ON r.livestream_id = l.id
         WHERE l.user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?)
}

/// `(count, tip sum)` of visible comments across the user's livestreams.
pub fn visible_comment_totals_on_owned(conn: &Connection, user_id: i64) -> AppResult<(i64, i64)> {
    Ok(conn.query_row(
        "SELECT COUNT(lc.id), IFNULL(SUM(lc.tip), 0) FROM livecomments lc
         INNER JOIN livestreams l ON lc.livestream_id = l.id
         WHERE l.user_id = ?1 AND lc.is_deleted = 0",
        params![user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?)
}

pub fn count_viewers_on_owned(conn: &Connection, user_id: i64) -> AppResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM livestream_viewers_history h
         INNER JOIN livestreams l ON h.livestream_id = l.id
         WHERE l.user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?)
}

/// Most used emoji on the user's livestreams. Ties go to the
/// lexicographically greater label.
pub fn favorite_emoji_on_owned(conn: &Connection, user_id: i64) -> AppResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT r.emoji_name FROM reactions r
             INNER JOIN livestreams l ON r.livestream_id = l.id
             WHERE l.user_id = ?1
             GROUP BY r.emoji_name
             ORDER BY COUNT(*) DESC, r.emoji_name DESC
             LIMIT 1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn count_viewers(conn: &Connection, livestream_id: i64) -> AppResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM livestream_viewers_history WHERE livestream_id = ?1",
        params![livestream_id],
        |row| row.get(0),
    )?)
}

pub fn max_visible_tip(conn: &Connection, livestream_id: i64) -> AppResult<i64> {
    Ok(conn.query_row(
        "SELECT IFNULL(MAX(tip), 0) FROM livecomments WHERE livestream_id = ?1 AND is_deleted = 0",
        params![livestream_id],
        |row| row.get(0),
    )?)
}

pub fn count_reactions(conn: &Connection, livestream_id: i64) -> AppResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM reactions WHERE livestream_id = ?1",
        params![livestream_id],
        |row| row.get(0),
    )?)
}

pub fn count_reports(conn: &Connection, livestream_id: i64) -> AppResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM livecomment_reports WHERE livestream_id = ?1",
        params![livestream_id],
        |row| row.get(0),
    )?)
}

/// Sum of every tip ever posted, hidden comments included.
pub fn total_tip(conn: &Connection) -> AppResult<i64> {
    Ok(conn.query_row("SELECT IFNULL(SUM(tip), 0) FROM livecomments", [], |row| {
        row.get(0)
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn seed(conn: &Connection) -> (i64, i64) {
        let user = insert_user(conn, "alice", "Alice", "", "hash").unwrap();
        let stream = insert_livestream(conn, user, "first", "", 0, 0).unwrap();
        (user, stream)
    }

    #[test]
    fn placeholders_matches_count() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn grouped_aggregates_skip_hidden_tips() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let (user, stream) = seed(&conn);

        insert_livecomment(&conn, user, stream, "a", 100, 1).unwrap();
        let hidden = insert_livecomment(&conn, user, stream, "b", 40, 2).unwrap();
        insert_reaction(&conn, user, stream, "👍", 3).unwrap();
        hide_livecomments(&conn, &[hidden]).unwrap();

        let tips = tip_sums_by_livestream(&conn).unwrap();
        assert_eq!(tips.get(&stream), Some(&100));
        let by_owner = tip_sums_by_owner(&conn).unwrap();
        assert_eq!(by_owner.get(&user), Some(&100));
        let reactions = reaction_counts_by_owner(&conn).unwrap();
        assert_eq!(reactions.get(&user), Some(&1));
    }

    #[test]
    fn bulk_lookups_with_no_ids_return_empty() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        assert!(reaction_counts_by_livestream(&conn).unwrap().is_empty());
        assert!(users_by_ids(&conn, &[]).unwrap().is_empty());
        assert!(icons_for(&conn, &[]).unwrap().is_empty());
        assert_eq!(hide_livecomments(&conn, &[]).unwrap(), 0);
    }

    #[test]
    fn hide_is_one_way_and_counts_only_fresh_transitions() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let (user, stream) = seed(&conn);
        let id = insert_livecomment(&conn, user, stream, "x", 0, 1).unwrap();

        assert_eq!(hide_livecomments(&conn, &[id]).unwrap(), 1);
        assert_eq!(hide_livecomments(&conn, &[id]).unwrap(), 0);
        let comment = livecomment_by_id(&conn, id).unwrap().unwrap();
        assert!(!comment.visibility.is_visible());
    }

    #[test]
    fn bulk_statements_stay_under_the_parameter_limit() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let (user, stream) = seed(&conn);
        let tx = conn.unchecked_transaction().unwrap();
        let ids: Vec<i64> = (0..33_000)
            .map(|i| insert_livecomment(&tx, user, stream, "bulk", 1, i).unwrap())
            .collect();
        tx.commit().unwrap();

        assert_eq!(livecomments_by_ids(&conn, &ids).unwrap().len(), ids.len());
        assert_eq!(hide_livecomments(&conn, &ids).unwrap(), ids.len());
        assert!(visible_livecomments(&conn, stream, Some(1)).unwrap().is_empty());

        let many_users: Vec<i64> = (user..user + 33_000).collect();
        let users = users_by_ids(&conn, &many_users).unwrap();
        assert_eq!(users.len(), 1);
        assert!(themes_for(&conn, &many_users).unwrap().is_empty());
    }

    #[test]
    fn single_row_lookups_by_id() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let (user, stream) = seed(&conn);
        let reaction = insert_reaction(&conn, user, stream, "🎉", 7).unwrap();
        let comment = insert_livecomment(&conn, user, stream, "hi", 0, 7).unwrap();
        let report = insert_report(&conn, user, stream, comment, 8).unwrap();

        let found = reaction_by_id(&conn, reaction).unwrap().unwrap();
        assert_eq!(found.emoji_name, "🎉");
        assert_eq!(found.livestream_id, stream);
        let found = report_by_id(&conn, report).unwrap().unwrap();
        assert_eq!(found.livecomment_id, comment);
        assert!(reaction_by_id(&conn, reaction + 1).unwrap().is_none());
        assert!(report_by_id(&conn, report + 1).unwrap().is_none());
    }

    #[test]
    fn seeded_tags_are_listed_in_id_order() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let tags = all_tags(&conn).unwrap();
        assert!(!tags.is_empty());
        assert!(tags.windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    #[test]
    fn listings_are_newest_first_and_limited() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let (user, stream) = seed(&conn);
        for (i, emoji) in ["a", "b", "c"].iter().enumerate() {
            insert_reaction(&conn, user, stream, emoji, i as i64).unwrap();
        }

        let all = reactions_for(&conn, stream, None).unwrap();
        let names: Vec<_> = all.iter().map(|r| r.emoji_name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);

        let limited = reactions_for(&conn, stream, Some(2)).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn favorite_emoji_breaks_ties_by_descending_label() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let (user, stream) = seed(&conn);
        insert_reaction(&conn, user, stream, "😀", 1).unwrap();
        insert_reaction(&conn, user, stream, "😂", 2).unwrap();

        assert_eq!(
            favorite_emoji_on_owned(&conn, user).unwrap().as_deref(),
            Some("😂")
        );
    }

    #[test]
    fn newest_icon_wins_in_bulk_lookup() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let (user, _) = seed(&conn);
        conn.execute(
            "INSERT INTO icons (user_id, image) VALUES (?1, ?2), (?1, ?3)",
            params![user, b"old".to_vec(), b"new".to_vec()],
        )
        .unwrap();

        let icons = icons_for(&conn, &[user]).unwrap();
        assert_eq!(icons.get(&user).map(Vec::as_slice), Some(&b"new"[..]));
        assert_eq!(icon_image(&conn, user).unwrap().as_deref(), Some(&b"new"[..]));
    }
}
