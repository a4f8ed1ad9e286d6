//! Banned-word moderation for livestream comments.
//!
//! Streamers register banned words per livestream. New comments containing
//! any registered word are refused before insertion, and registering a word
//! sweeps the livestream: every visible comment that matches any of the
//! livestream's words (not only the new one) is hidden in one batched update.
//!
//! Rule insert and sweep share one immediate transaction, so SQLite's write
//! lock keeps concurrent comment posts out of the window between the comment
//! snapshot and the hide. Against a storage engine without that isolation a
//! comment inserted after the snapshot can escape the sweep; it is still
//! refused by the post-time check once the rule is visible to it.
use rusqlite::Connection;

use crate::db::models::{BannedWord, Livecomment};
use crate::db::{queries, Storage};
use crate::error::{AppError, AppResult};

/// Case-sensitive substring match against any word.
pub fn matches_any<'a, I>(text: &str, words: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    words.into_iter().any(|word| text.contains(word))
}

/// Ids of the visible comments that contain at least one banned word.
pub fn find_violations(comments: &[Livecomment], rules: &[BannedWord]) -> Vec<i64> {
    comments
        .iter()
        .filter(|comment| comment.visibility.is_visible())
        .filter(|comment| matches_any(&comment.comment, rules.iter().map(|r| r.word.as_str())))
        .map(|comment| comment.id)
        .collect()
}

/// Whether `text` would be refused on `livestream_id` right now.
pub fn contains_banned_word(conn: &Connection, livestream_id: i64, text: &str) -> AppResult<bool> {
    let rules = queries::banned_words_for(conn, livestream_id)?;
    Ok(matches_any(text, rules.iter().map(|r| r.word.as_str())))
}

/// Hides every visible comment of the livestream matching any current rule.
/// Returns the number of comments that transitioned to hidden.
pub fn sweep(conn: &Connection, livestream_id: i64) -> AppResult<usize> {
    let rules = queries::banned_words_for(conn, livestream_id)?;
    let comments = queries::visible_livecomments(conn, livestream_id, None)?;
    let violations = find_violations(&comments, &rules);
    queries::hide_livecomments(conn, &violations)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleAdded {
    pub word_id: i64,
    pub hidden: usize,
}

/// Inserts a comment unless it matches one of the livestream's rules.
pub fn post_comment(
    conn: &Connection,
    user_id: i64,
    livestream_id: i64,
    text: &str,
    tip: i64,
    created_at: i64,
) -> AppResult<Livecomment> {
    if tip < 0 {
        return Err(AppError::BadRequest("tip must not be negative".into()));
    }
    if queries::livestream_by_id(conn, livestream_id)?.is_none() {
        return Err(AppError::NotFound("livestream not found".into()));
    }
    if contains_banned_word(conn, livestream_id, text)? {
        return Err(AppError::SpamRejected);
    }

    let id = queries::insert_livecomment(conn, user_id, livestream_id, text, tip, created_at)?;
    queries::livecomment_by_id(conn, id)?
        .ok_or_else(|| AppError::Internal(format!("livecomment {} vanished after insert", id)))
}

/// Registers `word` on a livestream owned by `owner_id` and sweeps it.
///
/// Runs on the caller's connection; callers wrap it in a transaction so a
/// failed sweep also discards the rule.
pub fn add_rule(
    conn: &Connection,
    owner_id: i64,
    livestream_id: i64,
    word: &str,
    created_at: i64,
) -> AppResult<RuleAdded> {
    if word.is_empty() {
        return Err(AppError::BadRequest("banned word must not be empty".into()));
    }

    let livestream = queries::livestream_by_id(conn, livestream_id)?
        .ok_or_else(|| AppError::NotFound("livestream not found".into()))?;
    if livestream.user_id != owner_id {
        return Err(AppError::PermissionDenied(
            "a streamer can only moderate their own livestreams".into(),
        ));
    }

    let word_id = queries::insert_banned_word(conn, owner_id, livestream_id, word, created_at)?;
    let hidden = sweep(conn, livestream_id)?;

    Ok(RuleAdded { word_id, hidden })
}

/// Async front for the moderation operations.
#[derive(Clone)]
pub struct ModerationEngine {
    storage: Storage,
}

impl ModerationEngine {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn add_rule(
        &self,
        owner_id: i64,
        livestream_id: i64,
        word: String,
        created_at: i64,
    ) -> AppResult<RuleAdded> {
        let added = self
            .storage
            .transaction(move |tx| add_rule(tx, owner_id, livestream_id, &word, created_at))
            .await?;

        tracing::info!(
            "Banned word {} added to livestream {}, {} comments hidden",
            added.word_id,
            livestream_id,
            added.hidden
        );
        Ok(added)
    }

    /// Check and insert share one transaction, so a rule committed before
    /// this starts is always applied.
    pub async fn post_comment(
        &self,
        user_id: i64,
        livestream_id: i64,
        text: String,
        tip: i64,
        created_at: i64,
    ) -> AppResult<Livecomment> {
        let result = self
            .storage
            .transaction(move |tx| post_comment(tx, user_id, livestream_id, &text, tip, created_at))
            .await;
        if let Err(AppError::SpamRejected) = &result {
            tracing::info!("Rejected comment on livestream {} as spam", livestream_id);
        }
        result
    }

    pub async fn check_and_reject(&self, livestream_id: i64, text: String) -> AppResult<bool> {
        self.storage
            .run(move |conn| contains_banned_word(conn, livestream_id, &text))
            .await
    }
}
