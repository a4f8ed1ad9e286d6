//! Per-user and per-livestream statistics.
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::error::{AppError, AppResult};
use crate::ranking;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStatistics {
    pub rank: u64,
    pub viewers_count: i64,
    pub total_reactions: i64,
    pub total_livecomments: i64,
    pub total_tip: i64,
    pub favorite_emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LivestreamStatistics {
    pub rank: u64,
    pub viewers_count: i64,
    pub max_tip: i64,
    pub total_reactions: i64,
    pub total_reports: i64,
}

/// Statistics for the streamer named `username`, over every livestream they
/// own. Hidden comments count toward neither the comment total nor the tips.
pub fn user_statistics(conn: &Connection, username: &str) -> AppResult<UserStatistics> {
    let user = queries::user_by_name(conn, username)?
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", username)))?;

    let rank = ranking::user_rank(conn, user.id)?;
    let total_reactions = queries::count_reactions_on_owned(conn, user.id)?;
    let (total_livecomments, total_tip) = queries::visible_comment_totals_on_owned(conn, user.id)?;
    let viewers_count = queries::count_viewers_on_owned(conn, user.id)?;
    let favorite_emoji = queries::favorite_emoji_on_owned(conn, user.id)?.unwrap_or_default();

    Ok(UserStatistics {
        rank,
        viewers_count,
        total_reactions,
        total_livecomments,
        total_tip,
        favorite_emoji,
    })
}

pub fn livestream_statistics(conn: &Connection, livestream_id: i64) -> AppResult<LivestreamStatistics> {
    if queries::livestream_by_id(conn, livestream_id)?.is_none() {
        return Err(AppError::NotFound(format!(
            "livestream {} not found",
            livestream_id
        )));
    }

    Ok(LivestreamStatistics {
        rank: ranking::livestream_rank(conn, livestream_id)?,
        viewers_count: queries::count_viewers(conn, livestream_id)?,
        max_tip: queries::max_visible_tip(conn, livestream_id)?,
        total_reactions: queries::count_reactions(conn, livestream_id)?,
        total_reports: queries::count_reports(conn, livestream_id)?,
    })
}
