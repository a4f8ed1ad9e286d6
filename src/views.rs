//! JSON payloads and their assembly from row models.
//!
//! Lookups are batched: a page of comments resolves its users and
//! livestreams with one query each, and per-user derived attributes (icon
//! hash, theme) come from [`Caches`] first and storage second.
use bytes::Bytes;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::cache::{icon_hash, Caches};
use crate::db::models::{Livecomment, LivecommentReport, Livestream, Reaction, User};
use crate::db::queries;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct ThemeView {
    pub id: i64,
    pub dark_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub theme: ThemeView,
    pub icon_hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LivestreamView {
    pub id: i64,
    pub owner: UserView,
    pub title: String,
    pub description: String,
    pub start_at: i64,
    pub end_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LivecommentView {
    pub id: i64,
    pub user: UserView,
    pub livestream: LivestreamView,
    pub comment: String,
    pub tip: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionView {
    pub id: i64,
    pub emoji_name: String,
    pub user: UserView,
    pub livestream: LivestreamView,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub id: i64,
    pub reporter: UserView,
    pub livecomment: LivecommentView,
    pub created_at: i64,
}

/// Image served to users without an uploaded icon.
#[derive(Debug, Clone)]
pub struct FallbackIcon {
    pub image: Option<Bytes>,
    pub hash: String,
}

impl FallbackIcon {
    pub fn new(image: Option<Bytes>) -> Self {
        let hash = icon_hash(image.as_deref().unwrap_or_default());
        Self { image, hash }
    }

    pub fn load(path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let image = match path {
            Some(path) => Some(Bytes::from(std::fs::read(path)?)),
            None => None,
        };
        Ok(Self::new(image))
    }
}

fn missing(kind: &str, id: i64) -> AppError {
    AppError::Internal(format!("{} {} referenced but not found", kind, id))
}

fn unique(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

pub struct Renderer<'a> {
    conn: &'a Connection,
    caches: &'a Caches,
    fallback_hash: &'a str,
}

impl<'a> Renderer<'a> {
    pub fn new(conn: &'a Connection, caches: &'a Caches, fallback_hash: &'a str) -> Self {
        Self {
            conn,
            caches,
            fallback_hash,
        }
    }

    /// Icon digests by user id. Cache misses are hashed from storage in one
    /// query and written back; users without an icon get the fallback digest.
    fn icon_hashes(&self, users: &[User]) -> AppResult<HashMap<i64, String>> {
        let mut hashes = HashMap::with_capacity(users.len());
        let mut misses = Vec::new();
        for user in users {
            match self.caches.icon_hashes.get(&user.name) {
                Some(hash) => {
                    hashes.insert(user.id, hash);
                }
                None => misses.push(user.id),
            }
        }

        if !misses.is_empty() {
            let images = queries::icons_for(self.conn, &misses)?;
            for user in users.iter().filter(|u| misses.contains(&u.id)) {
                let hash = match images.get(&user.id) {
                    Some(image) => {
                        let hash = icon_hash(image);
                        self.caches
                            .icon_hashes
                            .set_if_absent(user.name.clone(), hash.clone());
                        hash
                    }
                    None => self.fallback_hash.to_string(),
                };
                hashes.insert(user.id, hash);
            }
        }

        Ok(hashes)
    }

    /// Dark-mode flags by user id, through the theme cache.
    pub fn dark_modes(&self, user_ids: &[i64]) -> AppResult<HashMap<i64, bool>> {
        let mut modes = HashMap::with_capacity(user_ids.len());
        let mut misses = Vec::new();
        for &id in user_ids {
            match self.caches.themes.get(&id) {
                Some(dark_mode) => {
                    modes.insert(id, dark_mode);
                }
                None => misses.push(id),
            }
        }

        if !misses.is_empty() {
            let stored = queries::themes_for(self.conn, &misses)?;
            for id in misses {
                let dark_mode = stored.get(&id).copied().unwrap_or(false);
                self.caches.themes.set(id, dark_mode);
                modes.insert(id, dark_mode);
            }
        }

        Ok(modes)
    }

    pub fn users(&self, users: Vec<User>) -> AppResult<HashMap<i64, UserView>> {
        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        let hashes = self.icon_hashes(&users)?;
        let modes = self.dark_modes(&ids)?;

        Ok(users
            .into_iter()
            .map(|user| {
                let view = UserView {
                    id: user.id,
                    theme: ThemeView {
                        id: user.id,
                        dark_mode: modes.get(&user.id).copied().unwrap_or(false),
                    },
                    icon_hash: hashes
                        .get(&user.id)
                        .cloned()
                        .unwrap_or_else(|| self.fallback_hash.to_string()),
                    name: user.name,
                    display_name: user.display_name,
                    description: user.description,
                };
                (view.id, view)
            })
            .collect())
    }

    pub fn user(&self, user: User) -> AppResult<UserView> {
        let id = user.id;
        self.users(vec![user])?
            .remove(&id)
            .ok_or_else(|| missing("user", id))
    }

    fn users_by_ids(&self, ids: Vec<i64>) -> AppResult<HashMap<i64, UserView>> {
        let users = queries::users_by_ids(self.conn, &unique(ids))?;
        self.users(users.into_values().collect())
    }

    pub fn livestreams(&self, livestreams: Vec<Livestream>) -> AppResult<HashMap<i64, LivestreamView>> {
        let owners = self.users_by_ids(livestreams.iter().map(|l| l.user_id).collect())?;
        livestreams
            .into_iter()
            .map(|livestream| {
                let owner = owners
                    .get(&livestream.user_id)
                    .cloned()
                    .ok_or_else(|| missing("user", livestream.user_id))?;
                Ok((
                    livestream.id,
                    LivestreamView {
                        id: livestream.id,
                        owner,
                        title: livestream.title,
                        description: livestream.description,
                        start_at: livestream.start_at,
                        end_at: livestream.end_at,
                    },
                ))
            })
            .collect()
    }

    pub fn livestream(&self, livestream: Livestream) -> AppResult<LivestreamView> {
        let id = livestream.id;
        self.livestreams(vec![livestream])?
            .remove(&id)
            .ok_or_else(|| missing("livestream", id))
    }

    fn livestreams_by_ids(&self, ids: Vec<i64>) -> AppResult<HashMap<i64, LivestreamView>> {
        let livestreams = queries::livestreams_by_ids(self.conn, &unique(ids))?;
        self.livestreams(livestreams.into_values().collect())
    }

    /// Keeps the input order.
    pub fn livecomments(&self, comments: Vec<Livecomment>) -> AppResult<Vec<LivecommentView>> {
        let users = self.users_by_ids(comments.iter().map(|c| c.user_id).collect())?;
        let livestreams =
            self.livestreams_by_ids(comments.iter().map(|c| c.livestream_id).collect())?;

        comments
            .into_iter()
            .map(|comment| {
                Ok(LivecommentView {
                    id: comment.id,
                    user: users
                        .get(&comment.user_id)
                        .cloned()
                        .ok_or_else(|| missing("user", comment.user_id))?,
                    livestream: livestreams
                        .get(&comment.livestream_id)
                        .cloned()
                        .ok_or_else(|| missing("livestream", comment.livestream_id))?,
                    comment: comment.comment,
                    tip: comment.tip,
                    created_at: comment.created_at,
                })
            })
            .collect()
    }

    pub fn livecomment(&self, comment: Livecomment) -> AppResult<LivecommentView> {
        let id = comment.id;
        self.livecomments(vec![comment])?
            .pop()
            .ok_or_else(|| missing("livecomment", id))
    }

    /// Keeps the input order.
    pub fn reactions(&self, reactions: Vec<Reaction>) -> AppResult<Vec<ReactionView>> {
        let users = self.users_by_ids(reactions.iter().map(|r| r.user_id).collect())?;
        let livestreams =
            self.livestreams_by_ids(reactions.iter().map(|r| r.livestream_id).collect())?;

        reactions
            .into_iter()
            .map(|reaction| {
                Ok(ReactionView {
                    id: reaction.id,
                    user: users
                        .get(&reaction.user_id)
                        .cloned()
                        .ok_or_else(|| missing("user", reaction.user_id))?,
                    livestream: livestreams
                        .get(&reaction.livestream_id)
                        .cloned()
                        .ok_or_else(|| missing("livestream", reaction.livestream_id))?,
                    emoji_name: reaction.emoji_name,
                    created_at: reaction.created_at,
                })
            })
            .collect()
    }

    pub fn reaction(&self, reaction: Reaction) -> AppResult<ReactionView> {
        let id = reaction.id;
        self.reactions(vec![reaction])?
            .pop()
            .ok_or_else(|| missing("reaction", id))
    }

    /// Keeps the input order.
    pub fn reports(&self, reports: Vec<LivecommentReport>) -> AppResult<Vec<ReportView>> {
        let reporters = self.users_by_ids(reports.iter().map(|r| r.user_id).collect())?;
        let comment_ids = unique(reports.iter().map(|r| r.livecomment_id));
        let comments: Vec<Livecomment> = queries::livecomments_by_ids(self.conn, &comment_ids)?
            .into_values()
            .collect();
        let comments: HashMap<i64, LivecommentView> = self
            .livecomments(comments)?
            .into_iter()
            .map(|view| (view.id, view))
            .collect();

        reports
            .into_iter()
            .map(|report| {
                Ok(ReportView {
                    id: report.id,
                    reporter: reporters
                        .get(&report.user_id)
                        .cloned()
                        .ok_or_else(|| missing("user", report.user_id))?,
                    livecomment: comments
                        .get(&report.livecomment_id)
                        .cloned()
                        .ok_or_else(|| missing("livecomment", report.livecomment_id))?,
                    created_at: report.created_at,
                })
            })
            .collect()
    }

    pub fn report(&self, report: LivecommentReport) -> AppResult<ReportView> {
        let id = report.id;
        self.reports(vec![report])?
            .pop()
            .ok_or_else(|| missing("report", id))
    }
}
