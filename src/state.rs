use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::cache::Caches;
use crate::config::Config;
use crate::db::Storage;
use crate::moderation::ModerationEngine;
use crate::views::FallbackIcon;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub caches: Caches,
    pub config: Config,
    pub moderation: ModerationEngine,
    pub fallback_icon: FallbackIcon,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config, fallback_icon: FallbackIcon) -> Self {
        let storage = Storage::new(pool, config.query_timeout());
        Self {
            caches: Caches::new(config.icon_ttl(), config.theme_ttl()),
            moderation: ModerationEngine::new(storage.clone()),
            storage,
            config,
            fallback_icon,
        }
    }
}
