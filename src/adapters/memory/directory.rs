//! In-memory level catalog and user directory.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, LevelId, UserId};
use crate::domain::membership::{Level, MemberIdentity};
use crate::ports::{LevelCatalog, UserDirectory};

#[derive(Default)]
pub struct InMemoryLevelCatalog {
    levels: RwLock<HashMap<LevelId, Level>>,
}

impl InMemoryLevelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, level: Level) {
        self.levels.write().await.insert(level.id, level);
    }
}

#[async_trait]
impl LevelCatalog for InMemoryLevelCatalog {
    async fn find_level(&self, id: &LevelId) -> Result<Option<Level>, DomainError> {
        Ok(self.levels.read().await.get(id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, MemberIdentity>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, user: MemberIdentity) {
        self.users.write().await.insert(user.user_id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, id: &UserId) -> Result<Option<MemberIdentity>, DomainError> {
        Ok(self.users.read().await.get(id).cloned())
    }
}
