//! Lookup ports for levels and user records.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, LevelId, UserId};
use crate::domain::membership::{Level, MemberIdentity};

#[async_trait]
pub trait LevelCatalog: Send + Sync {
    async fn find_level(&self, id: &LevelId) -> Result<Option<Level>, DomainError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: &UserId) -> Result<Option<MemberIdentity>, DomainError>;
}
