use crate::domain::model::Token;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Source of bearer tokens. Called once at start and again after every 401.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire(&self) -> Result<Token>;
}
