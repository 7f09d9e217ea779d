use async_trait::async_trait;

use crate::error::FetchError;
use crate::types::{RepoSort, Repository, SearchUser, User};

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Remote source of repositories. Queries are passed through untouched; the
/// implementation owns their syntax.
#[async_trait]
pub trait RepositorySource: Send + Sync + std::fmt::Debug {
    async fn search_repositories(
        &self,
        query: &str,
        sort: Option<RepoSort>,
        page: u32,
        page_size: u32,
    ) -> FetchResult<Vec<Repository>>;

    async fn user_repositories(
        &self,
        login: &str,
        page: u32,
        page_size: u32,
    ) -> FetchResult<Vec<Repository>>;
}

#[async_trait]
pub trait UserSource: Send + Sync + std::fmt::Debug {
    async fn search_users(&self, query: &str, page: u32, page_size: u32)
        -> FetchResult<Vec<SearchUser>>;

    async fn user(&self, login: &str) -> FetchResult<User>;
}
