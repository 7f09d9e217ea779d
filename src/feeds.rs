use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::sync::Arc;

use crate::config::PopularConfig;
use crate::error::FetchError;
use crate::feed::{PageRequest, PageSource};
use crate::remote::{RepositorySource, UserSource};
use crate::types::{RepoSort, Repository, SearchUser};

/// Search query for the home feed: well-starred repositories pushed to
/// recently. The window moves with `now`, so consecutive pages can drift.
pub fn popular_query(config: &PopularConfig, now: DateTime<Utc>) -> String {
    let since = now - Duration::days(config.pushed_within_days);
    format!(
        "stars:>{} pushed:>{}",
        config.min_stars,
        since.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Home feed. The query is built by the caller and passed through verbatim.
#[derive(Debug, Clone)]
pub struct PopularRepositories {
    source: Arc<dyn RepositorySource>,
}

impl PopularRepositories {
    pub fn new(source: Arc<dyn RepositorySource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl PageSource<Repository> for PopularRepositories {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Repository>, FetchError> {
        let query = request.query.as_deref().unwrap_or_default();
        self.source
            .search_repositories(
                query,
                Some(RepoSort::Updated),
                request.page,
                request.page_size,
            )
            .await
    }
}

/// Repositories owned by the user named in the request query.
#[derive(Debug, Clone)]
pub struct UserRepositories {
    source: Arc<dyn RepositorySource>,
}

impl UserRepositories {
    pub fn new(source: Arc<dyn RepositorySource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl PageSource<Repository> for UserRepositories {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Repository>, FetchError> {
        match request.query.as_deref() {
            Some(login) if !login.is_empty() => {
                self.source
                    .user_repositories(login, request.page, request.page_size)
                    .await
            }
            _ => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RepositorySearch {
    source: Arc<dyn RepositorySource>,
}

impl RepositorySearch {
    pub fn new(source: Arc<dyn RepositorySource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl PageSource<Repository> for RepositorySearch {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Repository>, FetchError> {
        match request.query.as_deref() {
            Some(query) if !query.is_empty() => {
                self.source
                    .search_repositories(query, None, request.page, request.page_size)
                    .await
            }
            _ => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserSearch {
    source: Arc<dyn UserSource>,
}

impl UserSearch {
    pub fn new(source: Arc<dyn UserSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl PageSource<SearchUser> for UserSearch {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<SearchUser>, FetchError> {
        match request.query.as_deref() {
            Some(query) if !query.is_empty() => {
                self.source
                    .search_users(query, request.page, request.page_size)
                    .await
            }
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use crate::remote::FetchResult;
    use crate::types::{RepoOwner, User};
    use std::sync::Mutex;

    /// One recorded call to a fake source
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        SearchRepos {
            query: String,
            sort: Option<RepoSort>,
            page: u32,
        },
        UserRepos {
            login: String,
            page: u32,
        },
        SearchUsers {
            query: String,
            page: u32,
        },
        User(String),
    }

    pub fn repo(id: u64, owner: &str, name: &str) -> Repository {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Repository {
            id,
            name: name.to_string(),
            full_name: format!("{}/{}", owner, name),
            owner: RepoOwner {
                login: owner.to_string(),
                avatar_url: String::new(),
            },
            description: None,
            html_url: format!("https://github.com/{}/{}", owner, name),
            stargazers_count: 10_001,
            forks_count: 0,
            language: None,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn search_user(id: u64, login: &str) -> SearchUser {
        SearchUser {
            id,
            login: login.to_string(),
            avatar_url: String::new(),
            html_url: format!("https://github.com/{}", login),
        }
    }

    /// Answers every call immediately with `per_page` items (or fewer) and
    /// records what was asked.
    #[derive(Debug, Default)]
    pub struct FakeGitHub {
        pub calls: Mutex<Vec<Call>>,
        pub fail_with: Mutex<Option<FetchError>>,
    }

    impl FakeGitHub {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) -> FetchResult<()> {
            self.calls.lock().unwrap().push(call);
            match self.fail_with.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl RepositorySource for FakeGitHub {
        async fn search_repositories(
            &self,
            query: &str,
            sort: Option<RepoSort>,
            page: u32,
            page_size: u32,
        ) -> FetchResult<Vec<Repository>> {
            self.record(Call::SearchRepos {
                query: query.to_string(),
                sort,
                page,
            })?;
            Ok((0..page_size as u64)
                .map(|i| repo(u64::from(page) * 1000 + i, "owner", &format!("repo{}", i)))
                .collect())
        }

        async fn user_repositories(
            &self,
            login: &str,
            page: u32,
            _page_size: u32,
        ) -> FetchResult<Vec<Repository>> {
            self.record(Call::UserRepos {
                login: login.to_string(),
                page,
            })?;
            Ok(vec![repo(1, login, "dotfiles"), repo(2, login, "blog")])
        }
    }

    #[async_trait]
    impl UserSource for FakeGitHub {
        async fn search_users(
            &self,
            query: &str,
            page: u32,
            _page_size: u32,
        ) -> FetchResult<Vec<SearchUser>> {
            self.record(Call::SearchUsers {
                query: query.to_string(),
                page,
            })?;
            Ok(vec![search_user(1, &format!("{}-1", query))])
        }

        async fn user(&self, login: &str) -> FetchResult<User> {
            self.record(Call::User(login.to_string()))?;
            Ok(User {
                id: 1,
                login: login.to_string(),
                avatar_url: String::new(),
                name: Some("The Octocat".to_string()),
                bio: None,
                public_repos: 2,
                followers: 10,
                following: 1,
                email: None,
                location: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::{Call, FakeGitHub};
    use super::*;

    fn request(query: Option<&str>, page: u32) -> PageRequest {
        PageRequest {
            query: query.map(str::to_string),
            page,
            page_size: 20,
        }
    }

    #[test]
    fn popular_query_filters_stars_and_push_window() {
        let now = DateTime::parse_from_rfc3339("2024-05-10T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let query = popular_query(&PopularConfig::default(), now);
        assert_eq!(query, "stars:>10000 pushed:>2024-05-07T12:30:00Z");
    }

    #[test]
    fn popular_query_uses_config() {
        let now = DateTime::parse_from_rfc3339("2024-05-10T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let config = PopularConfig {
            min_stars: 500,
            pushed_within_days: 1,
        };
        assert_eq!(
            popular_query(&config, now),
            "stars:>500 pushed:>2024-05-09T00:00:00Z"
        );
    }

    #[tokio::test]
    async fn popular_passes_query_through_sorted_by_update() {
        let github = Arc::new(FakeGitHub::default());
        let feed = PopularRepositories::new(github.clone());
        let items = feed
            .fetch_page(&request(Some("stars:>1 pushed:>x"), 2))
            .await
            .unwrap();
        assert_eq!(items.len(), 20);
        assert_eq!(
            github.calls(),
            vec![Call::SearchRepos {
                query: "stars:>1 pushed:>x".into(),
                sort: Some(RepoSort::Updated),
                page: 2,
            }]
        );
    }

    #[tokio::test]
    async fn user_repositories_need_a_login() {
        let github = Arc::new(FakeGitHub::default());
        let feed = UserRepositories::new(github.clone());

        assert!(feed.fetch_page(&request(None, 1)).await.unwrap().is_empty());
        assert!(github.calls().is_empty());

        let items = feed.fetch_page(&request(Some("octocat"), 1)).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            github.calls(),
            vec![Call::UserRepos {
                login: "octocat".into(),
                page: 1
            }]
        );
    }

    #[tokio::test]
    async fn searches_skip_blank_queries() {
        let github = Arc::new(FakeGitHub::default());
        let repos = RepositorySearch::new(github.clone());
        let users = UserSearch::new(github.clone());

        assert!(repos.fetch_page(&request(Some(""), 1)).await.unwrap().is_empty());
        assert!(users.fetch_page(&request(None, 1)).await.unwrap().is_empty());
        assert!(github.calls().is_empty());

        users.fetch_page(&request(Some("tj"), 3)).await.unwrap();
        repos.fetch_page(&request(Some("ratatui"), 1)).await.unwrap();
        assert_eq!(
            github.calls(),
            vec![
                Call::SearchUsers {
                    query: "tj".into(),
                    page: 3
                },
                Call::SearchRepos {
                    query: "ratatui".into(),
                    sort: None,
                    page: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn source_errors_pass_through() {
        let github = Arc::new(FakeGitHub::default());
        *github.fail_with.lock().unwrap() = Some(FetchError::Decode("bad".into()));
        let feed = RepositorySearch::new(github);
        let err = feed
            .fetch_page(&request(Some("x"), 1))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Decode("bad".into()));
    }
}
