use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Serialize;

use crate::config::GitHubConfig;
use crate::error::{FetchError, HubError, Result};
use crate::remote::{FetchResult, RepositorySource, UserSource};
use crate::types::{RepoSort, Repository, SearchPage, SearchUser, User};

pub struct GitHub {
    client: Octocrab,
}

impl std::fmt::Debug for GitHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHub").finish_non_exhaustive()
    }
}

impl From<octocrab::Error> for FetchError {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::Serde { source, .. } => FetchError::Decode(source.to_string()),
            octocrab::Error::Json { source, .. } => FetchError::Decode(source.to_string()),
            other => FetchError::Transport(other.to_string()),
        }
    }
}

impl From<octocrab::Error> for HubError {
    fn from(err: octocrab::Error) -> Self {
        HubError::Api(err.to_string())
    }
}

/// Query string of the search endpoints
#[derive(Debug, Serialize)]
struct SearchParams<'a> {
    q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<&'static str>,
    page: u32,
    per_page: u32,
}

#[derive(Debug, Serialize)]
struct PageParams {
    page: u32,
    per_page: u32,
}

impl GitHub {
    /// Build a client. Without a token requests are anonymous and subject to
    /// the lower unauthenticated rate limit.
    pub fn new(token: Option<String>) -> Result<Self> {
        let mut builder = Octocrab::builder();
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }
        let client = builder.build().map_err(|e| HubError::Auth(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RepositorySource for GitHub {
    async fn search_repositories(
        &self,
        query: &str,
        sort: Option<RepoSort>,
        page: u32,
        page_size: u32,
    ) -> FetchResult<Vec<Repository>> {
        let params = SearchParams {
            q: query,
            sort: sort.map(|s| s.as_api_str()),
            order: sort.map(|_| "desc"),
            page,
            per_page: page_size,
        };
        tracing::debug!(query, page, "searching repositories");
        let result: SearchPage<Repository> = self
            .client
            .get("/search/repositories", Some(&params))
            .await?;

        if result.incomplete_results {
            tracing::warn!(query, page, "GitHub returned incomplete search results");
        }
        Ok(result.items)
    }

    async fn user_repositories(
        &self,
        login: &str,
        page: u32,
        page_size: u32,
    ) -> FetchResult<Vec<Repository>> {
        let route = format!("/users/{}/repos", login);
        let params = PageParams {
            page,
            per_page: page_size,
        };
        tracing::debug!(login, page, "listing user repositories");
        let repos: Vec<Repository> = self.client.get(route, Some(&params)).await?;
        Ok(repos)
    }
}

#[async_trait]
impl UserSource for GitHub {
    async fn search_users(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> FetchResult<Vec<SearchUser>> {
        let params = SearchParams {
            q: query,
            sort: None,
            order: None,
            page,
            per_page: page_size,
        };
        tracing::debug!(query, page, "searching users");
        let result: SearchPage<SearchUser> =
            self.client.get("/search/users", Some(&params)).await?;
        Ok(result.items)
    }

    async fn user(&self, login: &str) -> FetchResult<User> {
        let route = format!("/users/{}", login);
        let user: User = self.client.get(route, None::<&()>).await?;
        Ok(user)
    }
}

/// Run a CLI command and capture stdout as a token
fn try_cli_token(command: &str) -> Option<String> {
    let output = std::process::Command::new("sh")
        .args(["-c", command])
        .output()
        .ok()?;

    if output.status.success() {
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !token.is_empty() {
            return Some(token);
        }
    }
    None
}

/// Find an optional API token: the configured env var first, then the
/// configured CLI command. `None` means anonymous access.
pub fn resolve_token(config: &GitHubConfig) -> Option<String> {
    if let Some(env_var) = &config.token_env {
        if let Ok(token) = std::env::var(env_var) {
            let token = token.trim().to_string();
            if !token.is_empty() {
                return Some(token);
            }
        }
    }

    if let Some(cmd) = &config.token_command {
        if let Some(token) = try_cli_token(cmd) {
            return Some(token);
        }
    }

    tracing::info!("no GitHub token found, using anonymous access");
    None
}
