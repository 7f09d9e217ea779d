use crate::error::HubError;
use crate::feed::FetchCompletion;
use crate::types::{Repository, SearchUser, User};

#[derive(Debug, Clone)]
pub enum Action {
    Quit,
    Back,
    Tick,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    GoToTop,
    GoToBottom,
    Select,

    // Feed control, applied to the feed on the current screen
    LoadHome,
    Refresh,
    Retry,
    CancelLoad,

    // Fetch completions, routed back to the feed that issued them
    HomeFetched(FetchCompletion<Repository>),
    UserReposFetched(FetchCompletion<Repository>),
    RepoSearchFetched(FetchCompletion<Repository>),
    UserSearchFetched(FetchCompletion<SearchUser>),
    ProfileLoaded { login: String, user: Box<User> },

    // Navigation
    OpenSearch,
    OpenProfile,

    // Search
    EnterSearchMode,
    ExitSearchMode,
    SearchInput(char),
    SearchBackspace,
    SearchConfirm,
    ToggleSearchKind,
    ClearRecentSearches,

    // Login / register form
    FormInput(char),
    FormBackspace,
    FormNextField,
    FormSubmit,
    ShowRegister,
    BiometricLogin,
    LoggedIn(String),
    LoginFailed(String),
    Logout,
    ForgetCredentials,

    // Polish
    OpenInBrowser,
    YankUrl,

    Error(String),
    None,
}

impl From<HubError> for Action {
    fn from(err: HubError) -> Self {
        Action::Error(err.to_string())
    }
}
