use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::action::Action;
use crate::auth::{self, BiometricAuthenticator, CredentialStore};
use crate::config::Config;
use crate::event::Event;
use crate::feed::{
    CompletionSink, FeedOptions, FeedSnapshot, FetchCompletion, PageSource,
    PaginatedFeedController,
};
use crate::feeds::{popular_query, PopularRepositories, RepositorySearch, UserRepositories, UserSearch};
use crate::recent::RecentSearches;
use crate::remote::{RepositorySource, UserSource};
use crate::store::JsonStore;
use crate::types::{Repository, SearchKind, SearchUser, User};

const FLASH_TTL: Duration = Duration::from_secs(2);
const PAGE_JUMP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,      // Popular repositories
    Search,    // User / repository search with recent searches
    UserRepos, // One user's repositories
    Profile,   // Logged-in user
    Login,
    Register,
}

/// Collaborators the app is wired to
pub struct Services {
    pub repos: Arc<dyn RepositorySource>,
    pub users: Arc<dyn UserSource>,
    pub credentials: Arc<dyn CredentialStore>,
    pub biometrics: Arc<dyn BiometricAuthenticator>,
    /// Where recent searches persist; `None` keeps them in memory only
    pub store: Option<JsonStore>,
}

pub struct UserReposView {
    pub login: String,
    pub profile: Option<User>,
    pub feed: PaginatedFeedController<Repository>,
    pub index: usize,
}

pub enum SearchResults {
    Users(PaginatedFeedController<SearchUser>),
    Repositories(PaginatedFeedController<Repository>),
}

impl SearchResults {
    fn len(&self) -> usize {
        match self {
            SearchResults::Users(feed) => feed.items().len(),
            SearchResults::Repositories(feed) => feed.items().len(),
        }
    }

    fn is_fetching(&self) -> bool {
        match self {
            SearchResults::Users(feed) => feed.is_fetching(),
            SearchResults::Repositories(feed) => feed.is_fetching(),
        }
    }

    fn can_retry(&self) -> bool {
        match self {
            SearchResults::Users(feed) => feed.can_retry(),
            SearchResults::Repositories(feed) => feed.can_retry(),
        }
    }
}

#[derive(Default)]
pub struct SearchState {
    pub input: String,
    pub editing: bool,
    pub kind: SearchKind,
    /// Query the current results belong to
    pub submitted: Option<String>,
    pub results: Option<SearchResults>,
    pub index: usize,
    pub recent: RecentSearches,
    pub recent_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Username,
    Password,
    Confirm,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub confirm: String,
    pub field: FormField,
    pub error: Option<String>,
}

impl LoginForm {
    fn prefilled(username: Option<String>) -> Self {
        Self {
            username: username.unwrap_or_default(),
            ..Self::default()
        }
    }

    fn active_mut(&mut self) -> &mut String {
        match self.field {
            FormField::Username => &mut self.username,
            FormField::Password => &mut self.password,
            FormField::Confirm => &mut self.confirm,
        }
    }
}

pub struct App {
    nav: Vec<Screen>,

    // Home feed
    pub home: PaginatedFeedController<Repository>,
    pub home_index: usize,

    pub user_repos: Option<UserReposView>,
    pub search: SearchState,
    pub form: LoginForm,

    pub flash: Option<(String, Instant)>,
    pub error: Option<String>,
    pub should_quit: bool,

    repos: Arc<dyn RepositorySource>,
    users: Arc<dyn UserSource>,
    credentials: Arc<dyn CredentialStore>,
    biometrics: Arc<dyn BiometricAuthenticator>,
    store: Option<JsonStore>,
    config: Config,
    action_tx: mpsc::UnboundedSender<Action>,
}

/// Post completions for one feed onto the action channel.
fn completion_sink<T: 'static>(
    tx: &mpsc::UnboundedSender<Action>,
    wrap: fn(FetchCompletion<T>) -> Action,
) -> CompletionSink<T> {
    let tx = tx.clone();
    Arc::new(move |completion| {
        tx.send(wrap(completion)).ok();
    })
}

fn new_feed<T: Send + 'static>(
    name: &'static str,
    source: Arc<dyn PageSource<T>>,
    tx: &mpsc::UnboundedSender<Action>,
    wrap: fn(FetchCompletion<T>) -> Action,
    options: FeedOptions,
) -> PaginatedFeedController<T> {
    let mut feed = PaginatedFeedController::new(source, completion_sink(tx, wrap), options);
    feed.set_render_hook(move |snapshot: &FeedSnapshot<'_, T>| {
        tracing::trace!(
            feed = name,
            phase = ?snapshot.phase,
            items = snapshot.items.len(),
            has_more = snapshot.has_more,
            "feed transition"
        );
    });
    feed
}

fn move_index(index: usize, len: usize, action: &Action) -> usize {
    if len == 0 {
        return 0;
    }
    let last = len - 1;
    match action {
        Action::ScrollUp => index.saturating_sub(1),
        Action::ScrollDown => (index + 1).min(last),
        Action::PageUp => index.saturating_sub(PAGE_JUMP),
        Action::PageDown => (index + PAGE_JUMP).min(last),
        Action::GoToTop => 0,
        Action::GoToBottom => last,
        _ => index.min(last),
    }
}

impl App {
    pub fn new(services: Services, config: Config, action_tx: mpsc::UnboundedSender<Action>) -> Self {
        let options = FeedOptions::from(&config.feed);
        let home = new_feed(
            "home",
            Arc::new(PopularRepositories::new(Arc::clone(&services.repos))),
            &action_tx,
            Action::HomeFetched,
            options,
        );
        let recent = services
            .store
            .as_ref()
            .map(RecentSearches::load)
            .unwrap_or_default();

        Self {
            nav: vec![Screen::Home],
            home,
            home_index: 0,
            user_repos: None,
            search: SearchState {
                recent,
                ..SearchState::default()
            },
            form: LoginForm::default(),
            flash: None,
            error: None,
            should_quit: false,
            repos: services.repos,
            users: services.users,
            credentials: services.credentials,
            biometrics: services.biometrics,
            store: services.store,
            config,
            action_tx,
        }
    }

    pub fn screen(&self) -> Screen {
        self.nav.last().copied().unwrap_or(Screen::Home)
    }

    pub fn is_authenticated(&self) -> bool {
        auth::is_authenticated(self.credentials.as_ref())
    }

    pub fn current_username(&self) -> Option<String> {
        self.credentials.load().username.filter(|u| !u.is_empty())
    }

    pub fn biometrics_label(&self) -> Option<String> {
        self.biometrics
            .is_available()
            .then(|| self.biometrics.kind().to_string())
    }

    pub fn flash_text(&self) -> Option<&str> {
        self.flash
            .as_ref()
            .and_then(|(msg, at)| (at.elapsed() < FLASH_TTL).then_some(msg.as_str()))
    }

    /// Whether the feed on the current screen has a fetch in flight
    pub fn is_loading(&self) -> bool {
        match self.screen() {
            Screen::Home => self.home.is_fetching(),
            Screen::UserRepos => self
                .user_repos
                .as_ref()
                .is_some_and(|v| v.feed.is_fetching()),
            Screen::Search => self
                .search
                .results
                .as_ref()
                .is_some_and(SearchResults::is_fetching),
            _ => false,
        }
    }

    /// Whether the feed on the current screen has a failed request to retry
    pub fn can_retry(&self) -> bool {
        match self.screen() {
            Screen::Home => self.home.can_retry(),
            Screen::UserRepos => self.user_repos.as_ref().is_some_and(|v| v.feed.can_retry()),
            Screen::Search => self
                .search
                .results
                .as_ref()
                .is_some_and(SearchResults::can_retry),
            _ => false,
        }
    }

    pub fn handle_event(&self, event: Event) -> Action {
        if event.is_quit() {
            return Action::Quit;
        }
        match event {
            Event::Init => Action::LoadHome,
            Event::Tick => Action::Tick,
            Event::Key(key) => self.handle_key(key),
            Event::Render => Action::None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Action {
        match self.screen() {
            Screen::Login | Screen::Register => self.handle_form_key(key),
            Screen::Search if self.search.editing => match key.code {
                KeyCode::Esc => Action::ExitSearchMode,
                KeyCode::Enter => Action::SearchConfirm,
                KeyCode::Backspace => Action::SearchBackspace,
                KeyCode::Tab => Action::ToggleSearchKind,
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    Action::SearchInput(c)
                }
                _ => Action::None,
            },
            Screen::Profile => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => Action::Back,
                KeyCode::Char('l') => Action::Logout,
                KeyCode::Char('f') => Action::ForgetCredentials,
                _ => Action::None,
            },
            screen => self.handle_list_key(screen, key),
        }
    }

    fn handle_list_key(&self, screen: Screen, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('d') => Action::PageDown,
                KeyCode::Char('u') => Action::PageUp,
                _ => Action::None,
            };
        }

        match key.code {
            KeyCode::Char('q') => Action::Back,
            KeyCode::Esc => {
                if self.is_loading() {
                    Action::CancelLoad
                } else {
                    Action::Back
                }
            }
            KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
            KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
            KeyCode::Char('g') | KeyCode::Home => Action::GoToTop,
            KeyCode::Char('G') | KeyCode::End => Action::GoToBottom,
            KeyCode::PageDown => Action::PageDown,
            KeyCode::PageUp => Action::PageUp,
            KeyCode::Enter => Action::Select,
            KeyCode::Char('o') => Action::OpenInBrowser,
            KeyCode::Char('y') => Action::YankUrl,
            KeyCode::Char('r') => Action::Refresh,
            KeyCode::Char('t') => Action::Retry,
            KeyCode::Char('/') => match screen {
                Screen::Search => Action::EnterSearchMode,
                _ => Action::OpenSearch,
            },
            KeyCode::Char('s') if screen == Screen::Home => Action::OpenSearch,
            KeyCode::Char('p') if screen == Screen::Home => Action::OpenProfile,
            KeyCode::Char('i') if screen == Screen::Search => Action::EnterSearchMode,
            KeyCode::Tab if screen == Screen::Search => Action::ToggleSearchKind,
            KeyCode::Char('x') if screen == Screen::Search => Action::ClearRecentSearches,
            _ => Action::None,
        }
    }

    fn handle_form_key(&self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('r') if self.screen() == Screen::Login => Action::ShowRegister,
                KeyCode::Char('b') if self.screen() == Screen::Login => Action::BiometricLogin,
                _ => Action::None,
            };
        }

        match key.code {
            KeyCode::Esc => Action::Back,
            KeyCode::Tab | KeyCode::Down | KeyCode::Up => Action::FormNextField,
            KeyCode::Enter => Action::FormSubmit,
            KeyCode::Backspace => Action::FormBackspace,
            KeyCode::Char(c) => Action::FormInput(c),
            _ => Action::None,
        }
    }

    pub fn update(&mut self, action: Action) {
        if self.error.is_some() && !matches!(action, Action::Tick | Action::None) {
            self.error = None;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::Back => self.go_back(),
            Action::Tick => {
                let now = Instant::now();
                self.home.expire_notice(now);
                if let Some(view) = self.user_repos.as_mut() {
                    view.feed.expire_notice(now);
                }
                match self.search.results.as_mut() {
                    Some(SearchResults::Users(feed)) => {
                        feed.expire_notice(now);
                    }
                    Some(SearchResults::Repositories(feed)) => {
                        feed.expire_notice(now);
                    }
                    None => {}
                }
                if self.flash.as_ref().is_some_and(|(_, at)| at.elapsed() >= FLASH_TTL) {
                    self.flash = None;
                }
            }
            Action::ScrollUp
            | Action::ScrollDown
            | Action::PageUp
            | Action::PageDown
            | Action::GoToTop
            | Action::GoToBottom => self.scroll(&action),
            Action::Select => self.select(),

            Action::LoadHome => {
                let query = popular_query(&self.config.popular, chrono::Utc::now());
                self.home_index = 0;
                self.home.start(Some(query));
            }
            Action::Refresh => self.refresh(),
            Action::Retry => self.retry(),
            Action::CancelLoad => self.cancel_load(),

            Action::HomeFetched(completion) => {
                self.home.apply(completion);
                self.home_index = self.home_index.min(self.home.items().len().saturating_sub(1));
            }
            Action::UserReposFetched(completion) => match self.user_repos.as_mut() {
                Some(view) => {
                    view.feed.apply(completion);
                }
                None => tracing::debug!("user repos completion after screen closed"),
            },
            Action::RepoSearchFetched(completion) => match self.search.results.as_mut() {
                Some(SearchResults::Repositories(feed)) => {
                    feed.apply(completion);
                }
                _ => tracing::debug!("repository search completion without matching feed"),
            },
            Action::UserSearchFetched(completion) => match self.search.results.as_mut() {
                Some(SearchResults::Users(feed)) => {
                    feed.apply(completion);
                }
                _ => tracing::debug!("user search completion without matching feed"),
            },
            Action::ProfileLoaded { login, user } => {
                if let Some(view) = self.user_repos.as_mut().filter(|v| v.login == login) {
                    view.profile = Some(*user);
                }
            }

            Action::OpenSearch => {
                self.search.editing = true;
                self.search.recent_index = 0;
                self.push(Screen::Search);
            }
            Action::OpenProfile => {
                if self.is_authenticated() {
                    self.push(Screen::Profile);
                } else {
                    self.open_login();
                }
            }

            Action::EnterSearchMode => {
                self.search.editing = true;
            }
            Action::ExitSearchMode => {
                self.search.editing = false;
            }
            Action::SearchInput(c) => {
                self.search.input.push(c);
            }
            Action::SearchBackspace => {
                self.search.input.pop();
                if self.search.input.is_empty() {
                    self.clear_search_results();
                }
            }
            Action::SearchConfirm => {
                let query = self.search.input.clone();
                if query.is_empty() {
                    return;
                }
                self.search.recent.record(&query);
                self.persist_recent();
                self.search.editing = false;
                self.run_search(query);
            }
            Action::ToggleSearchKind => {
                self.search.kind = self.search.kind.toggled();
                if let Some(query) = self.search.submitted.clone() {
                    self.run_search(query);
                }
            }
            Action::ClearRecentSearches => {
                self.search.recent.clear();
                self.search.recent_index = 0;
                self.persist_recent();
            }

            Action::FormInput(c) => {
                self.form.active_mut().push(c);
            }
            Action::FormBackspace => {
                self.form.active_mut().pop();
            }
            Action::FormNextField => {
                self.form.field = match (self.screen(), self.form.field) {
                    (_, FormField::Username) => FormField::Password,
                    (Screen::Register, FormField::Password) => FormField::Confirm,
                    _ => FormField::Username,
                };
            }
            Action::FormSubmit => self.submit_form(),
            Action::ShowRegister => {
                self.form = LoginForm::default();
                self.push(Screen::Register);
            }
            Action::BiometricLogin => self.spawn_biometric_login(),
            Action::LoggedIn(username) => {
                self.form = LoginForm::default();
                self.nav = vec![Screen::Home];
                self.flash(&format!("Welcome, {}", username));
            }
            Action::LoginFailed(msg) => {
                self.form.error = Some(msg);
            }
            Action::Logout => {
                // Stored credentials stay; only the session view is left
                tracing::info!("logged out");
                self.nav = vec![Screen::Home];
                self.open_login();
            }
            Action::ForgetCredentials => {
                self.credentials.clear();
                self.nav = vec![Screen::Home];
                self.open_login();
                self.flash("Stored credentials removed");
            }

            Action::OpenInBrowser => {
                if let Some(url) = self.selected_url() {
                    if let Err(e) = open::that(&url) {
                        self.error = Some(format!("Could not open browser: {}", e));
                    }
                }
            }
            Action::YankUrl => {
                if let Some(url) = self.selected_url() {
                    match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(url)) {
                        Ok(()) => self.flash("Copied URL"),
                        Err(_) => self.flash("Clipboard unavailable"),
                    }
                }
            }

            Action::Error(msg) => {
                self.error = Some(msg);
            }
            Action::None => {}
        }
    }

    fn push(&mut self, screen: Screen) {
        self.nav.push(screen);
    }

    fn go_back(&mut self) {
        if self.nav.len() <= 1 {
            self.should_quit = true;
            return;
        }
        let Some(left) = self.nav.pop() else {
            return;
        };
        match left {
            Screen::UserRepos => {
                if let Some(mut view) = self.user_repos.take() {
                    view.feed.dispose();
                }
            }
            Screen::Search => {
                self.clear_search_results();
                self.search.input.clear();
                self.search.editing = false;
            }
            Screen::Login | Screen::Register => {
                self.form = LoginForm::prefilled(self.current_username());
            }
            Screen::Home | Screen::Profile => {}
        }
    }

    fn open_login(&mut self) {
        self.form = LoginForm::prefilled(self.current_username());
        if !self.form.username.is_empty() {
            self.form.field = FormField::Password;
        }
        self.push(Screen::Login);
    }

    fn flash(&mut self, message: &str) {
        self.flash = Some((message.to_string(), Instant::now()));
    }

    fn feed_options(&self) -> FeedOptions {
        FeedOptions::from(&self.config.feed)
    }

    fn scroll(&mut self, action: &Action) {
        match self.screen() {
            Screen::Home => {
                self.home_index = move_index(self.home_index, self.home.items().len(), action);
                self.home.load_next_page_if_needed(self.home_index);
            }
            Screen::UserRepos => {
                if let Some(view) = self.user_repos.as_mut() {
                    view.index = move_index(view.index, view.feed.items().len(), action);
                    view.feed.load_next_page_if_needed(view.index);
                }
            }
            Screen::Search => match self.search.results.as_mut() {
                Some(results) => {
                    self.search.index = move_index(self.search.index, results.len(), action);
                    let index = self.search.index;
                    match results {
                        SearchResults::Users(feed) => {
                            feed.load_next_page_if_needed(index);
                        }
                        SearchResults::Repositories(feed) => {
                            feed.load_next_page_if_needed(index);
                        }
                    }
                }
                None => {
                    self.search.recent_index =
                        move_index(self.search.recent_index, self.search.recent.len(), action);
                }
            },
            _ => {}
        }
    }

    fn select(&mut self) {
        match self.screen() {
            Screen::Home | Screen::UserRepos => self.update(Action::OpenInBrowser),
            Screen::Search => match self.search.results.as_ref() {
                Some(SearchResults::Users(feed)) => {
                    if let Some(user) = feed.items().get(self.search.index) {
                        let login = user.login.clone();
                        self.open_user_repos(login);
                    }
                }
                Some(SearchResults::Repositories(_)) => self.update(Action::OpenInBrowser),
                None => {
                    if let Some(query) = self.search.recent.get(self.search.recent_index) {
                        let query = query.to_string();
                        self.search.input = query.clone();
                        self.search.recent.record(&query);
                        self.persist_recent();
                        self.run_search(query);
                    }
                }
            },
            _ => {}
        }
    }

    fn selected_url(&self) -> Option<String> {
        match self.screen() {
            Screen::Home => self
                .home
                .items()
                .get(self.home_index)
                .map(|r| r.html_url.clone()),
            Screen::UserRepos => self
                .user_repos
                .as_ref()
                .and_then(|v| v.feed.items().get(v.index))
                .map(|r| r.html_url.clone()),
            Screen::Search => match self.search.results.as_ref() {
                Some(SearchResults::Users(feed)) => feed
                    .items()
                    .get(self.search.index)
                    .map(|u| u.html_url.clone()),
                Some(SearchResults::Repositories(feed)) => feed
                    .items()
                    .get(self.search.index)
                    .map(|r| r.html_url.clone()),
                None => None,
            },
            _ => None,
        }
    }

    fn refresh(&mut self) {
        match self.screen() {
            Screen::Home => self.update(Action::LoadHome),
            Screen::UserRepos => {
                if let Some(view) = self.user_repos.as_mut() {
                    view.index = 0;
                    view.feed.start(Some(view.login.clone()));
                }
            }
            Screen::Search => {
                if let Some(query) = self.search.submitted.clone() {
                    self.run_search(query);
                }
            }
            _ => {}
        }
    }

    fn retry(&mut self) {
        match self.screen() {
            Screen::Home => {
                self.home.retry();
            }
            Screen::UserRepos => {
                if let Some(view) = self.user_repos.as_mut() {
                    view.feed.retry();
                }
            }
            Screen::Search => match self.search.results.as_mut() {
                Some(SearchResults::Users(feed)) => {
                    feed.retry();
                }
                Some(SearchResults::Repositories(feed)) => {
                    feed.retry();
                }
                None => {}
            },
            _ => {}
        }
    }

    fn cancel_load(&mut self) {
        match self.screen() {
            Screen::Home => {
                self.home.cancel();
            }
            Screen::UserRepos => {
                if let Some(view) = self.user_repos.as_mut() {
                    view.feed.cancel();
                }
            }
            Screen::Search => match self.search.results.as_mut() {
                Some(SearchResults::Users(feed)) => {
                    feed.cancel();
                }
                Some(SearchResults::Repositories(feed)) => {
                    feed.cancel();
                }
                None => {}
            },
            _ => {}
        }
    }

    /// Replace the search feed with a fresh one for the current kind. The old
    /// feed is dropped, which cancels its fetch.
    fn run_search(&mut self, query: String) {
        let options = self.feed_options();
        let results = match self.search.kind {
            SearchKind::Users => {
                let mut feed = new_feed(
                    "user-search",
                    Arc::new(UserSearch::new(Arc::clone(&self.users))),
                    &self.action_tx,
                    Action::UserSearchFetched,
                    options,
                );
                feed.start(Some(query.clone()));
                SearchResults::Users(feed)
            }
            SearchKind::Repositories => {
                let mut feed = new_feed(
                    "repo-search",
                    Arc::new(RepositorySearch::new(Arc::clone(&self.repos))),
                    &self.action_tx,
                    Action::RepoSearchFetched,
                    options,
                );
                feed.start(Some(query.clone()));
                SearchResults::Repositories(feed)
            }
        };
        tracing::info!(kind = %self.search.kind, query = %query, "search submitted");
        self.search.results = Some(results);
        self.search.submitted = Some(query);
        self.search.index = 0;
    }

    fn clear_search_results(&mut self) {
        self.search.results = None;
        self.search.submitted = None;
        self.search.index = 0;
    }

    fn persist_recent(&self) {
        if let Some(store) = &self.store {
            self.search.recent.save(store);
        }
    }

    fn open_user_repos(&mut self, login: String) {
        let mut feed = new_feed(
            "user-repos",
            Arc::new(UserRepositories::new(Arc::clone(&self.repos))),
            &self.action_tx,
            Action::UserReposFetched,
            self.feed_options(),
        );
        feed.start(Some(login.clone()));
        self.spawn_load_profile(login.clone());
        self.user_repos = Some(UserReposView {
            login,
            profile: None,
            feed,
            index: 0,
        });
        self.push(Screen::UserRepos);
    }

    fn submit_form(&mut self) {
        match self.screen() {
            Screen::Login => {
                match auth::login(
                    self.credentials.as_ref(),
                    &self.form.username,
                    &self.form.password,
                ) {
                    Ok(username) => self.update(Action::LoggedIn(username)),
                    Err(e) => self.form.error = Some(e.to_string()),
                }
            }
            Screen::Register => {
                match auth::register(
                    self.credentials.as_ref(),
                    &self.form.username,
                    &self.form.password,
                    &self.form.confirm,
                ) {
                    Ok(()) => {
                        let username = self.form.username.clone();
                        self.nav.pop();
                        self.form = LoginForm::prefilled(Some(username));
                        self.form.field = FormField::Password;
                        self.flash("Registered, please log in");
                    }
                    Err(e) => self.form.error = Some(e.to_string()),
                }
            }
            _ => {}
        }
    }

    fn spawn_biometric_login(&self) {
        let tx = self.action_tx.clone();
        let biometrics = Arc::clone(&self.biometrics);
        let credentials = Arc::clone(&self.credentials);
        tokio::spawn(async move {
            match auth::biometric_login(biometrics.as_ref(), credentials.as_ref()).await {
                Ok(username) => {
                    tx.send(Action::LoggedIn(username)).ok();
                }
                Err(e) => {
                    tx.send(Action::LoginFailed(e.to_string())).ok();
                }
            }
        });
    }

    fn spawn_load_profile(&self, login: String) {
        let tx = self.action_tx.clone();
        let users = Arc::clone(&self.users);
        tokio::spawn(async move {
            match users.user(&login).await {
                Ok(user) => {
                    tx.send(Action::ProfileLoaded {
                        login,
                        user: Box::new(user),
                    })
                    .ok();
                }
                Err(e) => {
                    // The repository list is still useful without the header
                    tracing::warn!(login = %login, error = %e, "failed to load profile");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryCredentialStore, NoBiometrics};
    use crate::feed::ViewPhase;
    use crate::feeds::fakes::{Call, FakeGitHub};

    struct Fixture {
        app: App,
        rx: mpsc::UnboundedReceiver<Action>,
        github: Arc<FakeGitHub>,
        credentials: Arc<MemoryCredentialStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let github = Arc::new(FakeGitHub::default());
            let credentials = Arc::new(MemoryCredentialStore::default());
            let (tx, rx) = mpsc::unbounded_channel();
            let services = Services {
                repos: github.clone(),
                users: github.clone(),
                credentials: credentials.clone(),
                biometrics: Arc::new(NoBiometrics),
                store: None,
            };
            Self {
                app: App::new(services, Config::default(), tx),
                rx,
                github,
                credentials,
            }
        }

        /// Feed the next action produced by a background task back into the app
        async fn pump(&mut self) {
            let action = self.rx.recv().await.expect("action");
            self.app.update(action);
        }

        fn key(&mut self, code: KeyCode) {
            let action = self
                .app
                .handle_event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
            self.app.update(action);
        }

        fn type_text(&mut self, text: &str) {
            for c in text.chars() {
                self.key(KeyCode::Char(c));
            }
        }
    }

    #[tokio::test]
    async fn init_loads_popular_repositories() {
        let mut f = Fixture::new();
        let action = f.app.handle_event(Event::Init);
        f.app.update(action);
        assert_eq!(f.app.home.snapshot().phase, ViewPhase::LoadingInitial);

        f.pump().await;
        assert_eq!(f.app.home.snapshot().phase, ViewPhase::Ready);
        assert_eq!(f.app.home.items().len(), 20);

        match &f.github.calls()[0] {
            Call::SearchRepos { query, sort, page } => {
                assert!(query.starts_with("stars:>10000 pushed:>"));
                assert_eq!(*sort, Some(crate::types::RepoSort::Updated));
                assert_eq!(*page, 1);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn scrolling_near_the_end_loads_next_page() {
        let mut f = Fixture::new();
        f.app.update(Action::LoadHome);
        f.pump().await;

        f.key(KeyCode::Char('G'));
        assert_eq!(f.app.home_index, 19);
        assert_eq!(f.app.home.snapshot().phase, ViewPhase::LoadingMore);
        f.pump().await;
        assert_eq!(f.app.home.items().len(), 40);
        match f.github.calls().as_slice() {
            [Call::SearchRepos {
                query: first,
                page: 1,
                ..
            }, Call::SearchRepos {
                query: second,
                page: 2,
                ..
            }] => assert_eq!(first, second),
            other => panic!("unexpected calls {:?}", other),
        }
    }

    #[tokio::test]
    async fn escape_cancels_home_load() {
        let mut f = Fixture::new();
        f.app.update(Action::LoadHome);
        f.key(KeyCode::Esc);

        assert!(!f.app.should_quit);
        assert!(!f.app.home.is_fetching());
        assert_eq!(f.app.home.snapshot().phase, ViewPhase::Idle);

        // The cancelled fetch still reports in and is ignored
        f.pump().await;
        assert_eq!(f.app.home.snapshot().phase, ViewPhase::Idle);
        assert!(f.app.home.items().is_empty());
    }

    #[tokio::test]
    async fn profile_requires_login() {
        let mut f = Fixture::new();
        f.key(KeyCode::Char('p'));
        assert_eq!(f.app.screen(), Screen::Login);

        f.key(KeyCode::Esc);
        f.credentials.save("octocat", "secret1");
        f.key(KeyCode::Char('p'));
        assert_eq!(f.app.screen(), Screen::Profile);
    }

    #[tokio::test]
    async fn register_then_login() {
        let mut f = Fixture::new();
        f.app.update(Action::OpenProfile);
        f.app.update(Action::ShowRegister);
        assert_eq!(f.app.screen(), Screen::Register);

        f.type_text("octocat");
        f.key(KeyCode::Tab);
        f.type_text("secret1");
        f.key(KeyCode::Tab);
        f.type_text("secret1");
        f.key(KeyCode::Enter);

        assert_eq!(f.app.screen(), Screen::Login);
        assert_eq!(f.app.form.username, "octocat");
        assert_eq!(f.app.form.field, FormField::Password);

        f.type_text("wrong");
        f.key(KeyCode::Enter);
        assert_eq!(f.app.screen(), Screen::Login);
        assert!(f.app.form.error.is_some());

        f.app.form.password.clear();
        f.type_text("secret1");
        f.key(KeyCode::Enter);
        assert_eq!(f.app.screen(), Screen::Home);
        assert!(f.app.is_authenticated());
    }

    #[tokio::test]
    async fn register_form_errors_are_shown() {
        let mut f = Fixture::new();
        f.app.update(Action::OpenProfile);
        f.app.update(Action::ShowRegister);
        f.type_text("octocat");
        f.key(KeyCode::Tab);
        f.type_text("abc");
        f.key(KeyCode::Enter);
        assert_eq!(f.app.screen(), Screen::Register);
        assert_eq!(
            f.app.form.error.as_deref(),
            Some("Password must be at least 6 characters")
        );
    }

    #[tokio::test]
    async fn logout_keeps_credentials_and_forget_clears_them() {
        let mut f = Fixture::new();
        f.credentials.save("octocat", "secret1");
        f.app.update(Action::OpenProfile);

        f.key(KeyCode::Char('l'));
        assert_eq!(f.app.screen(), Screen::Login);
        assert_eq!(f.app.form.username, "octocat");
        assert!(f.app.is_authenticated());

        f.key(KeyCode::Esc);
        f.app.update(Action::OpenProfile);
        f.key(KeyCode::Char('f'));
        assert_eq!(f.app.screen(), Screen::Login);
        assert!(!f.app.is_authenticated());
    }

    #[tokio::test]
    async fn biometric_login_unavailable_reports_error() {
        let mut f = Fixture::new();
        f.credentials.save("octocat", "secret1");
        f.app.update(Action::Logout);
        assert!(f.app.biometrics_label().is_none());

        f.app.update(Action::BiometricLogin);
        f.pump().await;
        assert_eq!(f.app.screen(), Screen::Login);
        assert_eq!(
            f.app.form.error.as_deref(),
            Some("Biometric authentication is not available")
        );
    }

    #[tokio::test]
    async fn search_records_recent_and_pages_users() {
        let mut f = Fixture::new();
        f.key(KeyCode::Char('/'));
        assert_eq!(f.app.screen(), Screen::Search);
        assert!(f.app.search.editing);

        f.type_text("tj");
        f.key(KeyCode::Enter);
        assert!(!f.app.search.editing);
        assert_eq!(f.app.search.recent.get(0), Some("tj"));

        f.pump().await;
        match f.app.search.results.as_ref() {
            Some(SearchResults::Users(feed)) => {
                assert_eq!(feed.items().len(), 1);
                // One result is a short page
                assert!(!feed.snapshot().has_more);
            }
            _ => panic!("expected user results"),
        }
    }

    #[tokio::test]
    async fn toggling_kind_reruns_query_and_drops_stale_results() {
        let mut f = Fixture::new();
        f.app.update(Action::OpenSearch);
        f.type_text("ratatui");
        f.key(KeyCode::Enter);

        // Switch before the user search lands
        f.key(KeyCode::Tab);
        assert_eq!(f.app.search.kind, SearchKind::Repositories);

        f.pump().await;
        f.pump().await;
        match f.app.search.results.as_ref() {
            Some(SearchResults::Repositories(feed)) => {
                assert_eq!(feed.items().len(), 20);
            }
            _ => panic!("expected repository results"),
        }
        assert_eq!(
            f.github.calls().last(),
            Some(&Call::SearchRepos {
                query: "ratatui".into(),
                sort: None,
                page: 1
            })
        );
    }

    #[tokio::test]
    async fn selecting_a_user_opens_their_repositories() {
        let mut f = Fixture::new();
        f.app.update(Action::OpenSearch);
        f.type_text("octo");
        f.key(KeyCode::Enter);
        f.pump().await;

        f.key(KeyCode::Enter);
        assert_eq!(f.app.screen(), Screen::UserRepos);
        assert_eq!(f.app.user_repos.as_ref().unwrap().login, "octo-1");

        // Repositories and profile arrive in either order
        f.pump().await;
        f.pump().await;
        let view = f.app.user_repos.as_ref().unwrap();
        assert_eq!(view.feed.items().len(), 2);
        assert_eq!(view.feed.snapshot().phase, ViewPhase::Ready);
        assert_eq!(
            view.profile.as_ref().map(|u| u.display_name()),
            Some("The Octocat")
        );

        f.key(KeyCode::Char('q'));
        assert_eq!(f.app.screen(), Screen::Search);
        assert!(f.app.user_repos.is_none());
    }

    #[tokio::test]
    async fn recent_search_can_be_rerun_from_list() {
        let mut f = Fixture::new();
        f.app.search.recent.record("serde");
        f.app.update(Action::OpenSearch);
        f.key(KeyCode::Esc);
        assert!(!f.app.search.editing);

        f.key(KeyCode::Enter);
        assert_eq!(f.app.search.submitted.as_deref(), Some("serde"));
        assert_eq!(f.app.search.input, "serde");
        f.pump().await;
        assert_eq!(
            f.github.calls().last(),
            Some(&Call::SearchUsers {
                query: "serde".into(),
                page: 1
            })
        );
    }

    #[tokio::test]
    async fn home_failure_then_retry() {
        let mut f = Fixture::new();
        *f.github.fail_with.lock().unwrap() =
            Some(crate::error::FetchError::Transport("offline".into()));
        f.app.update(Action::LoadHome);
        f.pump().await;
        assert_eq!(f.app.home.snapshot().phase, ViewPhase::Error);
        assert!(f.app.can_retry());

        *f.github.fail_with.lock().unwrap() = None;
        f.key(KeyCode::Char('t'));
        f.pump().await;
        assert_eq!(f.app.home.snapshot().phase, ViewPhase::Ready);
        assert_eq!(f.github.calls().len(), 2);
    }

    #[tokio::test]
    async fn quit_from_home() {
        let mut f = Fixture::new();
        f.key(KeyCode::Char('q'));
        assert!(f.app.should_quit);
    }

    #[tokio::test]
    async fn ctrl_c_quits_from_any_screen() {
        let mut f = Fixture::new();
        f.app.update(Action::OpenProfile);
        assert_eq!(f.app.screen(), Screen::Login);

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let action = f.app.handle_event(Event::Key(ctrl_c));
        assert!(matches!(action, Action::Quit));
        f.app.update(action);
        assert!(f.app.should_quit);
    }

    #[test]
    fn move_index_clamps() {
        assert_eq!(move_index(0, 0, &Action::ScrollDown), 0);
        assert_eq!(move_index(0, 5, &Action::ScrollUp), 0);
        assert_eq!(move_index(4, 5, &Action::ScrollDown), 4);
        assert_eq!(move_index(2, 30, &Action::PageDown), 12);
        assert_eq!(move_index(25, 30, &Action::PageDown), 29);
        assert_eq!(move_index(3, 30, &Action::PageUp), 0);
        assert_eq!(move_index(3, 30, &Action::GoToBottom), 29);
    }
}
