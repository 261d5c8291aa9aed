//! Client-side path-to-view dispatch with parameterized path segments.
//!
//! Route patterns are compiled once at router construction: literal segments
//! match verbatim, `:name` matches one non-slash segment and binds it, and a
//! pattern of exactly `*` matches any path (the not-found fallback). Matching
//! is first-match-wins in declaration order.

use std::future::Future;

use anyhow::{Context as _, Result};
use futures_util::future::BoxFuture;
use regex::Regex;

/// Redirect hops followed per navigation before giving up.
const MAX_REDIRECTS: usize = 8;

/// Mount point that views render into.
///
/// Implemented on a cheaply cloneable handle (the CLI uses a shared text
/// screen) so render callbacks can own their container across awaits.
pub trait Container {
    /// Discards the currently rendered contents.
    fn clear(&self);
}

/// Parameters bound while matching a route, plus the query-string pairs of
/// the navigated path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: Vec<(String, String)>,
    query: Vec<(String, String)>,
}

impl RouteParams {
    /// Value bound to a named `:segment`, in declaration order.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First query-string value for `name`.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates bound path parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Outcome of a render callback.
pub enum Rendered {
    /// The view rendered into the container.
    Done,
    /// Do not render this view; navigate to the given path instead.
    /// Auth-gated routes use this to bounce to the login route.
    Redirect(String),
}

type RenderFn<C> = Box<dyn Fn(C, RouteParams) -> BoxFuture<'static, Result<Rendered>> + Send + Sync>;

/// A compiled route pattern paired with its render callback.
pub struct Route<C> {
    pattern: Pattern,
    render: RenderFn<C>,
}

impl<C> Route<C> {
    /// Compiles `pattern` and pairs it with a render callback.
    ///
    /// # Errors
    /// Returns an error if the pattern does not compile.
    pub fn new<F, Fut>(pattern: &str, render: F) -> Result<Self>
    where
        F: Fn(C, RouteParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Rendered>> + Send + 'static,
    {
        Ok(Self {
            pattern: Pattern::compile(pattern)?,
            render: Box::new(move |container, params| Box::pin(render(container, params))),
        })
    }
}

/// A route pattern compiled to an anchored regex plus ordered parameter names.
struct Pattern {
    raw: String,
    /// None for the `*` catch-all.
    matcher: Option<Regex>,
    param_names: Vec<String>,
}

impl Pattern {
    fn compile(pattern: &str) -> Result<Self> {
        if pattern == "*" {
            return Ok(Self {
                raw: pattern.to_string(),
                matcher: None,
                param_names: Vec::new(),
            });
        }

        let mut param_names = Vec::new();
        let mut source = String::from("^");
        for segment in pattern.split('/') {
            if segment.is_empty() {
                continue;
            }
            source.push('/');
            if let Some(name) = segment.strip_prefix(':') {
                param_names.push(name.to_string());
                source.push_str("([^/]+)");
            } else {
                source.push_str(&regex::escape(segment));
            }
        }
        // The root pattern "/" compiles to exactly one slash.
        if source == "^" {
            source.push('/');
        }
        source.push('$');

        let matcher = Regex::new(&source)
            .with_context(|| format!("Failed to compile route pattern {pattern}"))?;

        Ok(Self {
            raw: pattern.to_string(),
            matcher: Some(matcher),
            param_names,
        })
    }

    /// Matches a path (no query string) and binds named parameters in
    /// declaration order.
    fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let Some(matcher) = &self.matcher else {
            // Wildcard: matches unconditionally, binds nothing.
            return Some(Vec::new());
        };

        let captures = matcher.captures(path)?;
        Some(
            self.param_names
                .iter()
                .zip(captures.iter().skip(1))
                .filter_map(|(name, capture)| {
                    capture.map(|c| (name.clone(), c.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// Maps paths to render callbacks and mirrors navigation into a history list.
///
/// The route list is immutable after construction. History back/forward
/// re-run the render cycle against the adjacent entry without pushing, the
/// way browser `popstate` handling does.
pub struct Router<C> {
    routes: Vec<Route<C>>,
    container: C,
    history: Vec<String>,
    cursor: usize,
}

impl<C> std::fmt::Debug for Router<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("history", &self.history)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl<C> Router<C>
where
    C: Container + Clone + Send + 'static,
{
    /// Builds the router and immediately renders `initial_path`, so a fresh
    /// session shows the correct view without any interaction.
    pub async fn start(routes: Vec<Route<C>>, container: C, initial_path: &str) -> Result<Self> {
        let mut router = Self {
            routes,
            container,
            history: Vec::new(),
            cursor: 0,
        };
        router.navigate(initial_path).await?;
        Ok(router)
    }

    /// The path of the current history entry.
    pub fn current_path(&self) -> &str {
        self.history
            .get(self.cursor)
            .map_or("", String::as_str)
    }

    /// Pushes a history entry for `path` and runs the render cycle,
    /// following any redirects the matched view requests.
    pub async fn navigate(&mut self, path: &str) -> Result<()> {
        let mut target = path.to_string();
        for _ in 0..MAX_REDIRECTS {
            self.push_entry(&target);
            match self.render_current().await? {
                None => return Ok(()),
                Some(next) => target = next,
            }
        }
        anyhow::bail!("redirect loop while navigating to {path}")
    }

    /// Moves one entry back in history and re-renders without pushing.
    /// Returns false when already at the oldest entry.
    pub async fn back(&mut self) -> Result<bool> {
        if self.cursor == 0 || self.history.is_empty() {
            return Ok(false);
        }
        self.cursor -= 1;
        self.rerender().await?;
        Ok(true)
    }

    /// Moves one entry forward in history and re-renders without pushing.
    /// Returns false when already at the newest entry.
    pub async fn forward(&mut self) -> Result<bool> {
        if self.cursor + 1 >= self.history.len() {
            return Ok(false);
        }
        self.cursor += 1;
        self.rerender().await?;
        Ok(true)
    }

    /// Re-runs the render cycle against the current entry (the `popstate`
    /// analog), following redirects.
    pub async fn rerender(&mut self) -> Result<()> {
        match self.render_current().await? {
            None => Ok(()),
            Some(next) => self.navigate(&next).await,
        }
    }

    fn push_entry(&mut self, path: &str) {
        if !self.history.is_empty() {
            self.history.truncate(self.cursor + 1);
        }
        self.history.push(path.to_string());
        self.cursor = self.history.len() - 1;
    }

    /// Scans routes in declaration order, clears the container, and invokes
    /// the first match. Returns a redirect target if the view requested one.
    /// If no route matches, nothing renders.
    async fn render_current(&self) -> Result<Option<String>> {
        let entry = self.current_path().to_string();
        let (path, query) = match entry.split_once('?') {
            Some((p, q)) => (p.to_string(), q.to_string()),
            None => (entry, String::new()),
        };

        for route in &self.routes {
            if let Some(params) = route.pattern.matches(&path) {
                tracing::debug!(pattern = %route.pattern.raw, %path, "rendering route");
                let params = RouteParams {
                    params,
                    query: parse_query(&query),
                };
                self.container.clear();
                return match (route.render)(self.container.clone(), params).await? {
                    Rendered::Done => Ok(None),
                    Rendered::Redirect(next) => Ok(Some(next)),
                };
            }
        }

        tracing::debug!(%path, "no route matched");
        Ok(None)
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    if query.is_empty() {
        return Vec::new();
    }
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Shared render log standing in for a mount container.
    #[derive(Clone, Default)]
    struct TestScreen {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl TestScreen {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        fn push(&self, line: impl Into<String>) {
            self.lines.lock().unwrap().push(line.into());
        }
    }

    impl Container for TestScreen {
        fn clear(&self) {
            self.lines.lock().unwrap().clear();
        }
    }

    /// A route that records its name and bound parameters.
    fn recording_route(pattern: &str, name: &'static str) -> Route<TestScreen> {
        Route::new(pattern, move |screen: TestScreen, params: RouteParams| {
            async move {
                let bound: Vec<String> = params
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect();
                screen.push(format!("{name}[{}]", bound.join(",")));
                Ok(Rendered::Done)
            }
        })
        .unwrap()
    }

    #[test]
    fn test_pattern_binds_named_segments() {
        let pattern = Pattern::compile("/boards/:boardId/posts/:postId").unwrap();

        let params = pattern.matches("/boards/12/posts/99").unwrap();
        assert_eq!(
            params,
            vec![
                ("boardId".to_string(), "12".to_string()),
                ("postId".to_string(), "99".to_string()),
            ]
        );
    }

    #[test]
    fn test_pattern_rejects_partial_paths() {
        let pattern = Pattern::compile("/boards/:boardId/posts/:postId").unwrap();
        assert!(pattern.matches("/boards/12").is_none());
        assert!(pattern.matches("/boards/12/posts").is_none());
        assert!(pattern.matches("/boards/12/posts/99/extra").is_none());
    }

    #[test]
    fn test_root_pattern_matches_only_root() {
        let pattern = Pattern::compile("/").unwrap();
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("/boards").is_none());
    }

    #[test]
    fn test_wildcard_matches_anything() {
        let pattern = Pattern::compile("*").unwrap();
        assert_eq!(pattern.matches("/nonexistent/xyz"), Some(Vec::new()));
        assert_eq!(pattern.matches("/"), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_initial_render_happens_at_start() {
        let screen = TestScreen::default();
        let routes = vec![recording_route("/", "home")];

        let router = Router::start(routes, screen.clone(), "/").await.unwrap();
        assert_eq!(screen.lines(), vec!["home[]"]);
        assert_eq!(router.current_path(), "/");
    }

    #[tokio::test]
    async fn test_first_match_wins_in_declaration_order() {
        let screen = TestScreen::default();
        let routes = vec![
            recording_route("/boards/:boardId", "by-id"),
            recording_route("/boards/new", "literal"),
            recording_route("*", "not-found"),
        ];

        // "/boards/new" also matches the parameterized route declared first.
        Router::start(routes, screen.clone(), "/boards/new")
            .await
            .unwrap();
        assert_eq!(screen.lines(), vec!["by-id[boardId=new]"]);
    }

    #[tokio::test]
    async fn test_wildcard_catches_unmatched_paths() {
        let screen = TestScreen::default();
        let routes = vec![recording_route("/", "home"), recording_route("*", "not-found")];

        Router::start(routes, screen.clone(), "/nonexistent/xyz")
            .await
            .unwrap();
        assert_eq!(screen.lines(), vec!["not-found[]"]);
    }

    #[tokio::test]
    async fn test_no_match_without_wildcard_renders_nothing() {
        let screen = TestScreen::default();
        let routes = vec![recording_route("/", "home")];

        let mut router = Router::start(routes, screen.clone(), "/").await.unwrap();
        router.navigate("/missing").await.unwrap();

        // The container was cleared by no one; the previous view survives.
        assert_eq!(screen.lines(), vec!["home[]"]);
        assert_eq!(router.current_path(), "/missing");
    }

    #[tokio::test]
    async fn test_navigate_clears_container_between_views() {
        let screen = TestScreen::default();
        let routes = vec![
            recording_route("/", "home"),
            recording_route("/login", "login"),
        ];

        let mut router = Router::start(routes, screen.clone(), "/").await.unwrap();
        router.navigate("/login").await.unwrap();
        assert_eq!(screen.lines(), vec!["login[]"]);
    }

    #[tokio::test]
    async fn test_back_and_forward_rerender_without_pushing() {
        let screen = TestScreen::default();
        let routes = vec![
            recording_route("/", "home"),
            recording_route("/boards/:boardId", "board"),
        ];

        let mut router = Router::start(routes, screen.clone(), "/").await.unwrap();
        router.navigate("/boards/7").await.unwrap();
        assert_eq!(screen.lines(), vec!["board[boardId=7]"]);

        assert!(router.back().await.unwrap());
        assert_eq!(screen.lines(), vec!["home[]"]);
        assert_eq!(router.current_path(), "/");

        assert!(router.forward().await.unwrap());
        assert_eq!(screen.lines(), vec!["board[boardId=7]"]);

        // At the edges, back/forward are no-ops.
        assert!(!router.forward().await.unwrap());
        router.back().await.unwrap();
        assert!(!router.back().await.unwrap());
    }

    #[tokio::test]
    async fn test_navigate_truncates_forward_history() {
        let screen = TestScreen::default();
        let routes = vec![
            recording_route("/", "home"),
            recording_route("/login", "login"),
            recording_route("/signup", "signup"),
        ];

        let mut router = Router::start(routes, screen.clone(), "/").await.unwrap();
        router.navigate("/login").await.unwrap();
        router.back().await.unwrap();
        router.navigate("/signup").await.unwrap();

        // The forward tail ("/login") was discarded.
        assert!(!router.forward().await.unwrap());
        assert_eq!(router.current_path(), "/signup");
    }

    #[tokio::test]
    async fn test_redirect_renders_target_not_source() {
        let screen = TestScreen::default();
        let routes = vec![
            Route::new("/profile", |_screen: TestScreen, _params| async move {
                Ok(Rendered::Redirect("/login".to_string()))
            })
            .unwrap(),
            recording_route("/login", "login"),
        ];

        let mut router = Router::start(routes, screen.clone(), "/profile")
            .await
            .unwrap();
        assert_eq!(screen.lines(), vec!["login[]"]);
        assert_eq!(router.current_path(), "/login");

        // The gated path stays in history behind the redirect target.
        assert!(router.back().await.unwrap());
        assert_eq!(router.current_path(), "/login");
    }

    #[tokio::test]
    async fn test_redirect_cycle_is_an_error() {
        let screen = TestScreen::default();
        let routes = vec![
            Route::new("/a", |_s: TestScreen, _p| async move {
                Ok(Rendered::Redirect("/b".to_string()))
            })
            .unwrap(),
            Route::new("/b", |_s: TestScreen, _p| async move {
                Ok(Rendered::Redirect("/a".to_string()))
            })
            .unwrap(),
        ];

        let err = Router::start(routes, screen, "/a").await.unwrap_err();
        assert!(err.to_string().contains("redirect loop"));
    }

    #[tokio::test]
    async fn test_query_string_is_parsed_not_matched() {
        let screen = TestScreen::default();
        let routes = vec![Route::new(
            "/search",
            |screen: TestScreen, params: RouteParams| async move {
                screen.push(format!(
                    "search keyword={} page={}",
                    params.query("keyword").unwrap_or(""),
                    params.query("page").unwrap_or("0"),
                ));
                Ok(Rendered::Done)
            },
        )
        .unwrap()];

        Router::start(routes, screen.clone(), "/search?keyword=rust+tips&page=2")
            .await
            .unwrap();
        assert_eq!(screen.lines(), vec!["search keyword=rust tips page=2"]);
    }
}
