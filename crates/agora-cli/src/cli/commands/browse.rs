//! Interactive routed browsing session.
//!
//! Stands in for the single-page views: a text screen is the mount container,
//! typed paths are link clicks, and `back`/`forward` replay history. Network
//! failures render as inline text so the session survives a flaky backend.

use std::future::Future;
use std::io::{BufRead, Write as _};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use agora_core::api::ApiClient;
use agora_core::api::posts::SortOrder;
use agora_core::config::Config;
use agora_core::router::{Container, Rendered, Route, RouteParams, Router};
use agora_core::session::SessionStore;
use anyhow::{Context as _, Result};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use super::build_client;

/// Text screen the routed views render into.
#[derive(Clone, Default)]
struct Screen {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Screen {
    fn push(&self, line: impl Into<String>) {
        self.lines.lock().expect("screen lock poisoned").push(line.into());
    }

    fn draw(&self, path: &str) {
        println!();
        println!("--- {path}");
        for line in self.lines.lock().expect("screen lock poisoned").iter() {
            println!("{line}");
        }
    }
}

impl Container for Screen {
    fn clear(&self) {
        self.lines.lock().expect("screen lock poisoned").clear();
    }
}

/// Wraps a renderer so it bounces to the login view when no session is
/// active, without rendering the target.
fn guarded<F, Fut>(
    session: Arc<SessionStore>,
    render: F,
) -> impl Fn(Screen, RouteParams) -> BoxFuture<'static, Result<Rendered>> + Send + Sync + 'static
where
    F: Fn(Screen, RouteParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Rendered>> + Send + 'static,
{
    move |screen, params| {
        if session.is_logged_in() {
            render(screen, params).boxed()
        } else {
            async { Ok(Rendered::Redirect("/login".to_string())) }.boxed()
        }
    }
}

fn id_param(params: &RouteParams, name: &str) -> Option<i64> {
    params.get(name).and_then(|raw| raw.parse().ok())
}

fn page_param(params: &RouteParams) -> u32 {
    params.query("page").and_then(|raw| raw.parse().ok()).unwrap_or(0)
}

/// Formats an API failure for inline display.
fn inline_error(err: &agora_core::api::ApiError) -> String {
    format!("error: {err}")
}

async fn home_view(screen: Screen, client: Arc<ApiClient>) -> Result<Rendered> {
    screen.push("agora boards");
    match client.list_boards().await {
        Ok(Some(boards)) if !boards.is_empty() => {
            for board in boards {
                let description = board.description.unwrap_or_default();
                screen.push(format!("  /boards/{}  {}  {}", board.id, board.name, description));
            }
        }
        Ok(_) => screen.push("  no boards"),
        Err(err) => screen.push(inline_error(&err)),
    }
    screen.push(String::new());
    screen.push("links: /search?keyword=..., /login, /signup, /profile");
    Ok(Rendered::Done)
}

fn login_view(screen: &Screen, session: &SessionStore) {
    screen.push("login");
    if session.is_logged_in() {
        match session.user() {
            Some(user) => screen.push(format!("already logged in as {}", user.nickname)),
            None => screen.push("already logged in".to_string()),
        }
    } else {
        screen.push("no active session; run `agora login <EMAIL> <PASSWORD>`".to_string());
    }
}

async fn board_view(
    screen: Screen,
    client: Arc<ApiClient>,
    params: RouteParams,
    page_size: u32,
) -> Result<Rendered> {
    let Some(board_id) = id_param(&params, "boardId") else {
        screen.push("invalid board id");
        return Ok(Rendered::Done);
    };
    let page = page_param(&params);
    let sort = params
        .query("sort")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(SortOrder::Latest);

    match client.get_board(board_id).await {
        Ok(Some(board)) => screen.push(format!("board: {}", board.name)),
        Ok(None) => screen.push(format!("board {board_id}")),
        Err(err) => {
            screen.push(inline_error(&err));
            return Ok(Rendered::Done);
        }
    }

    match client.list_posts(board_id, page, page_size, sort).await {
        Ok(Some(posts)) => {
            for post in &posts.posts {
                screen.push(format!(
                    "  /boards/{board_id}/posts/{}  {}  ({} views)",
                    post.id, post.title, post.view_count
                ));
            }
            screen.push(format!("page {page}, {} posts total", posts.total_count));
        }
        Ok(None) => screen.push("(no data)".to_string()),
        Err(err) => screen.push(inline_error(&err)),
    }
    screen.push(format!("new post: /boards/{board_id}/posts/new"));
    Ok(Rendered::Done)
}

async fn post_view(screen: Screen, client: Arc<ApiClient>, params: RouteParams) -> Result<Rendered> {
    let (Some(board_id), Some(post_id)) = (id_param(&params, "boardId"), id_param(&params, "postId"))
    else {
        screen.push("invalid post path");
        return Ok(Rendered::Done);
    };

    match client.get_post(board_id, post_id).await {
        Ok(Some(post)) => {
            screen.push(format!("{}  by {}", post.title, post.nickname));
            screen.push(post.content);
        }
        Ok(None) => screen.push("(no data)".to_string()),
        Err(err) => {
            screen.push(inline_error(&err));
            return Ok(Rendered::Done);
        }
    }

    match client.list_comments(post_id).await {
        Ok(Some(comments)) if !comments.is_empty() => {
            screen.push("comments:".to_string());
            push_comment_tree(&screen, &comments, 1);
        }
        Ok(_) => screen.push("no comments".to_string()),
        Err(err) => screen.push(inline_error(&err)),
    }
    Ok(Rendered::Done)
}

fn push_comment_tree(screen: &Screen, comments: &[agora_core::api::comments::Comment], depth: usize) {
    for comment in comments {
        screen.push(format!(
            "{}{}: {}",
            "  ".repeat(depth),
            comment.nickname,
            comment.content
        ));
        push_comment_tree(screen, &comment.replies, depth + 1);
    }
}

async fn search_view(
    screen: Screen,
    client: Arc<ApiClient>,
    params: RouteParams,
    page_size: u32,
) -> Result<Rendered> {
    let Some(keyword) = params.query("keyword").map(str::to_string) else {
        screen.push("search: add ?keyword=... to the path");
        return Ok(Rendered::Done);
    };
    screen.push(format!("search: {keyword}"));

    match client.search_posts(&keyword, page_param(&params), page_size).await {
        Ok(Some(results)) => {
            for post in &results.posts {
                screen.push(format!("  #{}  {}", post.id, post.title));
            }
            screen.push(format!("{} matches", results.total_count));
        }
        Ok(None) => screen.push("(no data)".to_string()),
        Err(err) => screen.push(inline_error(&err)),
    }
    Ok(Rendered::Done)
}

async fn profile_view(screen: Screen, client: Arc<ApiClient>) -> Result<Rendered> {
    screen.push("profile");
    let Some(user) = client.session().user() else {
        screen.push("identity unknown".to_string());
        return Ok(Rendered::Done);
    };
    match client.get_member(user.member_id).await {
        Ok(Some(member)) => {
            screen.push(format!("{} <{}>", member.nickname, member.email));
            screen.push("links: /my/posts, /my/comments".to_string());
        }
        Ok(None) => screen.push("(no data)".to_string()),
        Err(err) => screen.push(inline_error(&err)),
    }
    Ok(Rendered::Done)
}

async fn my_posts_view(
    screen: Screen,
    client: Arc<ApiClient>,
    params: RouteParams,
    page_size: u32,
) -> Result<Rendered> {
    screen.push("my posts");
    match client.my_posts(page_param(&params), page_size).await {
        Ok(Some(posts)) => {
            for post in &posts.posts {
                let board = post.board_name.as_deref().unwrap_or("?");
                screen.push(format!("  [{}] {}", board, post.title));
            }
            screen.push(format!("{} total", posts.total_count));
        }
        Ok(None) => screen.push("(no data)".to_string()),
        Err(err) => screen.push(inline_error(&err)),
    }
    Ok(Rendered::Done)
}

async fn my_comments_view(
    screen: Screen,
    client: Arc<ApiClient>,
    params: RouteParams,
    page_size: u32,
) -> Result<Rendered> {
    screen.push("my comments");
    match client.my_comments(page_param(&params), page_size).await {
        Ok(Some(page)) => {
            for comment in &page.comments {
                let title = comment.post_title.as_deref().unwrap_or("?");
                screen.push(format!("  on {title}: {}", comment.content));
            }
            screen.push(format!("{} total", page.total_count));
        }
        Ok(None) => screen.push("(no data)".to_string()),
        Err(err) => screen.push(inline_error(&err)),
    }
    Ok(Rendered::Done)
}

/// The route table, wildcard last. Auth-gated entries redirect to `/login`
/// when no session is active.
fn route_table(client: &Arc<ApiClient>, page_size: u32) -> Result<Vec<Route<Screen>>> {
    let session = Arc::clone(client.session());

    let compose_view = |screen: Screen, params: RouteParams| async move {
        match id_param(&params, "boardId") {
            Some(board_id) => {
                screen.push("new post".to_string());
                screen.push(format!(
                    "compose with: agora posts create {board_id} <TITLE> <CONTENT>"
                ));
            }
            None => screen.push("invalid board id".to_string()),
        }
        Ok(Rendered::Done)
    };

    let edit_view = |screen: Screen, params: RouteParams| async move {
        match (id_param(&params, "boardId"), id_param(&params, "postId")) {
            (Some(board_id), Some(post_id)) => {
                screen.push("edit post".to_string());
                screen.push(format!(
                    "edit with: agora posts edit {board_id} {post_id} <TITLE> <CONTENT>"
                ));
            }
            _ => screen.push("invalid post path".to_string()),
        }
        Ok(Rendered::Done)
    };

    let login_session = Arc::clone(&session);
    let signup_route = |screen: Screen, _params: RouteParams| async move {
        screen.push("signup".to_string());
        screen.push("register with: agora signup <EMAIL> <PASSWORD> <NICKNAME>".to_string());
        Ok(Rendered::Done)
    };

    let routes = vec![
        Route::new("/", {
            let client = Arc::clone(client);
            move |screen: Screen, _params: RouteParams| {
                let client = Arc::clone(&client);
                async move { home_view(screen, client).await }
            }
        })?,
        Route::new("/login", move |screen: Screen, _params| {
            let session = Arc::clone(&login_session);
            async move {
                login_view(&screen, &session);
                Ok(Rendered::Done)
            }
        })?,
        Route::new("/signup", signup_route)?,
        Route::new("/search", {
            let client = Arc::clone(client);
            move |screen: Screen, params: RouteParams| {
                let client = Arc::clone(&client);
                async move { search_view(screen, client, params, page_size).await }
            }
        })?,
        Route::new(
            "/profile",
            guarded(Arc::clone(&session), {
                let client = Arc::clone(client);
                move |screen: Screen, _params: RouteParams| {
                    let client = Arc::clone(&client);
                    async move { profile_view(screen, client).await }
                }
            }),
        )?,
        Route::new(
            "/my/posts",
            guarded(Arc::clone(&session), {
                let client = Arc::clone(client);
                move |screen: Screen, params: RouteParams| {
                    let client = Arc::clone(&client);
                    async move { my_posts_view(screen, client, params, page_size).await }
                }
            }),
        )?,
        Route::new(
            "/my/comments",
            guarded(Arc::clone(&session), {
                let client = Arc::clone(client);
                move |screen: Screen, params: RouteParams| {
                    let client = Arc::clone(&client);
                    async move { my_comments_view(screen, client, params, page_size).await }
                }
            }),
        )?,
        // Declared before "/boards/:boardId/posts/:postId": first match wins.
        Route::new(
            "/boards/:boardId/posts/new",
            guarded(Arc::clone(&session), compose_view),
        )?,
        Route::new(
            "/boards/:boardId/posts/:postId/edit",
            guarded(Arc::clone(&session), edit_view),
        )?,
        Route::new("/boards/:boardId/posts/:postId", {
            let client = Arc::clone(client);
            move |screen: Screen, params: RouteParams| {
                let client = Arc::clone(&client);
                async move { post_view(screen, client, params).await }
            }
        })?,
        Route::new("/boards/:boardId", {
            let client = Arc::clone(client);
            move |screen: Screen, params: RouteParams| {
                let client = Arc::clone(&client);
                async move { board_view(screen, client, params, page_size).await }
            }
        })?,
        Route::new("*", |screen: Screen, _params: RouteParams| async move {
            screen.push("page not found".to_string());
            Ok(Rendered::Done)
        })?,
    ];
    Ok(routes)
}

pub async fn run(config: &Config, start: &str) -> Result<()> {
    let client = build_client(config)?;

    // A refresh failure mid-render flips this flag; the loop bounces the
    // session to the login view before reading the next command.
    let expired = Arc::new(AtomicBool::new(false));
    let expired_flag = Arc::clone(&expired);
    client.set_session_expired_hook(move || {
        expired_flag.store(true, Ordering::SeqCst);
    });

    let screen = Screen::default();
    let routes = route_table(&client, config.page_size)?;
    let mut router = Router::start(routes, screen.clone(), start)
        .await
        .context("render initial route")?;
    screen.draw(router.current_path());

    let stdin = std::io::stdin();
    loop {
        if expired.swap(false, Ordering::SeqCst) {
            println!("session expired; returning to /login");
            router.navigate("/login").await?;
            screen.draw(router.current_path());
            continue;
        }

        print!("browse> ");
        std::io::stdout().flush().context("flush prompt")?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("read input")? == 0 {
            break; // EOF
        }

        match line.trim() {
            "" => continue,
            "q" | "quit" | "exit" => break,
            "back" => {
                if !router.back().await? {
                    println!("(no earlier entry)");
                    continue;
                }
            }
            "forward" => {
                if !router.forward().await? {
                    println!("(no later entry)");
                    continue;
                }
            }
            path if path.starts_with('/') => {
                if let Err(err) = router.navigate(path).await {
                    println!("navigation failed: {err:#}");
                    continue;
                }
            }
            _ => {
                println!("commands: /<path>, back, forward, quit");
                continue;
            }
        }
        screen.draw(router.current_path());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_session() -> (tempfile::TempDir, Arc<SessionStore>) {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(SessionStore::new(dir.path().join("session.json")));
        (dir, session)
    }

    fn marking_render(
        session: &Arc<SessionStore>,
    ) -> impl Fn(Screen, RouteParams) -> BoxFuture<'static, Result<Rendered>> {
        guarded(
            Arc::clone(session),
            |screen: Screen, _params: RouteParams| async move {
                screen.push("rendered");
                Ok(Rendered::Done)
            },
        )
    }

    #[tokio::test]
    async fn test_guard_redirects_to_login_when_logged_out() {
        let (_dir, session) = temp_session();
        let render = marking_render(&session);

        let screen = Screen::default();
        match render(screen.clone(), RouteParams::default()).await.unwrap() {
            Rendered::Redirect(target) => assert_eq!(target, "/login"),
            Rendered::Done => panic!("gated view rendered without a session"),
        }
        // The wrapped renderer never ran.
        assert!(screen.lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guard_renders_through_when_logged_in() {
        let (_dir, session) = temp_session();
        session.login("access-1", "refresh-1").unwrap();
        let render = marking_render(&session);

        let screen = Screen::default();
        assert!(matches!(
            render(screen.clone(), RouteParams::default()).await.unwrap(),
            Rendered::Done
        ));
        assert_eq!(*screen.lines.lock().unwrap(), ["rendered".to_string()]);
    }

    #[tokio::test]
    async fn test_guard_rechecks_session_on_every_render() {
        let (_dir, session) = temp_session();
        session.login("access-1", "refresh-1").unwrap();
        let render = marking_render(&session);

        let screen = Screen::default();
        assert!(matches!(
            render(screen.clone(), RouteParams::default()).await.unwrap(),
            Rendered::Done
        ));

        // A forced logout between renders flips the same route to a bounce.
        session.logout().unwrap();
        assert!(matches!(
            render(screen.clone(), RouteParams::default()).await.unwrap(),
            Rendered::Redirect(target) if target == "/login"
        ));
    }
}
