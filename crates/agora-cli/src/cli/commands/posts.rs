//! Post command handlers.

use std::path::Path;

use agora_core::api::posts::{PostInput, PostPage, SortOrder};
use agora_core::config::Config;
use anyhow::{Context, Result};

use super::build_client;

fn print_page(page: &PostPage) {
    if page.posts.is_empty() {
        println!("No posts.");
        return;
    }
    for post in &page.posts {
        let author = post.nickname.as_deref().unwrap_or("?");
        let board = post
            .board_name
            .as_deref()
            .map(|name| format!("  [{name}]"))
            .unwrap_or_default();
        println!(
            "#{}  {}{}  by {}  ({} views, {} likes)",
            post.id, post.title, board, author, post.view_count, post.like_count
        );
    }
    println!("page {} of {} total posts", page.page, page.total_count);
}

/// Content type inferred from a file extension, for image uploads.
fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

async fn upload_file(
    client: &agora_core::api::ApiClient,
    post_id: i64,
    file: &Path,
) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    client
        .upload_post_image(post_id, &file_name, mime_for(file), bytes)
        .await
        .context("upload image")?;
    Ok(())
}

pub async fn list(
    config: &Config,
    board: i64,
    page: u32,
    size: Option<u32>,
    sort: SortOrder,
) -> Result<()> {
    let client = build_client(config)?;
    let size = size.unwrap_or(config.page_size);
    let Some(posts) = client
        .list_posts(board, page, size, sort)
        .await
        .context("list posts")?
    else {
        return Ok(());
    };
    print_page(&posts);
    Ok(())
}

pub async fn show(config: &Config, board: i64, id: i64) -> Result<()> {
    let client = build_client(config)?;
    let Some(post) = client.get_post(board, id).await.context("fetch post")? else {
        return Ok(());
    };

    println!("#{}  {}", post.id, post.title);
    println!(
        "by {}  ({} views, {} likes)",
        post.nickname, post.view_count, post.like_count
    );
    if let Some(created) = post.created_at {
        println!("created: {}", created.format("%Y-%m-%d %H:%M"));
    }
    println!();
    println!("{}", post.content);

    if let Some(comments) = client.list_comments(id).await.context("list comments")? {
        if !comments.is_empty() {
            println!();
            println!("comments:");
            super::comments::print_tree(&comments, 0);
        }
    }
    Ok(())
}

pub async fn create(
    config: &Config,
    board: i64,
    title: &str,
    content: &str,
    image: Option<&Path>,
) -> Result<()> {
    let client = build_client(config)?;
    let Some(created) = client
        .create_post(board, &PostInput { title, content })
        .await
        .context("create post")?
    else {
        println!("Post created.");
        return Ok(());
    };
    println!("Created post #{}", created.id);

    // The post exists either way; a failed attachment is reported, not fatal.
    if let Some(file) = image {
        if let Err(err) = upload_file(&client, created.id, file).await {
            tracing::warn!("image upload failed: {err:#}");
            eprintln!("warning: image upload failed: {err:#}");
        } else {
            println!("Attached {}", file.display());
        }
    }
    Ok(())
}

pub async fn edit(config: &Config, board: i64, id: i64, title: &str, content: &str) -> Result<()> {
    let client = build_client(config)?;
    let post = client
        .update_post(board, id, &PostInput { title, content })
        .await
        .context("update post")?;

    match post {
        Some(post) => println!("Updated post #{} ({})", post.id, post.title),
        None => println!("Post updated."),
    }
    Ok(())
}

pub async fn delete(config: &Config, board: i64, id: i64) -> Result<()> {
    let client = build_client(config)?;
    client.delete_post(board, id).await.context("delete post")?;
    println!("Deleted post #{id}");
    Ok(())
}

pub async fn search(config: &Config, keyword: &str, page: u32, size: Option<u32>) -> Result<()> {
    let client = build_client(config)?;
    let size = size.unwrap_or(config.page_size);
    let Some(posts) = client
        .search_posts(keyword, page, size)
        .await
        .context("search posts")?
    else {
        return Ok(());
    };
    print_page(&posts);
    Ok(())
}

pub async fn mine(config: &Config, page: u32, size: Option<u32>) -> Result<()> {
    let client = build_client(config)?;
    let size = size.unwrap_or(config.page_size);
    let Some(posts) = client.my_posts(page, size).await.context("list my posts")? else {
        return Ok(());
    };
    print_page(&posts);
    Ok(())
}

pub async fn upload_image(config: &Config, post: i64, file: &Path) -> Result<()> {
    let client = build_client(config)?;
    upload_file(&client, post, file).await?;
    println!("Attached {} to post #{post}", file.display());
    Ok(())
}
