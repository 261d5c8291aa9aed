//! Comment command handlers.

use agora_core::api::comments::Comment;
use agora_core::config::Config;
use anyhow::{Context, Result};

use super::build_client;

/// Prints a comment tree with two-space indentation per reply level.
pub(crate) fn print_tree(comments: &[Comment], depth: usize) {
    for comment in comments {
        let indent = "  ".repeat(depth);
        println!(
            "{indent}#{}  {}: {}",
            comment.id, comment.nickname, comment.content
        );
        print_tree(&comment.replies, depth + 1);
    }
}

pub async fn list(config: &Config, post: i64) -> Result<()> {
    let client = build_client(config)?;
    let Some(comments) = client.list_comments(post).await.context("list comments")? else {
        return Ok(());
    };

    if comments.is_empty() {
        println!("No comments.");
    } else {
        print_tree(&comments, 0);
    }
    Ok(())
}

pub async fn add(config: &Config, post: i64, content: &str) -> Result<()> {
    let client = build_client(config)?;
    let comment = client
        .create_comment(post, content)
        .await
        .context("create comment")?;

    match comment {
        Some(comment) => println!("Added comment #{}", comment.id),
        None => println!("Comment added."),
    }
    Ok(())
}

pub async fn reply(config: &Config, post: i64, parent: i64, content: &str) -> Result<()> {
    let client = build_client(config)?;
    let comment = client
        .reply_to_comment(post, parent, content)
        .await
        .context("reply to comment")?;

    match comment {
        Some(comment) => println!("Added reply #{} under #{parent}", comment.id),
        None => println!("Reply added."),
    }
    Ok(())
}

pub async fn edit(config: &Config, post: i64, id: i64, content: &str) -> Result<()> {
    let client = build_client(config)?;
    client
        .update_comment(post, id, content)
        .await
        .context("update comment")?;
    println!("Updated comment #{id}");
    Ok(())
}

pub async fn delete(config: &Config, post: i64, id: i64) -> Result<()> {
    let client = build_client(config)?;
    client
        .delete_comment(post, id)
        .await
        .context("delete comment")?;
    println!("Deleted comment #{id}");
    Ok(())
}

pub async fn mine(config: &Config, page: u32, size: Option<u32>) -> Result<()> {
    let client = build_client(config)?;
    let size = size.unwrap_or(config.page_size);
    let Some(page) = client
        .my_comments(page, size)
        .await
        .context("list my comments")?
    else {
        return Ok(());
    };

    if page.comments.is_empty() {
        println!("No comments.");
        return Ok(());
    }
    for comment in &page.comments {
        let title = comment.post_title.as_deref().unwrap_or("?");
        println!(
            "post #{} ({}): {}",
            comment.post_id, title, comment.content
        );
    }
    println!("page {} of {} total comments", page.page, page.total_count);
    Ok(())
}
