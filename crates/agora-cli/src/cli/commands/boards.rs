//! Board command handlers.

use agora_core::api::boards::{Board, BoardInput};
use agora_core::config::Config;
use anyhow::{Context, Result};

use super::build_client;

fn print_board(board: &Board) {
    let description = board.description.as_deref().unwrap_or("-");
    println!("#{}  {}  {}", board.id, board.name, description);
}

pub async fn list(config: &Config) -> Result<()> {
    let client = build_client(config)?;
    let Some(boards) = client.list_boards().await.context("list boards")? else {
        return Ok(());
    };

    if boards.is_empty() {
        println!("No boards yet.");
    } else {
        for board in &boards {
            print_board(board);
        }
    }
    Ok(())
}

pub async fn show(config: &Config, id: i64) -> Result<()> {
    let client = build_client(config)?;
    let Some(board) = client.get_board(id).await.context("fetch board")? else {
        return Ok(());
    };

    println!("Board #{}: {}", board.id, board.name);
    if let Some(description) = &board.description {
        println!("{description}");
    }
    println!("owner: member {}", board.member_id);
    if let Some(created) = board.created_at {
        println!("created: {}", created.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

pub async fn create(config: &Config, name: &str, description: Option<&str>) -> Result<()> {
    let client = build_client(config)?;
    let board = client
        .create_board(&BoardInput { name, description })
        .await
        .context("create board")?;

    match board {
        Some(board) => println!("Created board #{} ({})", board.id, board.name),
        None => println!("Board created."),
    }
    Ok(())
}

pub async fn update(config: &Config, id: i64, name: &str, description: Option<&str>) -> Result<()> {
    let client = build_client(config)?;
    let board = client
        .update_board(id, &BoardInput { name, description })
        .await
        .context("update board")?;

    match board {
        Some(board) => {
            print!("Updated ");
            print_board(&board);
        }
        None => println!("Board updated."),
    }
    Ok(())
}

pub async fn delete(config: &Config, id: i64) -> Result<()> {
    let client = build_client(config)?;
    client.delete_board(id).await.context("delete board")?;
    println!("Deleted board #{id}");
    Ok(())
}
