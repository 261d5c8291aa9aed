//! Account command handlers for the logged-in member.

use std::io::{BufRead, Write};

use agora_core::config::Config;
use anyhow::{Context, Result};

use super::{build_client, current_member_id};

pub async fn show(config: &Config) -> Result<()> {
    let client = build_client(config)?;
    let member_id = current_member_id(&client)?;

    let Some(member) = client.get_member(member_id).await.context("fetch member")? else {
        return Ok(());
    };

    println!("{} <{}> (member {})", member.nickname, member.email, member.id);
    if let Some(created) = member.created_at {
        println!("joined: {}", created.format("%Y-%m-%d"));
    }
    Ok(())
}

pub async fn nickname(config: &Config, nickname: &str) -> Result<()> {
    let client = build_client(config)?;
    let member_id = current_member_id(&client)?;

    let member = client
        .update_nickname(member_id, nickname)
        .await
        .context("update nickname")?;

    match member {
        Some(member) => println!("Nickname changed to {}", member.nickname),
        None => println!("Nickname changed."),
    }
    Ok(())
}

pub async fn password(config: &Config, old: &str, new: &str) -> Result<()> {
    let client = build_client(config)?;
    let member_id = current_member_id(&client)?;

    client
        .change_password(member_id, old, new)
        .await
        .context("change password")?;
    println!("Password changed.");
    Ok(())
}

pub async fn delete(config: &Config, yes: bool) -> Result<()> {
    let client = build_client(config)?;
    let member_id = current_member_id(&client)?;

    if !yes {
        print!("Delete this account and all of its data? [y/N] ");
        std::io::stdout().flush().context("flush prompt")?;
        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("read confirmation")?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    client
        .delete_member(member_id)
        .await
        .context("delete account")?;
    client.session().logout().context("clear session")?;
    println!("Account deleted.");
    Ok(())
}
