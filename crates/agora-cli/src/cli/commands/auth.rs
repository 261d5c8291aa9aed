//! Session command handlers: login, logout, signup, whoami.

use agora_core::api::members::SignupRequest;
use agora_core::config::Config;
use agora_core::session::SessionStore;
use anyhow::{Context, Result};

use super::build_client;

pub async fn login(config: &Config, email: &str, password: &str) -> Result<()> {
    let client = build_client(config)?;

    let tokens = client
        .login(email, password)
        .await
        .context("login failed")?
        .context("login returned no tokens")?;

    client
        .session()
        .login(&tokens.access_token, &tokens.refresh_token)
        .context("persist session")?;

    match client.session().user() {
        Some(user) => println!("Logged in as {} <{}>", user.nickname, user.email),
        None => println!("Logged in."),
    }
    Ok(())
}

pub fn logout() -> Result<()> {
    let session = SessionStore::open_default();
    if !session.is_logged_in() {
        println!("Not logged in.");
        return Ok(());
    }
    session.logout().context("clear session")?;
    println!("Logged out.");
    Ok(())
}

pub async fn signup(config: &Config, email: &str, password: &str, nickname: &str) -> Result<()> {
    let client = build_client(config)?;

    let member = client
        .signup(&SignupRequest {
            email,
            password,
            nickname,
        })
        .await
        .context("signup failed")?;

    match member {
        Some(member) => println!(
            "Account created: {} <{}>. Log in with `agora login`.",
            member.nickname, member.email
        ),
        None => println!("Account created. Log in with `agora login`."),
    }
    Ok(())
}

pub fn whoami() -> Result<()> {
    let session = SessionStore::open_default();
    if !session.is_logged_in() {
        println!("Not logged in.");
        return Ok(());
    }
    match session.user() {
        Some(user) => println!(
            "{} <{}> (member {})",
            user.nickname, user.email, user.member_id
        ),
        // Token present but its payload did not decode.
        None => println!("Logged in (identity unknown)."),
    }
    Ok(())
}
