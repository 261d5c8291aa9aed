//! CLI entry and dispatch.

use std::path::PathBuf;
use std::str::FromStr;

use agora_core::api::posts::SortOrder;
use agora_core::config::Config;
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "agora")]
#[command(version)]
#[command(about = "Discussion-board client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Log in and persist the session
    Login {
        #[arg(value_name = "EMAIL")]
        email: String,
        #[arg(value_name = "PASSWORD")]
        password: String,
    },

    /// Clear the persisted session
    Logout,

    /// Register a new account
    Signup {
        #[arg(value_name = "EMAIL")]
        email: String,
        #[arg(value_name = "PASSWORD")]
        password: String,
        #[arg(value_name = "NICKNAME")]
        nickname: String,
    },

    /// Show the identity of the current session
    Whoami,

    /// Manage the account behind the current session
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Manage boards
    Boards {
        #[command(subcommand)]
        command: BoardCommands,
    },

    /// Manage posts
    Posts {
        #[command(subcommand)]
        command: PostCommands,
    },

    /// Manage comments
    Comments {
        #[command(subcommand)]
        command: CommentCommands,
    },

    /// Interactive routed browsing session
    Browse {
        /// Starting path (default: /)
        #[arg(value_name = "PATH")]
        path: Option<String>,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

#[derive(clap::Subcommand)]
enum ProfileCommands {
    /// Show the full member record
    Show,
    /// Change the nickname
    Nickname {
        #[arg(value_name = "NICKNAME")]
        nickname: String,
    },
    /// Change the password
    Password {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    /// Delete the account and clear the session
    Delete {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(clap::Subcommand)]
enum BoardCommands {
    /// List all boards
    List,
    /// Show one board
    Show {
        #[arg(value_name = "BOARD_ID")]
        id: i64,
    },
    /// Create a board
    Create {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Update a board's name and description
    Update {
        #[arg(value_name = "BOARD_ID")]
        id: i64,
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a board
    Delete {
        #[arg(value_name = "BOARD_ID")]
        id: i64,
    },
}

#[derive(clap::Subcommand)]
enum PostCommands {
    /// List posts in a board
    List {
        #[arg(value_name = "BOARD_ID")]
        board: i64,
        #[arg(long, default_value_t = 0)]
        page: u32,
        /// Page size (default: from config)
        #[arg(long)]
        size: Option<u32>,
        /// Sort order: latest, oldest, views, likes
        #[arg(long, default_value = "latest", value_parser = SortOrder::from_str)]
        sort: SortOrder,
    },
    /// Show one post with its comments
    Show {
        #[arg(value_name = "BOARD_ID")]
        board: i64,
        #[arg(value_name = "POST_ID")]
        id: i64,
    },
    /// Create a post
    Create {
        #[arg(value_name = "BOARD_ID")]
        board: i64,
        #[arg(value_name = "TITLE")]
        title: String,
        #[arg(value_name = "CONTENT")]
        content: String,
        /// Image file to attach after creation (best effort)
        #[arg(long, value_name = "FILE")]
        image: Option<PathBuf>,
    },
    /// Edit a post
    Edit {
        #[arg(value_name = "BOARD_ID")]
        board: i64,
        #[arg(value_name = "POST_ID")]
        id: i64,
        #[arg(value_name = "TITLE")]
        title: String,
        #[arg(value_name = "CONTENT")]
        content: String,
    },
    /// Delete a post
    Delete {
        #[arg(value_name = "BOARD_ID")]
        board: i64,
        #[arg(value_name = "POST_ID")]
        id: i64,
    },
    /// Search posts across boards
    Search {
        #[arg(value_name = "KEYWORD")]
        keyword: String,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        size: Option<u32>,
    },
    /// List posts authored by the current member
    Mine {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        size: Option<u32>,
    },
    /// Attach an image to an existing post
    UploadImage {
        #[arg(value_name = "POST_ID")]
        post: i64,
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(clap::Subcommand)]
enum CommentCommands {
    /// List the comment tree of a post
    List {
        #[arg(value_name = "POST_ID")]
        post: i64,
    },
    /// Comment on a post
    Add {
        #[arg(value_name = "POST_ID")]
        post: i64,
        #[arg(value_name = "CONTENT")]
        content: String,
    },
    /// Reply to an existing comment
    Reply {
        #[arg(value_name = "POST_ID")]
        post: i64,
        #[arg(value_name = "COMMENT_ID")]
        parent: i64,
        #[arg(value_name = "CONTENT")]
        content: String,
    },
    /// Edit a comment
    Edit {
        #[arg(value_name = "POST_ID")]
        post: i64,
        #[arg(value_name = "COMMENT_ID")]
        id: i64,
        #[arg(value_name = "CONTENT")]
        content: String,
    },
    /// Delete a comment
    Delete {
        #[arg(value_name = "POST_ID")]
        post: i64,
        #[arg(value_name = "COMMENT_ID")]
        id: i64,
    },
    /// List comments authored by the current member
    Mine {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        size: Option<u32>,
    },
}

fn init_logging() {
    // AGORA_LOG takes precedence, then RUST_LOG; warnings by default.
    let filter = EnvFilter::try_from_env("AGORA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load().context("load config")?;

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },

        Commands::Login { email, password } => commands::auth::login(&config, &email, &password).await,
        Commands::Logout => commands::auth::logout(),
        Commands::Signup {
            email,
            password,
            nickname,
        } => commands::auth::signup(&config, &email, &password, &nickname).await,
        Commands::Whoami => commands::auth::whoami(),

        Commands::Profile { command } => match command {
            ProfileCommands::Show => commands::profile::show(&config).await,
            ProfileCommands::Nickname { nickname } => {
                commands::profile::nickname(&config, &nickname).await
            }
            ProfileCommands::Password { old, new } => {
                commands::profile::password(&config, &old, &new).await
            }
            ProfileCommands::Delete { yes } => commands::profile::delete(&config, yes).await,
        },

        Commands::Boards { command } => match command {
            BoardCommands::List => commands::boards::list(&config).await,
            BoardCommands::Show { id } => commands::boards::show(&config, id).await,
            BoardCommands::Create { name, description } => {
                commands::boards::create(&config, &name, description.as_deref()).await
            }
            BoardCommands::Update {
                id,
                name,
                description,
            } => commands::boards::update(&config, id, &name, description.as_deref()).await,
            BoardCommands::Delete { id } => commands::boards::delete(&config, id).await,
        },

        Commands::Posts { command } => match command {
            PostCommands::List {
                board,
                page,
                size,
                sort,
            } => commands::posts::list(&config, board, page, size, sort).await,
            PostCommands::Show { board, id } => commands::posts::show(&config, board, id).await,
            PostCommands::Create {
                board,
                title,
                content,
                image,
            } => commands::posts::create(&config, board, &title, &content, image.as_deref()).await,
            PostCommands::Edit {
                board,
                id,
                title,
                content,
            } => commands::posts::edit(&config, board, id, &title, &content).await,
            PostCommands::Delete { board, id } => {
                commands::posts::delete(&config, board, id).await
            }
            PostCommands::Search {
                keyword,
                page,
                size,
            } => commands::posts::search(&config, &keyword, page, size).await,
            PostCommands::Mine { page, size } => commands::posts::mine(&config, page, size).await,
            PostCommands::UploadImage { post, file } => {
                commands::posts::upload_image(&config, post, &file).await
            }
        },

        Commands::Comments { command } => match command {
            CommentCommands::List { post } => commands::comments::list(&config, post).await,
            CommentCommands::Add { post, content } => {
                commands::comments::add(&config, post, &content).await
            }
            CommentCommands::Reply {
                post,
                parent,
                content,
            } => commands::comments::reply(&config, post, parent, &content).await,
            CommentCommands::Edit { post, id, content } => {
                commands::comments::edit(&config, post, id, &content).await
            }
            CommentCommands::Delete { post, id } => {
                commands::comments::delete(&config, post, id).await
            }
            CommentCommands::Mine { page, size } => {
                commands::comments::mine(&config, page, size).await
            }
        },

        Commands::Browse { path } => {
            commands::browse::run(&config, path.as_deref().unwrap_or("/")).await
        }
    }
}
