use crate::wiring::Wiring;
use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use stash_extract::{Page, fetch_page};
use stash_ui::{Action, ListView, PopupController, SaveStatus, Screen};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Longest `search -i` waits for the last query after input ends.
const SEARCH_WAIT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[clap(name = "stash", about = "Save, search and chat with your bookmarks")]
pub struct Cli {
    /// YAML config file (default: ./stash.yaml when present).
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Capture a page and save it.
    Save {
        /// Page URL, or a local HTML file with `--file`.
        target: String,
        #[clap(long)]
        file: bool,
        /// Comma-separated tags.
        #[clap(long, default_value = "")]
        tags: String,
    },
    /// Search saved bookmarks.
    Search {
        query: Option<String>,
        /// Read queries line by line from stdin, searching as you type.
        #[clap(long, short)]
        interactive: bool,
    },
    /// Ask a question about your bookmarks.
    Chat { question: Vec<String> },
    /// Recently saved bookmarks.
    Recent {
        #[clap(long)]
        limit: Option<u32>,
    },
    /// Print the login URL, or finish login.
    Login {
        /// Redirect URL the OAuth provider sent you to.
        #[clap(long, conflicts_with = "token")]
        redirect: Option<String>,
        /// Store an access token directly.
        #[clap(long)]
        token: Option<String>,
    },
    Logout,
    /// Show or change the backend base URL.
    Options {
        #[clap(long)]
        set_url: Option<String>,
    },
}

impl Command {
    pub async fn run(self, w: &Wiring) -> Result<()> {
        let out = self.execute(w, BufReader::new(tokio::io::stdin())).await?;
        println!("{out}");
        Ok(())
    }

    /// Run against `w`, reading `search -i` queries from `input`. Returns
    /// what the command prints.
    pub async fn execute<R>(self, w: &Wiring, input: R) -> Result<String>
    where
        R: AsyncBufRead + Unpin,
    {
        match self {
            Command::Save { target, file, tags } => save(w, &target, file, &tags).await,
            Command::Search { query, interactive } => {
                let popup = w.popup();
                let view = if interactive {
                    interactive_search(&popup, input, SEARCH_WAIT).await?
                } else {
                    popup.search(query.as_deref().unwrap_or("")).await
                };
                Ok(view.to_string())
            }
            Command::Chat { question } => {
                let chat = w.chat()?;
                let Some(reply) = chat.send(&question.join(" ")).await else {
                    bail!("nothing to ask");
                };
                Ok(reply.body.text().to_string())
            }
            Command::Recent { limit } => {
                let popup = w.popup();
                popup.open_recent(limit).await?;
                Ok(popup.list().to_string())
            }
            Command::Login { redirect, token } => {
                let popup = w.popup();
                match (redirect, token) {
                    (Some(url), _) => popup.complete_login(&url).await?,
                    (None, Some(token)) => popup.adopt_token(token).await?,
                    (None, None) => return Ok(popup.login_url()?),
                }
                Ok(format!("Logged in!\n{}", popup.list()))
            }
            Command::Logout => {
                w.popup().logout()?;
                Ok("Logged out.".to_string())
            }
            Command::Options { set_url: Some(url) } => {
                Ok(format!("Options saved: {}", w.options().save(&url)?))
            }
            Command::Options { set_url: None } => Ok(w.options().restore()?),
        }
    }
}

async fn save(w: &Wiring, target: &str, file: bool, tags: &str) -> Result<String> {
    let page = if file {
        Page::from_file(Path::new(target))?
    } else {
        fetch_page(&reqwest::Client::new(), target).await?
    };
    let popup = w.popup();
    match popup.save(&page, tags).await {
        SaveStatus::Error(msg) if popup.screen() == Screen::AccessDenied => {
            bail!("Access Denied: {} ({msg})", Action::Save.denied_notice())
        }
        SaveStatus::Error(msg) => bail!("{msg}"),
        status => Ok(format!("{status} {}", page.url)),
    }
}

/// Feed each input line to the debounced search, then wait up to `wait`
/// for the search of the last line to render.
async fn interactive_search<R>(
    popup: &PopupController,
    input: R,
    wait: Duration,
) -> Result<ListView>
where
    R: AsyncBufRead + Unpin,
{
    let (debounced, task) = popup.search_input();
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        debounced.push(line);
    }
    drop(debounced);

    match tokio::time::timeout(wait, task).await {
        Ok(joined) => joined?,
        Err(_) => bail!("search did not finish within {wait:?}"),
    }
    Ok(popup.list())
}
