//! Download feed entries from a Miniflux-compatible server for offline
//! reading.

mod cli;
mod sink;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use futures::TryStreamExt;
use inkfeed_api::{Client, EntryQuery};
use inkfeed_config::Config;
use inkfeed_library::{Layout, LocalEntry, SidecarStore};
use inkfeed_offline::{DownloadOptions, Downloader, Fetcher, Outcome};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::sink::TerminalSink;

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("INKFEED_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            // Point at the file the settings should have come from.
            if cli.config.is_none()
                && let Some(path) = inkfeed_config::default_config_file()
            {
                eprintln!("expected configuration at {}", path.display());
            }
            return Err(err.into());
        }
    };

    let client = Client::new(
        &config.server.url,
        &config.server.api_token,
        Duration::from_secs(config.server.timeout_secs),
    )?;
    let store = SidecarStore::new(Layout::new(config.download_root()?)?);

    match cli.command {
        Command::Check => {
            let user = client.me().await?;
            println!("connected to {} as {}", config.server.url, user.username);
        }
        Command::Entries {
            status,
            feed,
            category,
            limit,
            offset,
        } => {
            let query = EntryQuery {
                status: status.map(Into::into),
                limit: Some(limit),
                offset: (offset > 0).then_some(offset),
                ..EntryQuery::default()
            };
            let page = match (feed, category) {
                (Some(feed_id), _) => client.feed_entries(feed_id, &query).await?,
                (None, Some(category_id)) => client.category_entries(category_id, &query).await?,
                (None, None) => client.entries(&query).await?,
            };
            println!("{} of {} entries:", page.entries.len(), page.total);
            for entry in &page.entries {
                let date = entry.published_at.format(DATE_FORMAT).unwrap_or_default();
                let marker = if store.downloaded(entry.id).await { "*" } else { " " };
                println!(
                    "{marker} {:>8}  {date}  [{}]  {}",
                    entry.id, entry.status, entry.title
                );
            }
        }
        Command::Feeds => {
            for feed in client.feeds().await? {
                println!("{:>6}  {}", feed.id, feed.title);
            }
        }
        Command::Categories => {
            for category in client.categories().await? {
                println!("{:>6}  {}", category.id, category.title);
            }
        }
        Command::Download {
            ids,
            no_images,
            skip_on_interrupt,
        } => {
            let options = DownloadOptions {
                include_images: config.download.include_images && !no_images,
                extract_content: config.download.extract_content,
            };
            let downloader = Downloader::new(store, Fetcher::over_http()?, options);
            let sink = TerminalSink::new(skip_on_interrupt);
            let mut failures = 0usize;
            for id in ids {
                let entry = match client.entry(id).await {
                    Ok(entry) => entry,
                    Err(err) => {
                        eprintln!("entry {id}: {err}");
                        failures += 1;
                        continue;
                    }
                };
                match downloader.execute(&entry, &sink).await {
                    Outcome::Completed(_) | Outcome::AlreadyDownloaded(_) => {}
                    Outcome::Cancelled(_) => break,
                    Outcome::Failed => failures += 1,
                }
            }
            if failures > 0 {
                return Err(format!("{failures} download(s) failed").into());
            }
        }
        Command::Local => {
            let mut entries: Vec<LocalEntry> = store.scan().try_collect().await?;
            entries.sort_by_key(|entry| entry.id);
            for local in &entries {
                match &local.metadata {
                    Some(meta) => {
                        let date = meta.published_at.format(DATE_FORMAT).unwrap_or_default();
                        println!("{:>8}  {date}  [{}]  {}", meta.id, meta.status, meta.title);
                    }
                    None => println!("{:>8}  (no metadata)", local.id),
                }
            }
        }
        Command::Status { id, status } => {
            let status = status.into();
            client.update_status(&[id], status).await?;
            if store.update_status(id, status).await? {
                println!("entry {id} is now {status}");
            } else {
                println!("entry {id} is now {status} (no local copy)");
            }
        }
        Command::Delete { id } => {
            if let Err(err) = store.delete(id).await {
                if matches!(&*err, inkfeed_library::error::ErrorKind::NotFound(_)) {
                    println!("entry {id} has no local copy");
                    return Ok(());
                }
                return Err(err.into());
            }
            println!("entry {id} removed from the local library");
        }
    }
    Ok(())
}
