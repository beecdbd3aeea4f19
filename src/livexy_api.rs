use crate::config::Config;
use crate::error::FeedError;
use log::{debug, info};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};

/// Anything that can hand back the raw LiveXY document for a match.
pub trait FeedSource {
    fn fetch(&self, game_id: i64) -> Result<Vec<u8>, FeedError>;
}

pub struct LiveXyClient {
    client: Client,
    config: Config,
}

impl LiveXyClient {
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self, FeedError> {
        Ok(Self::new(Config::from_env()?))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.api_user, Some(&self.config.api_password))
            .send()?;

        check_status(url, response.status())?;

        Ok(response.bytes()?.to_vec())
    }
}

impl FeedSource for LiveXyClient {
    fn fetch(&self, game_id: i64) -> Result<Vec<u8>, FeedError> {
        let url = self.config.url_for(game_id);
        self.get_bytes(&url)
    }
}

/// Only a plain 200 counts as a feed; redirects and other 2xx codes do not.
pub fn check_status(url: &str, status: StatusCode) -> Result<(), FeedError> {
    if status != StatusCode::OK {
        return Err(FeedError::Status {
            url: url.to_string(),
            status,
        });
    }

    Ok(())
}

/// Reads a previously saved feed from disk. The match id is not used to locate it.
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl FeedSource for FileFeed {
    fn fetch(&self, game_id: i64) -> Result<Vec<u8>, FeedError> {
        debug!("Reading feed for game {} from {}", game_id, self.path.display());
        Ok(fs::read(&self.path)?)
    }
}

pub fn download_and_save_feed(
    source: &dyn FeedSource,
    game_id: i64,
    out_file: &Path,
) -> Result<usize, FeedError> {
    if let Some(parent) = out_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let body = source.fetch(game_id)?;
    fs::write(out_file, &body)?;

    info!(
        "Saved feed for game {} ({} bytes) to {}",
        game_id,
        body.len(),
        out_file.display()
    );

    Ok(body.len())
}
