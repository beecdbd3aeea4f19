use crate::error::{ErrorKind, FeedError};
use crate::feed::parse_feed;
use crate::livexy_api::FeedSource;
use crate::ptb::{PtbRow, extract};
use log::{info, warn};

pub const NO_DATA_MESSAGE: &str = "Couldn't retrieve play the ball data";

/// What the caller gets back for one match: either the joined table or a bare
/// "no data" signal. The cause has already been logged by then.
#[derive(Debug)]
pub enum PtbOutcome {
    Rows(Vec<PtbRow>),
    NoData(ErrorKind),
}

pub fn fetch_play_the_balls(
    source: &dyn FeedSource,
    game_id: i64,
) -> Result<Vec<PtbRow>, FeedError> {
    let raw = source.fetch(game_id)?;
    let feed = parse_feed(&raw)?;

    info!(
        "Game {}: {} v {}, {} stats in feed",
        game_id,
        feed.home.name,
        feed.away.name,
        feed.events.len()
    );

    extract(&feed.events, game_id)
}

pub fn load_play_the_balls(source: &dyn FeedSource, game_id: i64) -> PtbOutcome {
    match fetch_play_the_balls(source, game_id) {
        Ok(rows) if rows.is_empty() => {
            warn!(
                "Game {}: feed has no play-the-balls with opposing tacklers",
                game_id
            );
            PtbOutcome::NoData(ErrorKind::NoDataAvailable)
        }
        Ok(rows) => {
            info!("Game {}: {} play-the-ball rows", game_id, rows.len());
            PtbOutcome::Rows(rows)
        }
        Err(err) => {
            warn!("Game {}: {}", game_id, err);
            PtbOutcome::NoData(err.kind())
        }
    }
}
