use crate::error::FeedError;
use crate::feed::{Half, Numeric, StatEvent};
use log::debug;
use std::collections::BTreeMap;

pub const PLAY_THE_BALL: &str = "Play The Ball";
pub const TACKLE_MADE: &str = "Tackle-Made";

const PTB_ELEMENT: &str = "Play The Ball stat";
const TACKLE_ELEMENT: &str = "Tackle-Made stat";

/// A play-the-ball stat projected down to the columns the analyst works with,
/// coordinates already on the coarse grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayTheBall {
    pub game_id: i64,
    pub team_id: i64,
    pub team_name: String,
    pub half: Half,
    pub set_count: i64,
    pub tackle_number: i64,
    pub stat_name: String,
    pub game_minute: Option<String>,
    pub player_name: Option<String>,
    pub nx: i64,
    pub ny: i64,
    pub time: Option<String>,
    pub rank: i64,
}

/// (GameId, Half, SC, TN, TeamId) of the team that made the tackles.
pub type TackleSlot = (i64, Half, i64, i64, i64);

#[derive(Debug, Clone, PartialEq)]
pub struct PtbRow {
    pub game_id: i64,
    pub team_id: i64,
    pub team_name: String,
    pub half: Half,
    pub set_count: i64,
    pub tackle_number: i64,
    pub stat_name: String,
    pub game_minute: Option<String>,
    pub player_name: Option<String>,
    pub nx: i64,
    pub ny: i64,
    pub time: Option<String>,
    pub tacklers: String,
}

/// Feed units to grid cells: divide by ten, round half to even.
pub fn rescale(value: f64) -> i64 {
    (value / 10.0).round_ties_even() as i64
}

pub fn extract_play_the_balls(
    events: &[StatEvent],
    game_id: i64,
) -> Result<Vec<PlayTheBall>, FeedError> {
    let mut rows = Vec::new();

    for event in events.iter().filter(|e| is_stat(e, PLAY_THE_BALL)) {
        rows.push(PlayTheBall {
            game_id,
            team_id: event.team_id,
            team_name: event.team_name.clone(),
            half: event.half,
            set_count: required(event.set_count.as_ref(), PTB_ELEMENT, "SC")?,
            tackle_number: required(event.tackle_number.as_ref(), PTB_ELEMENT, "TN")?,
            stat_name: PLAY_THE_BALL.to_string(),
            game_minute: event.game_minute.as_ref().map(ToString::to_string),
            player_name: event.player_name.clone(),
            nx: rescale(required(event.nx.as_ref(), PTB_ELEMENT, "NX")?),
            ny: rescale(required(event.ny.as_ref(), PTB_ELEMENT, "NY")?),
            time: event.time.clone(),
            rank: required(event.rank.as_ref(), PTB_ELEMENT, "VR")?,
        });
    }

    rows.sort_by_key(|row| row.rank);

    Ok(rows)
}

/// Names of the tacklers per slot, joined with ", " in the order the feed lists them.
/// Tackles without a usable set or tackle number belong to no slot and are skipped.
pub fn tackler_groups(
    events: &[StatEvent],
    game_id: i64,
) -> Result<BTreeMap<TackleSlot, String>, FeedError> {
    let mut groups: BTreeMap<TackleSlot, Vec<&str>> = BTreeMap::new();

    for event in events.iter().filter(|e| is_stat(e, TACKLE_MADE)) {
        let set_count = event.set_count.as_ref().and_then(Numeric::number);
        let tackle_number = event.tackle_number.as_ref().and_then(Numeric::number);
        let (Some(set_count), Some(tackle_number)) = (set_count, tackle_number) else {
            debug!(
                "Skipping tackle by {} (team {}, half {}) without set/tackle number",
                event.player_name.as_deref().unwrap_or("-"),
                event.team_id,
                event.half.ordinal()
            );
            continue;
        };

        let slot = (game_id, event.half, set_count, tackle_number, event.team_id);
        let name = event
            .player_name
            .as_deref()
            .ok_or(FeedError::MissingAttribute {
                element: TACKLE_ELEMENT,
                attribute: "PN",
            })?;

        groups.entry(slot).or_default().push(name);
    }

    Ok(groups
        .into_iter()
        .map(|(slot, names)| (slot, names.join(", ")))
        .collect())
}

/// Pairs every play-the-ball with the tackler groups of the same game, half, set
/// and tackle, keeping only groups from the other team. A play-the-ball with no
/// opposing group is dropped.
pub fn join_tacklers(
    play_the_balls: Vec<PlayTheBall>,
    groups: &BTreeMap<TackleSlot, String>,
) -> Vec<PtbRow> {
    let mut rows = Vec::new();

    for ptb in play_the_balls {
        let lo = (ptb.game_id, ptb.half, ptb.set_count, ptb.tackle_number, i64::MIN);
        let hi = (ptb.game_id, ptb.half, ptb.set_count, ptb.tackle_number, i64::MAX);

        let opposing: Vec<&String> = groups
            .range(lo..=hi)
            .filter(|((_, _, _, _, tackling_team), _)| *tackling_team != ptb.team_id)
            .map(|(_, names)| names)
            .collect();

        if opposing.is_empty() {
            debug!(
                "No opposing tacklers for play-the-ball rank {} (half {}, set {}, tackle {})",
                ptb.rank,
                ptb.half.ordinal(),
                ptb.set_count,
                ptb.tackle_number
            );
            continue;
        }

        for tacklers in opposing {
            rows.push(PtbRow {
                game_id: ptb.game_id,
                team_id: ptb.team_id,
                team_name: ptb.team_name.clone(),
                half: ptb.half,
                set_count: ptb.set_count,
                tackle_number: ptb.tackle_number,
                stat_name: ptb.stat_name.clone(),
                game_minute: ptb.game_minute.clone(),
                player_name: ptb.player_name.clone(),
                nx: ptb.nx,
                ny: ptb.ny,
                time: ptb.time.clone(),
                tacklers: tacklers.clone(),
            });
        }
    }

    rows
}

pub fn extract(events: &[StatEvent], game_id: i64) -> Result<Vec<PtbRow>, FeedError> {
    let play_the_balls = extract_play_the_balls(events, game_id)?;
    let groups = tackler_groups(events, game_id)?;

    debug!(
        "Game {}: {} play-the-balls, {} tackler groups",
        game_id,
        play_the_balls.len(),
        groups.len()
    );

    Ok(join_tacklers(play_the_balls, &groups))
}

fn is_stat(event: &StatEvent, name: &str) -> bool {
    event.stat_name.as_deref() == Some(name)
}

fn required<T: Copy>(
    value: Option<&Numeric<T>>,
    element: &'static str,
    attribute: &'static str,
) -> Result<T, FeedError> {
    match value {
        Some(Numeric::Number(v)) => Ok(*v),
        Some(Numeric::Text(text)) => Err(FeedError::InvalidNumber {
            attribute,
            value: text.clone(),
        }),
        None => Err(FeedError::MissingAttribute { element, attribute }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(team_id: i64, stat_name: &str, sc: i64, tn: i64, pn: &str, vr: i64) -> StatEvent {
        StatEvent {
            half: Half::First,
            team_id,
            team_name: format!("Team {}", team_id),
            stat_name: Some(stat_name.to_string()),
            set_count: Some(Numeric::Number(sc)),
            tackle_number: Some(Numeric::Number(tn)),
            game_minute: Some(Numeric::Number(5)),
            player_name: Some(pn.to_string()),
            nx: Some(Numeric::Number(500.0)),
            ny: Some(Numeric::Number(300.0)),
            time: Some("04:59".to_string()),
            rank: Some(Numeric::Number(vr)),
            extra: BTreeMap::new(),
        }
    }

    fn ptb(team_id: i64, sc: i64, tn: i64, pn: &str, vr: i64) -> StatEvent {
        stat(team_id, PLAY_THE_BALL, sc, tn, pn, vr)
    }

    fn tackle(team_id: i64, sc: i64, tn: i64, pn: &str) -> StatEvent {
        stat(team_id, TACKLE_MADE, sc, tn, pn, 0)
    }

    #[test]
    fn test_rescale_rounds_half_to_even() {
        assert_eq!(rescale(123.0), 12);
        assert_eq!(rescale(87.0), 9);
        assert_eq!(rescale(125.0), 12);
        assert_eq!(rescale(135.0), 14);
        assert_eq!(rescale(0.0), 0);
    }

    #[test]
    fn test_play_the_ball_coordinates_rescaled() {
        let mut event = ptb(10, 1, 1, "Hughes", 1);
        event.nx = Some(Numeric::Number(123.0));
        event.ny = Some(Numeric::Number(87.0));

        let rows = extract_play_the_balls(&[event], 42).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].nx, rows[0].ny), (12, 9));
        assert_eq!(rows[0].game_id, 42);
    }

    #[test]
    fn test_play_the_balls_sorted_by_rank() {
        let events = vec![
            ptb(10, 1, 1, "A", 5),
            tackle(20, 1, 1, "X"),
            ptb(10, 1, 2, "B", 1),
            ptb(10, 1, 3, "C", 3),
        ];

        let rows = extract_play_the_balls(&events, 1).unwrap();
        let ranks: Vec<i64> = rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 3, 5]);
    }

    #[test]
    fn test_tacklers_keep_encounter_order() {
        let events = vec![tackle(20, 4, 2, "Smith"), tackle(20, 4, 2, "Jones")];

        let groups = tackler_groups(&events, 1).unwrap();
        assert_eq!(
            groups.get(&(1, Half::First, 4, 2, 20)).map(String::as_str),
            Some("Smith, Jones")
        );
    }

    #[test]
    fn test_no_self_pairing() {
        let events = vec![ptb(10, 2, 3, "Hughes", 1), tackle(10, 2, 3, "Own")];

        let rows = extract(&events, 1).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_pairs_only_with_opposing_team() {
        let events = vec![
            ptb(10, 2, 3, "Hughes", 1),
            tackle(20, 2, 3, "Doe"),
            tackle(20, 2, 4, "Elsewhere"),
        ];

        let rows = extract(&events, 1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].team_id, 10);
        assert_eq!(rows[0].tacklers, "Doe");
    }

    #[test]
    fn test_both_teams_tackling_same_slot() {
        let events = vec![
            tackle(10, 6, 1, "Own A"),
            ptb(10, 6, 1, "Hughes", 7),
            tackle(20, 6, 1, "Doe"),
            tackle(20, 6, 1, "Roe"),
            tackle(10, 6, 1, "Own B"),
        ];

        let rows = extract(&events, 1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].team_id, 10);
        assert_eq!(rows[0].tacklers, "Doe, Roe");
    }

    #[test]
    fn test_halves_do_not_join() {
        let mut tackle_2nd = tackle(20, 1, 1, "Doe");
        tackle_2nd.half = Half::Second;
        let events = vec![ptb(10, 1, 1, "Hughes", 1), tackle_2nd];

        assert!(extract(&events, 1).unwrap().is_empty());
    }

    #[test]
    fn test_no_play_the_balls_is_empty_not_error() {
        let events = vec![tackle(20, 1, 1, "Doe"), stat(10, "Kick", 1, 5, "Cleary", 9)];

        assert!(extract(&events, 1).unwrap().is_empty());
        assert!(extract(&[], 1).unwrap().is_empty());
    }

    #[test]
    fn test_missing_rank_is_error() {
        let mut event = ptb(10, 1, 1, "Hughes", 1);
        event.rank = None;

        let err = extract(&[event], 1).unwrap_err();
        assert!(matches!(
            err,
            FeedError::MissingAttribute {
                attribute: "VR",
                ..
            }
        ));
    }

    #[test]
    fn test_output_follows_rank_order() {
        let events = vec![
            ptb(10, 1, 1, "Late", 20),
            ptb(20, 2, 1, "Early", 10),
            tackle(20, 1, 1, "Doe"),
            tackle(10, 2, 1, "Smith"),
        ];

        let rows = extract(&events, 1).unwrap();
        let players: Vec<&str> = rows
            .iter()
            .filter_map(|r| r.player_name.as_deref())
            .collect();
        assert_eq!(players, vec!["Early", "Late"]);
        assert_eq!(rows[0].tacklers, "Smith");
    }

    #[test]
    fn test_tackle_without_set_is_skipped() {
        let mut loose = tackle(20, 1, 1, "Loose");
        loose.set_count = None;
        let mut garbled = tackle(20, 1, 1, "Garbled");
        garbled.tackle_number = Some(Numeric::Text("?".to_string()));
        let events = vec![ptb(10, 1, 1, "Hughes", 1), loose, tackle(20, 1, 1, "Doe"), garbled];

        let rows = extract(&events, 1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tacklers, "Doe");
    }

    #[test]
    fn test_game_minute_kept_as_text() {
        let mut event = ptb(10, 1, 1, "Hughes", 1);
        event.game_minute = Some(Numeric::Text("HT".to_string()));
        let events = vec![event, tackle(20, 1, 1, "Doe")];

        let rows = extract(&events, 1).unwrap();
        assert_eq!(rows[0].game_minute.as_deref(), Some("HT"));

        let rows = extract(&[ptb(10, 1, 1, "Hughes", 1), tackle(20, 1, 1, "Doe")], 1).unwrap();
        assert_eq!(rows[0].game_minute.as_deref(), Some("5"));
    }

    #[test]
    fn test_text_coordinate_on_play_the_ball_is_error() {
        let mut event = ptb(10, 1, 1, "Hughes", 1);
        event.nx = Some(Numeric::Text("n/a".to_string()));

        let err = extract(&[event], 1).unwrap_err();
        assert!(matches!(err, FeedError::InvalidNumber { attribute: "NX", .. }));
    }

    #[test]
    fn test_unnamed_stats_match_neither_filter() {
        let mut unnamed = tackle(20, 1, 1, "Ghost");
        unnamed.stat_name = None;
        let events = vec![ptb(10, 1, 1, "Hughes", 1), unnamed, tackle(20, 1, 1, "Doe")];

        let rows = extract(&events, 1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tacklers, "Doe");
    }
}
