use crate::error::FeedError;
use log::debug;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Period of the match a stat was recorded in. Serialized as its ordinal (1-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Half {
    First,
    Second,
    ExtraTime,
    ExtraTime2,
}

impl Half {
    pub const ALL: [Half; 4] = [Half::First, Half::Second, Half::ExtraTime, Half::ExtraTime2];

    pub fn ordinal(self) -> u8 {
        match self {
            Half::First => 1,
            Half::Second => 2,
            Half::ExtraTime => 3,
            Half::ExtraTime2 => 4,
        }
    }

    fn container(self) -> &'static str {
        match self {
            Half::First => "xandYFeed1stHalf",
            Half::Second => "xandYFeed2ndHalf",
            Half::ExtraTime => "xandYFeedExtraTime",
            Half::ExtraTime2 => "xandYFeedExtraTime2",
        }
    }
}

impl From<Half> for u8 {
    fn from(half: Half) -> u8 {
        half.ordinal()
    }
}

impl TryFrom<u8> for Half {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Half::ALL
            .into_iter()
            .find(|h| h.ordinal() == value)
            .ok_or_else(|| format!("Unknown half {}", value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: i64,
    pub name: String,
}

/// A declared numeric attribute. Values that do not parse keep their text so
/// that only the stages reading the attribute reject them.
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric<T> {
    Number(T),
    Text(String),
}

impl<T: Copy> Numeric<T> {
    pub fn number(&self) -> Option<T> {
        match self {
            Numeric::Number(v) => Some(*v),
            Numeric::Text(_) => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Numeric<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Number(v) => write!(f, "{}", v),
            Numeric::Text(text) => write!(f, "{}", text),
        }
    }
}

/// One `stat` element, with the attributes the pipeline knows about typed up
/// front. Anything else lands in `extra` untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct StatEvent {
    pub half: Half,
    pub team_id: i64,
    pub team_name: String,
    pub stat_name: Option<String>,
    pub set_count: Option<Numeric<i64>>,
    pub tackle_number: Option<Numeric<i64>>,
    pub game_minute: Option<Numeric<i64>>,
    pub player_name: Option<String>,
    pub nx: Option<Numeric<f64>>,
    pub ny: Option<Numeric<f64>>,
    pub time: Option<String>,
    pub rank: Option<Numeric<i64>>,
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Feed {
    pub home: Team,
    pub away: Team,
    pub events: Vec<StatEvent>,
}

pub fn parse_feed(raw: &[u8]) -> Result<Feed, FeedError> {
    let text = std::str::from_utf8(raw)?;
    let doc = Document::parse(text)?;

    let teams: Vec<Node> = doc
        .descendants()
        .filter(|n| is_element(n, "team"))
        .collect();

    let home = find_side(&teams, "true")?.ok_or(FeedError::MissingElement("home team"))?;
    let away = find_side(&teams, "false")?.ok_or(FeedError::MissingElement("away team"))?;

    let mut events = Vec::new();

    for node in &teams {
        let team = read_team(node)?;

        for half in Half::ALL {
            let Some(container) = node.descendants().find(|n| is_element(n, half.container()))
            else {
                continue;
            };

            let before = events.len();
            for stat in container.descendants().filter(|n| is_element(n, "stat")) {
                events.push(read_stat(&stat, half, &team));
            }

            debug!(
                "Team {} half {}: {} stats",
                team.id,
                half.ordinal(),
                events.len() - before
            );
        }
    }

    let unknown: BTreeSet<&str> = events
        .iter()
        .flat_map(|e| e.extra.keys().map(String::as_str))
        .collect();
    if !unknown.is_empty() {
        debug!("Attributes kept as text: {:?}", unknown);
    }

    Ok(Feed { home, away, events })
}

fn is_element(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn find_side(teams: &[Node], is_home: &str) -> Result<Option<Team>, FeedError> {
    teams
        .iter()
        .find(|n| n.attribute("isHomeTeam") == Some(is_home))
        .map(read_team)
        .transpose()
}

fn read_team(node: &Node) -> Result<Team, FeedError> {
    let id = node
        .attribute("teamId")
        .ok_or(FeedError::MissingAttribute {
            element: "team",
            attribute: "teamId",
        })?;
    let name = node
        .attribute("teamName")
        .ok_or(FeedError::MissingAttribute {
            element: "team",
            attribute: "teamName",
        })?;

    Ok(Team {
        id: parse_int("teamId", id)?,
        name: name.to_string(),
    })
}

fn read_stat(node: &Node, half: Half, team: &Team) -> StatEvent {
    let mut event = StatEvent {
        half,
        team_id: team.id,
        team_name: team.name.clone(),
        stat_name: None,
        set_count: None,
        tackle_number: None,
        game_minute: None,
        player_name: None,
        nx: None,
        ny: None,
        time: None,
        rank: None,
        extra: BTreeMap::new(),
    };

    for attr in node.attributes() {
        let value = attr.value();
        if value.trim().is_empty() {
            continue;
        }

        match attr.name() {
            "SN" => event.stat_name = Some(value.to_string()),
            "SC" => event.set_count = Some(int_attr(value)),
            "TN" => event.tackle_number = Some(int_attr(value)),
            "GM" => event.game_minute = Some(int_attr(value)),
            "PN" => event.player_name = Some(value.to_string()),
            "NX" => event.nx = Some(decimal_attr(value)),
            "NY" => event.ny = Some(decimal_attr(value)),
            "T" => event.time = Some(value.to_string()),
            "VR" => event.rank = Some(int_attr(value)),
            other => {
                event.extra.insert(other.to_string(), value.to_string());
            }
        }
    }

    event
}

fn int_attr(value: &str) -> Numeric<i64> {
    match whole_number(value) {
        Some(v) => Numeric::Number(v),
        None => Numeric::Text(value.to_string()),
    }
}

fn decimal_attr(value: &str) -> Numeric<f64> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Numeric::Number(v),
        _ => Numeric::Text(value.to_string()),
    }
}

/// Accepts "12" and also "12.0"; a fractional value is not an integer.
fn whole_number(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }

    match trimmed.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.is_finite() => Some(v as i64),
        _ => None,
    }
}

fn parse_int(attribute: &'static str, value: &str) -> Result<i64, FeedError> {
    whole_number(value).ok_or_else(|| FeedError::InvalidNumber {
        attribute,
        value: value.to_string(),
    })
}
