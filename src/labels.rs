use crate::feed::Half;
use crate::ptb::PtbRow;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyPosition {
    Front,
    Back,
    Standing,
}

impl BodyPosition {
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        match raw.trim().to_lowercase().as_str() {
            "front" => Ok(Some(BodyPosition::Front)),
            "back" => Ok(Some(BodyPosition::Back)),
            "standing" => Ok(Some(BodyPosition::Standing)),
            "" | "none" => Ok(None),
            other => bail!(
                "Unsupported body position '{}'. Supported: front, back, standing, none.",
                other
            ),
        }
    }
}

/// One exported play-the-ball with the two columns the analyst fills in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRow {
    #[serde(rename = "Game ID")]
    pub game_id: i64,
    #[serde(rename = "Team ID")]
    pub team_id: i64,
    #[serde(rename = "Team Name")]
    pub team_name: String,
    #[serde(rename = "Half")]
    pub half: Half,
    #[serde(rename = "Set")]
    pub set_count: i64,
    #[serde(rename = "Tackle")]
    pub tackle_number: i64,
    #[serde(rename = "Stat")]
    pub stat_name: String,
    #[serde(rename = "Min")]
    pub game_minute: Option<String>,
    #[serde(rename = "Player")]
    pub player_name: Option<String>,
    #[serde(rename = "PTB Won")]
    pub ptb_won: bool,
    #[serde(rename = "Body Position")]
    pub body_position: Option<BodyPosition>,
    #[serde(rename = "Length")]
    pub nx: i64,
    #[serde(rename = "Width")]
    pub ny: i64,
    #[serde(rename = "Time")]
    pub time: Option<String>,
    #[serde(rename = "Tacklers")]
    pub tacklers: String,
}

impl From<PtbRow> for LabelRow {
    fn from(row: PtbRow) -> Self {
        Self {
            game_id: row.game_id,
            team_id: row.team_id,
            team_name: row.team_name,
            half: row.half,
            set_count: row.set_count,
            tackle_number: row.tackle_number,
            stat_name: row.stat_name,
            game_minute: row.game_minute,
            player_name: row.player_name,
            ptb_won: false,
            body_position: None,
            nx: row.nx,
            ny: row.ny,
            time: row.time,
            tacklers: row.tacklers,
        }
    }
}

pub fn label_rows(rows: Vec<PtbRow>) -> Vec<LabelRow> {
    rows.into_iter().map(LabelRow::from).collect()
}

pub fn export_file_name(game_id: i64, created: &DateTime<Local>) -> String {
    format!(
        "ptb_labels_{}_{}.csv",
        game_id,
        created.format("%d%m%y_%H%M")
    )
}

pub fn write_labels<W: Write>(writer: W, rows: &[LabelRow]) -> Result<()> {
    let mut writer = Writer::from_writer(writer);

    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn export_labels(
    out_dir: &Path,
    game_id: i64,
    rows: &[LabelRow],
    created: &DateTime<Local>,
) -> Result<PathBuf> {
    if !out_dir.as_os_str().is_empty() {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    }

    let path = out_dir.join(export_file_name(game_id, created));
    let file = fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_labels(file, rows)?;

    Ok(path)
}

pub fn read_labels(path: &Path) -> Result<Vec<LabelRow>> {
    let mut reader =
        Reader::from_path(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<LabelRow>().enumerate() {
        let row: LabelRow =
            record.with_context(|| format!("Invalid label row {} in {}", idx + 1, path.display()))?;
        rows.push(row);
    }

    Ok(rows)
}

/// Changes to the user-editable columns of one row. `None` leaves a column as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelEdit {
    pub ptb_won: Option<bool>,
    pub body_position: Option<Option<BodyPosition>>,
}

/// Applies `edit` to the 1-based data row `row` of a labels file and rewrites it.
pub fn update_label(path: &Path, row: usize, edit: LabelEdit) -> Result<LabelRow> {
    let mut rows = read_labels(path)?;
    let total = rows.len();

    let Some(target) = row.checked_sub(1).and_then(|idx| rows.get_mut(idx)) else {
        bail!("Row {} out of range (file has {} rows)", row, total);
    };

    if let Some(won) = edit.ptb_won {
        target.ptb_won = won;
    }
    if let Some(position) = edit.body_position {
        target.body_position = position;
    }
    let updated = target.clone();

    replace_labels(path, &rows)?;

    Ok(updated)
}

/// Writes the rows next to `path` first and renames over it, so a failed write
/// leaves the previous labels intact.
fn replace_labels(path: &Path, rows: &[LabelRow]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to stage rewrite of {}", path.display()))?;
    write_labels(&mut staged, rows)?;
    staged
        .persist(path)
        .with_context(|| format!("Failed to rewrite {}", path.display()))?;

    Ok(())
}
