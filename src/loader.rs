use crate::model::{
    ChampionReference, ContextColumn, ItemId, ItemReference, MatchContext, MatchRecord,
};
use crate::reference::{ChampionTable, ItemTable};
use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, StringRecord};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

const PAYLOAD_COLUMNS: [&str; 2] = ["players", "champion"];

#[derive(Debug)]
pub struct MatchTable {
    pub records: Vec<MatchRecord>,
    /// Context columns present in the header, in header order.
    pub context_columns: Vec<ContextColumn>,
    pub payload_column: String,
    pub skipped_rows: usize,
}

pub fn load_matches(path: &Path, payload_column: Option<&str>) -> Result<MatchTable> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open match table {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();

    let column_index = |name: &str| headers.iter().position(|h| h.trim() == name);

    let game_id_idx = column_index("gameId")
        .ok_or_else(|| anyhow!("Match table {} has no gameId column", path.display()))?;

    let (payload_idx, payload_name) = match payload_column {
        Some(name) => {
            let idx = column_index(name).ok_or_else(|| {
                anyhow!("Match table {} has no {} column", path.display(), name)
            })?;
            (idx, name.to_string())
        }
        None => PAYLOAD_COLUMNS
            .into_iter()
            .find_map(|name| column_index(name).map(|idx| (idx, name.to_string())))
            .ok_or_else(|| {
                anyhow!(
                    "Match table {} has neither a players nor a champion column",
                    path.display()
                )
            })?,
    };

    let mut context_idx: Vec<(ContextColumn, usize)> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(column) = ContextColumn::from_column_name(header) {
            if !context_idx.iter().any(|(seen, _)| *seen == column) {
                context_idx.push((column, idx));
            }
        }
    }

    let mut records = Vec::new();
    let mut skipped_rows = 0usize;

    for (row_number, result) in reader.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!("Skipping unreadable match row {}: {}", row_number + 1, err);
                skipped_rows += 1;
                continue;
            }
        };

        let game_id = match cell(&row, game_id_idx) {
            Some(id) => id.to_string(),
            None => {
                warn!("Match row {} has no gameId", row_number + 1);
                format!("row-{}", row_number + 1)
            }
        };

        let mut context = MatchContext::default();
        for (column, idx) in &context_idx {
            let value = cell(&row, *idx);
            match column {
                ContextColumn::GameDuration => context.game_duration = value.and_then(parse_f64),
                ContextColumn::IngameDuration => {
                    context.ingame_duration = value.and_then(parse_f64)
                }
                ContextColumn::Level => context.level = value.and_then(parse_i64),
                ContextColumn::LastRound => context.last_round = value.and_then(parse_i64),
                ContextColumn::Ranked => context.ranked = value.and_then(parse_bool),
            }
        }

        records.push(MatchRecord {
            game_id,
            context,
            players_raw: cell(&row, payload_idx).map(|s| s.to_string()),
        });
    }

    info!(
        "Loaded {} match records from {} (payload column {}, {} rows skipped)",
        records.len(),
        path.display(),
        payload_name,
        skipped_rows
    );

    Ok(MatchTable {
        records,
        context_columns: context_idx.into_iter().map(|(column, _)| column).collect(),
        payload_column: payload_name,
        skipped_rows,
    })
}

/// Columns `load_items` interprets; any others pass through untouched.
const ITEM_COLUMNS: [&str; 4] = ["id", "name", "item_type", "is_defensive"];

pub fn load_items(path: &Path) -> Result<ItemTable> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open item table {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();

    let column_index = |name: &str| headers.iter().position(|h| h.trim() == name);
    let id_idx = column_index("id")
        .ok_or_else(|| anyhow!("{} has no id column", path.display()))?;
    let name_idx = column_index("name")
        .ok_or_else(|| anyhow!("{} has no name column", path.display()))?;
    let item_type_idx = column_index("item_type");
    let defensive_idx = column_index("is_defensive");

    let extra_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, header)| !ITEM_COLUMNS.contains(&header.trim()))
        .map(|(idx, _)| idx)
        .collect();
    let extra_columns: Vec<String> = extra_idx
        .iter()
        .map(|&idx| headers[idx].trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_number, result) in reader.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!("Skipping item row {}: {}", row_number + 1, err);
                continue;
            }
        };

        let Some(id) = cell(&row, id_idx).and_then(ItemId::parse) else {
            warn!("Skipping item row {} without id", row_number + 1);
            continue;
        };

        rows.push(ItemReference {
            id,
            name: cell(&row, name_idx).unwrap_or_default().to_string(),
            item_type: item_type_idx
                .and_then(|idx| cell(&row, idx))
                .map(String::from),
            is_defensive: defensive_idx
                .and_then(|idx| cell(&row, idx))
                .and_then(parse_bool),
            extra: extra_idx
                .iter()
                .map(|&idx| row.get(idx).unwrap_or_default().to_string())
                .collect(),
        });
    }

    let table = ItemTable::from_entries(rows).with_extra_columns(extra_columns);
    info!("Loaded {} items from {}", table.len(), path.display());
    Ok(table)
}

#[derive(Debug, Deserialize)]
struct ChampionCsvRow {
    name: String,
    #[serde(default)]
    cost: Option<String>,
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    class: Option<String>,
}

pub fn load_champions(path: &Path) -> Result<ChampionTable> {
    let mut reader = ReaderBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to open champion table {}", path.display()))?;
    require_columns(&mut reader, path, &["name"])?;

    let mut rows = Vec::new();
    for (row_number, result) in reader.deserialize::<ChampionCsvRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!("Skipping champion row {}: {}", row_number + 1, err);
                continue;
            }
        };

        if row.name.trim().is_empty() {
            continue;
        }

        rows.push(ChampionReference {
            name: row.name.trim().to_string(),
            cost: row.cost.as_deref().and_then(parse_i64),
            origin: non_empty(row.origin),
            class: non_empty(row.class),
        });
    }

    let table = ChampionTable::from_entries(rows);
    info!("Loaded {} champions from {}", table.len(), path.display());
    Ok(table)
}

fn require_columns<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    path: &Path,
    required: &[&str],
) -> Result<()> {
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?;
    for column in required {
        if !headers.iter().any(|h| h.trim() == *column) {
            return Err(anyhow!("{} has no {} column", path.display(), column));
        }
    }
    Ok(())
}

fn cell(row: &StringRecord, idx: usize) -> Option<&str> {
    row.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_i64(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" | "y" => Some(true),
        "false" | "0" | "0.0" | "no" | "n" => Some(false),
        _ => None,
    }
}
