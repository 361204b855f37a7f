use crate::export::ensure_parent;
use crate::pipeline::classify_defensive;
use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Occurrence counts per name, with ranking.
#[derive(Debug, Default, Clone)]
pub struct FrequencyTable {
    counts: HashMap<String, usize>,
}

impl FrequencyTable {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for name in names {
            table.add(name);
        }
        table
    }

    pub fn add(&mut self, name: impl Into<String>) {
        *self.counts.entry(name.into()).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Count descending, ties by name so the order is stable.
    pub fn ranked(&self) -> Vec<(String, usize)> {
        let mut ranked: Vec<(String, usize)> = self
            .counts
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    pub fn top(&self, k: usize) -> Vec<(String, usize)> {
        self.ranked().into_iter().take(k).collect()
    }

    /// 1-based rank and count of `name`, if present.
    pub fn rank_of(&self, name: &str) -> Option<(usize, usize)> {
        self.ranked()
            .into_iter()
            .position(|(candidate, _)| candidate == name)
            .map(|pos| (pos + 1, self.counts[name]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefensiveShare {
    pub defensive: usize,
    pub non_defensive: usize,
    pub defensive_pct: f64,
    pub non_defensive_pct: f64,
}

impl DefensiveShare {
    pub fn from_items<S: AsRef<str>>(items: &[S], defensive_set: &HashSet<String>) -> Self {
        let defensive = items
            .iter()
            .filter(|item| classify_defensive(item.as_ref(), defensive_set))
            .count();
        let total = items.len();
        let non_defensive = total - defensive;

        let defensive_pct = if total == 0 {
            0.0
        } else {
            defensive as f64 / total as f64 * 100.0
        };
        let non_defensive_pct = if total == 0 {
            0.0
        } else {
            100.0 - defensive_pct
        };

        Self {
            defensive,
            non_defensive,
            defensive_pct,
            non_defensive_pct,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RankedItemRow {
    pub rank: usize,
    pub item_name: String,
    pub count: usize,
    pub is_defensive: bool,
}

pub fn ranked_item_rows(
    ranked: &[(String, usize)],
    defensive_set: &HashSet<String>,
) -> Vec<RankedItemRow> {
    ranked
        .iter()
        .enumerate()
        .map(|(idx, (name, count))| RankedItemRow {
            rank: idx + 1,
            item_name: name.clone(),
            count: *count,
            is_defensive: classify_defensive(name, defensive_set),
        })
        .collect()
}

pub fn write_ranked_items(out_file: &Path, rows: &[RankedItemRow]) -> Result<()> {
    ensure_parent(out_file)?;

    let mut writer = Writer::from_path(out_file)
        .with_context(|| format!("Failed to create {}", out_file.display()))?;

    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DefensiveShareRow {
    pub category: &'static str,
    pub count: usize,
    pub percent: f64,
}

impl DefensiveShare {
    pub fn rows(&self) -> [DefensiveShareRow; 2] {
        let round = |pct: f64| (pct * 100.0).round() / 100.0;
        [
            DefensiveShareRow {
                category: "defensive",
                count: self.defensive,
                percent: round(self.defensive_pct),
            },
            DefensiveShareRow {
                category: "non_defensive",
                count: self.non_defensive,
                percent: round(self.non_defensive_pct),
            },
        ]
    }
}

/// `top_items.csv` -> `top_items_defensive_share.csv`, next to it.
pub fn defensive_share_path(ranked_csv: &Path) -> PathBuf {
    let stem = ranked_csv
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "items".to_string());
    ranked_csv.with_file_name(format!("{}_defensive_share.csv", stem))
}

pub fn write_defensive_share(out_file: &Path, share: &DefensiveShare) -> Result<()> {
    ensure_parent(out_file)?;

    let mut writer = Writer::from_path(out_file)
        .with_context(|| format!("Failed to create {}", out_file.display()))?;

    for row in share.rows() {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}
