use crate::config::AnalysisConfig;
use crate::decode::PayloadShape;
use crate::error::SkipReason;
use crate::model::{
    ChampionColumns, EnrichedRow, FlatChampionRow, FlatItemRow, ItemColumns, MatchRecord,
    normalize_champion,
};
use crate::reference::{ChampionTable, ItemTable};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Renaming applied to reference-table columns when they are joined in.
pub struct JoinColumns {
    pub renames: &'static [(&'static str, &'static str)],
}

pub const ITEM_JOIN: JoinColumns = JoinColumns {
    renames: &[
        ("name", "name_item"),
        ("item_type", "item_type_item"),
        ("is_defensive", "is_defensive_item"),
    ],
};

pub const CHAMPION_JOIN: JoinColumns = JoinColumns {
    renames: &[
        ("name", "name_champ"),
        ("cost", "cost_champ"),
        ("origin", "origin_champ"),
        ("class", "class_champ"),
    ],
};

impl JoinColumns {
    pub fn output_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.renames.iter().map(|(_, renamed)| *renamed)
    }
}

#[derive(Debug)]
pub struct SkippedRecord {
    pub game_id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct FlattenReport {
    pub records_seen: usize,
    pub skipped: Vec<SkippedRecord>,
    pub unusable_units: usize,
}

impl FlattenReport {
    pub fn records_flattened(&self) -> usize {
        self.records_seen - self.skipped.len()
    }
}

/// Rows flattened out of one match, or the reason there are none.
#[derive(Debug, Default)]
pub struct FlattenedMatch {
    pub rows: Vec<FlatChampionRow>,
    pub unusable_units: usize,
    pub skipped: Option<SkipReason>,
}

/// One row per parsed unit, game scalars broadcast onto each.
pub fn flatten_match(record: &MatchRecord, shape: PayloadShape) -> FlattenedMatch {
    let Some(raw) = record.players_raw.as_deref() else {
        return FlattenedMatch {
            skipped: Some(SkipReason::MissingPayload),
            ..Default::default()
        };
    };

    let parsed = shape.parse(raw);
    let rows = parsed
        .units
        .into_iter()
        .map(|unit| FlatChampionRow {
            game_id: record.game_id.clone(),
            context: record.context.clone(),
            champion_name: unit.character_id,
            items: unit.items,
            star: unit.star,
        })
        .collect();

    FlattenedMatch {
        rows,
        unusable_units: parsed.unusable_units,
        skipped: parsed.skipped,
    }
}

/// Flattens a batch; records that fail to decode are skipped and reported.
pub fn flatten_matches(
    records: &[MatchRecord],
    shape: PayloadShape,
) -> (Vec<FlatChampionRow>, FlattenReport) {
    let mut rows = Vec::new();
    let mut report = FlattenReport {
        records_seen: records.len(),
        ..Default::default()
    };

    for record in records {
        let flattened = flatten_match(record, shape);
        report.unusable_units += flattened.unusable_units;
        match flattened.skipped {
            None => rows.extend(flattened.rows),
            Some(reason) => {
                warn!("Skipping game {}: {}", record.game_id, reason);
                report.skipped.push(SkippedRecord {
                    game_id: record.game_id.clone(),
                    reason,
                });
            }
        }
    }

    if report.unusable_units > 0 {
        debug!(
            "{} units without character_id were ignored",
            report.unusable_units
        );
    }

    (rows, report)
}

/// One row per item; item-less champions keep a single row with no item.
pub fn explode_items(rows: &[FlatChampionRow]) -> Vec<FlatItemRow> {
    let mut out = Vec::with_capacity(rows.len());

    for row in rows {
        if row.items.is_empty() {
            out.push(FlatItemRow {
                game_id: row.game_id.clone(),
                context: row.context.clone(),
                champion_name: row.champion_name.clone(),
                star: row.star,
                item_id: None,
            });
            continue;
        }

        for item in &row.items {
            out.push(FlatItemRow {
                game_id: row.game_id.clone(),
                context: row.context.clone(),
                champion_name: row.champion_name.clone(),
                star: row.star,
                item_id: Some(item.clone()),
            });
        }
    }

    out
}

/// Left join against both reference tables. Unmatched keys leave nulls.
pub fn enrich(
    rows: &[FlatItemRow],
    item_ref: &ItemTable,
    champ_ref: &ChampionTable,
) -> Vec<EnrichedRow> {
    rows.iter()
        .map(|row| {
            let item = row
                .item_id
                .as_ref()
                .and_then(|id| item_ref.get(id))
                .map(|found| ItemColumns {
                    name_item: Some(found.name.clone()),
                    item_type_item: found.item_type.clone(),
                    is_defensive_item: found.is_defensive,
                })
                .unwrap_or_default();

            let champion = champ_ref
                .get(&row.champion_name)
                .map(|found| ChampionColumns {
                    name_champ: Some(found.name.clone()),
                    cost_champ: found.cost,
                    origin_champ: found.origin.clone(),
                    class_champ: found.class.clone(),
                })
                .unwrap_or_default();

            EnrichedRow {
                game_id: row.game_id.clone(),
                context: row.context.clone(),
                champion_name: row.champion_name.clone(),
                star: row.star,
                item_id: row.item_id.clone(),
                item,
                champion,
                is_defensive: None,
            }
        })
        .collect()
}

pub fn filter_champion(
    rows: &[EnrichedRow],
    champion_name: &str,
    case_insensitive: bool,
) -> Vec<EnrichedRow> {
    let wanted = if case_insensitive {
        normalize_champion(champion_name)
    } else {
        champion_name.trim().to_string()
    };

    rows.iter()
        .filter(|row| {
            if case_insensitive {
                normalize_champion(&row.champion_name) == wanted
            } else {
                row.champion_name.trim() == wanted
            }
        })
        .cloned()
        .collect()
}

pub fn classify_defensive(item: &str, defensive_set: &HashSet<String>) -> bool {
    defensive_set.contains(item.trim())
}

/// Marks each row by the defensive set, by item name or else by raw id.
pub fn tag_defensive(rows: Vec<EnrichedRow>, defensive_set: &HashSet<String>) -> Vec<EnrichedRow> {
    rows.into_iter()
        .map(|mut row| {
            row.is_defensive = row.item_id.as_ref().map(|id| {
                let by_name = row
                    .item
                    .name_item
                    .as_deref()
                    .map(|name| classify_defensive(name, defensive_set))
                    .unwrap_or(false);
                by_name || classify_defensive(id.as_str(), defensive_set)
            });
            row
        })
        .collect()
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub champions: Vec<FlatChampionRow>,
    pub rows: Vec<EnrichedRow>,
    pub report: FlattenReport,
}

/// Flatten, explode, enrich and tag in one pass over an in-memory batch.
pub struct Pipeline<'a> {
    items: &'a ItemTable,
    champions: &'a ChampionTable,
    defensive: HashSet<String>,
    shape: PayloadShape,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &AnalysisConfig, items: &'a ItemTable, champions: &'a ChampionTable) -> Self {
        Self {
            items,
            champions,
            defensive: config.defensive.to_set(),
            shape: config.payload.shape,
        }
    }

    pub fn run(&self, records: &[MatchRecord]) -> PipelineOutput {
        let (champions, report) = flatten_matches(records, self.shape);
        let exploded = explode_items(&champions);
        let enriched = enrich(&exploded, self.items, self.champions);
        let rows = tag_defensive(enriched, &self.defensive);

        info!(
            "Flattened {}/{} matches into {} champion rows and {} item rows ({} skipped)",
            report.records_flattened(),
            report.records_seen,
            champions.len(),
            rows.len(),
            report.skipped.len()
        );

        PipelineOutput {
            champions,
            rows,
            report,
        }
    }
}
