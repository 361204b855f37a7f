use crate::model::{ContextColumn, EnrichedRow, opt_to_cell};
use crate::pipeline::{CHAMPION_JOIN, ITEM_JOIN, classify_defensive};
use crate::reference::ItemTable;
use anyhow::{Context, Result};
use csv::Writer;
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

pub fn enriched_header(context_columns: &[ContextColumn]) -> Vec<String> {
    let mut header = vec!["gameId".to_string()];
    header.extend(context_columns.iter().map(|c| c.column_name().to_string()));
    header.extend(["champion_name", "star", "item_id"].map(String::from));
    header.extend(ITEM_JOIN.output_names().map(String::from));
    header.extend(CHAMPION_JOIN.output_names().map(String::from));
    header.push("is_defensive".to_string());
    header
}

/// Cells in `enriched_header` order; the join blocks follow the rename tables.
pub fn enriched_record(row: &EnrichedRow, context_columns: &[ContextColumn]) -> Vec<String> {
    let mut record = vec![row.game_id.clone()];
    record.extend(context_columns.iter().map(|c| row.context.cell(*c)));
    record.push(row.champion_name.clone());
    record.push(row.star.to_string());
    record.push(opt_to_cell(row.item_id.as_ref()));

    record.push(opt_to_cell(row.item.name_item.as_ref()));
    record.push(opt_to_cell(row.item.item_type_item.as_ref()));
    record.push(opt_to_cell(row.item.is_defensive_item));

    record.push(opt_to_cell(row.champion.name_champ.as_ref()));
    record.push(opt_to_cell(row.champion.cost_champ));
    record.push(opt_to_cell(row.champion.origin_champ.as_ref()));
    record.push(opt_to_cell(row.champion.class_champ.as_ref()));

    record.push(opt_to_cell(row.is_defensive));
    record
}

pub fn ensure_parent(out_file: &Path) -> Result<()> {
    if let Some(parent) = out_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

pub fn write_enriched_csv(
    out_file: &Path,
    rows: &[EnrichedRow],
    context_columns: &[ContextColumn],
) -> Result<()> {
    ensure_parent(out_file)?;

    let mut writer = Writer::from_path(out_file)
        .with_context(|| format!("Failed to create {}", out_file.display()))?;
    writer.write_record(enriched_header(context_columns))?;
    for row in rows {
        writer.write_record(enriched_record(row, context_columns))?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {}", rows.len(), out_file.display());
    Ok(())
}

pub fn enriched_frame(
    rows: &[EnrichedRow],
    context_columns: &[ContextColumn],
) -> Result<DataFrame, PolarsError> {
    let mut game_id: Vec<String> = Vec::with_capacity(rows.len());
    let mut champion_name: Vec<String> = Vec::with_capacity(rows.len());
    let mut star: Vec<i64> = Vec::with_capacity(rows.len());
    let mut item_id: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut name_item: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut item_type_item: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut is_defensive_item: Vec<Option<bool>> = Vec::with_capacity(rows.len());
    let mut name_champ: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut cost_champ: Vec<Option<i64>> = Vec::with_capacity(rows.len());
    let mut origin_champ: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut class_champ: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut is_defensive: Vec<Option<bool>> = Vec::with_capacity(rows.len());

    for row in rows {
        game_id.push(row.game_id.clone());
        champion_name.push(row.champion_name.clone());
        star.push(row.star);
        item_id.push(row.item_id.as_ref().map(|id| id.to_string()));
        name_item.push(row.item.name_item.clone());
        item_type_item.push(row.item.item_type_item.clone());
        is_defensive_item.push(row.item.is_defensive_item);
        name_champ.push(row.champion.name_champ.clone());
        cost_champ.push(row.champion.cost_champ);
        origin_champ.push(row.champion.origin_champ.clone());
        class_champ.push(row.champion.class_champ.clone());
        is_defensive.push(row.is_defensive);
    }

    let mut columns = vec![Series::new("gameId", game_id)];
    for column in context_columns {
        let name = column.column_name();
        let series = match column {
            ContextColumn::GameDuration => Series::new(
                name,
                rows.iter()
                    .map(|r| r.context.game_duration)
                    .collect::<Vec<Option<f64>>>(),
            ),
            ContextColumn::IngameDuration => Series::new(
                name,
                rows.iter()
                    .map(|r| r.context.ingame_duration)
                    .collect::<Vec<Option<f64>>>(),
            ),
            ContextColumn::Level => Series::new(
                name,
                rows.iter()
                    .map(|r| r.context.level)
                    .collect::<Vec<Option<i64>>>(),
            ),
            ContextColumn::LastRound => Series::new(
                name,
                rows.iter()
                    .map(|r| r.context.last_round)
                    .collect::<Vec<Option<i64>>>(),
            ),
            ContextColumn::Ranked => Series::new(
                name,
                rows.iter()
                    .map(|r| r.context.ranked)
                    .collect::<Vec<Option<bool>>>(),
            ),
        };
        columns.push(series);
    }

    columns.extend([
        Series::new("champion_name", champion_name),
        Series::new("star", star),
        Series::new("item_id", item_id),
        Series::new("name_item", name_item),
        Series::new("item_type_item", item_type_item),
        Series::new("is_defensive_item", is_defensive_item),
        Series::new("name_champ", name_champ),
        Series::new("cost_champ", cost_champ),
        Series::new("origin_champ", origin_champ),
        Series::new("class_champ", class_champ),
        Series::new("is_defensive", is_defensive),
    ]);

    DataFrame::new(columns)
}

pub fn write_enriched_parquet(
    out_parquet: &Path,
    rows: &[EnrichedRow],
    context_columns: &[ContextColumn],
) -> Result<()> {
    ensure_parent(out_parquet)?;

    let mut df = enriched_frame(rows, context_columns)?;
    let mut file = File::create(out_parquet)
        .with_context(|| format!("Failed to create {}", out_parquet.display()))?;
    ParquetWriter::new(&mut file).finish(&mut df)?;

    info!("Wrote {} rows to {}", df.height(), out_parquet.display());
    Ok(())
}

#[derive(Debug, PartialEq)]
pub struct CategorizedItem {
    pub id: String,
    pub name: String,
    /// Passthrough cells, in the item table's `extra_columns` order.
    pub extra: Vec<String>,
    pub item_type: &'static str,
    pub is_defensive: bool,
}

/// Tags every reference item as component/completed and defensive or not.
pub fn categorize_items(
    items: &ItemTable,
    components: &HashSet<String>,
    defensive_set: &HashSet<String>,
) -> Vec<CategorizedItem> {
    items
        .entries()
        .iter()
        .map(|item| CategorizedItem {
            id: item.id.to_string(),
            name: item.name.clone(),
            extra: item.extra.clone(),
            item_type: if components.contains(&item.name) {
                "component"
            } else {
                "completed"
            },
            is_defensive: classify_defensive(&item.name, defensive_set),
        })
        .collect()
}

/// Writes `id,name`, the passthrough columns, then the two computed tags.
/// Input `item_type`/`is_defensive` columns are replaced by the tags.
pub fn write_categorized_items(
    out_file: &Path,
    extra_columns: &[String],
    rows: &[CategorizedItem],
) -> Result<()> {
    ensure_parent(out_file)?;

    let mut writer = Writer::from_path(out_file)
        .with_context(|| format!("Failed to create {}", out_file.display()))?;

    let mut header = vec!["id", "name"];
    header.extend(extra_columns.iter().map(String::as_str));
    header.extend(["item_type", "is_defensive"]);
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.id.as_str(), row.name.as_str()];
        record.extend(row.extra.iter().map(String::as_str));
        record.push(row.item_type);
        record.push(if row.is_defensive { "true" } else { "false" });
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!("Wrote {} categorized items to {}", rows.len(), out_file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChampionColumns, ItemColumns, ItemId, ItemReference, MatchContext};

    fn row(item: Option<&str>, name: Option<&str>) -> EnrichedRow {
        EnrichedRow {
            game_id: "1".to_string(),
            context: MatchContext {
                ingame_duration: Some(1500.0),
                ranked: Some(true),
                ..Default::default()
            },
            champion_name: "Vi".to_string(),
            star: 2,
            item_id: item.and_then(ItemId::parse),
            item: ItemColumns {
                name_item: name.map(String::from),
                ..Default::default()
            },
            champion: ChampionColumns {
                name_champ: Some("VI".to_string()),
                cost_champ: Some(4),
                ..Default::default()
            },
            is_defensive: item.map(|_| name == Some("Frozen Heart")),
        }
    }

    #[test]
    fn test_header_omits_absent_context_columns() {
        let header = enriched_header(&[ContextColumn::IngameDuration]);
        assert_eq!(
            header,
            vec![
                "gameId",
                "ingameDuration",
                "champion_name",
                "star",
                "item_id",
                "name_item",
                "item_type_item",
                "is_defensive_item",
                "name_champ",
                "cost_champ",
                "origin_champ",
                "class_champ",
                "is_defensive",
            ]
        );
    }

    #[test]
    fn test_record_matches_header_width() {
        let columns = [ContextColumn::IngameDuration, ContextColumn::Ranked];
        let record = enriched_record(&row(Some("23"), Some("Frozen Heart")), &columns);
        assert_eq!(record.len(), enriched_header(&columns).len());
        assert_eq!(record[1], "1500");
        assert_eq!(record[2], "true");
        assert_eq!(record[5], "23");
        assert_eq!(record[6], "Frozen Heart");
        assert_eq!(record[10], "4");
        assert_eq!(record.last().map(String::as_str), Some("true"));
    }

    #[test]
    fn test_write_enriched_csv() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out").join("enriched.csv");
        let rows = vec![row(Some("23"), Some("Frozen Heart")), row(None, None)];
        write_enriched_csv(&out, &rows, &[]).unwrap();

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let header = reader.headers().unwrap().clone();
        assert_eq!(&header[0], "gameId");
        assert_eq!(&header[1], "champion_name");
        let records: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[1][3], "");
        assert_eq!(&records[1][11], "");
    }

    #[test]
    fn test_enriched_frame_shape() {
        let rows = vec![row(Some("23"), Some("Frozen Heart")), row(None, None)];
        let columns = [ContextColumn::IngameDuration, ContextColumn::Ranked];
        let df = enriched_frame(&rows, &columns).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), enriched_header(&columns).len());
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(names, enriched_header(&columns));
    }

    #[test]
    fn test_write_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("enriched.parquet");
        write_enriched_parquet(&out, &[row(Some("23"), Some("Frozen Heart"))], &[]).unwrap();
        assert!(out.metadata().unwrap().len() > 0);
    }

    #[test]
    fn test_categorize_items() {
        let items = ItemTable::from_entries(vec![
            ItemReference {
                id: ItemId::parse("1").unwrap(),
                name: "Chain Vest".to_string(),
                item_type: None,
                is_defensive: None,
                extra: vec!["chain.png".to_string()],
            },
            ItemReference {
                id: ItemId::parse("23").unwrap(),
                name: "Frozen Heart".to_string(),
                item_type: None,
                is_defensive: None,
                extra: vec!["fh.png".to_string()],
            },
        ]);
        let components = HashSet::from(["Chain Vest".to_string()]);
        let defensive = HashSet::from(["Frozen Heart".to_string()]);

        let rows = categorize_items(&items, &components, &defensive);
        assert_eq!(
            rows,
            vec![
                CategorizedItem {
                    id: "1".to_string(),
                    name: "Chain Vest".to_string(),
                    extra: vec!["chain.png".to_string()],
                    item_type: "component",
                    is_defensive: false,
                },
                CategorizedItem {
                    id: "23".to_string(),
                    name: "Frozen Heart".to_string(),
                    extra: vec!["fh.png".to_string()],
                    item_type: "completed",
                    is_defensive: true,
                },
            ]
        );

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("categorized.csv");
        write_categorized_items(&out, &["icon".to_string()], &rows).unwrap();
        let written = fs::read_to_string(&out).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines[0], "id,name,icon,item_type,is_defensive");
        assert_eq!(lines[1], "1,Chain Vest,chain.png,component,false");
        assert_eq!(lines[2], "23,Frozen Heart,fh.png,completed,true");
    }
}
