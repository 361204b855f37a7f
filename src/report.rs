use crate::model::{EnrichedRow, FlatChampionRow, normalize_champion};
use crate::pipeline::filter_champion;
use crate::stats::{
    DefensiveShare, FrequencyTable, RankedItemRow, defensive_share_path, ranked_item_rows,
    write_defensive_share, write_ranked_items,
};
use anyhow::Result;
use polars::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{info, warn};

pub struct ChampionReportArgs<'a> {
    pub champion: &'a str,
    pub top_items: usize,
    pub top_champions: usize,
    pub out_csv: Option<&'a Path>,
}

#[derive(Debug)]
pub struct ChampionReport {
    /// Requested champion, normalized.
    pub champion: String,
    pub total_picks: usize,
    pub distinct_champions: usize,
    pub top_champions: Vec<(String, usize)>,
    /// 1-based rank and pick count of the requested champion.
    pub champion_rank: Option<(usize, usize)>,
    pub champion_rows: usize,
    pub items: Vec<RankedItemRow>,
    pub share: DefensiveShare,
}

pub fn champion_pick_counts(champions: &[FlatChampionRow]) -> FrequencyTable {
    FrequencyTable::from_names(
        champions
            .iter()
            .map(|row| normalize_champion(&row.champion_name)),
    )
}

/// Item occurrence counts for the given rows, most used first.
pub fn item_usage(rows: &[EnrichedRow], top_k: usize) -> Result<Vec<(String, usize)>> {
    let labels: Vec<Option<String>> = rows
        .iter()
        .map(|row| row.item_label().map(String::from))
        .collect();
    let df = DataFrame::new(vec![Series::new("item", labels)])?;

    let counted = df
        .lazy()
        .filter(col("item").is_not_null())
        .group_by([col("item")])
        .agg([len().alias("count")])
        .collect()?;

    let items = counted.column("item")?.str()?;
    let counts = counted.column("count")?.cast(&DataType::UInt64)?;
    let counts = counts.u64()?;

    let mut usage: Vec<(String, usize)> = items
        .into_iter()
        .zip(counts.into_iter())
        .filter_map(|(item, count)| Some((item?.to_string(), count? as usize)))
        .collect();
    usage.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    usage.truncate(top_k);

    Ok(usage)
}

fn items_frame(rows: &[RankedItemRow]) -> Result<DataFrame, PolarsError> {
    DataFrame::new(vec![
        Series::new(
            "rank",
            rows.iter().map(|r| r.rank as u32).collect::<Vec<u32>>(),
        ),
        Series::new(
            "item",
            rows.iter().map(|r| r.item_name.clone()).collect::<Vec<String>>(),
        ),
        Series::new(
            "count",
            rows.iter().map(|r| r.count as u64).collect::<Vec<u64>>(),
        ),
        Series::new(
            "is_defensive",
            rows.iter().map(|r| r.is_defensive).collect::<Vec<bool>>(),
        ),
    ])
}

/// Builds the report and writes the ranked items (plus the defensive share
/// next to them) when `out_csv` is set.
pub fn champion_report(
    champions: &[FlatChampionRow],
    rows: &[EnrichedRow],
    defensive_set: &HashSet<String>,
    args: &ChampionReportArgs,
) -> Result<ChampionReport> {
    let champion = normalize_champion(args.champion);

    let picks = champion_pick_counts(champions);
    if picks.is_empty() {
        warn!("No champion rows to rank");
    }
    let champion_rank = picks.rank_of(&champion);

    let champion_rows = filter_champion(rows, args.champion, true);
    if champion_rows.is_empty() {
        warn!("No rows for champion {}", champion);
    }

    let usage = item_usage(&champion_rows, args.top_items)?;
    let items = ranked_item_rows(&usage, defensive_set);
    let names: Vec<&str> = items.iter().map(|r| r.item_name.as_str()).collect();
    let share = DefensiveShare::from_items(&names, defensive_set);

    if let Some(out) = args.out_csv {
        write_ranked_items(out, &items)?;
        let share_out = defensive_share_path(out);
        write_defensive_share(&share_out, &share)?;
        info!(
            "Wrote ranked items to {} and {}",
            out.display(),
            share_out.display()
        );
    }

    Ok(ChampionReport {
        champion,
        total_picks: picks.total(),
        distinct_champions: picks.len(),
        top_champions: picks.top(args.top_champions),
        champion_rank,
        champion_rows: champion_rows.len(),
        items,
        share,
    })
}

impl ChampionReport {
    pub fn print(&self) -> Result<()> {
        println!("== Champion Report: {} ==", self.champion);

        if self.top_champions.is_empty() {
            println!("No champion rows in the match data");
        } else {
            println!(
                "Champion rows: {} ({} distinct champions)",
                self.total_picks, self.distinct_champions
            );
            println!("Top champions:");
            for (name, count) in &self.top_champions {
                println!("  {:<20} {}", name, count);
            }
        }

        match self.champion_rank {
            Some((rank, count)) => {
                println!("{}: rank {} with {} picks", self.champion, rank, count)
            }
            None => println!("{} does not appear in the match data", self.champion),
        }

        if self.items.is_empty() {
            println!("No item data for {}", self.champion);
            return Ok(());
        }

        println!(
            "Top {} items for {} ({} item rows):\n{}",
            self.items.len(),
            self.champion,
            self.champion_rows,
            items_frame(&self.items)?
        );
        println!(
            "Defensive items among the top {}: {} ({:.2}%), other: {} ({:.2}%)",
            self.items.len(),
            self.share.defensive,
            self.share.defensive_pct,
            self.share.non_defensive,
            self.share.non_defensive_pct
        );

        Ok(())
    }
}

#[derive(Debug, PartialEq)]
pub struct ItemCheck {
    pub occurrences: usize,
    pub item_types: Vec<String>,
}

/// Looks an item name up in the enriched table.
pub fn item_check(rows: &[EnrichedRow], item_name: &str) -> ItemCheck {
    let wanted = item_name.trim();
    let matching: Vec<&EnrichedRow> = rows
        .iter()
        .filter(|row| row.item.name_item.as_deref() == Some(wanted))
        .collect();

    let item_types: BTreeSet<String> = matching
        .iter()
        .filter_map(|row| row.item.item_type_item.clone())
        .collect();

    let check = ItemCheck {
        occurrences: matching.len(),
        item_types: item_types.into_iter().collect(),
    };

    if check.occurrences == 0 {
        println!("{} does not appear in the enriched table", wanted);
    } else {
        println!("{} appears {} times", wanted, check.occurrences);
        if check.item_types.is_empty() {
            println!("  no item type recorded");
        } else {
            println!("  item type: {}", check.item_types.join(", "));
        }
    }

    check
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemColumns, ItemId, MatchContext};

    fn champion(name: &str) -> FlatChampionRow {
        FlatChampionRow {
            game_id: "1".to_string(),
            context: MatchContext::default(),
            champion_name: name.to_string(),
            items: Vec::new(),
            star: 1,
        }
    }

    fn enriched(champion: &str, item_id: Option<&str>, name: Option<&str>) -> EnrichedRow {
        EnrichedRow {
            game_id: "1".to_string(),
            context: MatchContext::default(),
            champion_name: champion.to_string(),
            star: 1,
            item_id: item_id.and_then(ItemId::parse),
            item: ItemColumns {
                name_item: name.map(String::from),
                item_type_item: name.map(|_| "completed".to_string()),
                is_defensive_item: None,
            },
            champion: Default::default(),
            is_defensive: None,
        }
    }

    #[test]
    fn test_champion_picks_are_case_normalized() {
        let picks = champion_pick_counts(&[
            champion("Vi"),
            champion("VI"),
            champion("Ahri"),
            champion("vi"),
        ]);
        assert_eq!(picks.rank_of("VI"), Some((1, 3)));
        assert_eq!(picks.rank_of("AHRI"), Some((2, 1)));
    }

    #[test]
    fn test_item_usage_counts_and_orders() {
        let rows = vec![
            enriched("Vi", Some("23"), Some("Frozen Heart")),
            enriched("Vi", Some("23"), Some("Frozen Heart")),
            enriched("Vi", Some("47"), Some("Redemption")),
            enriched("Vi", Some("999"), None),
            enriched("Vi", None, None),
        ];

        let usage = item_usage(&rows, 10).unwrap();
        assert_eq!(
            usage,
            vec![
                ("Frozen Heart".to_string(), 2),
                ("999".to_string(), 1),
                ("Redemption".to_string(), 1),
            ]
        );
        assert_eq!(item_usage(&rows, 1).unwrap().len(), 1);
        assert!(item_usage(&[], 5).unwrap().is_empty());
    }

    #[test]
    fn test_champion_report() {
        let champions = vec![champion("Vi"), champion("Ahri"), champion("Vi")];
        let rows = vec![
            enriched("Vi", Some("23"), Some("Frozen Heart")),
            enriched("Vi", Some("23"), Some("Frozen Heart")),
            enriched("Vi", Some("1"), Some("Zephyr")),
            enriched("Ahri", Some("1"), Some("Zephyr")),
        ];
        let defensive = HashSet::from(["Frozen Heart".to_string()]);

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("vi_items.csv");
        let report = champion_report(
            &champions,
            &rows,
            &defensive,
            &ChampionReportArgs {
                champion: "vi",
                top_items: 5,
                top_champions: 10,
                out_csv: Some(&out),
            },
        )
        .unwrap();

        assert_eq!(report.champion, "VI");
        assert_eq!(report.total_picks, 3);
        assert_eq!(report.distinct_champions, 2);
        assert_eq!(report.top_champions[0], ("VI".to_string(), 2));
        assert_eq!(report.champion_rank, Some((1, 2)));
        assert_eq!(report.champion_rows, 3);
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.items[0].item_name, "Frozen Heart");
        assert!(report.items[0].is_defensive);
        assert_eq!(report.share.defensive, 1);
        assert_eq!(report.share.non_defensive, 1);
        assert!(out.exists());
        assert!(dir.path().join("vi_items_defensive_share.csv").exists());
        report.print().unwrap();
    }

    #[test]
    fn test_champion_report_without_rows_is_not_fatal() {
        let report = champion_report(
            &[champion("Ahri")],
            &[],
            &HashSet::new(),
            &ChampionReportArgs {
                champion: "Blitzcrank",
                top_items: 10,
                top_champions: 10,
                out_csv: None,
            },
        )
        .unwrap();
        assert_eq!(report.champion_rank, None);
        assert!(report.items.is_empty());
        assert_eq!(report.share.defensive_pct, 0.0);
        report.print().unwrap();
    }

    #[test]
    fn test_item_check() {
        let rows = vec![
            enriched("Vi", Some("5"), Some("Locket of the Iron Solari")),
            enriched("Ahri", Some("5"), Some("Locket of the Iron Solari")),
            enriched("Ahri", Some("23"), Some("Frozen Heart")),
        ];
        let check = item_check(&rows, "Locket of the Iron Solari");
        assert_eq!(check.occurrences, 2);
        assert_eq!(check.item_types, vec!["completed".to_string()]);
        assert_eq!(item_check(&rows, "Spatula").occurrences, 0);
    }
}
