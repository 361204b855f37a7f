//! Command-line surface for tft-item-analysis.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{AnalysisConfig, resolve_input};
use crate::export::{
    categorize_items, write_categorized_items, write_enriched_csv, write_enriched_parquet,
};
use crate::loader::{MatchTable, load_champions, load_items, load_matches};
use crate::pipeline::{Pipeline, PipelineOutput};
use crate::report::{ChampionReportArgs, champion_report, item_check};

const MAX_LISTED_SKIPS: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "tft-item-analysis")]
#[command(version, about = "Flatten and enrich TFT match data for item analysis", long_about = None)]
pub struct Cli {
    /// TOML config file (defaults to tft-analysis.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Input tables; each falls back to `[inputs]` in the config file.
#[derive(Args, Debug, Default)]
pub struct InputArgs {
    /// Match table CSV (gameId, players)
    #[arg(long)]
    pub matches: Option<PathBuf>,

    /// Item reference CSV (id, name)
    #[arg(long)]
    pub items: Option<PathBuf>,

    /// Champion reference CSV (name, cost, origin, class)
    #[arg(long)]
    pub champions: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the enriched champion/item table
    Flatten {
        #[command(flatten)]
        inputs: InputArgs,

        /// Output CSV path
        #[arg(short, long, default_value = "data/enriched_items.csv")]
        out: PathBuf,

        /// Also write a Parquet file next to the CSV
        #[arg(long)]
        parquet: bool,
    },

    /// Champion pick ranking and the champion's most used items
    ChampionReport {
        #[command(flatten)]
        inputs: InputArgs,

        /// Champion name, matched case-insensitively
        #[arg(short, long)]
        champion: String,

        /// Number of items to rank
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Number of champions to list
        #[arg(long, default_value_t = 10)]
        champions_top: usize,

        /// Write the ranked items to this CSV
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Tag every reference item as component/completed and defensive
    CategorizeItems {
        /// Item reference CSV
        #[arg(long)]
        items: Option<PathBuf>,

        /// Output CSV path
        #[arg(short, long, default_value = "data/items_categorized.csv")]
        out: PathBuf,
    },

    /// Check whether an item name appears in the enriched table
    ItemCheck {
        #[command(flatten)]
        inputs: InputArgs,

        /// Exact item name
        #[arg(short, long)]
        name: String,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let config = AnalysisConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Flatten {
            inputs,
            out,
            parquet,
        } => run_flatten(&config, inputs, &out, parquet),
        Commands::ChampionReport {
            inputs,
            champion,
            top,
            champions_top,
            out,
        } => {
            let (_, output) = run_pipeline(&config, inputs)?;
            let defensive = config.defensive.to_set();
            let report = champion_report(
                &output.champions,
                &output.rows,
                &defensive,
                &ChampionReportArgs {
                    champion: &champion,
                    top_items: top,
                    top_champions: champions_top,
                    out_csv: out.as_deref(),
                },
            )?;
            report.print()
        }
        Commands::CategorizeItems { items, out } => {
            let items_path = resolve_input(items, config.inputs.items.as_ref(), "items")?;
            let items = load_items(&items_path)?;
            let categorized = categorize_items(
                &items,
                &config.components.to_set(),
                &config.defensive.to_set(),
            );
            write_categorized_items(&out, items.extra_columns(), &categorized)?;
            println!("Wrote {} items to {}", categorized.len(), out.display());
            Ok(())
        }
        Commands::ItemCheck { inputs, name } => {
            let (_, output) = run_pipeline(&config, inputs)?;
            item_check(&output.rows, &name);
            Ok(())
        }
    }
}

fn run_pipeline(
    config: &AnalysisConfig,
    inputs: InputArgs,
) -> Result<(MatchTable, PipelineOutput)> {
    let matches_path = resolve_input(inputs.matches, config.inputs.matches.as_ref(), "matches")?;
    let items_path = resolve_input(inputs.items, config.inputs.items.as_ref(), "items")?;
    let champions_path =
        resolve_input(inputs.champions, config.inputs.champions.as_ref(), "champions")?;

    let mut table = load_matches(&matches_path, config.payload.column.as_deref())?;
    let items = load_items(&items_path)?;
    let champions = load_champions(&champions_path)?;
    if items.is_empty() {
        warn!("Item table {} has no usable rows", items_path.display());
    }
    if champions.is_empty() {
        warn!("Champion table {} has no usable rows", champions_path.display());
    }
    info!(
        "Loaded {} matches, {} items, {} champions",
        table.records.len(),
        items.len(),
        champions.len()
    );

    let records = std::mem::take(&mut table.records);
    let output = Pipeline::new(config, &items, &champions).run(&records);

    Ok((table, output))
}

fn run_flatten(
    config: &AnalysisConfig,
    inputs: InputArgs,
    out: &Path,
    parquet: bool,
) -> Result<()> {
    let (table, output) = run_pipeline(config, inputs)?;

    write_enriched_csv(out, &output.rows, &table.context_columns)?;
    if parquet {
        let parquet_out = out.with_extension("parquet");
        write_enriched_parquet(&parquet_out, &output.rows, &table.context_columns)?;
    }

    let report = &output.report;
    println!("== Flatten Summary ==");
    println!("Payload column:       {}", table.payload_column);
    println!("Match rows read:      {}", report.records_seen + table.skipped_rows);
    println!("Match rows skipped:   {}", table.skipped_rows);
    println!("Matches flattened:    {}", report.records_flattened());
    println!("Matches without data: {}", report.skipped.len());
    for skipped in report.skipped.iter().take(MAX_LISTED_SKIPS) {
        println!("  {}: {}", skipped.game_id, skipped.reason);
    }
    if report.skipped.len() > MAX_LISTED_SKIPS {
        println!("  ... and {} more", report.skipped.len() - MAX_LISTED_SKIPS);
    }
    println!("Champion rows:        {}", output.champions.len());
    println!("Item rows:            {}", output.rows.len());
    if report.unusable_units > 0 {
        warn!("{} units had no character_id", report.unusable_units);
    }
    println!("Output: {}", out.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn fixture(dir: &Path) -> InputArgs {
        InputArgs {
            matches: Some(write(
                dir,
                "matches.csv",
                "gameId,level,players\n\
                 1,8,\"{'Vi': {'items': [23, 47], 'star': 2}, 'Ahri': {'items': [], 'star': 1}}\"\n\
                 2,7,not a payload\n",
            )),
            items: Some(write(
                dir,
                "items.csv",
                "id,name\n23,Frozen Heart\n47,Redemption\n",
            )),
            champions: Some(write(
                dir,
                "champions.csv",
                "name,cost,origin,class\nVi,3,Enforcer,Bruiser\nAhri,4,Arcanist,Mage\n",
            )),
        }
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "tft-item-analysis",
            "champion-report",
            "--champion",
            "Vi",
            "--matches",
            "m.csv",
            "--top",
            "5",
        ])
        .unwrap();
        match cli.command {
            Commands::ChampionReport {
                champion,
                top,
                champions_top,
                inputs,
                ..
            } => {
                assert_eq!(champion, "Vi");
                assert_eq!(top, 5);
                assert_eq!(champions_top, 10);
                assert_eq!(inputs.matches, Some(PathBuf::from("m.csv")));
                assert_eq!(inputs.items, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_run_pipeline_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let (table, output) =
            run_pipeline(&AnalysisConfig::default(), fixture(dir.path())).unwrap();

        assert_eq!(output.report.records_seen, 2);
        assert_eq!(output.report.skipped.len(), 1);
        assert_eq!(output.champions.len(), 2);
        // Vi with two items, Ahri with a single empty-item row
        assert_eq!(output.rows.len(), 3);
        assert_eq!(table.payload_column, "players");
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let inputs = InputArgs {
            matches: Some(PathBuf::from("m.csv")),
            ..Default::default()
        };
        assert!(run_pipeline(&AnalysisConfig::default(), inputs).is_err());
    }

    #[test]
    fn test_flatten_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out").join("enriched.csv");
        run_flatten(&AnalysisConfig::default(), fixture(dir.path()), &out, true).unwrap();

        assert!(out.exists());
        assert!(out.with_extension("parquet").exists());
        let written = fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("gameId,level,champion_name"));
        assert_eq!(written.lines().count(), 4);
    }

    #[test]
    fn test_categorize_items_command() {
        let dir = tempfile::tempdir().unwrap();
        let config = write(
            dir.path(),
            "tft.toml",
            "[defensive]\nitems = [\"Frozen Heart\"]\n\n[components]\nitems = [\"Chain Vest\"]\n",
        );
        let items = write(
            dir.path(),
            "items.csv",
            "id,name,icon\n1,Chain Vest,cv.png\n23,Frozen Heart,fh.png\n",
        );
        let out = dir.path().join("categorized.csv");

        let cli = Cli::try_parse_from([
            "tft-item-analysis",
            "categorize-items",
            "--config",
            config.to_str().unwrap(),
            "--items",
            items.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ])
        .unwrap();
        run(cli).unwrap();

        let written = fs::read_to_string(&out).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines[0], "id,name,icon,item_type,is_defensive");
        assert_eq!(lines[1], "1,Chain Vest,cv.png,component,false");
        assert_eq!(lines[2], "23,Frozen Heart,fh.png,completed,true");
    }
}
