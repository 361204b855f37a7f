use serde_json::Value;
use std::fmt;

/// Item identifier in its normalized textual form.
///
/// Match payloads carry ids as integers, as floats that went through a
/// dataframe round-trip (`23.0`), or as `TFT_Item_*` strings. All of them
/// collapse to the same key so the item join does not depend on how a
/// particular file typed the column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(String);

impl ItemId {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Ok(int) = trimmed.parse::<i64>() {
            return Some(Self(int.to_string()));
        }

        if let Ok(float) = trimmed.parse::<f64>() {
            if let Some(int) = integral(float) {
                return Some(Self(int.to_string()));
            }
        }

        Some(Self(trimmed.to_string()))
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Some(Self(int.to_string()))
                } else {
                    let float = number.as_f64()?;
                    Some(Self(
                        integral(float)
                            .map(|int| int.to_string())
                            .unwrap_or_else(|| float.to_string()),
                    ))
                }
            }
            Value::String(text) => Self::parse(text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Case-folds a champion name for joins and filters.
pub fn normalize_champion(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Optional scalar columns of the match table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextColumn {
    GameDuration,
    IngameDuration,
    Level,
    LastRound,
    Ranked,
}

impl ContextColumn {
    pub const ALL: [ContextColumn; 5] = [
        ContextColumn::GameDuration,
        ContextColumn::IngameDuration,
        ContextColumn::Level,
        ContextColumn::LastRound,
        ContextColumn::Ranked,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            Self::GameDuration => "gameDuration",
            Self::IngameDuration => "ingameDuration",
            Self::Level => "level",
            Self::LastRound => "lastRound",
            Self::Ranked => "Ranked",
        }
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|column| column.column_name() == name.trim())
    }
}

/// Game-level scalars broadcast onto every row flattened out of a match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchContext {
    pub game_duration: Option<f64>,
    pub ingame_duration: Option<f64>,
    pub level: Option<i64>,
    pub last_round: Option<i64>,
    pub ranked: Option<bool>,
}

impl MatchContext {
    pub fn cell(&self, column: ContextColumn) -> String {
        match column {
            ContextColumn::GameDuration => opt_to_cell(self.game_duration),
            ContextColumn::IngameDuration => opt_to_cell(self.ingame_duration),
            ContextColumn::Level => opt_to_cell(self.level),
            ContextColumn::LastRound => opt_to_cell(self.last_round),
            ContextColumn::Ranked => opt_to_cell(self.ranked),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub game_id: String,
    pub context: MatchContext,
    /// Encoded player/unit payload, `None` when the cell was empty.
    pub players_raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub character_id: String,
    pub items: Vec<ItemId>,
    pub star: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatChampionRow {
    pub game_id: String,
    pub context: MatchContext,
    pub champion_name: String,
    pub items: Vec<ItemId>,
    pub star: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatItemRow {
    pub game_id: String,
    pub context: MatchContext,
    pub champion_name: String,
    pub star: i64,
    pub item_id: Option<ItemId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemReference {
    pub id: ItemId,
    pub name: String,
    pub item_type: Option<String>,
    pub is_defensive: Option<bool>,
    /// Cells of any other columns, aligned with `ItemTable::extra_columns`.
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChampionReference {
    pub name: String,
    pub cost: Option<i64>,
    pub origin: Option<String>,
    pub class: Option<String>,
}

/// Item-table columns after the `_item` rename.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemColumns {
    pub name_item: Option<String>,
    pub item_type_item: Option<String>,
    pub is_defensive_item: Option<bool>,
}

/// Champion-table columns after the `_champ` rename.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChampionColumns {
    pub name_champ: Option<String>,
    pub cost_champ: Option<i64>,
    pub origin_champ: Option<String>,
    pub class_champ: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub game_id: String,
    pub context: MatchContext,
    pub champion_name: String,
    pub star: i64,
    pub item_id: Option<ItemId>,
    pub item: ItemColumns,
    pub champion: ChampionColumns,
    /// Verdict of the configured defensive set; `None` for item-less rows.
    pub is_defensive: Option<bool>,
}

impl EnrichedRow {
    /// Name used for item statistics: the resolved name, else the raw id.
    pub fn item_label(&self) -> Option<&str> {
        self.item
            .name_item
            .as_deref()
            .or_else(|| self.item_id.as_ref().map(|id| id.as_str()))
    }
}

pub fn opt_to_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_id_normalizes_numeric_forms() {
        assert_eq!(ItemId::parse("23").unwrap().as_str(), "23");
        assert_eq!(ItemId::parse(" 23.0 ").unwrap().as_str(), "23");
        assert_eq!(ItemId::from_value(&json!(23)).unwrap().as_str(), "23");
        assert_eq!(ItemId::from_value(&json!(23.0)).unwrap().as_str(), "23");
        assert_eq!(
            ItemId::from_value(&json!("TFT_Item_FrozenHeart")).unwrap().as_str(),
            "TFT_Item_FrozenHeart"
        );
    }

    #[test]
    fn test_item_id_rejects_non_scalars() {
        assert!(ItemId::parse("   ").is_none());
        assert!(ItemId::from_value(&json!(null)).is_none());
        assert!(ItemId::from_value(&json!(true)).is_none());
        assert!(ItemId::from_value(&json!([1])).is_none());
    }

    #[test]
    fn test_context_column_names_round_trip() {
        for column in ContextColumn::ALL {
            assert_eq!(ContextColumn::from_column_name(column.column_name()), Some(column));
        }
        assert_eq!(ContextColumn::from_column_name("players"), None);
    }

    #[test]
    fn test_normalize_champion() {
        assert_eq!(normalize_champion(" vi "), "VI");
        assert_eq!(normalize_champion("Blitzcrank"), "BLITZCRANK");
    }
}
