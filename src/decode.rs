//! Decoding of the nested `players` / `champion` payload of a match row.

use crate::error::{DecodeError, SkipReason};
use crate::literal::parse_literal;
use crate::model::{ItemId, Unit};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ITEM_KEYS: [&str; 3] = ["item_ids", "items", "itemNames"];
const STAR_KEYS: [&str; 2] = ["star", "tier"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    Json,
    Literal,
}

impl DecodeStrategy {
    /// Tried in order; the first success wins.
    pub const ORDER: [DecodeStrategy; 2] = [DecodeStrategy::Json, DecodeStrategy::Literal];

    pub fn decode(self, raw: &str) -> Result<Value, DecodeError> {
        match self {
            Self::Json => Ok(serde_json::from_str(raw)?),
            Self::Literal => parse_literal(raw),
        }
    }
}

/// Which payload layout a caller expects for a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadShape {
    #[default]
    Auto,
    ChampionMap,
    PlayerList,
}

/// Decoded payload, classified by layout.
#[derive(Debug)]
pub enum PlayersPayload {
    /// `{champion_name: {items, star, ...}}`
    ChampionMap(Map<String, Value>),
    /// `[{units: [{character_id, item_ids, ...}]}, ...]`
    PlayerList(Vec<Value>),
    Unparseable(SkipReason),
}

/// Units extracted from one payload plus the count of entries that had no
/// usable `character_id`. `skipped` is set when the whole payload was
/// unusable, in which case `units` is empty.
#[derive(Debug, Default)]
pub struct ParsedUnits {
    pub units: Vec<Unit>,
    pub unusable_units: usize,
    pub skipped: Option<SkipReason>,
}

impl PayloadShape {
    pub fn parse(self, raw: &str) -> ParsedUnits {
        match self {
            Self::Auto => parse_players(raw),
            Self::ChampionMap => parse_champion_map(raw),
            Self::PlayerList => parse_player_list(raw),
        }
    }
}

pub fn decode_payload(raw: &str) -> Result<(Value, DecodeStrategy), DecodeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Blank);
    }

    let mut failures: Vec<String> = Vec::with_capacity(DecodeStrategy::ORDER.len());
    for strategy in DecodeStrategy::ORDER {
        match strategy.decode(trimmed) {
            Ok(value) => return Ok((value, strategy)),
            Err(err) => failures.push(err.to_string()),
        }
    }

    let literal = failures.pop().unwrap_or_default();
    let json = failures.pop().unwrap_or_default();
    Err(DecodeError::Exhausted { json, literal })
}

pub fn decode_players(raw: &str, shape: PayloadShape) -> PlayersPayload {
    let value = match decode_payload(raw) {
        Ok((value, _)) => value,
        Err(err) => return PlayersPayload::Unparseable(SkipReason::Undecodable(err)),
    };

    classify(value, shape)
}

fn classify(value: Value, shape: PayloadShape) -> PlayersPayload {
    match (value, shape) {
        (Value::Object(map), PayloadShape::Auto | PayloadShape::ChampionMap) => {
            PlayersPayload::ChampionMap(map)
        }
        (Value::Array(players), PayloadShape::Auto | PayloadShape::PlayerList) => {
            if players.is_empty() || players.iter().any(has_units_list) {
                PlayersPayload::PlayerList(players)
            } else {
                PlayersPayload::Unparseable(SkipReason::UnexpectedShape(
                    "sequence without player objects carrying a units list",
                ))
            }
        }
        (Value::Object(_), PayloadShape::PlayerList) => PlayersPayload::Unparseable(
            SkipReason::UnexpectedShape("mapping where a player sequence was expected"),
        ),
        (Value::Array(_), PayloadShape::ChampionMap) => PlayersPayload::Unparseable(
            SkipReason::UnexpectedShape("sequence where a champion mapping was expected"),
        ),
        _ => PlayersPayload::Unparseable(SkipReason::UnexpectedShape(
            "neither a mapping nor a sequence",
        )),
    }
}

fn has_units_list(player: &Value) -> bool {
    player
        .get("units")
        .map(|units| units.is_array())
        .unwrap_or(false)
}

impl PlayersPayload {
    pub fn into_units(self) -> ParsedUnits {
        let mut parsed = ParsedUnits::default();

        match self {
            Self::ChampionMap(map) => {
                for (champion, detail) in map {
                    if champion.trim().is_empty() {
                        parsed.unusable_units += 1;
                        continue;
                    }
                    parsed.units.push(Unit {
                        character_id: champion,
                        items: unit_items(&detail),
                        star: unit_star(&detail),
                    });
                }
            }
            Self::PlayerList(players) => {
                for player in &players {
                    let Some(units) = player.get("units").and_then(|u| u.as_array()) else {
                        continue;
                    };

                    for unit in units {
                        let Some(character_id) = unit
                            .get("character_id")
                            .and_then(|v| v.as_str())
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                        else {
                            parsed.unusable_units += 1;
                            continue;
                        };

                        parsed.units.push(Unit {
                            character_id: character_id.to_string(),
                            items: unit_items(unit),
                            star: unit_star(unit),
                        });
                    }
                }
            }
            Self::Unparseable(reason) => parsed.skipped = Some(reason),
        }

        parsed
    }
}

fn unit_items(detail: &Value) -> Vec<ItemId> {
    ITEM_KEYS
        .iter()
        .find_map(|key| detail.get(*key).and_then(|v| v.as_array()))
        .map(|items| items.iter().filter_map(ItemId::from_value).collect())
        .unwrap_or_default()
}

fn unit_star(detail: &Value) -> i64 {
    STAR_KEYS
        .iter()
        .find_map(|key| {
            detail.get(*key).and_then(|v| {
                v.as_i64()
                    .or_else(|| v.as_f64().map(|f| f as i64))
                    .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            })
        })
        .unwrap_or(0)
}

/// Decodes a payload of either layout; undecodable input yields no units.
pub fn parse_players(raw: &str) -> ParsedUnits {
    decode_players(raw, PayloadShape::Auto).into_units()
}

pub fn parse_champion_map(raw: &str) -> ParsedUnits {
    decode_players(raw, PayloadShape::ChampionMap).into_units()
}

pub fn parse_player_list(raw: &str) -> ParsedUnits {
    decode_players(raw, PayloadShape::PlayerList).into_units()
}
