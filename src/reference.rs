use crate::model::{ChampionReference, ItemId, ItemReference, normalize_champion};
use std::collections::HashMap;
use tracing::warn;

/// Item lookup keyed by normalized id. The first row for an id wins.
#[derive(Debug, Default)]
pub struct ItemTable {
    entries: Vec<ItemReference>,
    index: HashMap<ItemId, usize>,
    extra_columns: Vec<String>,
}

impl ItemTable {
    pub fn from_entries(rows: Vec<ItemReference>) -> Self {
        let mut table = Self::default();
        for row in rows {
            if table.index.contains_key(&row.id) {
                warn!("duplicate item id {} ({}) ignored", row.id, row.name);
                continue;
            }
            table.index.insert(row.id.clone(), table.entries.len());
            table.entries.push(row);
        }
        table
    }

    /// Names of the passthrough columns carried in `ItemReference::extra`.
    pub fn with_extra_columns(mut self, columns: Vec<String>) -> Self {
        self.extra_columns = columns;
        self
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn get(&self, id: &ItemId) -> Option<&ItemReference> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn entries(&self) -> &[ItemReference] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Champion lookup keyed by uppercased name.
#[derive(Debug, Default)]
pub struct ChampionTable {
    entries: HashMap<String, ChampionReference>,
}

impl ChampionTable {
    pub fn from_entries(rows: Vec<ChampionReference>) -> Self {
        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows {
            let key = normalize_champion(&row.name);
            if entries.contains_key(&key) {
                warn!("duplicate champion {} ignored", row.name);
                continue;
            }
            entries.insert(key, row);
        }
        Self { entries }
    }

    pub fn get(&self, champion_name: &str) -> Option<&ChampionReference> {
        self.entries.get(&normalize_champion(champion_name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, name: &str) -> ItemReference {
        ItemReference {
            id: ItemId::parse(id).unwrap(),
            name: name.to_string(),
            item_type: None,
            is_defensive: None,
            extra: Vec::new(),
        }
    }

    #[test]
    fn test_item_table_first_row_wins() {
        let table = ItemTable::from_entries(vec![
            item("23", "Frozen Heart"),
            item("23.0", "Shadow Copy"),
            item("47", "Redemption"),
        ]);
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
        assert!(ItemTable::default().is_empty());
        let id = ItemId::parse("23").unwrap();
        assert_eq!(table.get(&id).unwrap().name, "Frozen Heart");
        assert_eq!(table.entries()[1].name, "Redemption");
    }

    #[test]
    fn test_champion_lookup_ignores_case() {
        let table = ChampionTable::from_entries(vec![ChampionReference {
            name: "VI".to_string(),
            cost: Some(4),
            origin: None,
            class: None,
        }]);
        assert_eq!(table.get("vi").unwrap().cost, Some(4));
        assert_eq!(table.get(" Vi ").unwrap().cost, Some(4));
        assert!(table.get("Ahri").is_none());
        assert!(!table.is_empty());
        assert!(ChampionTable::from_entries(Vec::new()).is_empty());
    }
}
