use std::collections::HashMap;

use serde::Deserialize;

use crate::record::UNSET;

/// One row of a backend catalog (`/characters`, `/stages`, `/movelist`).
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub id: i32,
    pub display_name: String,
    #[serde(default)]
    pub list_order: i32,
}

/// Display-name to id lookup tables for enrichment. Built once from the
/// backend catalogs and passed around explicitly; nothing here is global.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    characters: HashMap<String, i32>,
    stages: HashMap<String, i32>,
    moves: HashMap<String, i32>,
}

impl Catalog {
    pub fn new(
        characters: Vec<CatalogEntry>,
        stages: Vec<CatalogEntry>,
        moves: Vec<CatalogEntry>,
    ) -> Self {
        Self {
            characters: index(characters),
            stages: index(stages),
            moves: index(moves),
        }
    }

    pub fn character_id(&self, name: &str) -> i32 {
        lookup(&self.characters, name)
    }

    pub fn stage_id(&self, name: &str) -> i32 {
        lookup(&self.stages, name)
    }

    pub fn move_id(&self, name: &str) -> i32 {
        lookup(&self.moves, name)
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn move_count(&self) -> usize {
        self.moves.len()
    }
}

fn index(entries: Vec<CatalogEntry>) -> HashMap<String, i32> {
    entries
        .into_iter()
        .map(|entry| (entry.display_name, entry.id))
        .collect()
}

fn lookup(table: &HashMap<String, i32>, name: &str) -> i32 {
    table.get(name.trim()).copied().unwrap_or(UNSET)
}
