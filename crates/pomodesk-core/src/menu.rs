//! Canteen menu items and the browse cursor.
//!
//! Fetching the menu over the network is somebody else's job; the controller
//! only asks a [`MenuProvider`] how many items there are. The JSON document
//! format is the flat array served by the canteen endpoint.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// Items kept from one menu document.
pub const MAX_MENU_ITEMS: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub weekday: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub price_chf: String,
    #[serde(default)]
    pub source: String,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Source of menu items.
pub trait MenuProvider {
    fn item_count(&self) -> usize;
    fn item_at(&self, index: usize) -> Option<MenuItem>;
}

/// In-memory menu, typically parsed from a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticMenu {
    items: Vec<MenuItem>,
}

impl StaticMenu {
    pub fn new(mut items: Vec<MenuItem>) -> Self {
        items.truncate(MAX_MENU_ITEMS);
        Self { items }
    }

    /// Parse the flat JSON array, keeping at most [`MAX_MENU_ITEMS`] entries.
    pub fn from_json(json: &str) -> Result<Self> {
        let items: Vec<MenuItem> = serde_json::from_str(json)?;
        if items.len() > MAX_MENU_ITEMS {
            tracing::warn!(
                found = items.len(),
                kept = MAX_MENU_ITEMS,
                "menu limit reached, dropping extra items"
            );
        }
        Ok(Self::new(items))
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }
}

impl MenuProvider for StaticMenu {
    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn item_at(&self, index: usize) -> Option<MenuItem> {
        self.items.get(index).cloned()
    }
}

/// Position in the menu. Clamped to `0..total`, never wraps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuCursor {
    index: usize,
    total: usize,
}

impl MenuCursor {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Back to the first item of a menu with `total` items.
    pub fn reset(&mut self, total: usize) {
        self.index = 0;
        self.total = total;
    }

    /// Returns true when the cursor moved.
    pub fn prev(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Returns true when the cursor moved.
    pub fn next(&mut self) -> bool {
        if self.index + 1 >= self.total {
            return false;
        }
        self.index += 1;
        true
    }
}
