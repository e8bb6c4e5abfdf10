use clap::Subcommand;
use pomodesk_core::{MenuProvider, StaticMenu};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum MenuAction {
    /// Parse a menu JSON file and print its items
    Show {
        /// Flat JSON array of menu items
        file: PathBuf,
        /// Print only the item at this position
        #[arg(long)]
        index: Option<usize>,
    },
}

pub fn run(action: MenuAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        MenuAction::Show { file, index } => {
            let text = std::fs::read_to_string(&file)?;
            let menu = StaticMenu::from_json(&text)?;
            let json = match index {
                Some(i) => {
                    let item = menu.item_at(i).ok_or_else(|| {
                        format!("no menu item at index {i} ({} items)", menu.item_count())
                    })?;
                    serde_json::to_string_pretty(&item)?
                }
                None => serde_json::to_string_pretty(menu.items())?,
            };
            println!("{json}");
        }
    }
    Ok(())
}
