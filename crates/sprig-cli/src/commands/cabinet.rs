use std::path::PathBuf;

use sprig_core::db::CabinetStore;
use sprig_core::models::CabinetItem;

use crate::commands::common::{current_owner, open_database};
use crate::error::CliError;
use crate::session::FileSessionStore;

pub fn run_add(ingredient: &str, db_path: Option<PathBuf>) -> Result<(), CliError> {
    let ingredient = normalize_ingredient(ingredient)?;
    let db = open_database(db_path)?;
    let owner = current_owner(&FileSessionStore::default_location()?)?;
    let store = CabinetStore::new(db.connection());

    if store.get(&owner, &ingredient)?.is_some() {
        println!("'{ingredient}' is already in the cabinet");
        return Ok(());
    }

    let item = CabinetItem::new(owner, ingredient.clone());
    store.save_all(std::slice::from_ref(&item))?;
    println!("Added '{ingredient}'");
    Ok(())
}

pub fn run_use(ingredient: &str, db_path: Option<PathBuf>) -> Result<(), CliError> {
    let ingredient = normalize_ingredient(ingredient)?;
    let db = open_database(db_path)?;
    let owner = current_owner(&FileSessionStore::default_location()?)?;
    let store = CabinetStore::new(db.connection());

    let mut item = store
        .get(&owner, &ingredient)?
        .ok_or(CliError::NothingRecorded("cabinet item"))?;
    item.mark_used();
    store.save_all(std::slice::from_ref(&item))?;
    println!("Marked '{ingredient}' as used");
    Ok(())
}

pub fn run_staple(ingredient: &str, off: bool, db_path: Option<PathBuf>) -> Result<(), CliError> {
    let ingredient = normalize_ingredient(ingredient)?;
    let db = open_database(db_path)?;
    let owner = current_owner(&FileSessionStore::default_location()?)?;
    let store = CabinetStore::new(db.connection());

    let mut item = store
        .get(&owner, &ingredient)?
        .ok_or(CliError::NothingRecorded("cabinet item"))?;
    item.set_staple(!off);
    store.save_all(std::slice::from_ref(&item))?;
    println!(
        "'{ingredient}' is {} a staple",
        if off { "no longer" } else { "now" }
    );
    Ok(())
}

pub fn run_list(json: bool, db_path: Option<PathBuf>) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let owner = current_owner(&FileSessionStore::default_location()?)?;
    let items = CabinetStore::new(db.connection()).list(&owner)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("The cabinet is empty.");
        return Ok(());
    }

    for item in &items {
        let staple = if item.is_staple { " [staple]" } else { "" };
        let used = match item.last_used_at {
            Some(stamp) => format!("last used {}", stamp.date_naive()),
            None => "never used".to_string(),
        };
        println!("{}{staple} - {used}", item.ingredient);
    }
    Ok(())
}

fn normalize_ingredient(raw: &str) -> Result<String, CliError> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(CliError::InvalidInput(
            "ingredient name cannot be empty".to_string(),
        ));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ingredient() {
        assert_eq!(normalize_ingredient("  Tulsi ").unwrap(), "tulsi");
        assert!(normalize_ingredient("   ").is_err());
    }
}
