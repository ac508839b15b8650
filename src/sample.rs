//! Built-in sample recipes for trying the planner without a dataset

use anyhow::Result;
use rusqlite::Connection;

use crate::db;
use crate::models::{ItemRate, Recipe};

fn recipe(id: &str, output: (&str, f64), inputs: &[(&str, f64)], machine: &str) -> Recipe {
    Recipe::new(
        id,
        ItemRate::new(output.0, output.1),
        inputs
            .iter()
            .map(|&(item, rate)| ItemRate::new(item, rate))
            .collect(),
        machine,
    )
}

/// A small iron and copper production tree
pub fn sample_recipes() -> Vec<Recipe> {
    vec![
        recipe("iron-ingot", ("Iron Ingot", 30.0), &[("Iron Ore", 30.0)], "Smelter"),
        recipe("copper-ingot", ("Copper Ingot", 30.0), &[("Copper Ore", 30.0)], "Smelter"),
        recipe("iron-plate", ("Iron Plate", 20.0), &[("Iron Ingot", 30.0)], "Constructor"),
        recipe("iron-rod", ("Iron Rod", 15.0), &[("Iron Ingot", 15.0)], "Constructor"),
        recipe("screw", ("Screw", 40.0), &[("Iron Rod", 10.0)], "Constructor"),
        recipe("wire", ("Wire", 30.0), &[("Copper Ingot", 15.0)], "Constructor"),
        recipe("cable", ("Cable", 30.0), &[("Wire", 60.0)], "Constructor"),
        recipe(
            "reinforced-plate",
            ("Reinforced Iron Plate", 5.0),
            &[("Iron Plate", 30.0), ("Screw", 60.0)],
            "Assembler",
        ),
        recipe(
            "rotor",
            ("Rotor", 4.0),
            &[("Iron Rod", 20.0), ("Screw", 100.0)],
            "Assembler",
        ),
        recipe(
            "modular-frame",
            ("Modular Frame", 2.0),
            &[("Reinforced Iron Plate", 3.0), ("Iron Rod", 12.0)],
            "Assembler",
        ),
        recipe(
            "cast-screw",
            ("Screw", 50.0),
            &[("Iron Ingot", 12.5)],
            "Constructor",
        )
        .alternate(),
        recipe(
            "stitched-plate",
            ("Reinforced Iron Plate", 5.625),
            &[("Iron Plate", 18.75), ("Wire", 37.5)],
            "Assembler",
        )
        .alternate(),
    ]
}

/// Replace the database contents with the sample recipes
pub fn load_sample_data(conn: &Connection) -> Result<usize> {
    db::clear_recipes(conn)?;
    let recipes = sample_recipes();
    for recipe in &recipes {
        db::upsert_recipe(conn, recipe)?;
    }
    Ok(recipes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RecipeCatalog;

    #[test]
    fn sample_loads_and_resolves() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        assert_eq!(load_sample_data(&conn).unwrap(), sample_recipes().len());

        let catalog = RecipeCatalog::new(db::load_recipes(&conn).unwrap());
        assert_eq!(catalog.resolve("Screw", false).unwrap().id, "screw");
        assert_eq!(catalog.resolve("Screw", true).unwrap().id, "cast-screw");
        assert!(catalog.resolve("Iron Ore", false).is_none());
    }
}
