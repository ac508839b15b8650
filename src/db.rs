//! Database schema and operations for the recipe dataset

use anyhow::Result;
use rusqlite::Connection;

use crate::models::{ItemRate, Recipe};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per recipe; every recipe has a single output
        CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            output_item TEXT NOT NULL,
            output_rate REAL NOT NULL,
            machine TEXT NOT NULL,
            alternate INTEGER NOT NULL DEFAULT 0
        );

        -- Ordered inputs; position is the machine input slot
        CREATE TABLE IF NOT EXISTS recipe_inputs (
            recipe_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            item TEXT NOT NULL,
            rate REAL NOT NULL,
            PRIMARY KEY (recipe_id, position)
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_output ON recipes(output_item);
        "#,
    )?;
    Ok(())
}

/// Insert or replace a recipe together with its inputs
pub fn upsert_recipe(conn: &Connection, recipe: &Recipe) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO recipes (id, output_item, output_rate, machine, alternate)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            &recipe.id,
            &recipe.output.item,
            recipe.output.rate,
            &recipe.machine,
            recipe.alternate,
        ),
    )?;

    conn.execute("DELETE FROM recipe_inputs WHERE recipe_id = ?1", [&recipe.id])?;
    for (position, input) in recipe.inputs.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_inputs (recipe_id, position, item, rate)
             VALUES (?1, ?2, ?3, ?4)",
            (&recipe.id, position as i64, &input.item, input.rate),
        )?;
    }
    Ok(())
}

/// Clear all recipe data (for re-import)
pub fn clear_recipes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM recipe_inputs;
        DELETE FROM recipes;
        "#,
    )?;
    Ok(())
}

/// Load every recipe in insertion order
pub fn load_recipes(conn: &Connection) -> Result<Vec<Recipe>> {
    load_where(conn, "", ())
}

/// All recipes producing a given item
pub fn recipes_for_item(conn: &Connection, item: &str) -> Result<Vec<Recipe>> {
    load_where(conn, "WHERE output_item = ?1", [item])
}

fn load_where<P: rusqlite::Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> Result<Vec<Recipe>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, output_item, output_rate, machine, alternate FROM recipes {} ORDER BY rowid",
        filter
    ))?;

    let rows = stmt.query_map(params, |row| {
        Ok(Recipe {
            id: row.get(0)?,
            output: ItemRate::new(row.get::<_, String>(1)?, row.get(2)?),
            inputs: Vec::new(),
            machine: row.get(3)?,
            alternate: row.get(4)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }

    let mut inputs_stmt = conn.prepare(
        "SELECT item, rate FROM recipe_inputs WHERE recipe_id = ?1 ORDER BY position",
    )?;
    for recipe in &mut results {
        let rows = inputs_stmt.query_map([&recipe.id], |row| {
            Ok(ItemRate::new(row.get::<_, String>(0)?, row.get(1)?))
        })?;
        for row in rows {
            recipe.inputs.push(row?);
        }
    }

    Ok(results)
}

/// List all unique items that are recipe outputs
pub fn list_producible_items(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT output_item FROM recipes ORDER BY output_item")?;

    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}
