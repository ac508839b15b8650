//! Recipe lookup by output item

use std::collections::HashMap;

use crate::models::Recipe;

/// All known recipes, indexed by the item they produce.
///
/// Recipes keep their dataset order, so when several recipes of the same kind
/// exist for one item the first one loaded wins.
#[derive(Debug, Default, Clone)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
    by_output: HashMap<String, Vec<usize>>,
}

impl RecipeCatalog {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        let mut by_output: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, recipe) in recipes.iter().enumerate() {
            by_output
                .entry(recipe.output.item.clone())
                .or_default()
                .push(idx);
        }
        Self { recipes, by_output }
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Every recipe producing `item`, in dataset order
    pub fn candidates(&self, item: &str) -> Vec<&Recipe> {
        self.by_output
            .get(item)
            .map(|indices| indices.iter().map(|&i| &self.recipes[i]).collect())
            .unwrap_or_default()
    }

    /// Pick the recipe used to produce `item`.
    ///
    /// Selection order: an alternate when `prefer_alternate` is set and one
    /// exists, otherwise a standard recipe, otherwise any alternate, otherwise
    /// the first candidate. Returns `None` when nothing produces the item,
    /// which callers treat as a raw material.
    pub fn resolve(&self, item: &str, prefer_alternate: bool) -> Option<&Recipe> {
        let candidates = self.candidates(item);
        if candidates.is_empty() {
            return None;
        }

        let (alternates, standard): (Vec<&Recipe>, Vec<&Recipe>) =
            candidates.iter().copied().partition(|r| r.alternate);

        if prefer_alternate {
            if let Some(recipe) = alternates.first() {
                return Some(recipe);
            }
        }
        if let Some(recipe) = standard.first() {
            return Some(recipe);
        }
        if let Some(recipe) = alternates.first() {
            return Some(recipe);
        }
        candidates.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemRate;

    fn plate(id: &str) -> Recipe {
        Recipe::new(
            id,
            ItemRate::new("Iron Plate", 20.0),
            vec![ItemRate::new("Iron Ingot", 30.0)],
            "Constructor",
        )
    }

    #[test]
    fn unknown_item_is_uncraftable() {
        let catalog = RecipeCatalog::new(vec![plate("plate")]);
        assert!(catalog.resolve("Iron Ore", false).is_none());
        assert!(catalog.resolve("Iron Ore", true).is_none());
    }

    #[test]
    fn standard_wins_without_preference() {
        let catalog = RecipeCatalog::new(vec![plate("alt-plate").alternate(), plate("plate")]);
        assert_eq!(catalog.resolve("Iron Plate", false).unwrap().id, "plate");
        assert_eq!(catalog.resolve("Iron Plate", true).unwrap().id, "alt-plate");
    }

    #[test]
    fn single_kind_ignores_flag() {
        let only_alt = RecipeCatalog::new(vec![plate("alt-plate").alternate()]);
        assert_eq!(only_alt.resolve("Iron Plate", false).unwrap().id, "alt-plate");
        assert_eq!(only_alt.resolve("Iron Plate", true).unwrap().id, "alt-plate");

        let only_std = RecipeCatalog::new(vec![plate("plate")]);
        assert_eq!(only_std.resolve("Iron Plate", false).unwrap().id, "plate");
        assert_eq!(only_std.resolve("Iron Plate", true).unwrap().id, "plate");
    }

    #[test]
    fn first_of_kind_wins() {
        let catalog = RecipeCatalog::new(vec![plate("a"), plate("b")]);
        assert_eq!(catalog.resolve("Iron Plate", false).unwrap().id, "a");
        assert_eq!(catalog.candidates("Iron Plate").len(), 2);
    }
}
