//! Data models for recipes and item flows

/// An item name paired with a rate in items per minute
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRate {
    pub item: String,
    pub rate: f64,
}

impl ItemRate {
    pub fn new(item: impl Into<String>, rate: f64) -> Self {
        Self {
            item: item.into(),
            rate,
        }
    }
}

/// A production rule: one machine turns the inputs into one output
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub output: ItemRate,
    pub inputs: Vec<ItemRate>,
    pub machine: String,
    pub alternate: bool,
}

impl Recipe {
    pub fn new(
        id: impl Into<String>,
        output: ItemRate,
        inputs: Vec<ItemRate>,
        machine: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            output,
            inputs,
            machine: machine.into(),
            alternate: false,
        }
    }

    /// Mark this recipe as an alternate
    pub fn alternate(mut self) -> Self {
        self.alternate = true;
        self
    }
}
