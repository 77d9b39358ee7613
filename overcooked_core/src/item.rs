use serde::{Deserialize, Serialize};

use crate::{ItemId, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientState {
    Fresh,
    Chopped,
    Cooked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: ItemId,
    pub name: String,
    pub state: IngredientState,
}

impl Ingredient {
    pub fn fresh(id: ItemId, name: impl Into<String>) -> Self {
        Ingredient {
            id,
            name: name.into(),
            state: IngredientState::Fresh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateState {
    Empty,
    Plated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plate {
    pub id: ItemId,
    pub state: PlateState,
    /// Dish carried by a plated plate.
    pub dish: Option<String>,
}

impl Plate {
    pub fn empty(id: ItemId) -> Self {
        Plate {
            id,
            state: PlateState::Empty,
            dish: None,
        }
    }
}

/// Anything an agent can hold or leave on a counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Item {
    Ingredient(Ingredient),
    Plate(Plate),
}

impl Item {
    /// Short human-readable description, e.g. `chopped onion` or `plate of onion_soup`.
    pub fn label(&self) -> String {
        match self {
            Item::Ingredient(ingredient) => {
                let state = match ingredient.state {
                    IngredientState::Fresh => "fresh",
                    IngredientState::Chopped => "chopped",
                    IngredientState::Cooked => "cooked",
                };
                format!("{} {}", state, ingredient.name)
            }
            Item::Plate(Plate {
                state: PlateState::Plated,
                dish: Some(dish),
                ..
            }) => format!("plate of {}", dish),
            Item::Plate(_) => "empty plate".to_string(),
        }
    }
}

/// An item resting on a counter cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedItem {
    pub item: Item,
    pub location: Position,
}

/// Cooking progress of a pot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotPhase {
    /// Empty or still being filled.
    Filling,
    Cooking { remaining: u32 },
    Cooked { age: u32 },
    Burnt,
}

/// Timer transitions reported by [`Pot::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PotEvent {
    FinishedCooking { ingredient: String, count: usize },
    Burnt { ingredient: String, count: usize },
}

/// A pot sitting on a stove. Holds units of a single ingredient type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pot {
    pub id: usize,
    pub location: Position,
    pub contents: Vec<Ingredient>,
    pub phase: PotPhase,
}

impl Pot {
    pub fn new(id: usize, location: Position) -> Self {
        Pot {
            id,
            location,
            contents: Vec::new(),
            phase: PotPhase::Filling,
        }
    }

    pub fn ingredient(&self) -> Option<&str> {
        self.contents.first().map(|ingredient| ingredient.name.as_str())
    }

    pub fn count(&self) -> usize {
        self.contents.len()
    }

    /// Whether a unit of `ingredient` can go in, given the recipe needs `required` units.
    pub fn accepts(&self, ingredient: &str, required: usize) -> bool {
        self.phase == PotPhase::Filling
            && self.count() < required
            && self.ingredient().is_none_or(|current| current == ingredient)
    }

    /// Adds an ingredient; the pot starts cooking once it holds `required` units.
    pub fn add(&mut self, mut ingredient: Ingredient, required: usize, cook_ticks: u32) {
        ingredient.state = IngredientState::Chopped;
        self.contents.push(ingredient);
        if self.count() >= required {
            self.phase = PotPhase::Cooking {
                remaining: cook_ticks,
            };
            if cook_ticks == 0 {
                self.finish_cooking();
            }
        }
    }

    pub fn is_cooked(&self) -> bool {
        matches!(self.phase, PotPhase::Cooked { .. })
    }

    pub fn is_burnt(&self) -> bool {
        self.phase == PotPhase::Burnt
    }

    /// Full pots, cooking or done. Plates are worth fetching for these.
    pub fn is_full(&self) -> bool {
        matches!(
            self.phase,
            PotPhase::Cooking { .. } | PotPhase::Cooked { .. }
        )
    }

    /// Advances the cooking/burning countdown by one tick.
    pub fn advance(&mut self, burn_ticks: Option<u32>) -> Option<PotEvent> {
        match self.phase {
            PotPhase::Cooking { remaining } if remaining > 1 => {
                self.phase = PotPhase::Cooking {
                    remaining: remaining - 1,
                };
                None
            }
            PotPhase::Cooking { .. } => {
                self.finish_cooking();
                Some(PotEvent::FinishedCooking {
                    ingredient: self.ingredient().unwrap_or_default().to_string(),
                    count: self.count(),
                })
            }
            PotPhase::Cooked { age } => {
                let age = age + 1;
                match burn_ticks {
                    Some(limit) if age >= limit => {
                        self.phase = PotPhase::Burnt;
                        Some(PotEvent::Burnt {
                            ingredient: self.ingredient().unwrap_or_default().to_string(),
                            count: self.count(),
                        })
                    }
                    _ => {
                        self.phase = PotPhase::Cooked { age };
                        None
                    }
                }
            }
            PotPhase::Filling | PotPhase::Burnt => None,
        }
    }

    /// Empties the pot, returning what was in it.
    pub fn take_contents(&mut self) -> Vec<Ingredient> {
        self.phase = PotPhase::Filling;
        std::mem::take(&mut self.contents)
    }

    fn finish_cooking(&mut self) {
        for ingredient in &mut self.contents {
            ingredient.state = IngredientState::Cooked;
        }
        self.phase = PotPhase::Cooked { age: 0 };
    }
}
