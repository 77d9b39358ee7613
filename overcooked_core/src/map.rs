use std::{
    collections::{BTreeMap, BTreeSet},
    ops::{Index, IndexMut},
};

use serde::{Deserialize, Serialize};

use crate::{Position, StationId};

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![T::default(); size],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Converts a position to a flat vector index, `None` if out of bounds.
    #[inline]
    pub fn index_of(&self, pos: Position) -> Option<usize> {
        if pos.x < self.width && pos.y < self.height {
            Some(pos.y * self.width + pos.x)
        } else {
            None
        }
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        self.index_of(pos).is_some()
    }

    pub fn get(&self, pos: Position) -> Option<&T> {
        self.index_of(pos).and_then(|index| self.cells.get(index))
    }

    /// Returns an iterator that yields `(Position, &T)` in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (Position::new(index % width, index / width), cell))
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, pos: Position) -> &Self::Output {
        match self.index_of(pos) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                pos, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, pos: Position) -> &mut Self::Output {
        let (width, height) = (self.width, self.height);
        match self.index_of(pos) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                pos, width, height
            ),
        }
    }
}

/// Interactive fixtures of the kitchen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationKind {
    IngredientSource { ingredient: String },
    ChoppingBoard,
    /// A stove carrying one pot.
    Stove,
    ServingCounter,
    /// Where served plates come back, empty.
    ReturnCounter,
}

/// Represents the static type of a cell in the kitchen grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    #[default]
    Floor,
    Wall,
    /// Table top; items can be left here.
    Counter,
    Station(StationKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub kind: StationKind,
    pub location: Position,
}

/// The immutable kitchen topology shared by every planning call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitchenLayout {
    cells: Grid<CellType>,
    stations: Vec<Station>,
    agent_starts: Vec<Position>,
    plate_spawns: Vec<Position>,
}

impl KitchenLayout {
    pub fn new(cells: Grid<CellType>, agent_starts: Vec<Position>, plate_spawns: Vec<Position>) -> Self {
        let stations = cells
            .enumerate()
            .filter_map(|(location, cell)| match cell {
                CellType::Station(kind) => Some((location, kind.clone())),
                _ => None,
            })
            .enumerate()
            .map(|(id, (location, kind))| Station { id, kind, location })
            .collect();
        KitchenLayout {
            cells,
            stations,
            agent_starts,
            plate_spawns,
        }
    }

    pub fn width(&self) -> usize {
        self.cells.width()
    }

    pub fn height(&self) -> usize {
        self.cells.height()
    }

    pub fn is_floor(&self, pos: Position) -> bool {
        matches!(self.cells.get(pos), Some(CellType::Floor))
    }

    /// Cells an item may rest on: counters, chopping boards and the return counter.
    pub fn can_hold_items(&self, pos: Position) -> bool {
        matches!(
            self.cells.get(pos),
            Some(
                CellType::Counter
                    | CellType::Station(StationKind::ChoppingBoard | StationKind::ReturnCounter)
            )
        )
    }

    /// All floor cells, row-major.
    pub fn floor_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells
            .enumerate()
            .filter(|(_, cell)| **cell == CellType::Floor)
            .map(|(pos, _)| pos)
    }

    /// Plain counter cells, row-major.
    pub fn counters(&self) -> Vec<Position> {
        self.cells
            .enumerate()
            .filter(|(_, cell)| **cell == CellType::Counter)
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station_at(&self, pos: Position) -> Option<&Station> {
        self.stations.iter().find(|station| station.location == pos)
    }

    fn station_locations(&self, wanted: impl Fn(&StationKind) -> bool) -> Vec<Position> {
        self.stations
            .iter()
            .filter(|station| wanted(&station.kind))
            .map(|station| station.location)
            .collect()
    }

    pub fn ingredient_sources(&self, name: &str) -> Vec<Position> {
        self.station_locations(
            |kind| matches!(kind, StationKind::IngredientSource { ingredient } if ingredient == name),
        )
    }

    pub fn chopping_boards(&self) -> Vec<Position> {
        self.station_locations(|kind| *kind == StationKind::ChoppingBoard)
    }

    pub fn stoves(&self) -> Vec<Position> {
        self.station_locations(|kind| *kind == StationKind::Stove)
    }

    pub fn serving_counters(&self) -> Vec<Position> {
        self.station_locations(|kind| *kind == StationKind::ServingCounter)
    }

    pub fn return_counter(&self) -> Option<Position> {
        self.station_locations(|kind| *kind == StationKind::ReturnCounter)
            .into_iter()
            .next()
    }

    /// Floor cells orthogonally adjacent to `target`, from which it can be used.
    pub fn staging_cells(&self, target: Position) -> Vec<Position> {
        target
            .orthogonal_neighbours()
            .filter(|cell| self.is_floor(*cell))
            .collect()
    }

    /// Staging cells of every station. An idle agent standing on one is in the way.
    pub fn blocking_cells(&self) -> BTreeSet<Position> {
        self.stations
            .iter()
            .flat_map(|station| self.staging_cells(station.location))
            .collect()
    }

    pub fn agent_starts(&self) -> &[Position] {
        &self.agent_starts
    }

    pub fn plate_spawns(&self) -> &[Position] {
        &self.plate_spawns
    }
}

/// Represents errors raised while parsing a kitchen map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("Map string is empty.")]
    Empty,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map code '{code}' at position ({x}, {y}).")]
    UnknownCode { code: String, x: usize, y: usize },
    #[error("Agent start '{code}' appears more than once.")]
    DuplicateStart { code: String },
}

/// Two-letter codes for ingredient sources.
const INGREDIENT_CODES: &[(&str, &str)] = &[("ON", "onion"), ("TO", "tomato")];

/// The two-pot kitchen used when no map file is given.
pub const DEFAULT_KITCHEN: &str = "
CT CT CT ON CT CT PT CT PT CT CT CT CT
CT FL FL FL FL FL FL FL FL FL FL FL CT
CT FL FL FL FL A2 FL FL A1 FL FL FL CT
CT FL FL FL FL FL FL FL FL FL FL FL CT
CT CT CT CT CT CT CT CT CT CT FL FL CT
RT FL FL FL FL FL FL FL FL FL FL FL CT
SV FL FL FL FL A4 FL FL A3 FL FL FL CT
SV FL FL FL FL FL FL FL FL FL FL FL CT
CT CT CT CB CT CB CT CT CT PL PL CT CT
";

pub fn default_layout() -> KitchenLayout {
    load_layout_from_string(DEFAULT_KITCHEN).expect("built-in kitchen map is valid")
}

/// Loads a kitchen layout from whitespace-separated two-letter codes.
///
/// `FL` floor, `WL` wall, `CT` counter, `CB` chopping board, `PT` stove with
/// pot, `SV` serving counter, `RT` return counter, `PL` counter with a clean
/// plate, `ON`/`TO` ingredient sources, `A1`..`A9` agent starts on floor.
pub fn load_layout_from_string(map_string: &str) -> Result<KitchenLayout, MapError> {
    let lines: Vec<&str> = map_string.trim().lines().collect();
    if lines.is_empty() {
        return Err(MapError::Empty);
    }

    let height = lines.len();
    let mut width = 0;
    let mut parsed_rows: Vec<Vec<&str>> = Vec::with_capacity(height);

    for (y, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if y == 0 {
            width = tokens.len();
            if width == 0 {
                return Err(MapError::Empty);
            }
        } else if tokens.len() != width {
            return Err(MapError::RaggedRow {
                row: y,
                expected: width,
                found: tokens.len(),
            });
        }
        parsed_rows.push(tokens);
    }

    let mut cells: Grid<CellType> = Grid::new(width, height);
    let mut starts: BTreeMap<u32, Position> = BTreeMap::new();
    let mut plate_spawns = Vec::new();

    for (y, row_tokens) in parsed_rows.iter().enumerate() {
        for (x, token) in row_tokens.iter().enumerate() {
            let pos = Position { x, y };
            let cell = match *token {
                "FL" => CellType::Floor,
                "WL" => CellType::Wall,
                "CT" => CellType::Counter,
                "PL" => {
                    plate_spawns.push(pos);
                    CellType::Counter
                }
                "CB" => CellType::Station(StationKind::ChoppingBoard),
                "PT" => CellType::Station(StationKind::Stove),
                "SV" => CellType::Station(StationKind::ServingCounter),
                "RT" => CellType::Station(StationKind::ReturnCounter),
                code => {
                    if let Some(number) = code.strip_prefix('A').and_then(|n| n.parse::<u32>().ok()) {
                        if starts.insert(number, pos).is_some() {
                            return Err(MapError::DuplicateStart {
                                code: code.to_string(),
                            });
                        }
                        CellType::Floor
                    } else if let Some((_, ingredient)) =
                        INGREDIENT_CODES.iter().find(|(known, _)| *known == code)
                    {
                        CellType::Station(StationKind::IngredientSource {
                            ingredient: ingredient.to_string(),
                        })
                    } else {
                        return Err(MapError::UnknownCode {
                            code: code.to_string(),
                            x,
                            y,
                        });
                    }
                }
            };
            cells[pos] = cell;
        }
    }

    Ok(KitchenLayout::new(
        cells,
        starts.into_values().collect(),
        plate_spawns,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_kitchen_has_expected_fixtures() {
        let layout = default_layout();
        assert_eq!((layout.width(), layout.height()), (13, 9));
        assert_eq!(layout.ingredient_sources("onion"), vec![Position::new(3, 0)]);
        assert_eq!(layout.stoves(), vec![Position::new(6, 0), Position::new(8, 0)]);
        assert_eq!(layout.chopping_boards().len(), 2);
        assert_eq!(layout.serving_counters().len(), 2);
        assert_eq!(layout.return_counter(), Some(Position::new(0, 5)));
        assert_eq!(layout.plate_spawns(), &[Position::new(9, 8), Position::new(10, 8)]);
        assert_eq!(
            layout.agent_starts(),
            &[
                Position::new(8, 2),
                Position::new(5, 2),
                Position::new(8, 6),
                Position::new(5, 6)
            ]
        );
    }

    #[test]
    fn staging_cells_are_orthogonal_floor_neighbours() {
        let layout = default_layout();
        assert_eq!(layout.staging_cells(Position::new(3, 0)), vec![Position::new(3, 1)]);
        // Serving counter on the left edge: only the cell to its right is floor.
        assert_eq!(layout.staging_cells(Position::new(0, 6)), vec![Position::new(1, 6)]);
        assert!(layout.blocking_cells().contains(&Position::new(3, 1)));
        assert!(!layout.blocking_cells().contains(&Position::new(2, 2)));
    }

    #[test]
    fn can_hold_items_only_on_surfaces() {
        let layout = default_layout();
        assert!(layout.can_hold_items(Position::new(1, 0)));
        assert!(layout.can_hold_items(Position::new(3, 8)));
        assert!(!layout.can_hold_items(Position::new(6, 0)));
        assert!(!layout.can_hold_items(Position::new(1, 1)));
    }

    #[test]
    fn rejects_malformed_maps() {
        assert_eq!(load_layout_from_string("   \n  "), Err(MapError::Empty));
        assert!(matches!(
            load_layout_from_string("FL FL\nFL"),
            Err(MapError::RaggedRow { row: 1, expected: 2, found: 1 })
        ));
        assert!(matches!(
            load_layout_from_string("FL XX"),
            Err(MapError::UnknownCode { x: 1, y: 0, .. })
        ));
        assert!(matches!(
            load_layout_from_string("A1 A1"),
            Err(MapError::DuplicateStart { .. })
        ));
    }

    #[test]
    fn agent_starts_are_ordered_by_number() {
        let layout = load_layout_from_string("A2 FL A1").unwrap();
        assert_eq!(layout.agent_starts(), &[Position::new(2, 0), Position::new(0, 0)]);
        assert!(layout.is_floor(Position::new(0, 0)));
    }

    #[test]
    fn grid_lookups_outside_the_map_are_none() {
        let mut grid: Grid<u8> = Grid::new(2, 2);
        grid[Position::new(1, 1)] = 5;
        assert_eq!(grid.get(Position::new(1, 1)), Some(&5));
        assert_eq!(grid.get(Position::new(2, 0)), None);
        assert!(!grid.contains(Position::new(0, 2)));
    }
}
