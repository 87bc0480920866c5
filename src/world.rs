//! Generated terrain grid and its cells.
//!
//! A `TerrainGrid` is built once by `topology::generate*` and never mutated
//! afterwards. Consumers read cells by (x, y) or by row-major index; any
//! per-cell mutable state (depletion, fog of war) lives in side tables
//! keyed by `TerrainGrid::index_of`.

use serde::{Deserialize, Serialize};

use crate::biomes::Biome;

/// Bitset of water-related cell flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellFlags(u8);

impl CellFlags {
    pub const WATER: CellFlags = CellFlags(1 << 0);
    pub const RIVER: CellFlags = CellFlags(1 << 1);
    pub const LAKE: CellFlags = CellFlags(1 << 2);
    pub const COAST: CellFlags = CellFlags(1 << 3);

    pub const fn empty() -> Self {
        CellFlags(0)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, other: CellFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: CellFlags) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for CellFlags {
    type Output = CellFlags;

    fn bitor(self, rhs: CellFlags) -> CellFlags {
        CellFlags(self.0 | rhs.0)
    }
}

/// One grid unit of terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Abstract elevation units, signed 8-bit range
    pub elevation: i8,
    /// 0 (arid) to 255 (saturated)
    pub moisture: u8,
    /// 0 (frozen) to 255 (hot)
    pub temperature: u8,
    pub biome: Biome,
    pub flags: CellFlags,
    /// 1 (smooth) to 9 (very rough)
    pub roughness: u8,
}

impl Cell {
    pub fn is_water(&self) -> bool {
        self.flags.contains(CellFlags::WATER)
    }

    pub fn is_river(&self) -> bool {
        self.flags.contains(CellFlags::RIVER)
    }

    pub fn is_lake(&self) -> bool {
        self.flags.contains(CellFlags::LAKE)
    }

    pub fn is_coast(&self) -> bool {
        self.flags.contains(CellFlags::COAST)
    }
}

/// Fixed-size generated world.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl TerrainGrid {
    /// Assemble a grid. `cells.len()` must equal `width * height`.
    pub(crate) fn new(width: usize, height: usize, cells: Vec<Cell>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Self { width, height, cells }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major index of (x, y), or `None` when out of bounds.
    pub fn index_of(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Cell at (x, y), or `None` when out of bounds.
    pub fn cell_at(&self, x: usize, y: usize) -> Option<&Cell> {
        self.index_of(x, y).map(|idx| &self.cells[idx])
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Fraction of cells matching `pred`.
    pub fn fraction(&self, pred: impl Fn(&Cell) -> bool) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.cells.iter().filter(|c| pred(c)).count() as f64 / self.cells.len() as f64
    }

    /// Count of cells per biome, in `Biome::all()` order.
    pub fn biome_counts(&self) -> Vec<(Biome, usize)> {
        Biome::all()
            .iter()
            .map(|&b| (b, self.cells.iter().filter(|c| c.biome == b).count()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(flags: CellFlags) -> Cell {
        Cell {
            elevation: 0,
            moisture: 100,
            temperature: 100,
            biome: Biome::Forest,
            flags,
            roughness: 1,
        }
    }

    #[test]
    fn test_flags() {
        let mut f = CellFlags::empty();
        assert!(!f.contains(CellFlags::WATER));
        f.insert(CellFlags::RIVER | CellFlags::WATER);
        assert!(f.contains(CellFlags::WATER));
        assert!(f.contains(CellFlags::RIVER));
        assert!(!f.contains(CellFlags::LAKE));
        assert_eq!(f.bits(), 0b0011);
    }

    #[test]
    fn test_cell_at_bounds() {
        let mut cells = vec![cell(CellFlags::empty()); 6];
        cells[5] = cell(CellFlags::WATER);
        let grid = TerrainGrid::new(3, 2, cells);

        assert!(grid.cell_at(2, 1).unwrap().is_water());
        assert!(grid.cell_at(3, 0).is_none());
        assert!(grid.cell_at(0, 2).is_none());
        assert_eq!(grid.index_of(1, 1), Some(4));
        assert!((grid.fraction(|c| c.is_water()) - 1.0 / 6.0).abs() < 1e-12);
    }
}
