use crate::config::GridConfig;
use crate::trace_grid;
use crate::types::{AnomalyId, EntityId, Point3};
use std::collections::{BTreeSet, HashMap};

/// Column/row of a grid cell on the XZ plane
pub type CellCoord = (u32, u32);

/// Occupants of one grid cell
#[derive(Debug, Clone, Default)]
pub struct GridCell {
    pub anomalies: Vec<AnomalyId>,
    pub entities: Vec<EntityId>,
}

/// Uniform broad-phase grid, centred on the origin and rebuilt every tick.
/// Positions outside the grid are clamped into the border cells.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    config: GridConfig,
    cells: HashMap<CellCoord, GridCell>,
}

impl SpatialGrid {
    pub fn new(config: GridConfig) -> Self {
        SpatialGrid {
            config,
            cells: HashMap::new(),
        }
    }

    pub fn config(&self) -> GridConfig {
        self.config
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    fn half_size(&self) -> f64 {
        self.config.extent as f64 * self.config.cell_size / 2.0
    }

    fn axis_index(&self, value: f64) -> u32 {
        let max_index = self.config.extent.saturating_sub(1);
        let index = ((value + self.half_size()) / self.config.cell_size).floor();
        if index.is_nan() || index <= 0.0 {
            0
        } else if index >= max_index as f64 {
            max_index
        } else {
            index as u32
        }
    }

    /// Cell containing `point` (y is ignored)
    pub fn cell_of(&self, point: Point3) -> CellCoord {
        (self.axis_index(point.x), self.axis_index(point.z))
    }

    /// Adds an anomaly to every cell its bounding square touches
    pub fn insert_anomaly(&mut self, id: AnomalyId, center: Point3, radius: f64) {
        let (min_x, min_z) = self.cell_of(Point3::new(center.x - radius, 0.0, center.z - radius));
        let (max_x, max_z) = self.cell_of(Point3::new(center.x + radius, 0.0, center.z + radius));
        for cx in min_x..=max_x {
            for cz in min_z..=max_z {
                self.cells.entry((cx, cz)).or_default().anomalies.push(id);
            }
        }
        trace_grid!(
            "Anomaly {} spans cells ({}, {})..=({}, {})",
            id,
            min_x,
            min_z,
            max_x,
            max_z
        );
    }

    pub fn insert_entity(&mut self, id: EntityId, position: Point3) {
        let cell = self.cell_of(position);
        self.cells.entry(cell).or_default().entities.push(id);
    }

    pub fn cell(&self, coord: CellCoord) -> Option<&GridCell> {
        self.cells.get(&coord)
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Anomaly pairs `(a, b)` with `a < b` that share at least one cell
    pub fn anomaly_pairs(&self) -> BTreeSet<(AnomalyId, AnomalyId)> {
        let mut pairs = BTreeSet::new();
        for cell in self.cells.values() {
            for (i, &a) in cell.anomalies.iter().enumerate() {
                for &b in &cell.anomalies[i + 1..] {
                    if a != b {
                        pairs.insert((a.min(b), a.max(b)));
                    }
                }
            }
        }
        pairs
    }

    /// Entity/anomaly pairs that share a cell
    pub fn entity_anomaly_pairs(&self) -> BTreeSet<(EntityId, AnomalyId)> {
        let mut pairs = BTreeSet::new();
        for cell in self.cells.values() {
            for &entity in &cell.entities {
                for &anomaly in &cell.anomalies {
                    pairs.insert((entity, anomaly));
                }
            }
        }
        pairs
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        SpatialGrid::new(GridConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_grid() -> SpatialGrid {
        // 10 cells of 2 units: covers -10..10 on x and z
        SpatialGrid::new(GridConfig {
            cell_size: 2.0,
            extent: 10,
        })
    }

    #[test]
    fn test_cell_of() {
        let grid = small_grid();
        assert_eq!(grid.cell_of(Point3::zero()), (5, 5));
        assert_eq!(grid.cell_of(Point3::new(-9.5, 3.0, 9.5)), (0, 9));
        assert_eq!(grid.cell_of(Point3::new(1.9, 0.0, -0.1)), (5, 4));
    }

    #[test]
    fn test_out_of_bounds_is_clamped() {
        let grid = small_grid();
        assert_eq!(grid.cell_of(Point3::new(-500.0, 0.0, 500.0)), (0, 9));
        assert_eq!(grid.cell_of(Point3::new(f64::NAN, 0.0, 0.0)), (0, 5));
    }

    #[test]
    fn test_anomaly_occupies_bounding_square() {
        let mut grid = small_grid();
        grid.insert_anomaly(1, Point3::new(1.0, 0.0, 1.0), 1.5);
        // x and z span -0.5..2.5 -> cells 4..=6
        assert_eq!(grid.occupied_cells(), 9);
        for cx in 4..=6 {
            for cz in 4..=6 {
                assert_eq!(grid.cell((cx, cz)).unwrap().anomalies, vec![1]);
            }
        }
        assert!(grid.cell((3, 3)).is_none());
    }

    #[test]
    fn test_pairs_are_deduplicated() {
        let mut grid = small_grid();
        grid.insert_anomaly(2, Point3::zero(), 3.0);
        grid.insert_anomaly(1, Point3::new(1.0, 0.0, 0.0), 3.0);
        grid.insert_anomaly(3, Point3::new(9.0, 0.0, 9.0), 0.5);
        grid.insert_entity(10, Point3::new(0.5, 0.0, 0.5));

        let anomaly_pairs: Vec<_> = grid.anomaly_pairs().into_iter().collect();
        assert_eq!(anomaly_pairs, vec![(1, 2)]);

        let entity_pairs: Vec<_> = grid.entity_anomaly_pairs().into_iter().collect();
        assert_eq!(entity_pairs, vec![(10, 1), (10, 2)]);
    }

    #[test]
    fn test_clear() {
        let mut grid = small_grid();
        grid.insert_entity(1, Point3::zero());
        grid.clear();
        assert_eq!(grid.occupied_cells(), 0);
    }
}
