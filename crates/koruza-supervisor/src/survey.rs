use serde::Serialize;

pub const DEFAULT_BINS: usize = 100;
pub const MAX_BINS: usize = 1024;
pub const DEFAULT_COVERAGE: i64 = 10_000;

/// Square grid of received optical power indexed by motor position.
///
/// Each cell holds the most recent sample that fell into it. Cells are
/// overwritten, never averaged, and only cleared by [`SurveyGrid::reset`].
#[derive(Debug, Clone)]
pub struct SurveyGrid {
    bins: usize,
    coverage: i64,
    cells: Vec<Option<f64>>,
}

/// One populated survey cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurveyPoint {
    pub x: usize,
    pub y: usize,
    pub rx_power_mw: f64,
}

/// Serializable view of a survey grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveySnapshot {
    pub bins: usize,
    pub coverage: i64,
    pub points: Vec<SurveyPoint>,
}

impl Default for SurveyGrid {
    fn default() -> Self {
        Self::new(DEFAULT_BINS, DEFAULT_COVERAGE)
    }
}

impl SurveyGrid {
    /// Create a `bins`×`bins` grid spanning `-coverage..=coverage` on both
    /// axes. `bins` is clamped to `1..=MAX_BINS` and `coverage` raised to
    /// at least one.
    pub fn new(bins: usize, coverage: i64) -> Self {
        let bins = bins.clamp(1, MAX_BINS);
        Self {
            bins,
            coverage: coverage.max(1),
            cells: vec![None; bins * bins],
        }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn coverage(&self) -> i64 {
        self.coverage
    }

    /// Map one motor coordinate to its bin, clamped to the grid edges.
    pub fn bin(&self, coordinate: i32) -> usize {
        let n = self.bins as i64;
        let bin = (i64::from(coordinate) * (n / 2)) / self.coverage + n / 2;
        bin.clamp(0, n - 1) as usize
    }

    /// Record `rx_power_mw` at motor position (`x`, `y`). Returns the cell.
    pub fn update(&mut self, x: i32, y: i32, rx_power_mw: f64) -> (usize, usize) {
        let (bx, by) = (self.bin(x), self.bin(y));
        self.cells[by * self.bins + bx] = Some(rx_power_mw);
        (bx, by)
    }

    pub fn get(&self, x_bin: usize, y_bin: usize) -> Option<f64> {
        if x_bin >= self.bins || y_bin >= self.bins {
            return None;
        }
        self.cells[y_bin * self.bins + x_bin]
    }

    pub fn reset(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = None);
    }

    pub fn snapshot(&self) -> SurveySnapshot {
        let points = self
            .cells
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| {
                cell.map(|rx_power_mw| SurveyPoint {
                    x: idx % self.bins,
                    y: idx / self.bins,
                    rx_power_mw,
                })
            })
            .collect();
        SurveySnapshot {
            bins: self.bins,
            coverage: self.coverage,
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binning_centre_and_edges() {
        let mut grid = SurveyGrid::default();
        assert_eq!(grid.update(0, 0, 0.5), (50, 50));
        assert_eq!(grid.update(10_000, 10_000, 0.6), (99, 99));
        assert_eq!(grid.update(-10_000, -10_000, 0.7), (0, 0));
        assert_eq!(grid.update(i32::MAX, i32::MIN, 0.8), (99, 0));
    }

    #[test]
    fn truncating_division() {
        let grid = SurveyGrid::default();
        // 199 * 50 / 10000 = 0 (truncated)
        assert_eq!(grid.bin(199), 50);
        assert_eq!(grid.bin(200), 51);
        assert_eq!(grid.bin(-199), 50);
        assert_eq!(grid.bin(-200), 49);
    }

    #[test]
    fn later_samples_overwrite() {
        let mut grid = SurveyGrid::default();
        grid.update(0, 0, 1.0);
        grid.update(10, 10, 2.0);
        assert_eq!(grid.get(50, 50), Some(2.0));
        assert_eq!(grid.snapshot().points.len(), 1);
    }

    #[test]
    fn reset_clears_all_cells() {
        let mut grid = SurveyGrid::new(10, 100);
        grid.update(-100, 100, 0.1);
        grid.update(100, -100, 0.2);
        assert_eq!(grid.snapshot().points.len(), 2);

        grid.reset();
        assert!(grid.snapshot().points.is_empty());
        assert_eq!(grid.get(0, 9), None);
    }

    #[test]
    fn bins_are_clamped() {
        assert_eq!(SurveyGrid::new(0, 100).bins(), 1);
        assert_eq!(SurveyGrid::new(usize::MAX, 100).bins(), MAX_BINS);
    }

    #[test]
    fn snapshot_coordinates() {
        let mut grid = SurveyGrid::new(4, 2);
        grid.update(-2, 2, 3.5);
        let snap = grid.snapshot();
        assert_eq!(snap.bins, 4);
        assert_eq!(
            snap.points,
            vec![SurveyPoint {
                x: 0,
                y: 3,
                rx_power_mw: 3.5
            }]
        );
        assert!(grid.get(4, 0).is_none());
    }
}
