//! Mask patterns, penalty scoring and mask selection.

use core::fmt;

use crate::matrix::ModuleMatrix;

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Mask(u8);

impl Mask {
    /// Creates a mask object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [0, 7].
    pub const fn new(mask: u8) -> Self {
        assert!(mask <= 7, "Mask value out of range");
        Self(mask)
    }

    /// Returns the value, which is in the range [0, 7].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// All eight masks in id order.
    pub fn all() -> impl Iterator<Item = Mask> {
        (0..8).map(Mask)
    }

    /// Whether this mask inverts the module at column `x`, row `y`.
    pub fn inverts(self, x: usize, y: usize) -> bool {
        match self.0 {
            0 => (x + y) % 2 == 0,
            1 => y % 2 == 0,
            2 => x % 3 == 0,
            3 => (x + y) % 3 == 0,
            4 => (x / 3 + y / 2) % 2 == 0,
            5 => x * y % 2 + x * y % 3 == 0,
            6 => (x * y % 2 + x * y % 3) % 2 == 0,
            7 => ((x + y) % 2 + x * y % 3) % 2 == 0,
            _ => unreachable!(),
        }
    }
}

/// XORs `mask` into every data module. Applying the same mask twice
/// restores the original matrix.
pub fn apply_mask(matrix: &mut ModuleMatrix, mask: Mask) {
    let size = matrix.size();
    for y in 0..size {
        for x in 0..size {
            if !matrix.is_function(x, y) && mask.inverts(x, y) {
                matrix.flip(x, y);
            }
        }
    }
}

/// Penalty of a masked matrix, split by rule.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PenaltyScore {
    /// Runs of five or more same-colored modules in a row or column.
    pub runs: i32,
    /// 2x2 blocks of one color.
    pub blocks: i32,
    /// 1:1:3:1:1 finder-like patterns with a light border.
    pub finder_like: i32,
    /// Dark/light imbalance.
    pub balance: i32,
}

impl PenaltyScore {
    pub fn total(&self) -> i32 {
        self.runs + self.blocks + self.finder_like + self.balance
    }
}

impl fmt::Display for PenaltyScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (runs {}, blocks {}, finder-like {}, balance {})",
            self.total(),
            self.runs,
            self.blocks,
            self.finder_like,
            self.balance
        )
    }
}

/// Scores a matrix with the four penalty rules.
pub fn penalty_score(matrix: &ModuleMatrix) -> PenaltyScore {
    score_modules(matrix.size(), |x, y| matrix.get(x, y))
}

/// The four penalty rules over a `size` x `size` grid where `module(x, y)`
/// is true for dark modules.
fn score_modules(size: usize, module: impl Fn(usize, usize) -> bool) -> PenaltyScore {
    let mut score = PenaltyScore::default();

    // Rows then columns: long runs and finder-like patterns
    for horizontal in [true, false] {
        for a in 0..size {
            let at = |b: usize| if horizontal { module(b, a) } else { module(a, b) };
            let mut runcolor = false;
            let mut runlen: i32 = 0;
            let mut runhistory = FinderPenalty::new(size);
            for b in 0..size {
                if at(b) == runcolor {
                    runlen += 1;
                    if runlen == 5 {
                        score.runs += PENALTY_N1;
                    } else if runlen > 5 {
                        score.runs += 1;
                    }
                } else {
                    runhistory.add_history(runlen);
                    if !runcolor {
                        score.finder_like += runhistory.count_patterns() * PENALTY_N3;
                    }
                    runcolor = at(b);
                    runlen = 1;
                }
            }
            score.finder_like += runhistory.terminate_and_count(runcolor, runlen) * PENALTY_N3;
        }
    }

    for y in 0..size.saturating_sub(1) {
        for x in 0..size - 1 {
            let color = module(x, y);
            if color == module(x + 1, y) && color == module(x, y + 1) && color == module(x + 1, y + 1) {
                score.blocks += PENALTY_N2;
            }
        }
    }

    // Smallest k >= 0 such that (45-5k)% <= dark <= (55+5k)%
    let dark = (0..size)
        .flat_map(|y| (0..size).map(move |x| (x, y)))
        .filter(|&(x, y)| module(x, y))
        .count() as i32;
    let total = (size * size).max(1) as i32;
    let k = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
    score.balance = k.max(0) * PENALTY_N4;

    score
}

/// Applies each mask to a copy of `matrix`, writes that mask into the format
/// area and scores the result.
pub fn score_candidates(matrix: &ModuleMatrix) -> Vec<(Mask, PenaltyScore)> {
    Mask::all()
        .map(|mask| {
            let candidate = masked(matrix, mask);
            (mask, penalty_score(&candidate))
        })
        .collect()
}

/// Keeps the candidate with the lowest total penalty; ties go to the lowest
/// mask id.
pub fn select_mask(matrix: ModuleMatrix) -> (ModuleMatrix, Mask) {
    let mut best: Option<(Mask, i32)> = None;
    for (mask, score) in score_candidates(&matrix) {
        tracing::trace!(mask = mask.value(), %score, "scored mask candidate");
        if best.map_or(true, |(_, min)| score.total() < min) {
            best = Some((mask, score.total()));
        }
    }
    let (mask, penalty) = best.unwrap_or((Mask::new(0), 0));
    tracing::debug!(mask = mask.value(), penalty, "selected mask");
    (masked(&matrix, mask), mask)
}

fn masked(matrix: &ModuleMatrix, mask: Mask) -> ModuleMatrix {
    let mut candidate = matrix.clone();
    apply_mask(&mut candidate, mask);
    candidate.draw_format_bits(mask);
    candidate
}

/// Run-length history for detecting finder-like patterns along one line.
struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    fn new(size: usize) -> Self {
        Self {
            qr_size: size as i32,
            run_history: [0; 7],
        }
    }

    fn add_history(&mut self, mut currentrunlength: i32) {
        if self.run_history[0] == 0 {
            currentrunlength += self.qr_size; // Light border before the first run
        }
        let len: usize = self.run_history.len();
        self.run_history.copy_within(0..len - 1, 1);
        self.run_history[0] = currentrunlength;
    }

    fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        let core = n > 0 && rh[2] == n && rh[3] == n * 3 && rh[4] == n && rh[5] == n;
        i32::from(core && rh[0] >= n * 4 && rh[6] >= n)
            + i32::from(core && rh[6] >= n * 4 && rh[0] >= n)
    }

    fn terminate_and_count(mut self, currentruncolor: bool, mut currentrunlength: i32) -> i32 {
        if currentruncolor {
            self.add_history(currentrunlength);
            currentrunlength = 0;
        }
        currentrunlength += self.qr_size; // Light border after the last run
        self.add_history(currentrunlength);
        self.count_patterns()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qrcode::{EcLevel, Version};

    fn sample_matrix() -> ModuleMatrix {
        let data: Vec<u8> = (0..26u8).map(|i| i.wrapping_mul(37)).collect();
        ModuleMatrix::build(&data, Version::new(1).unwrap(), EcLevel::Low)
    }

    #[test]
    fn test_mask_formulas() {
        assert!(Mask::new(0).inverts(0, 0));
        assert!(!Mask::new(0).inverts(1, 0));
        assert!(Mask::new(1).inverts(5, 2));
        assert!(Mask::new(2).inverts(3, 1));
        assert!(!Mask::new(4).inverts(3, 0));
        assert!(Mask::new(5).inverts(0, 7));
        assert_eq!(Mask::all().count(), 8);
    }

    #[test]
    fn test_mask_is_involution() {
        let original = sample_matrix();
        for mask in Mask::all() {
            let mut m = original.clone();
            apply_mask(&mut m, mask);
            apply_mask(&mut m, mask);
            assert_eq!(m, original);
        }
    }

    #[test]
    fn test_function_modules_untouched_by_masks() {
        let original = sample_matrix();
        let size = original.size();
        for mask in Mask::all() {
            let mut m = original.clone();
            apply_mask(&mut m, mask);
            for y in 0..size {
                for x in 0..size {
                    if original.is_function(x, y) {
                        assert_eq!(m.get(x, y), original.get(x, y), "mask {mask:?} at ({x},{y})");
                    }
                }
            }
        }
    }

    #[test]
    fn test_selected_mask_has_minimum_penalty() {
        let matrix = sample_matrix();
        let scores = score_candidates(&matrix);
        let (_, chosen) = select_mask(matrix);
        let min = scores.iter().map(|(_, s)| s.total()).min().unwrap();
        let first_min = scores.iter().find(|(_, s)| s.total() == min).unwrap().0;
        assert_eq!(chosen, first_min);
    }

    #[test]
    fn test_finder_like_pattern_counted() {
        // Leading light border, then dark 1, light 1, dark 3, light 1, dark 1
        let mut fp = FinderPenalty::new(21);
        for run in [4, 1, 1, 3, 1, 1, 2] {
            fp.add_history(run);
        }
        assert_eq!(fp.count_patterns(), 1);

        // Four light modules on both sides count once per side
        let mut fp = FinderPenalty::new(21);
        for run in [4, 1, 1, 3, 1, 1, 4] {
            fp.add_history(run);
        }
        assert_eq!(fp.count_patterns(), 2);
    }

    /// Scores a grid given as rows of `#` (dark) and `.` (light).
    fn score_rows(rows: &[&str]) -> PenaltyScore {
        let cells: Vec<Vec<bool>> = rows.iter().map(|r| r.bytes().map(|b| b == b'#').collect()).collect();
        assert!(cells.iter().all(|r| r.len() == cells.len()));
        score_modules(cells.len(), |x, y| cells[y][x])
    }

    fn checkerboard(size: usize) -> Vec<Vec<bool>> {
        (0..size).map(|y| (0..size).map(|x| (x + y) % 2 == 0).collect()).collect()
    }

    fn score_cells(cells: &[Vec<bool>]) -> PenaltyScore {
        score_modules(cells.len(), |x, y| cells[y][x])
    }

    #[test]
    fn test_checkerboard_has_no_penalty() {
        assert_eq!(score_cells(&checkerboard(10)), PenaltyScore::default());
    }

    #[test]
    fn test_run_penalty() {
        // Row 0 starts with six dark modules; every other line alternates
        let mut cells = checkerboard(10);
        for x in 0..6 {
            cells[0][x] = true;
        }
        cells[0][6] = false;
        assert_eq!(score_cells(&cells).runs, 4);

        cells[0][5] = false;
        assert_eq!(score_cells(&cells).runs, 3);
    }

    #[test]
    fn test_block_penalty() {
        let mut cells = checkerboard(10);
        for (x, y) in [(2, 2), (3, 2), (2, 3), (3, 3)] {
            cells[y][x] = true;
        }
        assert_eq!(score_cells(&cells).blocks, 3);

        let mut cells = checkerboard(10);
        for y in 2..5 {
            for x in 2..5 {
                cells[y][x] = true;
            }
        }
        assert_eq!(score_cells(&cells).blocks, 12);
    }

    #[test]
    fn test_finder_like_line_penalty() {
        let mut rows = vec!["..............."; 15];
        rows[7] = "....#.###.#....";
        // Four light modules on each side: counted once per side
        assert_eq!(score_rows(&rows).finder_like, 80);
    }

    #[test]
    fn test_balance_penalty() {
        let grid = |dark: usize| -> Vec<Vec<bool>> {
            (0..10).map(|y| (0..10).map(|x| y * 10 + x < dark).collect()).collect()
        };
        assert_eq!(score_cells(&grid(50)).balance, 0);
        assert_eq!(score_cells(&grid(45)).balance, 0);
        assert_eq!(score_cells(&grid(55)).balance, 0);
        assert_eq!(score_cells(&grid(57)).balance, 10);
        assert_eq!(score_cells(&grid(44)).balance, 10);
        assert_eq!(score_cells(&grid(61)).balance, 20);
        assert_eq!(score_cells(&grid(100)).balance, 90);
    }

    #[test]
    fn test_matrix_score_matches_grid_score() {
        let m = sample_matrix();
        let via_grid = score_modules(m.size(), |x, y| m.get(x, y));
        assert_eq!(penalty_score(&m), via_grid);
        assert_eq!(penalty_score(&m).balance % PENALTY_N4, 0);
    }
}
