// Mud module - sediment bed occupancy model and settling automaton.
//
// Bed rows are indexed bottom-up: row 0 is the bottom of the visible region
// and larger rows are higher. Each column records the row of its topmost
// particle (-1 when empty). The display layer converts rows to matrix pixel
// coordinates when drawing and when reporting the surface to falling
// droplets.
use rand::Rng;

use crate::canvas::Canvas;
use crate::types::Rgb;

pub struct Mud {
    width: usize,
    height: usize,
    top: Vec<i32>,
    cells: Vec<Option<Rgb>>,
    value: i32,
    good_color: Rgb,
    decay: Option<f64>,
}

impl Mud {
    pub fn new(width: usize, height: usize, good_color: Rgb, decay: Option<f64>) -> Self {
        Mud {
            width,
            height,
            top: vec![-1; width],
            cells: vec![None; width * height],
            value: 0,
            good_color,
            decay,
        }
    }

    /// Net movement recorded by the most recent settling step. Not
    /// cumulative: it is the instantaneous health signal.
    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn top_row(&self, x: usize) -> i32 {
        self.top[x]
    }

    /// Matrix pixel row of the sediment surface near column `x`, taking the
    /// highest of the column and its immediate neighbors. An empty
    /// neighborhood reports the row just below the bottom of the matrix.
    pub fn surface_px(&self, x: i32) -> i32 {
        let mut level = self.height as i32;
        for nx in x - 1..=x + 1 {
            if nx < 0 || nx >= self.width as i32 {
                continue;
            }
            level = level.min(self.height as i32 - 1 - self.top[nx as usize]);
        }
        level
    }

    /// Deposit one particle near column `x` (matrix pixel column). The
    /// particle lands on the local surface with a small random scatter, which
    /// is what makes the next settling step register movement.
    pub fn add(&mut self, x: i32, color: Rgb, rng: &mut impl Rng) {
        if self.width == 0 {
            return;
        }
        let ox = rng.gen_range(-1..=1);
        let col = (x + ox).clamp(0, self.width as i32 - 1) as usize;
        let lift = rng.gen_range(0..=1);
        let mut row = (self.top[col] + 1 + lift).max(0) as usize;
        while row < self.height && self.cells[row * self.width + col].is_some() {
            row += 1;
        }
        if row >= self.height {
            return; // column full to the brim
        }
        self.cells[row * self.width + col] = Some(color);
        self.top[col] = self.top[col].max(row as i32);
    }

    fn contribution(&self, color: Rgb) -> i32 {
        if color == self.good_color {
            1
        } else {
            -1
        }
    }

    /// One settling step. Columns are processed tallest-first (order fixed
    /// from the heights at step start, heights mutated in place), and each
    /// column is scanned from one margin row below its recorded top to the
    /// top of the region. A particle falls one row per step toward a gap
    /// below it, or slides diagonally into a neighbor column with room; the
    /// bed's value is replaced by this step's net movement.
    pub fn step(&mut self, rng: &mut impl Rng) {
        let width = self.width;
        let mut order: Vec<usize> = (0..width).collect();
        order.sort_by(|&a, &b| self.top[b].cmp(&self.top[a]));

        let mut value = 0i32;
        for &x in &order {
            let start = (self.top[x] - 1).max(0) as usize;
            let mut gap = false;
            for row in start..self.height {
                let idx = row * width + x;
                let Some(color) = self.cells[idx] else {
                    gap = true;
                    continue;
                };

                // decay clears the cell; the hole it leaves is not a landing
                // slot until the next step
                if let Some(p) = self.decay {
                    if rng.gen::<f64>() < p {
                        self.cells[idx] = None;
                        self.top[x] = row as i32 - 1;
                        continue;
                    }
                }

                if gap {
                    // vertical fall, one row toward the gap below
                    self.cells[idx] = None;
                    self.cells[(row - 1) * width + x] = Some(color);
                    self.top[x] = self.top[x].max(row as i32 - 1);
                    value += self.contribution(color);
                    continue;
                }

                let below = row as i32 - 1;
                let open = |nx: usize| {
                    self.top[nx] < below && self.cells[below as usize * width + nx].is_none()
                };
                let left_ok = below >= 0 && x > 0 && open(x - 1);
                let right_ok = below >= 0 && x + 1 < width && open(x + 1);
                let target = match (left_ok, right_ok) {
                    (true, true) => Some(if rng.gen::<bool>() { x - 1 } else { x + 1 }),
                    (true, false) => Some(x - 1),
                    (false, true) => Some(x + 1),
                    (false, false) => None,
                };
                match target {
                    Some(nx) => {
                        self.cells[idx] = None;
                        self.cells[below as usize * width + nx] = Some(color);
                        self.top[nx] = below;
                        if self.top[x] == row as i32 {
                            self.top[x] = below;
                        }
                        value += self.contribution(color);
                        gap = true; // the vacated cell is a usable slot
                    }
                    None => {
                        self.top[x] = self.top[x].max(row as i32);
                    }
                }
            }
        }
        self.value = value;
    }

    /// Paint every occupied cell onto the matrix canvas.
    pub fn render(&self, canvas: &mut Canvas) {
        for row in 0..self.height {
            let py = self.height as i32 - 1 - row as i32;
            for x in 0..self.width {
                if let Some(color) = self.cells[row * self.width + x] {
                    canvas.put_pixel(x as i32, py, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const GOOD: Rgb = Rgb::new(0, 0, 0xcc);
    const BAD: Rgb = Rgb::new(0x66, 0, 0);

    fn set(mud: &mut Mud, x: usize, row: usize, color: Rgb) {
        mud.cells[row * mud.width + x] = Some(color);
        mud.top[x] = mud.top[x].max(row as i32);
    }

    #[test]
    fn test_fresh_bed_is_empty() {
        let mud = Mud::new(8, 32, GOOD, None);
        assert_eq!(mud.occupied(), 0);
        assert!((0..8).all(|x| mud.top_row(x) == -1));
        assert_eq!(mud.surface_px(4), 32);
    }

    #[test]
    fn test_vertical_fall_one_row_per_step() {
        // column solid up to row 10, a single particle floating at row 15
        // with rows 11-14 empty: one step drops it to 14 and the recorded
        // top becomes 14
        let mut mud = Mud::new(1, 32, GOOD, None);
        for row in 0..=10 {
            set(&mut mud, 0, row, GOOD);
        }
        set(&mut mud, 0, 15, GOOD);
        mud.top[0] = 10; // record predates the floating particle

        let mut rng = StdRng::seed_from_u64(1);
        mud.step(&mut rng);

        assert!(mud.cells[15].is_none());
        assert_eq!(mud.cells[14], Some(GOOD));
        assert_eq!(mud.top_row(0), 14);
        assert_eq!(mud.value(), 1);
    }

    #[test]
    fn test_diagonal_prefers_open_neighbor() {
        // middle column blocked vertically, left neighbor two rows lower,
        // right neighbor full to the same height: slide must go left
        let mut mud = Mud::new(3, 16, GOOD, None);
        for row in 0..=3 {
            set(&mut mud, 1, row, BAD);
            set(&mut mud, 2, row, BAD);
        }
        for row in 0..=1 {
            set(&mut mud, 0, row, BAD);
        }

        let mut rng = StdRng::seed_from_u64(7);
        mud.step(&mut rng);

        // the top particle of column 1 (row 3) moved to column 0 row 2
        assert_eq!(mud.cells[2 * 3 + 0], Some(BAD));
        assert!(mud.cells[3 * 3 + 1].is_none());
        assert_eq!(mud.top_row(0), 2);
        assert_eq!(mud.top_row(1), 2);
        // right column untouched
        assert_eq!(mud.top_row(2), 3);
        assert!(mud.value() < 0);
    }

    #[test]
    fn test_step_conserves_particles_without_decay() {
        let mut mud = Mud::new(8, 32, GOOD, None);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..40 {
            mud.add(3, GOOD, &mut rng);
            mud.add(5, BAD, &mut rng);
        }
        let before = mud.occupied();
        for _ in 0..20 {
            mud.step(&mut rng);
            assert_eq!(mud.occupied(), before);
        }
    }

    #[test]
    fn test_decay_only_reduces_count() {
        let mut mud = Mud::new(8, 32, GOOD, Some(0.2));
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..60 {
            mud.add(4, GOOD, &mut rng);
        }
        let mut prev = mud.occupied();
        for _ in 0..30 {
            mud.step(&mut rng);
            let now = mud.occupied();
            assert!(now <= prev);
            prev = now;
        }
    }

    #[test]
    fn test_value_sign_tracks_particle_color() {
        let mut rng = StdRng::seed_from_u64(3);

        let mut good = Mud::new(8, 32, GOOD, None);
        for _ in 0..20 {
            good.add(4, GOOD, &mut rng);
        }
        good.step(&mut rng);
        assert!(good.value() >= 0);

        let mut bad = Mud::new(8, 32, GOOD, None);
        for _ in 0..20 {
            bad.add(4, BAD, &mut rng);
        }
        bad.step(&mut rng);
        assert!(bad.value() <= 0);
    }

    #[test]
    fn test_value_not_cumulative() {
        let mut mud = Mud::new(4, 32, GOOD, None);
        let mut rng = StdRng::seed_from_u64(11);
        mud.add(2, GOOD, &mut rng);
        mud.step(&mut rng);
        // keep stepping until the bed is still; value must return to zero
        for _ in 0..40 {
            mud.step(&mut rng);
        }
        assert_eq!(mud.value(), 0);
    }

    #[test]
    fn test_surface_tracks_neighborhood() {
        let mut mud = Mud::new(5, 32, GOOD, None);
        set(&mut mud, 2, 0, GOOD);
        set(&mut mud, 2, 1, GOOD);
        // column 2 has two particles: surface at pixel row 30
        assert_eq!(mud.surface_px(2), 30);
        // neighbors see the same peak
        assert_eq!(mud.surface_px(1), 30);
        assert_eq!(mud.surface_px(3), 30);
        // far column sees an empty bed
        assert_eq!(mud.surface_px(0), 32);
    }
}
