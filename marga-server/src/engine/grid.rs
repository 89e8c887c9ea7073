//! Grid-backed reference engine.
//!
//! Each map is a JSON file `<data_folder>/<map_id:03>.json`:
//!
//! ```json
//! {
//!   "origin": [0.0, 0.0],
//!   "resolution": 1.0,
//!   "height": 0.0,
//!   "rows": ["....#", "....#", "....."]
//! }
//! ```
//!
//! Row `i` covers `y` cells `i`, column `j` covers `x` cell `j`; `#` marks a
//! blocked cell, anything else is walkable. Every walkable cell sits at the
//! map's `height`.
//!
//! Path queries run 8-connected A* with an octile heuristic, then pull the
//! cell corridor tight with line-of-sight checks.

use log::{debug, trace};
use marga_path::core::{Point3, points_to_flat};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use super::{EngineError, EngineResult, NavEngine};

/// Grid cell coordinate (x, y)
type Cell = (i32, i32);

/// Neighbour offsets: orthogonal first, then diagonal
const NEIGHBORS: [Cell; 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Segment sampling step as a fraction of the cell size
const SAMPLE_FRACTION: f32 = 0.25;

/// Grid engine configuration
#[derive(Clone, Debug)]
pub struct GridEngineConfig {
    /// Directory holding `<map_id:03>.json` files
    pub data_folder: PathBuf,
    /// Corridor cells kept from a search before string pulling
    pub max_poly_path: usize,
    /// Points returned from a path query
    pub max_point_path: usize,
    /// A* expansion limit
    pub max_search_nodes: usize,
    /// Random point seed (0 = entropy)
    pub seed: u64,
}

impl Default for GridEngineConfig {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("mmaps"),
            max_poly_path: 512,
            max_point_path: 256,
            max_search_nodes: 65535,
            seed: 0,
        }
    }
}

#[derive(Deserialize)]
struct GridFile {
    origin: [f32; 2],
    resolution: f32,
    #[serde(default)]
    height: f32,
    rows: Vec<String>,
}

/// Walkability grid for one map
#[derive(Clone, Debug)]
pub struct GridMap {
    origin: [f32; 2],
    resolution: f32,
    height: f32,
    width: usize,
    depth: usize,
    walkable: Vec<bool>,
}

impl GridMap {
    /// Parse map JSON.
    pub fn parse(map_id: i32, json: &str) -> EngineResult<Self> {
        let invalid = |reason: String| EngineError::InvalidMap { map_id, reason };

        let file: GridFile = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;

        if !(file.resolution.is_finite() && file.resolution > 0.0) {
            return Err(invalid(format!("resolution {} must be positive", file.resolution)));
        }
        if !(file.origin[0].is_finite() && file.origin[1].is_finite() && file.height.is_finite())
        {
            return Err(invalid("origin and height must be finite".to_string()));
        }

        let depth = file.rows.len();
        let width = file.rows.first().map_or(0, |r| r.chars().count());
        if depth == 0 || width == 0 {
            return Err(invalid("grid is empty".to_string()));
        }

        let mut walkable = Vec::with_capacity(width * depth);
        for (i, row) in file.rows.iter().enumerate() {
            let len = row.chars().count();
            if len != width {
                return Err(invalid(format!(
                    "row {} has {} cells, expected {}",
                    i, len, width
                )));
            }
            walkable.extend(row.chars().map(|c| c != '#'));
        }

        Ok(Self {
            origin: file.origin,
            resolution: file.resolution,
            height: file.height,
            width,
            depth,
            walkable,
        })
    }

    /// Load map JSON from disk.
    pub fn load(map_id: i32, path: &Path) -> EngineResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EngineError::MapNotFound(map_id),
            _ => EngineError::InvalidMap {
                map_id,
                reason: format!("{}: {}", path.display(), e),
            },
        })?;
        Self::parse(map_id, &json)
    }

    /// Grid width in cells
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid depth (row count) in cells
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_walkable(&self, cell: Cell) -> bool {
        let (x, y) = cell;
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.depth {
            return false;
        }
        self.walkable[y as usize * self.width + x as usize]
    }

    /// Cell containing `p` (may lie outside the grid)
    pub fn cell_of(&self, p: &Point3) -> Cell {
        (
            ((p.x - self.origin[0]) / self.resolution).floor() as i32,
            ((p.y - self.origin[1]) / self.resolution).floor() as i32,
        )
    }

    pub fn cell_center(&self, cell: Cell) -> Point3 {
        Point3::new(
            self.origin[0] + (cell.0 as f32 + 0.5) * self.resolution,
            self.origin[1] + (cell.1 as f32 + 0.5) * self.resolution,
            self.height,
        )
    }

    /// Project `p` onto the walking surface.
    pub fn on_surface(&self, p: &Point3) -> Point3 {
        Point3::new(p.x, p.y, self.height)
    }

    /// Walkable cell containing `p`, or `OutOfBounds`.
    fn walkable_cell(&self, p: &Point3) -> EngineResult<Cell> {
        let cell = self.cell_of(p);
        if p.is_finite() && self.is_walkable(cell) {
            Ok(cell)
        } else {
            Err(EngineError::OutOfBounds(*p))
        }
    }

    /// Cell ranges covering a disc of `radius` around `center`, clipped to the grid.
    fn window_around(
        &self,
        center: &Point3,
        radius: f32,
    ) -> (RangeInclusive<i32>, RangeInclusive<i32>) {
        let reach = (radius / self.resolution).ceil() as i64;
        let (cx, cy) = self.cell_of(center);
        let clip = |c: i32, len: usize| {
            let lo = (c as i64).saturating_sub(reach).max(0);
            let hi = (c as i64).saturating_add(reach).min(len as i64 - 1);
            lo as i32..=hi as i32
        };
        (clip(cx, self.width), clip(cy, self.depth))
    }

    /// Samples along `a -> b`, including both ends.
    fn samples(&self, a: &Point3, b: &Point3) -> impl Iterator<Item = Point3> {
        let (a, b) = (*a, *b);
        let step = self.resolution * SAMPLE_FRACTION;
        let n = ((a.distance_2d(&b) / step).ceil() as usize).max(1);
        (0..=n).map(move |i| a + (b - a) * (i as f32 / n as f32))
    }

    /// Every sample of the segment lies on a walkable cell.
    pub fn line_of_sight(&self, a: &Point3, b: &Point3) -> bool {
        self.samples(a, b).all(|p| self.is_walkable(self.cell_of(&p)))
    }

    /// Octile distance between cells
    fn heuristic(from: Cell, to: Cell) -> f32 {
        let dx = (from.0 - to.0).abs() as f32;
        let dy = (from.1 - to.1).abs() as f32;
        let min = dx.min(dy);
        let max = dx.max(dy);
        min * std::f32::consts::SQRT_2 + (max - min)
    }

    /// A* over walkable cells. Diagonal moves may not clip a blocked corner.
    pub fn search(&self, start: Cell, goal: Cell, max_nodes: usize) -> EngineResult<Vec<Cell>> {
        let mut open_set = BinaryHeap::new();
        let mut closed_set = HashSet::new();
        let mut came_from: HashMap<Cell, Cell> = HashMap::new();
        let mut g_scores: HashMap<Cell, f32> = HashMap::new();

        open_set.push(SearchNode {
            cell: start,
            g_cost: 0.0,
            f_cost: Self::heuristic(start, goal),
        });
        g_scores.insert(start, 0.0);

        let mut nodes_expanded = 0;

        while let Some(current) = open_set.pop() {
            if current.cell == goal {
                trace!("A* reached goal after {} expansions", nodes_expanded);
                return Ok(reconstruct(&came_from, goal));
            }

            if !closed_set.insert(current.cell) {
                continue;
            }

            nodes_expanded += 1;
            if nodes_expanded > max_nodes {
                debug!("A* gave up after {} expansions", nodes_expanded);
                return Err(EngineError::NoPath);
            }

            for (i, (dx, dy)) in NEIGHBORS.iter().enumerate() {
                let neighbor = (current.cell.0 + dx, current.cell.1 + dy);
                if closed_set.contains(&neighbor) || !self.is_walkable(neighbor) {
                    continue;
                }

                let diagonal = i >= 4;
                if diagonal
                    && !(self.is_walkable((current.cell.0 + dx, current.cell.1))
                        && self.is_walkable((current.cell.0, current.cell.1 + dy)))
                {
                    continue;
                }

                let move_cost = if diagonal { std::f32::consts::SQRT_2 } else { 1.0 };
                let tentative_g = current.g_cost + move_cost;

                let known_g = g_scores.get(&neighbor).copied().unwrap_or(f32::INFINITY);
                if tentative_g < known_g {
                    came_from.insert(neighbor, current.cell);
                    g_scores.insert(neighbor, tentative_g);
                    open_set.push(SearchNode {
                        cell: neighbor,
                        g_cost: tentative_g,
                        f_cost: tentative_g + Self::heuristic(neighbor, goal),
                    });
                }
            }
        }

        debug!("A* exhausted after {} expansions", nodes_expanded);
        Err(EngineError::NoPath)
    }

    /// Keep only the waypoints needed to stay in line of sight.
    fn string_pull(&self, points: &[Point3]) -> Vec<Point3> {
        if points.len() <= 2 {
            return points.to_vec();
        }

        let mut out = vec![points[0]];
        let mut anchor = 0;
        while anchor < points.len() - 1 {
            let mut next = anchor + 1;
            for j in (anchor + 2..points.len()).rev() {
                if self.line_of_sight(&points[anchor], &points[j]) {
                    next = j;
                    break;
                }
            }
            out.push(points[next]);
            anchor = next;
        }
        out
    }
}

/// A node in the A* search
#[derive(Clone, Debug)]
struct SearchNode {
    cell: Cell,
    g_cost: f32,
    f_cost: f32,
}

impl Eq for SearchNode {}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.cell == other.cell
    }
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn reconstruct(came_from: &HashMap<Cell, Cell>, goal: Cell) -> Vec<Cell> {
    let mut cells = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        cells.push(prev);
        current = prev;
    }
    cells.reverse();
    cells
}

/// Reference [`NavEngine`] over JSON walkability grids
pub struct GridNavEngine {
    config: GridEngineConfig,
    maps: HashMap<i32, GridMap>,
    rng: SmallRng,
}

impl GridNavEngine {
    pub fn new(config: GridEngineConfig) -> Self {
        let rng = if config.seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(config.seed)
        };
        Self {
            config,
            maps: HashMap::new(),
            rng,
        }
    }

    /// Install an already parsed map.
    pub fn insert_map(&mut self, map_id: i32, map: GridMap) {
        self.maps.insert(map_id, map);
    }

    /// Data file for `map_id`
    pub fn map_path(&self, map_id: i32) -> PathBuf {
        self.config.data_folder.join(format!("{:03}.json", map_id))
    }

    fn map(&self, map_id: i32) -> EngineResult<&GridMap> {
        self.maps
            .get(&map_id)
            .ok_or(EngineError::MapNotLoaded(map_id))
    }
}

impl NavEngine for GridNavEngine {
    fn load_map(&mut self, map_id: i32) -> EngineResult<()> {
        if self.maps.contains_key(&map_id) {
            return Ok(());
        }
        let path = self.map_path(map_id);
        let map = GridMap::load(map_id, &path)?;
        debug!(
            "Loaded map {:03} from {} ({}x{} cells)",
            map_id,
            path.display(),
            map.width(),
            map.depth()
        );
        self.maps.insert(map_id, map);
        Ok(())
    }

    fn find_path(&mut self, map_id: i32, start: Point3, end: Point3) -> EngineResult<Vec<f32>> {
        let map = self.map(map_id)?;
        let start_cell = map.walkable_cell(&start)?;
        let end_cell = map.walkable_cell(&end)?;

        let mut cells = map.search(start_cell, end_cell, self.config.max_search_nodes)?;

        let partial = cells.len() > self.config.max_poly_path;
        if partial {
            debug!(
                "Corridor of {} cells truncated to {}",
                cells.len(),
                self.config.max_poly_path
            );
            cells.truncate(self.config.max_poly_path.max(1));
        }

        let last = match cells.last() {
            Some(&cell) if partial => map.cell_center(cell),
            _ => map.on_surface(&end),
        };

        let mut corridor = Vec::with_capacity(cells.len() + 1);
        corridor.push(map.on_surface(&start));
        corridor.extend(
            cells
                .iter()
                .skip(1)
                .take(cells.len().saturating_sub(2))
                .map(|&c| map.cell_center(c)),
        );
        corridor.push(last);

        let mut points = map.string_pull(&corridor);
        points.truncate(self.config.max_point_path.max(1));
        Ok(points_to_flat(&points))
    }

    fn move_along_surface(
        &mut self,
        map_id: i32,
        start: Point3,
        end: Point3,
    ) -> EngineResult<Point3> {
        let map = self.map(map_id)?;
        map.walkable_cell(&start)?;
        if !end.is_finite() {
            return Err(EngineError::OutOfBounds(end));
        }

        let mut reached = map.on_surface(&start);
        for p in map.samples(&start, &end) {
            if !map.is_walkable(map.cell_of(&p)) {
                break;
            }
            reached = map.on_surface(&p);
        }
        Ok(reached)
    }

    fn cast_ray(&mut self, map_id: i32, start: Point3, end: Point3) -> EngineResult<bool> {
        let map = self.map(map_id)?;
        map.walkable_cell(&start)?;
        Ok(end.is_finite() && map.line_of_sight(&start, &end))
    }

    fn random_point(&mut self, map_id: i32) -> EngineResult<Point3> {
        let map = self
            .maps
            .get(&map_id)
            .ok_or(EngineError::MapNotLoaded(map_id))?;

        let cells: Vec<usize> = (0..map.walkable.len())
            .filter(|&i| map.walkable[i])
            .collect();
        if cells.is_empty() {
            return Err(EngineError::NoPoint);
        }

        let i = cells[self.rng.gen_range(0..cells.len())];
        Ok(map.cell_center(((i % map.width) as i32, (i / map.width) as i32)))
    }

    fn random_point_around(
        &mut self,
        map_id: i32,
        center: Point3,
        radius: f32,
    ) -> EngineResult<Point3> {
        let map = self
            .maps
            .get(&map_id)
            .ok_or(EngineError::MapNotLoaded(map_id))?;
        if !center.is_finite() || !radius.is_finite() {
            return Err(EngineError::OutOfBounds(center));
        }

        let (xs, ys) = map.window_around(&center, radius);
        let mut candidates = Vec::new();
        for y in ys {
            for x in xs.clone() {
                let cell = (x, y);
                if map.is_walkable(cell) && map.cell_center(cell).distance_2d(&center) <= radius {
                    candidates.push(cell);
                }
            }
        }

        if candidates.is_empty() {
            return Err(EngineError::NoPoint);
        }
        let cell = candidates[self.rng.gen_range(0..candidates.len())];
        Ok(map.cell_center(cell))
    }
}
