// SPDX-License-Identifier: MIT OR Apache-2.0

//! Board representation and manipulation

use crate::{Color, Coord};
use std::collections::HashSet;

/// Side length of the only supported board
pub const BOARD_SIZE: usize = 19;

/// Represents the Go board with stones and empty positions.
///
/// A board is a derived value: it is rebuilt from the game record whenever it
/// is needed and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    positions: [[Option<Color>; BOARD_SIZE]; BOARD_SIZE],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            positions: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Get the stone at the specified coordinate
    pub fn get(&self, coord: Coord) -> Option<Color> {
        if !coord.is_valid() {
            return None;
        }
        self.positions[coord.row as usize][coord.col as usize]
    }

    /// Place a stone at the specified coordinate.
    ///
    /// Returns false if the coordinate is off the board or occupied.
    pub fn place(&mut self, coord: Coord, color: Color) -> bool {
        if !coord.is_valid() || self.get(coord).is_some() {
            return false;
        }
        self.positions[coord.row as usize][coord.col as usize] = Some(color);
        true
    }

    /// Remove a stone at the specified coordinate
    pub fn remove(&mut self, coord: Coord) -> bool {
        if self.get(coord).is_none() {
            return false;
        }
        self.positions[coord.row as usize][coord.col as usize] = None;
        true
    }

    /// Get adjacent coordinates (up, down, left, right) that lie on the board
    pub fn adjacent_coords(&self, coord: Coord) -> Vec<Coord> {
        let mut result = Vec::with_capacity(4);
        let last = (BOARD_SIZE - 1) as u8;

        if coord.row < last {
            result.push(Coord::new(coord.row + 1, coord.col));
        }
        if coord.row > 0 {
            result.push(Coord::new(coord.row - 1, coord.col));
        }
        if coord.col > 0 {
            result.push(Coord::new(coord.row, coord.col - 1));
        }
        if coord.col < last {
            result.push(Coord::new(coord.row, coord.col + 1));
        }

        result
    }

    /// Find all stones in the group connected to the stone at `coord`.
    ///
    /// Returns an empty vector for an empty point.
    pub fn group(&self, coord: Coord) -> Vec<Coord> {
        let target = match self.get(coord) {
            Some(color) => color,
            None => return Vec::new(),
        };

        let mut group = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![coord];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            group.push(current);

            for neighbor in self.adjacent_coords(current) {
                if self.get(neighbor) == Some(target) && !visited.contains(&neighbor) {
                    stack.push(neighbor);
                }
            }
        }

        group.sort();
        group
    }

    /// Empty points orthogonally adjacent to any stone of the group
    pub fn liberties(&self, group: &[Coord]) -> HashSet<Coord> {
        group
            .iter()
            .flat_map(|&coord| self.adjacent_coords(coord))
            .filter(|&neighbor| self.get(neighbor).is_none())
            .collect()
    }

    /// Remove every stone of the group, returning how many were removed
    pub fn remove_group(&mut self, group: &[Coord]) -> usize {
        group.iter().filter(|&&coord| self.remove(coord)).count()
    }

    /// Iterate over every occupied point
    pub fn stones(&self) -> impl Iterator<Item = (Coord, Color)> + '_ {
        self.positions.iter().enumerate().flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, cell)| {
                cell.map(|color| (Coord::new(row as u8, col as u8), color))
            })
        })
    }

    /// Count stones of specified color on the board
    pub fn count_stones_for(&self, color: Color) -> usize {
        self.stones().filter(|(_, c)| *c == color).count()
    }
}
