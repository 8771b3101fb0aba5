use serde::{Deserialize, Serialize};

use crate::{Coordinate, Direction};

/// Structural failures of the grid: any of these aborts generation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Coordinates ({row}, {column}) are out of bounds for grid size ({rows}, {columns})")]
    OutOfBounds {
        row: i32,
        column: i32,
        rows: usize,
        columns: usize,
    },
    #[error("Cannot get cell {direction} of ({row},{column})")]
    NoSuchNeighbor {
        row: i32,
        column: i32,
        direction: Direction,
    },
    #[error("Grid is not rectangular: expected {expected} cells, found {found}")]
    NotRectangular { expected: usize, found: usize },
    #[error("Grid contains no cells")]
    Empty,
    #[error("No agent cell ('X') found in grid")]
    MissingAgent,
    #[error("More than one agent cell ('X') found, second at ({row},{column})")]
    MultipleAgents { row: i32, column: i32 },
    #[error("Expected agents colors to be different. Agent with color '{name}' already present")]
    DuplicateAgent { name: String },
}

/// A dense 2D grid addressed by 1-based [`Coordinate`]s.
///
/// Stores elements of type `T` in a flat vector using row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    columns: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    pub fn new(rows: usize, columns: usize) -> Self
    where
        T: Default + Clone,
    {
        Grid {
            rows,
            columns,
            cells: vec![T::default(); rows * columns],
        }
    }

    /// Converts a 1-based coordinate to a flat vector index.
    ///
    /// Returns `None` if the coordinate lies outside the grid.
    #[inline]
    pub fn coords_to_index(&self, position: Coordinate) -> Option<usize> {
        let row = usize::try_from(position.row).ok()?.checked_sub(1)?;
        let column = usize::try_from(position.column).ok()?.checked_sub(1)?;
        if row < self.rows && column < self.columns {
            Some(row * self.columns + column)
        } else {
            None
        }
    }

    /// Gets an immutable reference to the element at `position`.
    ///
    /// Returns `None` if the coordinate is out of bounds.
    pub fn get(&self, position: Coordinate) -> Option<&T> {
        let index = self.coords_to_index(position)?;
        self.cells.get(index)
    }

    /// Sets the value at `position`.
    ///
    /// Returns `Err(GridError::OutOfBounds)` if the coordinate is invalid.
    pub fn set(&mut self, position: Coordinate, value: T) -> Result<(), GridError> {
        let index = self
            .coords_to_index(position)
            .ok_or(GridError::OutOfBounds {
                row: position.row,
                column: position.column,
                rows: self.rows,
                columns: self.columns,
            })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Returns an iterator over the elements in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }
}

impl<T> Grid<Option<T>> {
    /// Existence-checked neighbour lookup: the element occupying the cell one
    /// step from `position` in `direction`.
    ///
    /// Fails with [`GridError::NoSuchNeighbor`] if that cell is outside the
    /// grid or was never filled.
    pub fn neighbor(&self, position: Coordinate, direction: Direction) -> Result<&T, GridError> {
        self.get(position.step(direction))
            .and_then(Option::as_ref)
            .ok_or(GridError::NoSuchNeighbor {
                row: position.row,
                column: position.column,
                direction,
            })
    }
}
