//! Reader for the textual grid format exported by Minigrid environments.
//!
//! ```text
//! Dimensions: 3 x 4          (optional)
//! WGWGWGWG                   foreground: two characters per cell
//! WGXR  WG
//! WGWGWGWG
//! --------                   delimiter
//! WGWGWGWG                   background
//! WG   RWG
//! WGWGWGWG
//! --------                   delimiter
//! 2;2;0.5;3;2;1.0            rewards: x;y;value triples
//! ```

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::{Cell, Color, TileKind};

/// Per-coordinate state rewards, keyed by `(x, y)` as written in the input.
pub type RewardTable = BTreeMap<(i32, i32), f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Foreground,
    Background,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Foreground => f.write_str("foreground"),
            Layer::Background => f.write_str("background"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}, column {column}: expected {expected}, got {found:?}")]
    Unexpected {
        line: usize,
        column: usize,
        expected: &'static str,
        found: String,
    },
    #[error("{layer} row on line {line} has {found} cells, expected {expected}")]
    RaggedRow {
        layer: Layer,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("header declares {rows} x {columns} but the foreground is {found_rows} x {found_columns}")]
    DimensionMismatch {
        rows: usize,
        columns: usize,
        found_rows: usize,
        found_columns: usize,
    },
    #[error("input contains no foreground rows")]
    EmptyForeground,
    #[error("reward entry {entry}: expected {expected}, got {found:?}")]
    Reward {
        entry: usize,
        expected: &'static str,
        found: String,
    },
}

/// Everything the parser extracts from one input text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedInput {
    pub foreground: Vec<Cell>,
    pub background: Vec<Cell>,
    pub rewards: RewardTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Foreground,
    Background,
    Rewards,
}

/// Splits `text` into its sections and parses each of them.
///
/// Reading stops at the first empty line once the grid has started.
pub fn parse_input(text: &str) -> Result<ParsedInput, ParseError> {
    let mut header: Option<(usize, usize)> = None;
    let mut foreground: Vec<(usize, &str)> = Vec::new();
    let mut background: Vec<(usize, &str)> = Vec::new();
    let mut rewards = String::new();
    let mut section = Section::Foreground;
    let mut started = false;

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.is_empty() {
            if started {
                break;
            }
            continue;
        }
        if !started && header.is_none() {
            if let Some(rest) = line.strip_prefix("Dimensions:") {
                header = Some(parse_header(rest, line_number)?);
                continue;
            }
        }
        started = true;
        if is_delimiter(line) {
            section = match section {
                Section::Foreground => Section::Background,
                Section::Background | Section::Rewards => Section::Rewards,
            };
            continue;
        }
        match section {
            Section::Foreground => foreground.push((line_number, line)),
            Section::Background => background.push((line_number, line)),
            Section::Rewards => {
                rewards.push_str(line);
                rewards.push('\n');
            }
        }
    }

    if foreground.is_empty() {
        return Err(ParseError::EmptyForeground);
    }
    let foreground_cells = parse_rows(&foreground, Layer::Foreground)?;
    if let Some((rows, columns)) = header {
        let found_columns = foreground_cells.len() / foreground.len();
        if rows != foreground.len() || columns != found_columns {
            return Err(ParseError::DimensionMismatch {
                rows,
                columns,
                found_rows: foreground.len(),
                found_columns,
            });
        }
    }
    let parsed = ParsedInput {
        foreground: foreground_cells,
        background: parse_rows(&background, Layer::Background)?,
        rewards: parse_rewards(&rewards)?,
    };
    debug!(
        foreground = parsed.foreground.len(),
        background = parsed.background.len(),
        rewards = parsed.rewards.len(),
        "parsed input"
    );
    Ok(parsed)
}

/// Parses one layer given as newline separated rows.
pub fn parse_layer(text: &str, layer: Layer) -> Result<Vec<Cell>, ParseError> {
    let rows: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.is_empty())
        .collect();
    parse_rows(&rows, layer)
}

/// Parses reward triples separated by `;` or newlines. A backslash escapes
/// the character that follows it.
pub fn parse_rewards(text: &str) -> Result<RewardTable, ParseError> {
    let tokens = tokenize(text);
    let mut table = RewardTable::new();
    for (entry, triple) in tokens.chunks(3).enumerate() {
        let entry = entry + 1;
        let [x, y, reward] = triple else {
            return Err(ParseError::Reward {
                entry,
                expected: "a complete x;y;reward triple",
                found: triple.join(";"),
            });
        };
        let x = parse_number::<i32>(x, entry, "an integer x coordinate")?;
        let y = parse_number::<i32>(y, entry, "an integer y coordinate")?;
        let reward = parse_number::<f64>(reward, entry, "a numeric reward")?;
        table.insert((x, y), reward);
    }
    Ok(table)
}

fn parse_header(rest: &str, line: usize) -> Result<(usize, usize), ParseError> {
    let unexpected = || ParseError::Unexpected {
        line,
        column: 1,
        expected: "a header of the form 'Dimensions: <rows> x <columns>'",
        found: format!("Dimensions:{rest}"),
    };
    let (rows, columns) = rest.split_once('x').ok_or_else(unexpected)?;
    let rows = rows.trim().parse().map_err(|_| unexpected())?;
    let columns = columns.trim().parse().map_err(|_| unexpected())?;
    Ok((rows, columns))
}

fn is_delimiter(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c == '-')
}

fn parse_rows(rows: &[(usize, &str)], layer: Layer) -> Result<Vec<Cell>, ParseError> {
    let mut cells = Vec::new();
    let mut width: Option<usize> = None;

    for (row_index, (line, text)) in rows.iter().enumerate() {
        let symbols: Vec<char> = text.chars().collect();
        if symbols.len() % 2 != 0 {
            return Err(ParseError::Unexpected {
                line: *line,
                column: symbols.len() + 1,
                expected: "a color character",
                found: String::new(),
            });
        }
        let row_width = symbols.len() / 2;
        match width {
            None => width = Some(row_width),
            Some(expected) if expected != row_width => {
                return Err(ParseError::RaggedRow {
                    layer,
                    line: *line,
                    expected,
                    found: row_width,
                });
            }
            Some(_) => {}
        }

        for (column_index, pair) in symbols.chunks(2).enumerate() {
            let (tile, color) = (pair[0], pair[1]);
            let kind = TileKind::from_symbol(tile).ok_or_else(|| ParseError::Unexpected {
                line: *line,
                column: column_index * 2 + 1,
                expected: "a tile character",
                found: tile.to_string(),
            })?;
            let color = Color::from_symbol(color).ok_or_else(|| ParseError::Unexpected {
                line: *line,
                column: column_index * 2 + 2,
                expected: "a color character",
                found: color.to_string(),
            })?;
            cells.push(Cell::new(
                row_index as i32 + 1,
                column_index as i32 + 1,
                kind,
                color,
            ));
        }
    }
    Ok(cells)
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ';' | '\n' | '\r' => {
                let token = current.trim();
                if !token.is_empty() {
                    tokens.push(token.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    let token = current.trim();
    if !token.is_empty() {
        tokens.push(token.to_string());
    }
    tokens
}

fn parse_number<T: std::str::FromStr>(
    token: &str,
    entry: usize,
    expected: &'static str,
) -> Result<T, ParseError> {
    token.parse().map_err(|_| ParseError::Reward {
        entry,
        expected,
        found: token.to_string(),
    })
}
