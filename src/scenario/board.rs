//! Structured reading of the engine's board dump.
//!
//! The dump prints rank 8 first, one rank per line:
//!
//! ```text
//! 8  r n b q k b n r
//! 7  p p p p p p p p
//! ...
//! 1  R N B Q K B N R
//! ```

use std::fmt;

pub const FILES: [char; 8] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];

/// Marker the engine prints for an empty square.
pub const EMPTY: char = '.';

/// An 8x8 grid of square glyphs, rank 8 first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardGrid {
    ranks: [[char; 8]; 8],
}

impl BoardGrid {
    /// Find the first complete dump (ranks 8 down to 1 on consecutive lines) in `text`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let lines: Vec<&str> = text.lines().collect();
        lines.windows(8).find_map(|window| {
            let mut ranks = [[EMPTY; 8]; 8];
            for (i, line) in window.iter().enumerate() {
                ranks[i] = parse_rank(line, 8 - i as u32)?;
            }
            Some(BoardGrid { ranks })
        })
    }

    /// Glyph on a square such as `('e', 4)`.
    #[must_use]
    pub fn square(&self, file: char, rank: u32) -> Option<char> {
        let col = FILES.iter().position(|&f| f == file)?;
        if !(1..=8).contains(&rank) {
            return None;
        }
        Some(self.ranks[8 - rank as usize][col])
    }

    /// Squares that differ from `other`, as `e4: P != .` lines.
    #[must_use]
    pub fn differences(&self, other: &BoardGrid) -> Vec<String> {
        let mut out = Vec::new();
        for (row, (mine, theirs)) in self.ranks.iter().zip(other.ranks.iter()).enumerate() {
            for (col, (a, b)) in mine.iter().zip(theirs.iter()).enumerate() {
                if a != b {
                    out.push(format!("{}{}: {a} != {b}", FILES[col], 8 - row));
                }
            }
        }
        out
    }
}

fn parse_rank(line: &str, rank: u32) -> Option<[char; 8]> {
    let mut chars = line.trim_start().chars();
    if chars.next()?.to_digit(10)? != rank {
        return None;
    }
    let mut squares = [EMPTY; 8];
    let mut count = 0;
    for token in chars.as_str().split_whitespace() {
        let mut glyph = token.chars();
        let c = glyph.next()?;
        if glyph.next().is_some() || count == 8 {
            return None;
        }
        squares[count] = c;
        count += 1;
    }
    (count == 8).then_some(squares)
}

/// Renders the ranks exactly as the engine dumps them, without the file footer.
impl fmt::Display for BoardGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, squares) in self.ranks.iter().enumerate() {
            if row > 0 {
                writeln!(f)?;
            }
            write!(f, "{}  ", 8 - row)?;
            for (col, c) in squares.iter().enumerate() {
                if col > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "8  r n b q k b n r\n7  p p p p p p p p\n6  . . . . . . . .\n5  . . . . . . . .\n4  . . . . . . . .\n3  . . . . . . . .\n2  P P P P P P P P\n1  R N B Q K B N R";

    #[test]
    fn test_parse_start_position() {
        let grid = BoardGrid::parse(START).unwrap();
        assert_eq!(grid.square('e', 1), Some('K'));
        assert_eq!(grid.square('d', 8), Some('q'));
        assert_eq!(grid.square('e', 4), Some('.'));
        assert_eq!(grid.square('i', 1), None);
        assert_eq!(grid.square('a', 9), None);
    }

    #[test]
    fn test_display_matches_dump() {
        assert_eq!(BoardGrid::parse(START).unwrap().to_string(), START);
    }

    #[test]
    fn test_dump_among_other_output() {
        let output = format!("CHX chess engine\n> \n{START}\n\n   a b c d e f g h\n> ");
        assert!(BoardGrid::parse(&output).is_some());
    }

    #[test]
    fn test_incomplete_dump() {
        let truncated: String = START.lines().take(7).collect::<Vec<_>>().join("\n");
        assert!(BoardGrid::parse(&truncated).is_none());
        assert!(BoardGrid::parse("8  r n b").is_none());
        assert!(BoardGrid::parse("").is_none());
    }

    #[test]
    fn test_differences() {
        let start = BoardGrid::parse(START).unwrap();
        let moved_text = START
            .replace("2  P P P P P", "2  P P P P .")
            .replace("4  . . . . .", "4  . . . . P");
        let moved = BoardGrid::parse(&moved_text).unwrap();
        assert_eq!(start.differences(&moved), ["e4: . != P", "e2: P != ."]);
        assert!(start.differences(&start).is_empty());
    }
}
