//! Stone colors and the pass coordinate.
//!
//! Colors are signed so that side-relative quantities (values, feature
//! planes, territory) flip with a single multiplication.

/// Stone color code. `BLACK` and `WHITE` negate into each other; `EDGE`
/// marks the sentinel border group and never participates in play.
pub type Color = i8;

pub const BLACK: Color = 1;
pub const WHITE: Color = -1;
pub const EMPTY: Color = 0;
pub const EDGE: Color = 2;

/// Coordinates that mean "pass".
pub const PASS: (i32, i32) = (-1, -1);

/// The opposing color. `EMPTY` maps to itself.
#[inline]
pub fn opposite(color: Color) -> Color {
    -color
}

/// Human-readable color name for logs and board dumps.
pub fn color_name(color: Color) -> &'static str {
    match color {
        BLACK => "black",
        WHITE => "white",
        EMPTY => "empty",
        _ => "edge",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_flips_sign() {
        assert_eq!(opposite(BLACK), WHITE);
        assert_eq!(opposite(WHITE), BLACK);
        assert_eq!(opposite(EMPTY), EMPTY);
    }
}
