pub const RESET: &str = "\x1B[0m";
pub const BOLD: &str = "\x1B[1m";
pub const DIM: &str = "\x1B[2m";

pub const YELLOW: &str = "\x1B[33m";
pub const MAGENTA: &str = "\x1B[35m";
pub const CYAN: &str = "\x1b[36m";

pub const HI_GREEN: &str = "\x1B[92m";

/// Truecolour escape for an embed colour, `None` for the "no colour" value 0.
#[must_use]
pub fn from_colour(num: u32) -> Option<String> {
    if num != 0 {
        return Some(format!("\x1B[38;2;{};{};{}m", r(num), g(num), b(num)));
    }

    None
}

#[must_use]
pub const fn r(num: u32) -> u8 {
    ((num >> 16) & 255) as u8
}

#[must_use]
pub const fn g(num: u32) -> u8 {
    ((num >> 8) & 255) as u8
}

#[must_use]
pub const fn b(num: u32) -> u8 {
    (num & 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_channels() {
        assert_eq!((r(0x12_34_56), g(0x12_34_56), b(0x12_34_56)), (0x12, 0x34, 0x56));
    }

    #[test]
    fn zero_colour_has_no_escape() {
        assert!(from_colour(0).is_none());
        assert_eq!(
            from_colour(0xFF_00_80).as_deref(),
            Some("\x1B[38;2;255;0;128m")
        );
    }
}
