use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter, Timestamp};

pub struct Colours;

impl Colours {
    pub const BRAND: u32 = 0x7B68EE;
    pub const SUCCESS: u32 = 0x43B581;
    pub const WARNING: u32 = 0xFAA61A;
    pub const ERROR: u32 = 0xF04747;
    pub const MODERATION: u32 = 0xE67E22;
}

/// Base embed in a guild's colour.
#[must_use]
pub fn themed(colour: u32) -> CreateEmbed {
    CreateEmbed::new().colour(colour)
}

#[must_use]
pub fn info(description: impl Into<String>) -> CreateEmbed {
    themed(Colours::BRAND).description(description)
}

#[must_use]
pub fn success(description: impl Into<String>) -> CreateEmbed {
    themed(Colours::SUCCESS).description(description)
}

#[must_use]
pub fn error(description: impl Into<String>) -> CreateEmbed {
    themed(Colours::ERROR).description(description)
}

#[must_use]
pub fn warning(description: impl Into<String>) -> CreateEmbed {
    themed(Colours::WARNING).description(description)
}

/// Mod-log entry: coloured, timestamped, with the acting moderator in the footer.
#[must_use]
pub fn moderation(action: &str, moderator: &str) -> CreateEmbed {
    themed(Colours::MODERATION)
        .title(action)
        .footer(CreateEmbedFooter::new(format!("Moderator: {moderator}")))
        .timestamp(Timestamp::now())
}

/// Parses `#RRGGBB`, `RRGGBB` or `0xRRGGBB`.
#[must_use]
pub fn parse_hex_colour(input: &str) -> Option<u32> {
    let trimmed = input.trim();
    let hex = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    u32::from_str_radix(hex, 16).ok()
}

#[must_use]
pub fn format_hex_colour(colour: u32) -> String {
    format!("#{colour:06X}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_hex_forms() {
        assert_eq!(parse_hex_colour("#ff8800"), Some(0xFF8800));
        assert_eq!(parse_hex_colour("FF8800"), Some(0xFF8800));
        assert_eq!(parse_hex_colour(" 0x00ff00 "), Some(0x00FF00));
    }

    #[test]
    fn rejects_bad_hex() {
        assert_eq!(parse_hex_colour("#fff"), None);
        assert_eq!(parse_hex_colour("#gg0000"), None);
        assert_eq!(parse_hex_colour(""), None);
        assert_eq!(parse_hex_colour("#+f0000"), None);
    }

    #[test]
    fn formats_with_padding() {
        assert_eq!(format_hex_colour(0xFF), "#0000FF");
    }
}
