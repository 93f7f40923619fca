//! Color utility functions shared across the application.
//!
//! Palette entries are stored as `#RRGGBB` strings; rendering works with
//! `[u8; 3]` triples.

/// Parse a `#RRGGBB` (or `#RGB`) hex string into an RGB triple.
///
/// Returns `None` for anything that is not a valid hex colour.
pub fn hex_to_rgb(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.strip_prefix('#')?;
    match digits.len() {
        6 => {
            let value = u32::from_str_radix(digits, 16).ok()?;
            Some([(value >> 16) as u8, (value >> 8) as u8, value as u8])
        }
        3 => {
            let value = u16::from_str_radix(digits, 16).ok()?;
            let expand = |nibble: u16| (nibble as u8 & 0xF) * 0x11;
            Some([expand(value >> 8), expand(value >> 4), expand(value)])
        }
        _ => None,
    }
}

/// Format an RGB triple as an upper-case `#RRGGBB` string.
pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

/// Append a full alpha channel.
pub fn opaque(rgb: [u8; 3]) -> [u8; 4] {
    [rgb[0], rgb[1], rgb[2], 255]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb_long_form() {
        assert_eq!(hex_to_rgb("#F6C3CB"), Some([0xF6, 0xC3, 0xCB]));
        assert_eq!(hex_to_rgb("#000000"), Some([0, 0, 0]));
    }

    #[test]
    fn test_hex_to_rgb_short_form() {
        assert_eq!(hex_to_rgb("#fff"), Some([255, 255, 255]));
        assert_eq!(hex_to_rgb("#f00"), Some([255, 0, 0]));
    }

    #[test]
    fn test_hex_to_rgb_rejects_garbage() {
        assert_eq!(hex_to_rgb("F6C3CB"), None);
        assert_eq!(hex_to_rgb("#GGGGGG"), None);
        assert_eq!(hex_to_rgb("#12345"), None);
    }

    #[test]
    fn test_rgb_to_hex() {
        assert_eq!(rgb_to_hex([0x14, 0x91, 0xFF]), "#1491FF");
    }
}
