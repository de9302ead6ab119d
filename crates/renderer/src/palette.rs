//! The twelve shark colours offered to the viewer.

use crate::types::{ColorParseError, Rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub name: &'static str,
    pub hex: u32,
    pub description: &'static str,
}

impl PaletteEntry {
    pub fn color(&self) -> Rgb {
        Rgb::from_u32(self.hex)
    }
}

pub const SHARK_PALETTE: [PaletteEntry; 12] = [
    PaletteEntry { name: "Classic Blue", hex: 0x4A90E2, description: "Ocean Blue" },
    PaletteEntry { name: "Great White", hex: 0xE8E8E8, description: "Classic White" },
    PaletteEntry { name: "Tiger Shark", hex: 0xD2691E, description: "Sandy Orange" },
    PaletteEntry { name: "Hammerhead", hex: 0x708090, description: "Steel Gray" },
    PaletteEntry { name: "Mako", hex: 0x2F4F4F, description: "Dark Slate" },
    PaletteEntry { name: "Reef Shark", hex: 0x4682B4, description: "Steel Blue" },
    PaletteEntry { name: "Bull Shark", hex: 0x8B4513, description: "Saddle Brown" },
    PaletteEntry { name: "Blacktip", hex: 0x2C2C2C, description: "Charcoal" },
    PaletteEntry { name: "Lemon Shark", hex: 0xFFD700, description: "Golden Yellow" },
    PaletteEntry { name: "Nurse Shark", hex: 0xCD853F, description: "Peru Brown" },
    PaletteEntry { name: "Goblin Shark", hex: 0xFF69B4, description: "Hot Pink" },
    PaletteEntry { name: "Greenland", hex: 0x556B2F, description: "Dark Olive" },
];

/// Top-row keys selecting each palette slot, in palette order.
pub const PALETTE_KEYS: [&str; 12] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "0", "-", "="];

pub fn slot_for_key(key: &str) -> Option<usize> {
    PALETTE_KEYS.iter().position(|candidate| *candidate == key)
}

/// Finds a palette entry by name, ignoring case, spaces, hyphens and underscores.
pub fn lookup(name: &str) -> Option<&'static PaletteEntry> {
    let wanted = normalize(name);
    SHARK_PALETTE
        .iter()
        .find(|entry| normalize(entry.name) == wanted)
}

/// Resolves a user supplied colour: a palette name first, then a hex literal.
pub fn parse_color(value: &str) -> Result<Rgb, ColorParseError> {
    if let Some(entry) = lookup(value) {
        return Ok(entry.color());
    }
    Rgb::from_hex(value)
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '-' | '_'))
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_forgiving_about_spelling() {
        assert_eq!(lookup("tiger-shark").map(|e| e.hex), Some(0xD2691E));
        assert_eq!(lookup("GREAT_WHITE").map(|e| e.hex), Some(0xE8E8E8));
        assert!(lookup("megalodon").is_none());
    }

    #[test]
    fn parse_color_prefers_palette_names() {
        assert_eq!(parse_color("mako").expect("name").to_u32(), 0x2F4F4F);
        assert_eq!(parse_color("#123456").expect("hex").to_u32(), 0x123456);
        assert!(parse_color("not a colour").is_err());
    }

    #[test]
    fn top_row_covers_the_whole_palette() {
        let slots: Vec<_> = PALETTE_KEYS.iter().filter_map(|key| slot_for_key(key)).collect();
        assert_eq!(slots, (0..SHARK_PALETTE.len()).collect::<Vec<_>>());
        assert_eq!(slot_for_key("0"), Some(9));
        assert_eq!(slot_for_key("="), Some(11));
        assert_eq!(slot_for_key("q"), None);
    }
}
