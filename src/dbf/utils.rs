//! Text encoding selection for table and memo contents.

use encoding_rs::{
    Encoding, BIG5, EUC_KR, GBK, IBM866, SHIFT_JIS, WINDOWS_1250, WINDOWS_1251, WINDOWS_1252,
    WINDOWS_1253, WINDOWS_1254, WINDOWS_1255, WINDOWS_1256, WINDOWS_1257, WINDOWS_874,
};
use log::warn;

/// Parses a user-supplied encoding label, falling back to Windows-1252.
pub fn parse_encoding(label: &str) -> &'static Encoding {
    Encoding::for_label(label.trim().as_bytes()).unwrap_or_else(|| {
        warn!("Unknown encoding label '{}', using {}", label, WINDOWS_1252.name());
        WINDOWS_1252
    })
}

/// Maps the header's language driver byte to a text encoding.
///
/// Only code pages `encoding_rs` implements are mapped. DOS code pages such
/// as 437 and 850 have no decoder and return `None`, as does an unset driver.
pub fn encoding_for_language_driver(driver: u8) -> Option<&'static Encoding> {
    match driver {
        0x03 | 0x57 | 0x58 | 0x59 => Some(WINDOWS_1252),
        0x26 | 0x65 => Some(IBM866),
        0x13 | 0x7B => Some(SHIFT_JIS),
        0x4D | 0x7A => Some(GBK),
        0x4E | 0x79 => Some(EUC_KR),
        0x4F | 0x78 => Some(BIG5),
        0x50 | 0x7C => Some(WINDOWS_874),
        0x7D => Some(WINDOWS_1255),
        0x7E => Some(WINDOWS_1256),
        0xC8 => Some(WINDOWS_1250),
        0xC9 => Some(WINDOWS_1251),
        0xCA => Some(WINDOWS_1254),
        0xCB => Some(WINDOWS_1253),
        0xCC => Some(WINDOWS_1257),
        _ => None,
    }
}

/// Picks the text encoding for a table.
///
/// Priority (highest → lowest):
/// 1. `user_encoding`, an explicit label from the caller
/// 2. the header's language driver
/// 3. Windows-1252
pub fn resolve_encoding(user_encoding: Option<&str>, language_driver: u8) -> &'static Encoding {
    if let Some(label) = user_encoding {
        return parse_encoding(label);
    }
    encoding_for_language_driver(language_driver).unwrap_or_else(|| {
        if language_driver != 0 {
            warn!(
                "No decoder for language driver {:#04x}, using {}",
                language_driver,
                WINDOWS_1252.name()
            );
        }
        WINDOWS_1252
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    #[test]
    fn user_label_wins() {
        assert_eq!(resolve_encoding(Some("utf-8"), 0xC9), UTF_8);
    }

    #[test]
    fn language_driver_is_used_without_label() {
        assert_eq!(resolve_encoding(None, 0xC9), WINDOWS_1251);
        assert_eq!(resolve_encoding(None, 0x7A), GBK);
    }

    #[test]
    fn falls_back_to_windows_1252() {
        assert_eq!(resolve_encoding(None, 0x00), WINDOWS_1252);
        assert_eq!(resolve_encoding(None, 0x01), WINDOWS_1252);
        assert_eq!(resolve_encoding(Some("no-such-encoding"), 0xC9), WINDOWS_1252);
    }
}
