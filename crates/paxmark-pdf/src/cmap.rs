//! ToUnicode CMap parser.
//!
//! Handles `beginbfchar`/`endbfchar` and `beginbfrange`/`endbfrange`
//! sections with UTF-16BE destination strings, which is what manifest
//! generators embed for their Type0 fonts.

use std::collections::HashMap;

use crate::error::BackendError;

/// Character code to Unicode string mapping from a `/ToUnicode` stream.
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeMap {
    mappings: HashMap<u32, String>,
}

impl ToUnicodeMap {
    /// Parse a ToUnicode CMap from its decoded stream bytes.
    pub fn parse(data: &[u8]) -> Result<Self, BackendError> {
        let text = String::from_utf8_lossy(data);
        let mut mappings = HashMap::new();

        for section in sections(&text, "beginbfchar", "endbfchar") {
            parse_bfchar_section(section, &mut mappings)?;
        }
        for section in sections(&text, "beginbfrange", "endbfrange") {
            parse_bfrange_section(section, &mut mappings)?;
        }

        Ok(ToUnicodeMap { mappings })
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Bodies between every `begin`/`end` keyword pair.
fn sections<'a>(text: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(start) = text[from..].find(begin) {
        let body_start = from + start + begin.len();
        let Some(len) = text[body_start..].find(end) else {
            break;
        };
        found.push(&text[body_start..body_start + len]);
        from = body_start + len + end.len();
    }
    found
}

fn parse_hex_code(hex: &str) -> Result<u32, BackendError> {
    u32::from_str_radix(hex, 16)
        .map_err(|e| BackendError::Parse(format!("invalid hex code '{hex}': {e}")))
}

/// Decode hex UTF-16BE code units into a string.
fn decode_utf16be_hex(hex: &str) -> Result<String, BackendError> {
    if hex.len() == 2 {
        return decode_utf16be_hex(&format!("00{hex}"));
    }
    if hex.len() % 4 != 0 {
        return Err(BackendError::Parse(format!(
            "UTF-16BE hex string must have length divisible by 4, got '{hex}'"
        )));
    }
    let units = hex
        .as_bytes()
        .chunks(4)
        .map(|chunk| {
            let s = std::str::from_utf8(chunk)
                .map_err(|e| BackendError::Parse(format!("invalid hex: {e}")))?;
            u16::from_str_radix(s, 16)
                .map_err(|e| BackendError::Parse(format!("invalid hex '{s}': {e}")))
        })
        .collect::<Result<Vec<u16>, BackendError>>()?;
    String::from_utf16(&units)
        .map_err(|e| BackendError::Parse(format!("invalid UTF-16BE sequence: {e}")))
}

fn hex_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        let Some(len) = rest[start + 1..].find('>') else {
            break;
        };
        tokens.push(&rest[start + 1..start + 1 + len]);
        rest = &rest[start + 1 + len + 1..];
    }
    tokens
}

fn parse_bfchar_section(
    section: &str,
    mappings: &mut HashMap<u32, String>,
) -> Result<(), BackendError> {
    for line in section.lines() {
        let tokens = hex_tokens(line.trim());
        if tokens.len() >= 2 {
            mappings.insert(parse_hex_code(tokens[0])?, decode_utf16be_hex(tokens[1])?);
        }
    }
    Ok(())
}

fn parse_bfrange_section(
    section: &str,
    mappings: &mut HashMap<u32, String>,
) -> Result<(), BackendError> {
    for line in section.lines() {
        let line = line.trim();
        if let Some(bracket) = line.find('[') {
            // <lo> <hi> [<dst1> <dst2> ...]
            let src = hex_tokens(&line[..bracket]);
            if src.len() < 2 {
                continue;
            }
            let (lo, hi) = (parse_hex_code(src[0])?, parse_hex_code(src[1])?);
            for (i, dst) in hex_tokens(&line[bracket..]).iter().enumerate() {
                let code = lo + i as u32;
                if code > hi {
                    break;
                }
                mappings.insert(code, decode_utf16be_hex(dst)?);
            }
        } else {
            // <lo> <hi> <dstStart>
            let tokens = hex_tokens(line);
            if tokens.len() < 3 {
                continue;
            }
            let lo = parse_hex_code(tokens[0])?;
            let hi = parse_hex_code(tokens[1])?;
            let dst = parse_hex_code(tokens[2])?;
            for offset in 0..=hi.saturating_sub(lo) {
                if let Some(ch) = char::from_u32(dst + offset) {
                    mappings.insert(lo + offset, ch.to_string());
                }
            }
        }
    }
    Ok(())
}
