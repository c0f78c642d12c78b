//! Reading and writing `.reg` files
//!
//! Files are written the way Registry Editor writes them: a
//! `Windows Registry Editor Version 5.00` header, UTF-16LE with a byte-order mark,
//! CRLF line endings and hex lists wrapped at 80 columns. Input may also be UTF-8
//! (with or without BOM) or use the older `REGEDIT4` header.

use crate::tree::{
    KeySection, REG_BINARY, REG_DWORD, REG_EXPAND_SZ, REG_MULTI_SZ, REG_NONE, REG_QWORD, REG_SZ,
    RegTree, RegValue, ValueEntry,
};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const HEADER_V5: &str = "Windows Registry Editor Version 5.00";
pub const HEADER_V4: &str = "REGEDIT4";

const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const LINE_END: &str = "\r\n";
const MAX_LINE: usize = 80;

/// Errors raised while reading or parsing `.reg` files
#[derive(Debug, Error)]
pub enum RegFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is not valid {0} text")]
    Encoding(&'static str),

    #[error("missing registry file header")]
    MissingHeader,

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// On-disk text encoding of a `.reg` file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf16Le,
    Utf8Bom,
    Utf8,
}

/// Decoded file text together with the encoding it was stored in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegText {
    pub text: String,
    pub encoding: TextEncoding,
}

/// Options for [`export`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    pub encoding: TextEncoding,
}

/// Decode file bytes, detecting the encoding from the byte-order mark
pub fn decode(bytes: &[u8]) -> Result<RegText, RegFileError> {
    if let Some(body) = bytes.strip_prefix(&UTF16LE_BOM) {
        if body.len() % 2 != 0 {
            return Err(RegFileError::Encoding("UTF-16"));
        }
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let text = String::from_utf16(&units).map_err(|_| RegFileError::Encoding("UTF-16"))?;
        return Ok(RegText {
            text,
            encoding: TextEncoding::Utf16Le,
        });
    }

    let (body, encoding) = match bytes.strip_prefix(&UTF8_BOM) {
        Some(body) => (body, TextEncoding::Utf8Bom),
        None => (bytes, TextEncoding::Utf8),
    };
    let text = std::str::from_utf8(body)
        .map_err(|_| RegFileError::Encoding("UTF-8"))?
        .to_string();
    Ok(RegText { text, encoding })
}

/// Encode text for disk in the given encoding
pub fn encode(text: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Utf16Le => {
            let mut bytes = UTF16LE_BOM.to_vec();
            bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
            bytes
        }
        TextEncoding::Utf8Bom => {
            let mut bytes = UTF8_BOM.to_vec();
            bytes.extend_from_slice(text.as_bytes());
            bytes
        }
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
    }
}

pub fn read_text(path: &Path) -> Result<RegText, RegFileError> {
    let bytes = fs::read(path)?;
    decode(&bytes)
}

pub fn write_text(path: &Path, text: &RegText) -> Result<(), RegFileError> {
    fs::write(path, encode(&text.text, text.encoding))?;
    Ok(())
}

/// Serialize a tree to `.reg` text
pub fn to_string(tree: &RegTree) -> String {
    let mut out = String::new();
    out.push_str(HEADER_V5);
    out.push_str(LINE_END);
    out.push_str(LINE_END);

    for section in &tree.keys {
        out.push('[');
        if section.delete {
            out.push('-');
        }
        out.push_str(&section.path);
        out.push(']');
        out.push_str(LINE_END);

        for entry in &section.values {
            write_value(&mut out, entry);
        }
        out.push_str(LINE_END);
    }

    out
}

/// Write a tree to a `.reg` file
pub fn export(tree: &RegTree, path: &Path, options: ExportOptions) -> Result<(), RegFileError> {
    debug!(keys = tree.len(), path = %path.display(), "writing registry file");
    let text = RegText {
        text: to_string(tree),
        encoding: options.encoding,
    };
    write_text(path, &text)
}

/// Read and parse a `.reg` file
pub fn import_file(path: &Path) -> Result<RegTree, RegFileError> {
    let text = read_text(path)?;
    let tree = parse(&text.text)?;
    debug!(keys = tree.len(), path = %path.display(), "parsed registry file");
    Ok(tree)
}

fn write_value(out: &mut String, entry: &ValueEntry) {
    let name = if entry.name.is_empty() {
        "@".to_string()
    } else {
        format!("\"{}\"", escape(&entry.name))
    };

    let Some(value) = &entry.value else {
        out.push_str(&format!("{}=-{}", name, LINE_END));
        return;
    };

    match value {
        // quoted strings cannot hold line breaks or NULs
        RegValue::String(s) if s.contains(['\r', '\n', '\0']) => {
            write_hex(out, format!("{}=hex({:x}):", name, REG_SZ), &utf16z(s));
        }
        RegValue::String(s) => {
            out.push_str(&format!("{}=\"{}\"{}", name, escape(s), LINE_END));
        }
        RegValue::Dword(v) => {
            out.push_str(&format!("{}=dword:{:08x}{}", name, v, LINE_END));
        }
        RegValue::Binary(bytes) => write_hex(out, format!("{}=hex:", name), bytes),
        other => {
            let prefix = format!("{}=hex({:x}):", name, other.kind());
            write_hex(out, prefix, &value_bytes(other));
        }
    }
}

/// Append a hex list, continuing with `\` and a two-space indent past 80 columns
fn write_hex(out: &mut String, prefix: String, bytes: &[u8]) {
    let mut line = prefix;
    for (i, byte) in bytes.iter().enumerate() {
        let item = if i + 1 == bytes.len() {
            format!("{:02x}", byte)
        } else {
            format!("{:02x},", byte)
        };
        if line.len() + item.len() > MAX_LINE - 2 {
            out.push_str(&line);
            out.push('\\');
            out.push_str(LINE_END);
            line = "  ".to_string();
        }
        line.push_str(&item);
    }
    out.push_str(&line);
    out.push_str(LINE_END);
}

/// Raw registry bytes for values written in `hex(n)` form
fn value_bytes(value: &RegValue) -> Vec<u8> {
    match value {
        RegValue::None => Vec::new(),
        RegValue::String(s) | RegValue::ExpandString(s) => utf16z(s),
        RegValue::MultiString(list) => {
            let mut bytes: Vec<u8> = list.iter().flat_map(|s| utf16z(s)).collect();
            bytes.extend_from_slice(&[0, 0]);
            bytes
        }
        RegValue::Binary(bytes) => bytes.clone(),
        RegValue::Dword(v) => v.to_le_bytes().to_vec(),
        RegValue::Qword(v) => v.to_le_bytes().to_vec(),
        RegValue::Raw { bytes, .. } => bytes.clone(),
    }
}

/// UTF-16LE bytes with a terminating NUL
fn utf16z(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Parse `.reg` text into a tree
pub fn parse(text: &str) -> Result<RegTree, RegFileError> {
    let mut lines = text.lines().enumerate();
    let mut tree = RegTree::new();

    // header: first non-blank line
    loop {
        match lines.next() {
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) => {
                let header = line.trim();
                if header != HEADER_V5 && header != HEADER_V4 {
                    return Err(RegFileError::MissingHeader);
                }
                break;
            }
            None => return Err(RegFileError::MissingHeader),
        }
    }

    while let Some((index, raw)) = lines.next() {
        let line_no = index + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') {
            let inner = line
                .strip_suffix(']')
                .map(|l| &l[1..])
                .ok_or_else(|| syntax(line_no, "unterminated key header"))?;
            let section = match inner.strip_prefix('-') {
                Some(path) => KeySection::deletion(path),
                None => KeySection::new(inner),
            };
            if section.path.is_empty() {
                return Err(syntax(line_no, "empty key path"));
            }
            tree.push(section);
            continue;
        }

        let (name, data) = split_value_line(line).map_err(|m| syntax(line_no, m))?;

        let mut data = data.to_string();
        if data.starts_with("hex") {
            while data.ends_with('\\') {
                data.pop();
                match lines.next() {
                    Some((_, next)) => data.push_str(next.trim()),
                    None => break,
                }
            }
        }

        let value = parse_data(&data).map_err(|m| syntax(line_no, m))?;
        let section = tree
            .keys
            .last_mut()
            .ok_or_else(|| syntax(line_no, "value outside of a key"))?;
        section.values.push(ValueEntry { name, value });
    }

    Ok(tree)
}

fn syntax(line: usize, message: impl Into<String>) -> RegFileError {
    RegFileError::Syntax {
        line,
        message: message.into(),
    }
}

/// Split `"name"=data` or `@=data` into the value name and the data text
fn split_value_line(line: &str) -> Result<(String, &str), String> {
    if let Some(rest) = line.strip_prefix('@') {
        let data = rest
            .trim_start()
            .strip_prefix('=')
            .ok_or("expected '=' after '@'")?;
        return Ok((String::new(), data.trim_start()));
    }

    if !line.starts_with('"') {
        return Err(format!("unexpected line '{}'", line));
    }
    let (name, rest) = parse_quoted(line)?;
    let data = rest
        .trim_start()
        .strip_prefix('=')
        .ok_or("expected '=' after value name")?;
    Ok((name, data.trim_start()))
}

/// Parse a leading quoted string, returning it unescaped and the remaining text
fn parse_quoted(s: &str) -> Result<(String, &str), String> {
    let body = s.strip_prefix('"').ok_or("expected '\"'")?;
    let mut out = String::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => out.push(escaped),
                None => return Err("dangling escape".to_string()),
            },
            '"' => return Ok((out, &body[i + 1..])),
            other => out.push(other),
        }
    }

    Err("unterminated string".to_string())
}

fn parse_data(data: &str) -> Result<Option<RegValue>, String> {
    if data == "-" {
        return Ok(None);
    }

    if data.starts_with('"') {
        let (s, rest) = parse_quoted(data)?;
        if !rest.trim().is_empty() {
            return Err("unexpected text after string".to_string());
        }
        return Ok(Some(RegValue::String(s)));
    }

    if let Some(hex) = strip_prefix_ignore_case(data, "dword:") {
        let v = u32::from_str_radix(hex.trim(), 16).map_err(|_| format!("bad dword '{}'", hex))?;
        return Ok(Some(RegValue::Dword(v)));
    }

    if let Some(list) = strip_prefix_ignore_case(data, "hex:") {
        return Ok(Some(RegValue::Binary(parse_hex_list(list)?)));
    }

    if let Some(rest) = strip_prefix_ignore_case(data, "hex(") {
        let (kind, list) = rest.split_once("):").ok_or("malformed hex(n) value")?;
        let kind = u32::from_str_radix(kind.trim(), 16)
            .map_err(|_| format!("bad value type '{}'", kind))?;
        let bytes = parse_hex_list(list)?;
        return Ok(Some(value_from_bytes(kind, bytes)));
    }

    Err(format!("unrecognized value data '{}'", data))
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn parse_hex_list(list: &str) -> Result<Vec<u8>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| u8::from_str_radix(item, 16).map_err(|_| format!("bad hex byte '{}'", item)))
        .collect()
}

/// Interpret raw bytes of a `hex(n)` value by registry type
fn value_from_bytes(kind: u32, bytes: Vec<u8>) -> RegValue {
    match kind {
        REG_NONE if bytes.is_empty() => RegValue::None,
        REG_SZ => RegValue::String(from_utf16z(&bytes)),
        REG_EXPAND_SZ => RegValue::ExpandString(from_utf16z(&bytes)),
        REG_BINARY => RegValue::Binary(bytes),
        REG_DWORD if bytes.len() == 4 => {
            RegValue::Dword(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        REG_MULTI_SZ => {
            // every element ends in NUL and one more NUL ends the list
            let text = from_utf16(&bytes);
            let body = text.strip_suffix('\0').unwrap_or(&text);
            RegValue::MultiString(body.split_terminator('\0').map(String::from).collect())
        }
        REG_QWORD if bytes.len() == 8 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes);
            RegValue::Qword(u64::from_le_bytes(raw))
        }
        kind => RegValue::Raw { kind, bytes },
    }
}

fn from_utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Decode a string value, dropping its NUL terminator
fn from_utf16z(bytes: &[u8]) -> String {
    let text = from_utf16(bytes);
    match text.strip_suffix('\0') {
        Some(body) => body.to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r"HKEY_CURRENT_USER\Software\Microsoft\Office\15.0\Outlook\Profiles\Outlook";

    #[test]
    fn test_string_and_dword_lines() {
        let mut tree = RegTree::new();
        tree.push(
            KeySection::new(PROFILE)
                .with_value("", RegValue::String("default".to_string()))
                .with_value("Path", RegValue::String(r#"C:\mail "x".pst"#.to_string()))
                .with_value("Count", RegValue::Dword(0x1f)),
        );

        let text = to_string(&tree);
        assert!(text.starts_with("Windows Registry Editor Version 5.00\r\n\r\n"));
        assert!(text.contains(&format!("[{}]\r\n", PROFILE)));
        assert!(text.contains("@=\"default\"\r\n"));
        assert!(text.contains(r#""Path"="C:\\mail \"x\".pst""#));
        assert!(text.contains("\"Count\"=dword:0000001f\r\n"));
    }

    #[test]
    fn test_long_hex_values_wrap() {
        let mut tree = RegTree::new();
        tree.push(KeySection::new(PROFILE).with_value("Blob", RegValue::Binary(vec![0xab; 100])));

        let text = to_string(&tree);
        let hex_lines: Vec<&str> = text
            .split("\r\n")
            .filter(|l| l.starts_with("\"Blob\"") || l.starts_with("  "))
            .collect();
        assert!(hex_lines.len() > 1);
        assert!(hex_lines.iter().all(|l| l.len() <= MAX_LINE));
        assert!(hex_lines[..hex_lines.len() - 1].iter().all(|l| l.ends_with('\\')));

        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.keys[0].value("Blob"), Some(&RegValue::Binary(vec![0xab; 100])));
    }

    #[test]
    fn test_parse_all_value_kinds() {
        let text = "Windows Registry Editor Version 5.00\r\n\
\r\n\
; comment\r\n\
[HKEY_CURRENT_USER\\Software\\Test]\r\n\
\"s\"=\"a\\\\b\"\r\n\
\"e\"=hex(2):25,00,41,00,25,00,00,00\r\n\
\"m\"=hex(7):61,00,00,00,62,00,00,00,00,00\r\n\
\"q\"=hex(b):01,00,00,00,00,00,00,00\r\n\
\"n\"=hex(0):\r\n\
\"r\"=hex(5):00,00,00,01\r\n\
\"gone\"=-\r\n\
\r\n\
[-HKEY_CURRENT_USER\\Software\\Old]\r\n";

        let tree = parse(text).unwrap();
        assert_eq!(tree.len(), 2);
        let key = &tree.keys[0];
        assert_eq!(key.value("s"), Some(&RegValue::String(r"a\b".to_string())));
        assert_eq!(key.value("e"), Some(&RegValue::ExpandString("%A%".to_string())));
        assert_eq!(
            key.value("m"),
            Some(&RegValue::MultiString(vec!["a".to_string(), "b".to_string()]))
        );
        assert_eq!(key.value("q"), Some(&RegValue::Qword(1)));
        assert_eq!(key.value("n"), Some(&RegValue::None));
        assert_eq!(
            key.value("r"),
            Some(&RegValue::Raw { kind: 5, bytes: vec![0, 0, 0, 1] })
        );
        assert_eq!(key.values[6], ValueEntry::delete("gone"));
        assert!(tree.keys[1].delete);
        assert_eq!(tree.keys[1].path, r"HKEY_CURRENT_USER\Software\Old");
    }

    #[test]
    fn test_string_ending_in_backslash_is_not_continued() {
        let text = "REGEDIT4\n[HKEY_CURRENT_USER\\A]\n\"dir\"=\"C:\\\\\"\n\"next\"=dword:00000001\n";
        let tree = parse(text).unwrap();
        assert_eq!(tree.keys[0].value("dir"), Some(&RegValue::String(r"C:\".to_string())));
        assert_eq!(tree.keys[0].value("next"), Some(&RegValue::Dword(1)));
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(parse("[HKEY_CURRENT_USER\\A]"), Err(RegFileError::MissingHeader)));
        assert!(matches!(parse(""), Err(RegFileError::MissingHeader)));
    }

    #[test]
    fn test_value_before_key_is_an_error() {
        let err = parse("REGEDIT4\n\"a\"=\"b\"\n").unwrap_err();
        assert!(matches!(err, RegFileError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_decode_detects_encoding() {
        let text = "Windows Registry Editor Version 5.00\r\n";
        for encoding in [TextEncoding::Utf16Le, TextEncoding::Utf8Bom, TextEncoding::Utf8] {
            let decoded = decode(&encode(text, encoding)).unwrap();
            assert_eq!(decoded.text, text);
            assert_eq!(decoded.encoding, encoding);
        }
        assert!(decode(&[0xFF, 0xFE, 0x41]).is_err());
    }
}
