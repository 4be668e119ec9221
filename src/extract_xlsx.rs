//! Workbook extractor (xlsx, xls).
//!
//! Labels every non-blank cell `[<sheet-name>][<column><row>]`, iterating
//! worksheets in workbook order, rows top-to-bottom, and cells left-to-right.
//! Values are the cached/computed ones (`<v>`), never formula text. Legacy
//! `.xls` files are routed here too; a real binary workbook is not a ZIP and
//! fails into the dispatcher's degrade-to-empty path, matching the source
//! tool's behavior of feeding `.xls` to its xlsx parser inside a catch-all.

use async_trait::async_trait;
use quick_xml::events::Event;
use std::io::Read;
use std::path::Path;

use crate::extract::{ExtractError, Extractor, MAX_XML_ENTRY_BYTES};
use crate::models::Fragment;

/// Upper bound on cells read per sheet (unbounded memory protection).
const MAX_CELLS_PER_SHEET: usize = 100_000;

pub struct XlsxExtractor;

#[async_trait]
impl Extractor for XlsxExtractor {
    fn extensions(&self) -> &[&str] {
        &["xlsx", "xls"]
    }

    async fn extract(&self, path: &Path) -> Result<Vec<Fragment>, ExtractError> {
        let bytes = std::fs::read(path)?;
        extract_workbook(&bytes)
    }
}

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn extract_workbook(bytes: &[u8]) -> Result<Vec<Fragment>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Parse(e.to_string()))?;

    let shared_strings = read_shared_strings(&mut archive)?;
    let sheets = read_sheet_list(&mut archive)?;

    let mut fragments = Vec::new();
    for (name, part) in sheets {
        let xml = read_entry(&mut archive, &part)?;
        extract_sheet_cells(&xml, &name, &shared_strings, &mut fragments)?;
    }
    Ok(fragments)
}

fn read_entry(archive: &mut Archive, name: &str) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Parse(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Parse(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Parse(format!(
            "ZIP entry {} exceeds size limit",
            name
        )));
    }
    Ok(out)
}

/// Worksheet (name, archive part) pairs in workbook order, resolved through
/// `xl/workbook.xml` and its relationships file so that display names and
/// ordering match what the workbook author sees.
fn read_sheet_list(archive: &mut Archive) -> Result<Vec<(String, String)>, ExtractError> {
    let workbook_xml = read_entry(archive, "xl/workbook.xml")?;
    let rels = read_relationships(archive)?;

    let mut reader = quick_xml::Reader::from_reader(workbook_xml.as_slice());
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"sheet" =>
            {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes().flatten() {
                    let key = attr.key.local_name();
                    if key.as_ref() == b"name" {
                        name = attr.unescape_value().ok().map(|v| v.into_owned());
                    } else if key.as_ref() == b"id" {
                        rel_id = attr.unescape_value().ok().map(|v| v.into_owned());
                    }
                }
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    if let Some(target) = rels.iter().find(|(id, _)| *id == rel_id) {
                        sheets.push((name, normalize_part(&target.1)));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Parse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// (Id, Target) pairs from `xl/_rels/workbook.xml.rels`.
fn read_relationships(archive: &mut Archive) -> Result<Vec<(String, String)>, ExtractError> {
    let xml = read_entry(archive, "xl/_rels/workbook.xml.rels")?;
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut rels = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = attr.unescape_value().ok().map(|v| v.into_owned()),
                        b"Target" => target = attr.unescape_value().ok().map(|v| v.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    rels.push((id, target));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Parse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Relationship targets are relative to `xl/` unless absolute.
fn normalize_part(target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        stripped.to_string()
    } else {
        format!("xl/{}", target)
    }
}

/// Shared string table; absent when the workbook has no string cells.
/// Rich-text runs inside one `<si>` are concatenated into a single string.
fn read_shared_strings(archive: &mut Archive) -> Result<Vec<String>, ExtractError> {
    let xml = match read_entry(archive, "xl/sharedStrings.xml") {
        Ok(xml) => xml,
        Err(_) => return Ok(Vec::new()),
    };

    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_t => {
                current.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => {
                    in_si = false;
                    strings.push(current.clone());
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Parse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

#[derive(Default)]
struct CellState {
    row: u32,
    col: u32,
    kind: CellKind,
    in_value: bool,
    in_inline_t: bool,
    pending: String,
}

#[derive(Default, PartialEq)]
enum CellKind {
    #[default]
    Raw,
    Shared,
    Inline,
}

fn extract_sheet_cells(
    xml: &[u8],
    sheet_name: &str,
    shared_strings: &[String],
    fragments: &mut Vec<Fragment>,
) -> Result<(), ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut state = CellState::default();
    let mut cell_count = 0usize;

    loop {
        if cell_count >= MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"row" =>
            {
                state.row += 1;
                state.col = 0;
                if let Some(r) = attr_value(&e, b"r").and_then(|v| v.parse::<u32>().ok()) {
                    state.row = r;
                }
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"c" => {
                state.col += 1;
                state.kind = CellKind::Raw;
                state.pending.clear();
                if let Some(r) = attr_value(&e, b"r") {
                    if let Some(col) = parse_column(&r) {
                        state.col = col;
                    }
                }
                match attr_value(&e, b"t").as_deref() {
                    Some("s") => state.kind = CellKind::Shared,
                    Some("inlineStr") => state.kind = CellKind::Inline,
                    _ => {}
                }
            }
            // Self-closing cells carry no value but still advance the
            // running column position.
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"c" => {
                state.col += 1;
                if let Some(r) = attr_value(&e, b"r") {
                    if let Some(col) = parse_column(&r) {
                        state.col = col;
                    }
                }
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"v" => {
                state.in_value = true;
            }
            Ok(Event::Start(e))
                if e.local_name().as_ref() == b"t" && state.kind == CellKind::Inline =>
            {
                state.in_inline_t = true;
            }
            Ok(Event::Text(t)) if state.in_value || state.in_inline_t => {
                state.pending.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" => state.in_value = false,
                b"t" => state.in_inline_t = false,
                b"c" => {
                    let value = resolve_value(&state, shared_strings);
                    if let Some(value) = value {
                        if !value.trim().is_empty() {
                            fragments.push(Fragment::new(
                                format!(
                                    "{}][{}{}",
                                    sheet_name,
                                    column_letters(state.col),
                                    state.row
                                ),
                                value,
                            ));
                            cell_count += 1;
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Parse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn resolve_value(state: &CellState, shared_strings: &[String]) -> Option<String> {
    match state.kind {
        CellKind::Shared => {
            let idx: usize = state.pending.trim().parse().ok()?;
            shared_strings.get(idx).cloned()
        }
        _ => {
            if state.pending.is_empty() {
                None
            } else {
                Some(state.pending.clone())
            }
        }
    }
}

fn attr_value(e: &quick_xml::events::BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Spreadsheet column letters for a 1-based column index:
/// 1 → A, 26 → Z, 27 → AA, 703 → AAA.
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        col -= 1;
        letters.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// 1-based column index from a cell reference like `AB12`. A letter run too
/// long to fit in `u32` (nothing a real workbook produces, but corrupt or
/// hostile files do) yields `None` and the caller keeps its running position.
fn parse_column(cell_ref: &str) -> Option<u32> {
    let letters: String = cell_ref.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if letters.is_empty() {
        return None;
    }
    let mut col = 0u32;
    for c in letters.chars() {
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    Some(col)
}
