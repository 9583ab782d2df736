// XLSX template package: load into the workbook model, write back a patched copy.
//
// Load: cells (values, formulas, style index) are read from the worksheet XML
//       parts. Every other part of the package is kept as raw bytes.
// Save: only worksheets with written cells are re-serialized, and within them
//       only the written <c> elements change. Everything else is copied as is,
//       which keeps styles, macros, drawings and images intact.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesEnd, BytesRef, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use sheetfill_engine::cell::{Cell, CellValue, TextRun};
use sheetfill_engine::cell_id::{col_to_letters, parse_a1};
use sheetfill_engine::sheet::{CellRange, Sheet};
use sheetfill_engine::workbook::{Workbook, WorkbookModel};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::XlsxError;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// One raw entry of the ZIP container.
#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// A worksheet as declared in workbook.xml.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetPart {
    pub name: String,
    pub path: String,
}

/// A loaded XLSX package with its cells exposed as a `Workbook`.
#[derive(Debug, Clone)]
pub struct XlsxDocument {
    workbook: Workbook,
    sheet_parts: Vec<SheetPart>,
    entries: Vec<PackageEntry>,
    /// Cells that carried a formula at load time
    formula_cells: HashSet<(usize, usize, usize)>,
}

impl XlsxDocument {
    /// Parse an XLSX package. Any structural problem is fatal.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, XlsxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let mut data = Vec::new();
            if !file.is_dir() {
                file.read_to_end(&mut data)?;
            }
            entries.push(PackageEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                is_dir: file.is_dir(),
            });
        }

        let find = |name: &str| entries.iter().find(|e| e.name == name).map(|e| e.data.as_slice());

        let workbook_xml = find(WORKBOOK_PART).ok_or_else(|| XlsxError::MissingPart(WORKBOOK_PART.into()))?;
        let rels_xml = find(WORKBOOK_RELS_PART).ok_or_else(|| XlsxError::MissingPart(WORKBOOK_RELS_PART.into()))?;
        let sheet_parts = resolve_sheet_parts(workbook_xml, rels_xml)?;

        let shared_strings = match find(SHARED_STRINGS_PART) {
            Some(xml) => parse_shared_strings(xml)?,
            None => Vec::new(),
        };

        let mut workbook = Workbook::new();
        let mut formula_cells = HashSet::new();
        for (idx, part) in sheet_parts.iter().enumerate() {
            let xml = find(&part.path).ok_or_else(|| XlsxError::MissingPart(part.path.clone()))?;
            let sheet = parse_worksheet(&part.name, &part.path, xml, &shared_strings)?;
            for (&(row, col), cell) in sheet.cells_iter() {
                if cell.formula.is_some() {
                    formula_cells.insert((idx, row, col));
                }
            }
            workbook.add_sheet(sheet);
        }

        log::debug!(
            "loaded xlsx package: {} parts, {} worksheets, {} shared strings",
            entries.len(),
            sheet_parts.len(),
            shared_strings.len()
        );

        Ok(Self { workbook, sheet_parts, entries, formula_cells })
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn sheet_parts(&self) -> &[SheetPart] {
        &self.sheet_parts
    }

    /// Serialize the package, patching only worksheets that were written to.
    pub fn to_bytes(&self) -> Result<Vec<u8>, XlsxError> {
        let mut patches: HashMap<String, Vec<u8>> = HashMap::new();
        let mut formula_removed = false;

        for (idx, sheet) in self.workbook.sheets().iter().enumerate() {
            if !sheet.has_changes() {
                continue;
            }
            let part = &self.sheet_parts[idx];
            let original = self
                .entry(&part.path)
                .ok_or_else(|| XlsxError::MissingPart(part.path.clone()))?;
            patches.insert(part.path.clone(), patch_worksheet_xml(&part.path, original, sheet)?);

            formula_removed |= sheet
                .dirty_cells()
                .any(|&(r, c)| self.formula_cells.contains(&(idx, r, c)));
        }

        if !patches.is_empty() {
            if let Some(xml) = self.entry(WORKBOOK_PART) {
                patches.insert(WORKBOOK_PART.into(), force_full_calc(xml)?);
            }
        }

        // Excel rejects a calc chain that names cells which no longer hold formulas.
        let drop_calc_chain = formula_removed && self.entry(CALC_CHAIN_PART).is_some();
        if drop_calc_chain {
            if let Some(xml) = self.entry(WORKBOOK_RELS_PART) {
                patches.insert(
                    WORKBOOK_RELS_PART.into(),
                    drop_elements(WORKBOOK_RELS_PART, xml, b"Relationship", |e| {
                        attr(e, b"Type").is_some_and(|t| t.ends_with("/calcChain"))
                    })?,
                );
            }
            if let Some(xml) = self.entry(CONTENT_TYPES_PART) {
                patches.insert(
                    CONTENT_TYPES_PART.into(),
                    drop_elements(CONTENT_TYPES_PART, xml, b"Override", |e| {
                        attr(e, b"PartName").is_some_and(|p| p == "/xl/calcChain.xml")
                    })?,
                );
            }
            log::debug!("dropping {CALC_CHAIN_PART}: formula cells were overwritten");
        }

        let mut out = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in &self.entries {
            if drop_calc_chain && entry.name == CALC_CHAIN_PART {
                continue;
            }
            let method = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let opts = SimpleFileOptions::default().compression_method(method);
            if entry.is_dir {
                out.add_directory(entry.name.as_str(), opts)?;
                continue;
            }
            let data = patches.get(&entry.name).unwrap_or(&entry.data);
            out.start_file(entry.name.as_str(), opts)?;
            out.write_all(data)?;
        }

        let cursor = out.finish()?;
        Ok(cursor.into_inner())
    }

    fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.data.as_slice())
    }
}

impl WorkbookModel for XlsxDocument {
    fn sheet_count(&self) -> usize {
        self.workbook.sheet_count()
    }

    fn sheet_name(&self, sheet: usize) -> Option<&str> {
        self.workbook.sheet_name(sheet)
    }

    fn used_range(&self, sheet: usize) -> Option<CellRange> {
        self.workbook.used_range(sheet)
    }

    fn cell(&self, sheet: usize, row: usize, col: usize) -> Option<&Cell> {
        self.workbook.cell(sheet, row, col)
    }

    fn cells(&self, sheet: usize) -> Box<dyn Iterator<Item = ((usize, usize), &Cell)> + '_> {
        self.workbook.cells(sheet)
    }

    fn set_value(&mut self, sheet: usize, row: usize, col: usize, value: CellValue) {
        self.workbook.set_value(sheet, row, col, value)
    }

    fn set_formula(&mut self, sheet: usize, row: usize, col: usize, formula: String) {
        self.workbook.set_formula(sheet, row, col, formula)
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

fn xml_err(part: &str, e: impl std::fmt::Display) -> XlsxError {
    XlsxError::Xml { part: part.to_string(), message: e.to_string() }
}

/// Attribute value by key, entity references resolved.
fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Text of a `&...;` reference in element content: character references and
/// the five predefined entities. Anything else resolves to nothing.
fn resolve_ref(r: &BytesRef) -> Option<String> {
    if let Ok(Some(ch)) = r.resolve_char_ref() {
        return Some(ch.to_string());
    }
    let name = r.decode().ok()?;
    resolve_predefined_entity(&name).map(str::to_string)
}

/// Position of `<c>` elements within `<sheetData>`.
///
/// `r` is optional on both `<row>` and `<c>`: a row without it follows the
/// previous row, a cell without it follows the previous cell of its row.
#[derive(Debug, Default)]
struct CellCursor {
    row: Option<usize>,
    next_col: usize,
}

impl CellCursor {
    fn enter_row(&mut self, e: &BytesStart) {
        let explicit = attr(e, b"r").and_then(|r| r.trim().parse::<usize>().ok()).filter(|&r| r > 0);
        self.row = Some(match explicit {
            Some(r) => r - 1,
            None => self.row.map_or(0, |r| r + 1),
        });
        self.next_col = 0;
    }

    /// 0-based (row, col) of a `<c>` element, advancing the cursor.
    fn place(&mut self, e: &BytesStart) -> (usize, usize) {
        let at = match attr(e, b"r").as_deref().and_then(parse_a1) {
            Some(at) => at,
            None => (self.row.unwrap_or(0), self.next_col),
        };
        self.next_col = at.1 + 1;
        at
    }
}

/// Resolve worksheet names and part paths from workbook.xml + workbook.xml.rels.
pub fn resolve_sheet_parts(workbook_xml: &[u8], rels_xml: &[u8]) -> Result<Vec<SheetPart>, XlsxError> {
    // Step 1: sheet names and rIds in tab order
    let mut declared: Vec<(String, String)> = Vec::new();
    let mut reader = Reader::from_reader(workbook_xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| xml_err(WORKBOOK_PART, e))? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(e, b"name").unwrap_or_default();
                if let Some(rid) = attr(e, b"r:id") {
                    declared.push((name, rid));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // Step 2: rId → target
    let mut rid_to_target: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_reader(rels_xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| xml_err(WORKBOOK_RELS_PART, e))? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                    rid_to_target.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // Step 3: keep worksheets only (chartsheets have no cells)
    let mut parts = Vec::new();
    for (name, rid) in declared {
        let Some(target) = rid_to_target.get(&rid) else {
            log::warn!("sheet '{name}' references unknown relationship {rid}");
            continue;
        };
        if !target.contains("worksheet") {
            continue;
        }
        let path = match target.strip_prefix('/') {
            Some(abs) => abs.to_string(),
            None => format!("xl/{}", target),
        };
        parts.push(SheetPart { name, path });
    }

    Ok(parts)
}

/// Parse xl/sharedStrings.xml. Plain `<si><t>` entries become `Text`,
/// entries made of `<r>` runs become `RichText`. Phonetic runs are skipped.
pub fn parse_shared_strings(xml: &[u8]) -> Result<Vec<CellValue>, XlsxError> {
    let mut strings = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut collector = StringCollector::default();
    let mut in_si = false;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| xml_err(SHARED_STRINGS_PART, e))?;
        match event {
            Event::Start(ref e) if e.local_name().as_ref() == b"si" => {
                in_si = true;
                collector = StringCollector::default();
            }
            Event::End(ref e) if e.local_name().as_ref() == b"si" => {
                strings.push(std::mem::take(&mut collector).finish());
                in_si = false;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => {
                strings.push(CellValue::Text(String::new()));
            }
            Event::Eof => break,
            ref other if in_si => collector.feed(other),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Gathers text from `<t>` / `<r><t>` content of an `<si>` or `<is>` element.
#[derive(Default)]
struct StringCollector {
    plain: String,
    runs: Vec<TextRun>,
    in_t: bool,
    in_run: bool,
    in_phonetic: bool,
    saw_run: bool,
}

impl StringCollector {
    fn feed(&mut self, event: &Event) {
        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" if !self.in_phonetic => self.in_t = true,
                b"r" => {
                    self.in_run = true;
                    self.saw_run = true;
                    self.runs.push(TextRun::default());
                }
                b"rPh" => self.in_phonetic = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => self.in_t = false,
                b"r" => self.in_run = false,
                b"rPh" => self.in_phonetic = false,
                _ => {}
            },
            Event::Text(t) if self.in_t => self.push(&String::from_utf8_lossy(t.as_ref())),
            Event::CData(t) if self.in_t => self.push(&String::from_utf8_lossy(t.as_ref())),
            Event::GeneralRef(r) if self.in_t => {
                if let Some(text) = resolve_ref(r) {
                    self.push(&text);
                }
            }
            _ => {}
        }
    }

    fn push(&mut self, text: &str) {
        match self.runs.last_mut() {
            Some(run) if self.in_run => run.text.push_str(text),
            _ => self.plain.push_str(text),
        }
    }

    fn finish(self) -> CellValue {
        if self.saw_run {
            let mut runs = self.runs;
            if !self.plain.is_empty() {
                runs.insert(0, TextRun::new(self.plain));
            }
            CellValue::RichText(runs)
        } else {
            CellValue::Text(self.plain)
        }
    }
}

/// Raw state of one `<c>` element while it is being read.
#[derive(Default)]
struct RawCell {
    at: (usize, usize),
    style: Option<u32>,
    cell_type: Option<String>,
    value_text: String,
    formula_text: String,
    in_value: bool,
    in_formula: bool,
    in_inline: bool,
    inline: StringCollector,
}

impl RawCell {
    fn open(e: &BytesStart, at: (usize, usize)) -> Self {
        Self {
            at,
            style: attr(e, b"s").and_then(|s| s.parse().ok()),
            cell_type: attr(e, b"t"),
            ..Self::default()
        }
    }

    fn into_cell(self, shared_strings: &[CellValue]) -> Cell {
        let value = match self.cell_type.as_deref() {
            Some("s") => self
                .value_text
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| shared_strings.get(idx).cloned())
                .unwrap_or_default(),
            Some("inlineStr") => self.inline.finish(),
            Some("b") => CellValue::Bool(self.value_text.trim() == "1"),
            Some("e") => CellValue::Error(self.value_text),
            Some("str") | Some("d") => {
                if self.value_text.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(self.value_text)
                }
            }
            _ => match self.value_text.trim() {
                "" => CellValue::Empty,
                // Unparseable numerics are kept as text rather than dropped
                raw => raw.parse::<f64>().map(CellValue::Number).unwrap_or_else(|_| CellValue::Text(raw.to_string())),
            },
        };
        let formula = if self.formula_text.is_empty() { None } else { Some(self.formula_text) };
        Cell { value, formula, style_id: self.style }
    }
}

/// Read the `<c>` cells of a worksheet part into a `Sheet`.
fn parse_worksheet(name: &str, part: &str, xml: &[u8], shared_strings: &[CellValue]) -> Result<Sheet, XlsxError> {
    let mut sheet = Sheet::new(name);
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut current: Option<RawCell> = None;
    let mut cursor = CellCursor::default();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| xml_err(part, e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                cursor.enter_row(e);
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"c" => {
                current = Some(RawCell::open(e, cursor.place(e)));
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                let raw = RawCell::open(e, cursor.place(e));
                load_raw_cell(&mut sheet, raw, shared_strings);
            }
            Event::End(ref e) if e.local_name().as_ref() == b"c" => {
                if let Some(raw) = current.take() {
                    load_raw_cell(&mut sheet, raw, shared_strings);
                }
            }
            Event::Eof => break,
            ref other => {
                if let Some(raw) = current.as_mut() {
                    feed_cell(raw, other);
                }
            }
        }
        buf.clear();
    }

    Ok(sheet)
}

fn feed_cell(raw: &mut RawCell, event: &Event) {
    if raw.in_inline {
        if matches!(event, Event::End(e) if e.local_name().as_ref() == b"is") {
            raw.in_inline = false;
        } else {
            raw.inline.feed(event);
        }
        return;
    }
    match event {
        Event::Start(e) => match e.local_name().as_ref() {
            b"v" => raw.in_value = true,
            b"f" => raw.in_formula = true,
            b"is" => raw.in_inline = true,
            _ => {}
        },
        Event::End(e) => match e.local_name().as_ref() {
            b"v" => raw.in_value = false,
            b"f" => raw.in_formula = false,
            _ => {}
        },
        Event::Text(t) => {
            let text = String::from_utf8_lossy(t.as_ref());
            if raw.in_value {
                raw.value_text.push_str(&text);
            } else if raw.in_formula {
                raw.formula_text.push_str(&text);
            }
        }
        Event::GeneralRef(r) => {
            if let Some(text) = resolve_ref(r) {
                if raw.in_value {
                    raw.value_text.push_str(&text);
                } else if raw.in_formula {
                    raw.formula_text.push_str(&text);
                }
            }
        }
        _ => {}
    }
}

fn load_raw_cell(sheet: &mut Sheet, raw: RawCell, shared_strings: &[CellValue]) {
    let (row, col) = raw.at;
    sheet.load_cell(row, col, raw.into_cell(shared_strings));
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

/// Re-emit the worksheet XML, replacing only the `<c>` elements of dirty cells.
fn patch_worksheet_xml(part: &str, original: &[u8], sheet: &Sheet) -> Result<Vec<u8>, XlsxError> {
    let dirty: HashSet<(usize, usize)> = sheet.dirty_cells().copied().collect();
    let mut written: HashSet<(usize, usize)> = HashSet::new();
    let mut cursor = CellCursor::default();

    let mut reader = Reader::from_reader(original);
    let mut writer = Writer::new(Vec::with_capacity(original.len()));
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| xml_err(part, e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                cursor.enter_row(e);
                writer.write_event(event.borrow()).map_err(|e| xml_err(part, e))?;
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"c" => {
                let at = cursor.place(e);
                if !dirty.contains(&at) {
                    writer.write_event(Event::Start(e.borrow())).map_err(|e| xml_err(part, e))?;
                } else {
                    let original_tag = e.to_owned();
                    let formula_attrs = skip_cell_body(&mut reader, part)?;
                    write_cell(&mut writer, &original_tag, sheet, at, formula_attrs)
                        .map_err(|e| xml_err(part, e))?;
                    written.insert(at);
                }
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                let at = cursor.place(e);
                if !dirty.contains(&at) {
                    writer.write_event(Event::Empty(e.borrow())).map_err(|e| xml_err(part, e))?;
                } else {
                    write_cell(&mut writer, e, sheet, at, None).map_err(|e| xml_err(part, e))?;
                    written.insert(at);
                }
            }
            Event::Eof => break,
            other => writer.write_event(other).map_err(|e| xml_err(part, e))?,
        }
        buf.clear();
    }

    for &(row, col) in dirty.difference(&written) {
        log::warn!(
            "cell {}{} in '{}' was written but has no element in {part}; change dropped",
            col_to_letters(col),
            row + 1,
            sheet.name
        );
    }

    Ok(writer.into_inner())
}

/// Consume events up to the closing `</c>`. Returns the original `<f>` attributes,
/// if any, so shared and array formula masters keep their group metadata.
fn skip_cell_body(reader: &mut Reader<&[u8]>, part: &str) -> Result<Option<Vec<(String, String)>>, XlsxError> {
    let mut buf = Vec::new();
    let mut formula_attrs = None;
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| xml_err(part, e))? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"f" => {
                formula_attrs = Some(
                    e.attributes()
                        .flatten()
                        .filter_map(|a| {
                            let value = a.unescape_value().ok()?.into_owned();
                            Some((String::from_utf8_lossy(a.key.as_ref()).into_owned(), value))
                        })
                        .collect(),
                );
            }
            Event::End(ref e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => return Err(xml_err(part, "unexpected end of document inside <c>")),
            _ => {}
        }
        buf.clear();
    }
    Ok(formula_attrs)
}

fn child_tag(cell_tag: &BytesStart, local: &str) -> String {
    let name = String::from_utf8_lossy(cell_tag.name().as_ref()).into_owned();
    match name.split_once(':') {
        Some((prefix, _)) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

/// Write the new `<c>` element for a dirty cell, keeping `r` and `s`.
fn write_cell(
    writer: &mut Writer<Vec<u8>>,
    original: &BytesStart,
    sheet: &Sheet,
    at: (usize, usize),
    formula_attrs: Option<Vec<(String, String)>>,
) -> std::io::Result<()> {
    let cell_name = String::from_utf8_lossy(original.name().as_ref()).into_owned();
    let mut start = BytesStart::new(cell_name.as_str());
    for a in original.attributes().flatten() {
        if matches!(a.key.as_ref(), b"r" | b"s") {
            start.push_attribute(a);
        }
    }

    let Some(cell) = sheet.cell(at.0, at.1) else {
        return writer.write_event(Event::Empty(start));
    };

    if let Some(formula) = &cell.formula {
        writer.write_event(Event::Start(start))?;
        let f_name = child_tag(original, "f");
        let mut f = BytesStart::new(f_name.as_str());
        for (k, v) in formula_attrs.iter().flatten() {
            f.push_attribute((k.as_str(), v.as_str()));
        }
        writer.write_event(Event::Start(f))?;
        writer.write_event(Event::Text(BytesText::new(formula)))?;
        writer.write_event(Event::End(BytesEnd::new(f_name.as_str())))?;
        return writer.write_event(Event::End(BytesEnd::new(cell_name.as_str())));
    }

    if formula_attrs.as_ref().is_some_and(|attrs| attrs.iter().any(|(k, _)| k == "si")) {
        log::warn!(
            "shared formula master {}{} in '{}' replaced by a value",
            col_to_letters(at.1),
            at.0 + 1,
            sheet.name
        );
    }

    let (cell_type, v_text) = match &cell.value {
        CellValue::Empty => return writer.write_event(Event::Empty(start)),
        CellValue::Number(n) => (None, Some(format!("{}", n))),
        CellValue::Bool(b) => (Some("b"), Some(if *b { "1".to_string() } else { "0".to_string() })),
        CellValue::Error(e) => (Some("e"), Some(e.clone())),
        CellValue::Text(_) | CellValue::RichText(_) | CellValue::Hyperlink { .. } => (Some("inlineStr"), None),
    };
    if let Some(t) = cell_type {
        start.push_attribute(("t", t));
    }
    writer.write_event(Event::Start(start))?;

    match v_text {
        Some(text) => {
            let v_name = child_tag(original, "v");
            writer.write_event(Event::Start(BytesStart::new(v_name.as_str())))?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new(v_name.as_str())))?;
        }
        None => {
            let text = cell.value.as_text().unwrap_or_default();
            let is_name = child_tag(original, "is");
            let t_name = child_tag(original, "t");
            writer.write_event(Event::Start(BytesStart::new(is_name.as_str())))?;
            let mut t = BytesStart::new(t_name.as_str());
            if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
                t.push_attribute(("xml:space", "preserve"));
            }
            writer.write_event(Event::Start(t))?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new(t_name.as_str())))?;
            writer.write_event(Event::End(BytesEnd::new(is_name.as_str())))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new(cell_name.as_str())))
}

/// Set `fullCalcOnLoad="1"` on an existing `<calcPr>` so dependents refresh on open.
fn force_full_calc(xml: &[u8]) -> Result<Vec<u8>, XlsxError> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 32));
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| xml_err(WORKBOOK_PART, e))?;
        match event {
            Event::Empty(ref e) if e.local_name().as_ref() == b"calcPr" => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let mut calc = BytesStart::new(name.as_str());
                for a in e.attributes().flatten() {
                    if a.key.as_ref() != b"fullCalcOnLoad" {
                        calc.push_attribute(a);
                    }
                }
                calc.push_attribute(("fullCalcOnLoad", "1"));
                writer.write_event(Event::Empty(calc)).map_err(|e| xml_err(WORKBOOK_PART, e))?;
            }
            Event::Eof => break,
            other => writer.write_event(other).map_err(|e| xml_err(WORKBOOK_PART, e))?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

/// Copy an XML part, dropping empty elements named `local` that match `pred`.
fn drop_elements(
    part: &str,
    xml: &[u8],
    local: &[u8],
    pred: impl Fn(&BytesStart) -> bool,
) -> Result<Vec<u8>, XlsxError> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| xml_err(part, e))?;
        match event {
            Event::Empty(ref e) if e.local_name().as_ref() == local && pred(e) => {}
            Event::Eof => break,
            other => writer.write_event(other).map_err(|e| xml_err(part, e))?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}
