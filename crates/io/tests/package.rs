use std::io::{Cursor, Read, Write};

use sheetfill_engine::cell::CellValue;
use sheetfill_engine::workbook::WorkbookModel;
use sheetfill_io::{XlsxDocument, XlsxError};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/xl/workbook.xml" ContentType="application/vnd.ms-excel.sheet.macroEnabled.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/></Types>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Appraisal" sheetId="1" r:id="rId1"/></sheets><calcPr calcId="191029"/></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain" Target="calcChain.xml"/></Relationships>"#;

const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3"><si><t>&lt;site.purchase.price&gt;</t></si><si><t>Total: &lt;total.cost&gt; GBP</t></si><si><t>Label</t></si></sst>"#;

const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" s="3" t="s"><v>0</v></c><c r="B1" s="4"><f>A1*0.2</f><v>0</v></c></row><row r="2"><c r="A2" s="5" t="s"><v>1</v></c><c r="B2" t="s"><v>2</v></c></row><row r="3"><c r="A3" s="6"><f>&lt;rate.code&gt;</f><v>0</v></c></row></sheetData></worksheet>"#;

const STYLES: &str = r#"<styleSheet><numFmts count="1"><numFmt numFmtId="164" formatCode="&quot;£&quot;#,##0"/></numFmts></styleSheet>"#;

const CALC_CHAIN: &str = r#"<calcChain><c r="B1" i="1"/><c r="A3"/></calcChain>"#;

const VBA: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00, 0x42];

fn build_package(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default();
    for (name, data) in parts {
        zip.start_file(*name, opts).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn template() -> Vec<u8> {
    build_package(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("xl/workbook.xml", WORKBOOK.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
        ("xl/sharedStrings.xml", SHARED_STRINGS.as_bytes()),
        ("xl/worksheets/sheet1.xml", SHEET1.as_bytes()),
        ("xl/styles.xml", STYLES.as_bytes()),
        ("xl/calcChain.xml", CALC_CHAIN.as_bytes()),
        ("xl/vbaProject.bin", VBA),
    ])
}

fn read_part(package: &[u8], name: &str) -> Option<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(package)).unwrap();
    let mut file = archive.by_name(name).ok()?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).unwrap();
    Some(data)
}

#[test]
fn loads_cells_styles_and_formulas() {
    let doc = XlsxDocument::from_bytes(&template()).unwrap();
    assert_eq!(doc.sheet_count(), 1);
    assert_eq!(doc.sheet_name(0), Some("Appraisal"));

    let a1 = doc.cell(0, 0, 0).unwrap();
    assert_eq!(a1.value, CellValue::Text("<site.purchase.price>".into()));
    assert_eq!(a1.style_id, Some(3));
    assert_eq!(doc.formula(0, 0, 1), Some("A1*0.2"));
    assert_eq!(doc.formula(0, 2, 0), Some("<rate.code>"));
    assert_eq!(doc.value(0, 1, 0), Some(&CellValue::Text("Total: <total.cost> GBP".into())));
}

#[test]
fn untouched_document_keeps_every_part() {
    let original = template();
    let doc = XlsxDocument::from_bytes(&original).unwrap();
    let saved = doc.to_bytes().unwrap();

    for name in [
        "xl/worksheets/sheet1.xml",
        "xl/workbook.xml",
        "xl/styles.xml",
        "xl/calcChain.xml",
        "xl/vbaProject.bin",
        "[Content_Types].xml",
    ] {
        assert_eq!(read_part(&saved, name), read_part(&original, name), "part {name} changed");
    }
}

#[test]
fn written_cells_round_trip_with_styles() {
    let original = template();
    let mut doc = XlsxDocument::from_bytes(&original).unwrap();
    doc.set_value(0, 0, 0, CellValue::Number(500000.0));
    doc.set_value(0, 1, 0, CellValue::Text("Total: 725000 GBP".into()));

    let saved = doc.to_bytes().unwrap();
    let reloaded = XlsxDocument::from_bytes(&saved).unwrap();

    let a1 = reloaded.cell(0, 0, 0).unwrap();
    assert_eq!(a1.value, CellValue::Number(500000.0));
    assert_eq!(a1.style_id, Some(3));
    let a2 = reloaded.cell(0, 1, 0).unwrap();
    assert_eq!(a2.value, CellValue::Text("Total: 725000 GBP".into()));
    assert_eq!(a2.style_id, Some(5));
    // untouched neighbours
    assert_eq!(reloaded.formula(0, 0, 1), Some("A1*0.2"));
    assert_eq!(reloaded.value(0, 1, 1), Some(&CellValue::Text("Label".into())));

    assert_eq!(read_part(&saved, "xl/styles.xml"), read_part(&original, "xl/styles.xml"));
    assert_eq!(read_part(&saved, "xl/vbaProject.bin").as_deref(), Some(VBA));
    // no formula cell was overwritten, so the calc chain stays
    assert!(read_part(&saved, "xl/calcChain.xml").is_some());

    let workbook = String::from_utf8(read_part(&saved, "xl/workbook.xml").unwrap()).unwrap();
    assert!(workbook.contains(r#"fullCalcOnLoad="1""#), "{workbook}");
}

#[test]
fn replacing_a_formula_drops_the_calc_chain() {
    let mut doc = XlsxDocument::from_bytes(&template()).unwrap();
    doc.set_value(0, 2, 0, CellValue::Number(0.05));
    let saved = doc.to_bytes().unwrap();

    assert!(read_part(&saved, "xl/calcChain.xml").is_none());
    let rels = String::from_utf8(read_part(&saved, "xl/_rels/workbook.xml.rels").unwrap()).unwrap();
    assert!(!rels.contains("calcChain"), "{rels}");
    assert!(rels.contains("styles.xml"));
    let types = String::from_utf8(read_part(&saved, "[Content_Types].xml").unwrap()).unwrap();
    assert!(!types.contains("calcChain"), "{types}");

    let reloaded = XlsxDocument::from_bytes(&saved).unwrap();
    let a3 = reloaded.cell(0, 2, 0).unwrap();
    assert_eq!(a3.formula, None);
    assert_eq!(a3.value, CellValue::Number(0.05));
    assert_eq!(a3.style_id, Some(6));
}

#[test]
fn not_a_zip_is_fatal() {
    let err = XlsxDocument::from_bytes(b"definitely not a workbook").unwrap_err();
    assert!(matches!(err, XlsxError::Zip(_)), "{err}");
}

#[test]
fn missing_workbook_part_is_fatal() {
    let bytes = build_package(&[("[Content_Types].xml", CONTENT_TYPES.as_bytes())]);
    let err = XlsxDocument::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, XlsxError::MissingPart(ref p) if p == "xl/workbook.xml"), "{err}");
}

#[test]
fn malformed_sheet_xml_is_fatal() {
    let bytes = build_package(&[
        ("xl/workbook.xml", WORKBOOK.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
        ("xl/worksheets/sheet1.xml", b"<worksheet><sheetData><row></sheetData></worksheet>"),
    ]);
    let err = XlsxDocument::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, XlsxError::Xml { .. }), "{err}");
}

#[test]
fn cells_without_reference_are_loaded_and_patched() {
    let sheet = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c s="2" t="inlineStr"><is><t>&lt;unknown.code&gt;</t></is></c><c s="3"><v>7</v></c></row><row><c t="inlineStr"><is><t>note</t></is></c></row></sheetData></worksheet>"#;
    let package = build_package(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("xl/workbook.xml", WORKBOOK.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet.as_bytes()),
    ]);

    let mut doc = XlsxDocument::from_bytes(&package).unwrap();
    assert_eq!(doc.value(0, 0, 0), Some(&CellValue::Text("<unknown.code>".into())));
    assert_eq!(doc.value(0, 0, 1), Some(&CellValue::Number(7.0)));
    assert_eq!(doc.value(0, 1, 0), Some(&CellValue::Text("note".into())));

    doc.set_value(0, 0, 0, CellValue::Empty);
    doc.set_value(0, 1, 0, CellValue::Text("done".into()));
    let saved = doc.to_bytes().unwrap();

    let reloaded = XlsxDocument::from_bytes(&saved).unwrap();
    assert!(reloaded.cell(0, 0, 0).unwrap().is_empty());
    assert_eq!(reloaded.cell(0, 0, 0).unwrap().style_id, Some(2));
    assert_eq!(reloaded.value(0, 0, 1), Some(&CellValue::Number(7.0)));
    assert_eq!(reloaded.value(0, 1, 0), Some(&CellValue::Text("done".into())));
}
