use super::{A4_HEIGHT, A4_WIDTH, PageLayout, PlacedLine};
use anyhow::{Context, Result, anyhow};
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::{Cursor, Read};
use zip::ZipArchive;

const LEFT_MARGIN: f32 = 40.0;
const TOP_MARGIN: f32 = 40.0;
const BOTTOM_MARGIN: f32 = 40.0;
const LINE_HEIGHT: f32 = 15.0;

const OLE_SIGNATURE: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

/// Reads the text of every top-level body paragraph of a DOCX file.
///
/// Paragraphs nested in tables or text boxes are skipped, as is all
/// formatting. Tabs and manual line breaks are kept as `\t` and `\n`.
pub fn extract_paragraphs(bytes: &[u8]) -> Result<Vec<String>> {
    if bytes.starts_with(&OLE_SIGNATURE) {
        return Err(anyhow!(
            "Legacy binary .doc files are not supported, save the document as .docx"
        ));
    }

    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).context("File is not a valid DOCX document")?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("DOCX document has no word/document.xml part")?
        .read_to_string(&mut xml)?;

    parse_document_xml(&xml)
}

fn parse_document_xml(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    // Element path from the root, by local name
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<String> = None;
    // Depth of the top-level paragraph currently collected
    let mut paragraph_depth = 0;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"p" if current.is_none() && path.last().is_some_and(|p| p == b"body") => {
                        current = Some(String::new());
                        paragraph_depth = path.len() + 1;
                    }
                    b"t" if is_direct_content(&current, &path, paragraph_depth) => in_text = true,
                    _ => {}
                }
                path.push(name);
            }
            Event::Empty(e) => {
                let in_run = path.last().is_some_and(|p| p == b"r");
                if in_run && is_direct_content(&current, &path, paragraph_depth) {
                    if let Some(text) = current.as_mut() {
                        match e.local_name().as_ref() {
                            b"tab" => text.push('\t'),
                            b"br" | b"cr" => text.push('\n'),
                            _ => {}
                        }
                    }
                } else if e.local_name().as_ref() == b"p"
                    && current.is_none()
                    && path.last().is_some_and(|p| p == b"body")
                {
                    paragraphs.push(String::new());
                }
            }
            Event::End(_) => {
                let closed = path.pop();
                if closed.as_deref() == Some(b"t".as_slice()) {
                    in_text = false;
                }
                if path.len() + 1 == paragraph_depth && closed.as_deref() == Some(b"p".as_slice()) {
                    if let Some(text) = current.take() {
                        paragraphs.push(text);
                    }
                    paragraph_depth = 0;
                }
            }
            Event::Text(e) if in_text => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) if in_text => {
                if let Some(text) = current.as_mut() {
                    if let Some(ch) = e.resolve_char_ref()? {
                        text.push(ch);
                    } else if let Some(resolved) = resolve_xml_entity(&e.decode()?) {
                        text.push_str(resolved);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// True while inside a collected paragraph but outside any nested one
fn is_direct_content(current: &Option<String>, path: &[Vec<u8>], paragraph_depth: usize) -> bool {
    current.is_some()
        && !path[paragraph_depth.min(path.len())..]
            .iter()
            .any(|name| name == b"p" || name == b"txbxContent")
}

/// Places one paragraph per line at a fixed left margin, starting a new
/// page whenever the cursor drops below the bottom margin. Lines are not
/// wrapped.
pub fn layout_paragraphs(paragraphs: &[String], page_height: f32) -> Vec<PageLayout> {
    let mut pages = Vec::new();
    let mut page = PageLayout::default();
    let mut y = page_height - TOP_MARGIN;

    for paragraph in paragraphs {
        page.lines.push(PlacedLine {
            x: LEFT_MARGIN,
            y,
            text: paragraph.replace('\t', "    ").replace('\n', " "),
        });
        y -= LINE_HEIGHT;
        if y < BOTTOM_MARGIN {
            pages.push(std::mem::take(&mut page));
            y = page_height - TOP_MARGIN;
        }
    }

    if !page.lines.is_empty() || pages.is_empty() {
        pages.push(page);
    }
    pages
}

pub fn render_doc(bytes: &[u8]) -> Result<Vec<u8>> {
    let paragraphs = extract_paragraphs(bytes)?;
    super::write_text_pdf(
        &layout_paragraphs(&paragraphs, A4_HEIGHT),
        A4_WIDTH,
        A4_HEIGHT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            inner
        )
    }

    fn docx(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", FileOptions::default())
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_runs_are_joined() {
        let xml = body(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p><w:p><w:r><w:t>B</w:t></w:r></w:p>"#,
        );
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["Hello world", "B"]);
    }

    #[test]
    fn test_entities_tabs_and_breaks() {
        let xml = body(
            r#"<w:p><w:r><w:t>Fish &amp; chips</w:t><w:tab/><w:t>&#163;5</w:t><w:br/><w:t>x</w:t></w:r></w:p>"#,
        );
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["Fish & chips\t£5\nx"]);
    }

    #[test]
    fn test_tab_stops_are_not_text() {
        let xml = body(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>a</w:t></w:r></w:p>"#,
        );
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_empty_paragraphs_are_kept() {
        let xml = body(r#"<w:p/><w:p><w:pPr><w:jc w:val="center"/></w:pPr></w:p><w:p><w:r><w:t>z</w:t></w:r></w:p>"#);
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["", "", "z"]);
    }

    #[test]
    fn test_tables_are_dropped() {
        let xml = body(
            r#"<w:p><w:r><w:t>before</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:r><w:t>after</w:t></w:r></w:p>"#,
        );
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["before", "after"]);
    }

    #[test]
    fn test_text_boxes_are_dropped() {
        let xml = body(
            r#"<w:p><w:r><w:t>main</w:t></w:r><w:r><w:pict><v:shape xmlns:v="urn:schemas-microsoft-com:vml"><v:textbox><w:txbxContent><w:p><w:r><w:t>boxed</w:t></w:r></w:p></w:txbxContent></v:textbox></v:shape></w:pict></w:r></w:p>"#,
        );
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["main"]);
    }

    #[test]
    fn test_two_paragraph_layout() {
        let paragraphs = vec!["A".to_string(), "B".to_string()];
        let pages = layout_paragraphs(&paragraphs, A4_HEIGHT);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines[0].y, A4_HEIGHT - 40.0);
        assert_eq!(pages[0].lines[1].y, A4_HEIGHT - 55.0);
        assert_eq!(pages[0].lines[0].x, 40.0);
        assert_eq!(pages[0].lines[1].text, "B");
    }

    #[test]
    fn test_page_break_resets_cursor() {
        // (841.89 - 40 - 40) / 15 -> 51 lines fit before the cursor crosses the margin
        let paragraphs: Vec<String> = (0..60).map(|i| format!("p{}", i)).collect();
        let pages = layout_paragraphs(&paragraphs, A4_HEIGHT);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines.len(), 51);
        assert_eq!(pages[1].lines.len(), 9);
        assert_eq!(pages[1].lines[0].y, A4_HEIGHT - 40.0);
    }

    #[test]
    fn test_breaks_flattened_for_drawing() {
        let pages = layout_paragraphs(&["a\tb\nc".to_string()], A4_HEIGHT);
        assert_eq!(pages[0].lines[0].text, "a    b c");
    }

    #[test]
    fn test_no_trailing_blank_page() {
        let paragraphs: Vec<String> = (0..51).map(|i| format!("p{}", i)).collect();
        assert_eq!(layout_paragraphs(&paragraphs, A4_HEIGHT).len(), 1);
        assert_eq!(layout_paragraphs(&[], A4_HEIGHT).len(), 1);
    }

    #[test]
    fn test_render_docx() {
        let bytes = docx(&body(
            r#"<w:p><w:r><w:t>A</w:t></w:r></w:p><w:p><w:r><w:t>B</w:t></w:r></w:p>"#,
        ));
        let pdf = render_doc(&bytes).unwrap();
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_legacy_doc_is_rejected() {
        let mut bytes = OLE_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        let err = extract_paragraphs(&bytes).unwrap_err();
        assert!(err.to_string().contains(".doc"));
    }

    #[test]
    fn test_not_a_zip() {
        let err = extract_paragraphs(b"plain text").unwrap_err();
        assert!(err.to_string().contains("not a valid DOCX"));
    }
}
