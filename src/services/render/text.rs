use super::{A4_HEIGHT, A4_WIDTH, FONT_SIZE, PageLayout, PlacedLine, char_width, text_width};
use anyhow::Result;

const MM: f32 = 72.0 / 25.4;

/// Left, right and top page margin
const MARGIN: f32 = 10.0 * MM;
/// Distance from the bottom edge at which a new page is started
const BOTTOM_MARGIN: f32 = 20.0 * MM;
const LINE_HEIGHT: f32 = 8.0 * MM;
/// Horizontal padding inside the full-width text cell
const CELL_PADDING: f32 = 1.0 * MM;

const WRAP_WIDTH: f32 = A4_WIDTH - 2.0 * MARGIN - 2.0 * CELL_PADDING;
const TAB: &str = "    ";

/// Splits one input line into rows that fit `max_width`.
///
/// Breaks at the last space when possible (the space is dropped), otherwise
/// between characters. An empty line still produces one empty row.
pub fn wrap_line(line: &str, max_width: f32) -> Vec<String> {
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;
    let mut last_space: Option<usize> = None;

    for ch in line.chars() {
        let width = char_width(ch, FONT_SIZE);

        while current_width + width > max_width && !current.is_empty() {
            match last_space.take() {
                Some(idx) => {
                    let rest = current[idx + 1..].to_string();
                    current.truncate(idx);
                    rows.push(std::mem::replace(&mut current, rest));
                    current_width = text_width(&current, FONT_SIZE);
                }
                None => {
                    rows.push(std::mem::take(&mut current));
                    current_width = 0.0;
                }
            }
        }

        if ch == ' ' {
            last_space = Some(current.len());
        }
        current.push(ch);
        current_width += width;
    }

    rows.push(current);
    rows
}

/// Lays out plain text on A4 pages, one wrapped paragraph per input line
pub fn layout_text(text: &str) -> Vec<PageLayout> {
    let mut pages = Vec::new();
    let mut page = PageLayout::default();
    let mut top = MARGIN;

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw).replace('\t', TAB);

        for row in wrap_line(&line, WRAP_WIDTH) {
            if top + LINE_HEIGHT > A4_HEIGHT - BOTTOM_MARGIN {
                pages.push(std::mem::take(&mut page));
                top = MARGIN;
            }

            // Baseline sits slightly below the middle of the row
            let baseline = top + 0.5 * LINE_HEIGHT + 0.3 * FONT_SIZE;
            page.lines.push(PlacedLine {
                x: MARGIN + CELL_PADDING,
                y: A4_HEIGHT - baseline,
                text: row,
            });
            top += LINE_HEIGHT;
        }
    }

    pages.push(page);
    pages
}

pub fn render_text(text: &str) -> Result<Vec<u8>> {
    super::write_text_pdf(&layout_text(text), A4_WIDTH, A4_HEIGHT)
}
