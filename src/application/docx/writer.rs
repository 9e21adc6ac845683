use std::io::Cursor;

use docx_rs::{BreakType, Docx, Paragraph, Run, Style, StyleType};

use super::convert::{Block, BlockKind, Segment};

pub const FALLBACK_NOTICE: &str = "HTML could not be fully parsed. Fallback content only.";

// Half-points, Heading1 through Heading6.
const HEADING_SIZES: [usize; 6] = [32, 28, 26, 24, 22, 22];

const LIST_INDENT: &str = "    ";

pub(crate) fn write_blocks(blocks: &[Block], title: &str) -> Result<Vec<u8>, String> {
    let docx = blocks
        .iter()
        .fold(styled_document(title), |docx, block| {
            docx.add_paragraph(paragraph_for(block))
        });
    pack(docx)
}

/// A Heading1 carrying the title, then the fixed notice paragraph.
pub(crate) fn fallback_document(title: &str) -> Result<Vec<u8>, String> {
    let docx = styled_document(title)
        .add_paragraph(
            Paragraph::new()
                .style(&heading_style_id(1))
                .add_run(Run::new().add_text(title)),
        )
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text(FALLBACK_NOTICE)));
    pack(docx)
}

/// Heading styles, with the title stored as the `title` custom property.
fn styled_document(title: &str) -> Docx {
    let docx = Docx::new().custom_property("title", title);
    (1..=6u8).fold(docx, |docx, level| {
        docx.add_style(
            Style::new(heading_style_id(level), StyleType::Paragraph)
                .name(format!("Heading {level}"))
                .size(HEADING_SIZES[usize::from(level - 1)])
                .bold(),
        )
    })
}

fn heading_style_id(level: u8) -> String {
    format!("Heading{}", level.clamp(1, 6))
}

fn paragraph_for(block: &Block) -> Paragraph {
    let mut paragraph = Paragraph::new();
    match &block.kind {
        BlockKind::Heading(level) => {
            paragraph = paragraph.style(&heading_style_id(*level));
        }
        BlockKind::ListItem { depth, marker } => {
            let prefix = format!("{}{marker} ", LIST_INDENT.repeat(*depth));
            paragraph = paragraph.add_run(Run::new().add_text(prefix));
        }
        BlockKind::Paragraph | BlockKind::Preformatted | BlockKind::TableRow => {}
    }

    block
        .segments
        .iter()
        .fold(paragraph, |paragraph, segment| paragraph.add_run(run_for(segment)))
}

fn run_for(segment: &Segment) -> Run {
    match segment {
        Segment::Break => Run::new().add_break(BreakType::TextWrapping),
        Segment::Tab => Run::new().add_tab(),
        Segment::Text { text, style } => {
            let mut run = Run::new();
            for (index, line) in text.split('\n').enumerate() {
                if index > 0 {
                    run = run.add_break(BreakType::TextWrapping);
                }
                if !line.is_empty() {
                    run = run.add_text(line);
                }
            }
            if style.bold {
                run = run.bold();
            }
            if style.italic {
                run = run.italic();
            }
            if style.underline {
                run = run.underline("single");
            }
            run
        }
    }
}

fn pack(docx: Docx) -> Result<Vec<u8>, String> {
    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|err| format!("docx packaging failed: {err}"))?;
    Ok(buffer.into_inner())
}
