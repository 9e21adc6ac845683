use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    rc::Rc,
};

use ammonia::Builder as AmmoniaBuilder;
use lol_html::{
    EndTagHandler, RewriteStrSettings, doc_text, element, html_content::EndTag, rewrite_str,
};

use crate::application::render::RenderError;

/// Character formatting carried by a text segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct InlineStyle {
    pub(crate) bold: bool,
    pub(crate) italic: bool,
    pub(crate) underline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Text { text: String, style: InlineStyle },
    Break,
    Tab,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Heading(u8),
    Paragraph,
    Preformatted,
    ListItem { depth: usize, marker: String },
    TableRow,
}

/// One paragraph-level unit of the converted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    pub(crate) kind: BlockKind,
    pub(crate) segments: Vec<Segment>,
}

impl Block {
    fn normalized(mut self) -> Option<Block> {
        if self.kind != BlockKind::Preformatted {
            if let Some(Segment::Text { text, .. }) = self.segments.first_mut() {
                *text = text.trim_start().to_string();
            }
            if let Some(Segment::Text { text, .. }) = self.segments.last_mut() {
                *text = text.trim_end().to_string();
            }
            self.segments
                .retain(|segment| !matches!(segment, Segment::Text { text, .. } if text.is_empty()));
        }

        let has_text = self.segments.iter().any(
            |segment| matches!(segment, Segment::Text { text, .. } if !text.trim().is_empty()),
        );
        has_text.then_some(self)
    }
}

/// HTML to block converter: sanitises with Ammonia, then walks the cleaned
/// markup with lol_html.
pub(crate) struct HtmlConverter {
    sanitizer: AmmoniaBuilder<'static>,
    max_depth: usize,
}

impl HtmlConverter {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            sanitizer: build_sanitizer(),
            max_depth,
        }
    }

    pub(crate) fn convert(&self, html: &str) -> Result<Vec<Block>, RenderError> {
        // Sanitising deeply nested markup is super-linear, so the raw input is
        // bounded first.
        check_nesting(html, self.max_depth)?;
        // Ammonia re-serialises through html5ever, so every non-void element
        // reaches the walker with an explicit end tag.
        let cleaned = self.sanitizer.clean(html).to_string();
        collect_blocks(&cleaned, self.max_depth)
    }
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();
    builder.clean_content_tags(HashSet::from(["script", "style", "title", "template"]));
    builder
}

/// Streams the raw markup once and stops at the first element nested deeper
/// than `max_depth`.
///
/// Elements whose end tag may be omitted are not counted, since the parser
/// closes them implicitly and they never stack up.
fn check_nesting(html: &str, max_depth: usize) -> Result<(), RenderError> {
    let depth = Rc::new(Cell::new(0usize));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", {
                let depth = Rc::clone(&depth);
                move |el| {
                    if has_optional_end_tag(&el.tag_name()) {
                        return Ok(());
                    }
                    let Some(handlers) = el.end_tag_handlers() else {
                        return Ok(());
                    };

                    let current = depth.get() + 1;
                    if current > max_depth {
                        return Err(nesting_message(max_depth).into());
                    }
                    depth.set(current);

                    let depth = Rc::clone(&depth);
                    let handler: EndTagHandler<'static> =
                        Box::new(move |_end: &mut EndTag<'_>| {
                            depth.set(depth.get().saturating_sub(1));
                            Ok(())
                        });
                    handlers.push(handler);
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map(drop)
    .map_err(|err| RenderError::conversion(err.to_string()))
}

fn has_optional_end_tag(tag: &str) -> bool {
    matches!(
        tag,
        "html"
            | "head"
            | "body"
            | "p"
            | "li"
            | "dt"
            | "dd"
            | "tr"
            | "td"
            | "th"
            | "thead"
            | "tbody"
            | "tfoot"
            | "colgroup"
            | "caption"
            | "option"
            | "optgroup"
            | "rb"
            | "rt"
            | "rp"
    )
}

fn nesting_message(max_depth: usize) -> String {
    format!("markup nesting exceeds {max_depth} levels")
}

fn collect_blocks(html: &str, max_depth: usize) -> Result<Vec<Block>, RenderError> {
    let state = Rc::new(RefCell::new(WalkState::new(max_depth)));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", {
                let state = Rc::clone(&state);
                move |el| {
                    let tag = el.tag_name();
                    let has_end_tag = el.end_tag_handlers().is_some();
                    state.borrow_mut().open(&tag, has_end_tag);

                    if let Some(handlers) = el.end_tag_handlers() {
                        let state = Rc::clone(&state);
                        let handler: EndTagHandler<'static> =
                            Box::new(move |_end: &mut EndTag<'_>| {
                                state.borrow_mut().close(&tag);
                                Ok(())
                            });
                        handlers.push(handler);
                    }
                    Ok(())
                }
            })],
            document_content_handlers: vec![doc_text!({
                let state = Rc::clone(&state);
                move |chunk| {
                    state.borrow_mut().push_text(chunk.as_str());
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::conversion(err.to_string()))?;

    state.borrow_mut().finish()
}

#[derive(Debug, Clone, Copy)]
enum ListContext {
    Bullet,
    Ordered(usize),
}

struct WalkState {
    max_depth: usize,
    depth: usize,
    too_deep: bool,
    blocks: Vec<Block>,
    open_blocks: Vec<BlockKind>,
    current: Option<Block>,
    bold: usize,
    italic: usize,
    underline: usize,
    preformatted: usize,
    lists: Vec<ListContext>,
    rows: Vec<usize>,
    // One entry per open paragraph tag: whether it started its own block.
    paragraphs: Vec<bool>,
}

impl WalkState {
    fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            depth: 0,
            too_deep: false,
            blocks: Vec::new(),
            open_blocks: Vec::new(),
            current: None,
            bold: 0,
            italic: 0,
            underline: 0,
            preformatted: 0,
            lists: Vec::new(),
            rows: Vec::new(),
            paragraphs: Vec::new(),
        }
    }

    fn open(&mut self, tag: &str, has_end_tag: bool) {
        if has_end_tag {
            self.depth += 1;
            if self.depth > self.max_depth {
                self.too_deep = true;
            }
        }

        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<u8>().unwrap_or(1);
                self.begin_block(BlockKind::Heading(level));
            }
            "pre" => {
                self.preformatted += 1;
                self.begin_block(BlockKind::Preformatted);
            }
            "ul" => {
                self.finish_block();
                self.lists.push(ListContext::Bullet);
            }
            "ol" => {
                self.finish_block();
                self.lists.push(ListContext::Ordered(0));
            }
            "li" => {
                let marker = self.next_list_marker();
                let depth = self.lists.len().saturating_sub(1);
                self.begin_block(BlockKind::ListItem { depth, marker });
            }
            "tr" => {
                self.rows.push(0);
                self.begin_block(BlockKind::TableRow);
            }
            "td" | "th" => {
                self.begin_cell();
                if tag == "th" {
                    self.bold += 1;
                }
            }
            "strong" | "b" => self.bold += 1,
            "em" | "i" => self.italic += 1,
            "u" | "ins" => self.underline += 1,
            "br" => self.push_segment(Segment::Break),
            "hr" => self.finish_block(),
            tag if is_paragraph_tag(tag) => self.open_paragraph(),
            _ => {}
        }
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);

        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" => self.end_block(),
            "pre" => {
                self.preformatted = self.preformatted.saturating_sub(1);
                self.end_block();
            }
            "ul" | "ol" => {
                self.finish_block();
                self.lists.pop();
            }
            "tr" => {
                self.rows.pop();
                self.end_block();
            }
            "th" => self.bold = self.bold.saturating_sub(1),
            "strong" | "b" => self.bold = self.bold.saturating_sub(1),
            "em" | "i" => self.italic = self.italic.saturating_sub(1),
            "u" | "ins" => self.underline = self.underline.saturating_sub(1),
            tag if is_paragraph_tag(tag) => {
                if self.paragraphs.pop().unwrap_or(true) {
                    self.end_block();
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }

        let decoded = decode_entities(raw);
        let mut text = if self.preformatted > 0 {
            decoded
        } else {
            collapse_whitespace(&decoded)
        };

        if self.current.is_none() && text.trim().is_empty() {
            return;
        }

        let style = self.style();
        let preformatted = self.preformatted > 0;
        let block = self.current_block();

        if !preformatted && text.starts_with(' ') {
            let follows_space = match block.segments.last() {
                Some(Segment::Text { text: previous, .. }) => previous.ends_with(' '),
                _ => true,
            };
            if follows_space {
                text = text.trim_start().to_string();
            }
        }
        if text.is_empty() {
            return;
        }

        if let Some(Segment::Text {
            text: previous,
            style: previous_style,
        }) = block.segments.last_mut()
            && *previous_style == style
        {
            previous.push_str(&text);
            return;
        }

        block.segments.push(Segment::Text { text, style });
    }

    fn finish(&mut self) -> Result<Vec<Block>, RenderError> {
        if self.too_deep {
            return Err(RenderError::conversion(nesting_message(self.max_depth)));
        }
        self.finish_block();
        Ok(std::mem::take(&mut self.blocks))
    }

    fn style(&self) -> InlineStyle {
        InlineStyle {
            bold: self.bold > 0,
            italic: self.italic > 0,
            underline: self.underline > 0,
        }
    }

    /// A paragraph directly inside a list item continues the item's block,
    /// on a new line when the item already has text.
    fn open_paragraph(&mut self) {
        if matches!(self.open_blocks.last(), Some(BlockKind::ListItem { .. })) {
            let has_text = self.current.as_ref().is_some_and(|block| {
                block.segments.iter().any(
                    |segment| matches!(segment, Segment::Text { text, .. } if !text.trim().is_empty()),
                )
            });
            if has_text {
                self.push_segment(Segment::Break);
            }
            self.paragraphs.push(false);
        } else {
            self.begin_block(BlockKind::Paragraph);
            self.paragraphs.push(true);
        }
    }

    fn begin_block(&mut self, kind: BlockKind) {
        self.finish_block();
        self.open_blocks.push(kind);
    }

    fn end_block(&mut self) {
        self.finish_block();
        self.open_blocks.pop();
    }

    fn finish_block(&mut self) {
        if let Some(block) = self.current.take().and_then(Block::normalized) {
            self.blocks.push(block);
        }
    }

    fn current_block(&mut self) -> &mut Block {
        let kind = self
            .open_blocks
            .last()
            .cloned()
            .unwrap_or(BlockKind::Paragraph);
        self.current.get_or_insert_with(|| Block {
            kind,
            segments: Vec::new(),
        })
    }

    fn push_segment(&mut self, segment: Segment) {
        self.current_block().segments.push(segment);
    }

    fn begin_cell(&mut self) {
        let needs_separator = match self.rows.last_mut() {
            Some(cells) => {
                *cells += 1;
                *cells > 1
            }
            None => false,
        };
        if needs_separator {
            self.push_segment(Segment::Tab);
        }
    }

    fn next_list_marker(&mut self) -> String {
        match self.lists.last_mut() {
            Some(ListContext::Ordered(counter)) => {
                *counter += 1;
                format!("{counter}.")
            }
            Some(ListContext::Bullet) | None => "\u{2022}".to_string(),
        }
    }
}

fn is_paragraph_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "blockquote"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "aside"
            | "nav"
            | "figure"
            | "figcaption"
            | "caption"
            | "dt"
            | "dd"
            | "details"
            | "summary"
    )
}

fn collapse_whitespace(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() && ch != '\u{a0}' {
            if !in_space {
                collapsed.push(' ');
                in_space = true;
            }
        } else {
            collapsed.push(ch);
            in_space = false;
        }
    }
    collapsed
}

/// Undo the escaping html5ever applies when Ammonia serialises text nodes.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
