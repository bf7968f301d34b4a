//! Proposal extraction pipeline
//!
//! Parses a Markdown-structured strategy proposal into normalized
//! [`ContentBlock`]s. Recognized structure:
//!
//! - a heading containing "menu" opens the menu section; it closes at the
//!   next heading of the same or shallower level
//! - headings one level below the menu heading are categories, unless they
//!   carry a price line themselves (flat menus), in which case they are items
//! - deeper headings inside the menu section are items
//! - `Price: $12.50` lines (or a bare `$12.50` paragraph) set the item price
//! - image references attach to the enclosing item; unattached ones are
//!   retained as stray anchors
//! - everything outside the menu section becomes free-text blocks
//!
//! Extraction is deterministic given identical bytes. Partial records are
//! retained with best-effort fields rather than dropped.

use crate::error::ExtractError;
use menuforge_model::{
    AnchorId, ContentBlock, ImageAsset, ItemRecord, Price, SourceDocument,
};
use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Parser as MdParser, Tag, TagEnd};
use regex::Regex;

static PRICE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^price:?\s+(\S.*)$").expect("static regex"));

/// Everything the pipeline recovered from one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Normalized blocks, in document order
    pub blocks: Vec<ContentBlock>,
    /// Image assets referenced by the document
    pub assets: Vec<ImageAsset>,
}

impl Extraction {
    /// Item records among the blocks, in order
    pub fn items(&self) -> impl Iterator<Item = &ItemRecord> {
        self.blocks.iter().filter_map(|b| match b {
            ContentBlock::Item(record) => Some(record),
            _ => None,
        })
    }
}

/// Deterministic proposal extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor;

impl Extractor {
    /// Create a new extractor
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extract normalized content from a source document
    ///
    /// # Errors
    /// - [`ExtractError::InvalidEncoding`] if the bytes are not UTF-8
    /// - [`ExtractError::EmptyDocument`] if there is no content
    /// - [`ExtractError::NoMenuSection`] if no menu marker exists
    /// - [`ExtractError::NoItems`] if the menu section holds no items
    pub fn extract(&self, document: &SourceDocument) -> Result<Extraction, ExtractError> {
        let text = document.text()?;
        if text.trim().is_empty() {
            return Err(ExtractError::EmptyDocument);
        }

        let sections = scan_sections(text);
        let extraction = interpret_sections(&sections)?;
        tracing::debug!(
            document = %document.hash().short(),
            blocks = extraction.blocks.len(),
            assets = extraction.assets.len(),
            "extraction complete"
        );
        Ok(extraction)
    }
}

/// Flat section scanned from the event stream
#[derive(Debug, Default)]
struct Section {
    level: u8,
    title: String,
    paras: Vec<String>,
    /// (destination, alt text) pairs, in order of appearance
    images: Vec<(String, String)>,
}

fn flush_para(sections: &mut [Section], para: &mut String) {
    let trimmed = para.trim();
    if !trimmed.is_empty() {
        if let Some(last) = sections.last_mut() {
            last.paras.push(trimmed.to_string());
        }
    }
    para.clear();
}

fn scan_sections(text: &str) -> Vec<Section> {
    // Index 0 is the preamble before any heading (level 0, untitled).
    let mut sections = vec![Section::default()];
    let mut para = String::new();
    let mut in_heading = false;
    let mut image: Option<(String, String)> = None;

    for event in MdParser::new(text) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                flush_para(&mut sections, &mut para);
                sections.push(Section {
                    level: level as u8,
                    ..Section::default()
                });
                in_heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                in_heading = false;
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                image = Some((dest_url.to_string(), String::new()));
            }
            Event::End(TagEnd::Image) => {
                if let Some((dest, alt)) = image.take() {
                    if let Some(last) = sections.last_mut() {
                        last.images.push((dest, alt.trim().to_string()));
                    }
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if in_heading {
                    if let Some(last) = sections.last_mut() {
                        last.title.push_str(&text);
                    }
                } else if let Some((_, alt)) = image.as_mut() {
                    alt.push_str(&text);
                } else {
                    para.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if image.is_none() && !in_heading {
                    para.push('\n');
                }
            }
            Event::End(TagEnd::Paragraph) | Event::End(TagEnd::Item) => {
                flush_para(&mut sections, &mut para);
            }
            _ => {}
        }
    }
    flush_para(&mut sections, &mut para);
    sections
}

fn is_menu_heading(title: &str) -> bool {
    title.trim().to_lowercase().contains("menu")
}

/// Split a section's paragraphs into (description paragraphs, price)
///
/// The first parseable price line is consumed as the price; unparseable
/// price lines and everything else stay in the description so nothing is
/// silently lost.
fn split_price(paras: &[String]) -> (Vec<String>, Option<Price>) {
    let mut description = Vec::new();
    let mut price: Option<Price> = None;

    for para in paras {
        let mut kept: Vec<&str> = Vec::new();
        for line in para.lines() {
            let trimmed = line.trim();
            if price.is_none() {
                if let Some(cap) = PRICE_LINE.captures(trimmed) {
                    if let Ok(parsed) = Price::parse(&cap[1]) {
                        price = Some(parsed);
                        continue;
                    }
                } else if trimmed.starts_with(['$', '€', '£']) {
                    if let Ok(parsed) = Price::parse(trimmed) {
                        price = Some(parsed);
                        continue;
                    }
                }
            }
            kept.push(line);
        }
        let joined = kept.join("\n");
        if !joined.trim().is_empty() {
            description.push(joined.trim().to_string());
        }
    }
    (description, price)
}

fn push_section_text(blocks: &mut Vec<ContentBlock>, section: &Section) {
    if section.paras.is_empty() {
        return;
    }
    let body = section.paras.join("\n");
    let text = if section.title.trim().is_empty() {
        body
    } else {
        format!("{}\n{}", section.title.trim(), body)
    };
    blocks.push(ContentBlock::Text(text));
}

fn push_assets(
    assets: &mut Vec<ImageAsset>,
    images: &[(String, String)],
) -> Vec<AnchorId> {
    let mut anchors = Vec::new();
    for (dest, alt) in images {
        let anchor = AnchorId::new(dest.clone());
        // First reference wins; repeated anchors share one asset entry.
        if !assets.iter().any(|a| a.anchor == anchor) {
            assets.push(ImageAsset::new(anchor.clone(), dest.clone(), alt.clone()));
        }
        anchors.push(anchor);
    }
    anchors
}

fn interpret_sections(sections: &[Section]) -> Result<Extraction, ExtractError> {
    let menu_idx = sections
        .iter()
        .position(|s| s.level > 0 && is_menu_heading(&s.title))
        .ok_or(ExtractError::NoMenuSection)?;
    let menu_level = sections[menu_idx].level;

    let mut blocks = Vec::new();
    let mut assets = Vec::new();
    let mut category: Option<String> = None;
    let mut in_menu_scope = false;
    let mut item_count = 0usize;

    for (idx, section) in sections.iter().enumerate() {
        if idx == menu_idx {
            in_menu_scope = true;
            push_section_text(&mut blocks, section);
            for anchor in push_assets(&mut assets, &section.images) {
                blocks.push(ContentBlock::ImageAnchor(anchor));
            }
            continue;
        }
        if in_menu_scope && section.level > 0 && section.level <= menu_level {
            in_menu_scope = false;
        }

        if !in_menu_scope {
            push_section_text(&mut blocks, section);
            for anchor in push_assets(&mut assets, &section.images) {
                blocks.push(ContentBlock::ImageAnchor(anchor));
            }
            continue;
        }

        let (description, price) = split_price(&section.paras);
        let is_category = section.level == menu_level + 1 && price.is_none();

        if is_category {
            category = Some(section.title.trim().to_string());
            for anchor in push_assets(&mut assets, &section.images) {
                blocks.push(ContentBlock::ImageAnchor(anchor));
            }
            continue;
        }

        // Item section. Its first image becomes the item anchor; extras are
        // retained as stray anchors.
        let anchors = push_assets(&mut assets, &section.images);
        let mut record = ItemRecord::named(section.title.trim());
        record.description = description.join("\n");
        record.price = price;
        record.category = category.clone();
        record.anchor = anchors.first().cloned();
        blocks.push(ContentBlock::Item(record));
        item_count += 1;

        for anchor in anchors.into_iter().skip(1) {
            blocks.push(ContentBlock::ImageAnchor(anchor));
        }
    }

    if item_count == 0 {
        return Err(ExtractError::NoItems);
    }

    Ok(Extraction { blocks, assets })
}
