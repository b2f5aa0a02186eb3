//! # Pagination
//!
//! The [`Paginator`] owns the write cursor. Every content-emitting step
//! asks it for room first; when the request does not fit above the bottom
//! margin it opens a new page and places the content at the top margin.
//!
//! Page numbers are stamped last, by [`Paginator::finalize`], because the
//! total only exists once nothing more will be appended.

use tracing::debug;

use super::page_break::{decide_break, fitting_prefix, BreakDecision};
use super::{text_element, ElementRole, LayoutElement, LayoutPage, LinkAnnotation};
use crate::config::{Color, PageConfig};
use crate::font::{Face, FontContext};

/// Slack for floating-point accumulation when comparing heights.
const EPSILON: f64 = 1e-6;

/// Where the next content will be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutCursor {
    pub page_index: usize,
    /// Top-down offset of the next free line on the page.
    pub y: f64,
    /// 1-based page ordinal.
    pub page_number: usize,
}

/// Whether the cursor can take a request of a given height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    OnPage,
    NeedPage,
}

/// A reserved slot: the page it landed on and the top of the slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub page_index: usize,
    pub y: f64,
}

/// Footer text appearance.
#[derive(Debug, Clone, Copy)]
pub struct FooterStyle {
    pub font_size: f64,
    pub color: Color,
}

pub struct Paginator {
    config: PageConfig,
    pages: Vec<LayoutPage>,
    cursor: LayoutCursor,
    footer: FooterStyle,
}

impl Paginator {
    /// Start a document with one empty page.
    pub fn new(config: &PageConfig, footer: FooterStyle) -> Self {
        let (width, height) = config.size.dimensions();
        Self {
            config: config.clone(),
            pages: vec![LayoutPage::new(width, height)],
            cursor: LayoutCursor {
                page_index: 0,
                y: config.margin.top,
                page_number: 1,
            },
            footer,
        }
    }

    pub fn cursor(&self) -> LayoutCursor {
        self.cursor
    }

    pub fn content_x(&self) -> f64 {
        self.config.margin.left
    }

    pub fn content_width(&self) -> f64 {
        self.config.content_width()
    }

    /// Usable height of an empty page.
    pub fn content_height(&self) -> f64 {
        self.config.content_height()
    }

    fn content_bottom(&self) -> f64 {
        self.config.size.dimensions().1 - self.config.margin.bottom
    }

    /// Room left above the bottom margin.
    pub fn remaining(&self) -> f64 {
        (self.content_bottom() - self.cursor.y).max(0.0)
    }

    pub fn state_for(&self, height: f64) -> PageState {
        if height <= self.remaining() + EPSILON {
            PageState::OnPage
        } else {
            PageState::NeedPage
        }
    }

    pub fn fits(&self, height: f64) -> bool {
        self.state_for(height) == PageState::OnPage
    }

    /// True when nothing has been placed on the current page yet.
    pub fn at_page_top(&self) -> bool {
        self.cursor.y <= self.config.margin.top + EPSILON
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[LayoutPage] {
        &self.pages
    }

    /// Reserve `height` points, opening a new page first if needed.
    /// A request taller than a whole page lands at the top of a fresh page.
    pub fn reserve(&mut self, height: f64) -> Placement {
        if self.state_for(height) == PageState::NeedPage && !self.at_page_top() {
            self.new_page();
        }
        self.take(height)
    }

    /// Place a block given as item heights. The block stays on one page if
    /// it fits on an empty page; otherwise it is split between items with
    /// the given orphan/widow minimums. Returns one placement per item.
    pub fn place_block(
        &mut self,
        item_heights: &[f64],
        min_orphan_items: usize,
        min_widow_items: usize,
    ) -> Vec<Placement> {
        let total: f64 = item_heights.iter().sum();
        let breakable = total > self.content_height() + EPSILON;
        let mut placements = Vec::with_capacity(item_heights.len());
        let mut rest = item_heights;

        while !rest.is_empty() {
            let decision = decide_break(
                self.remaining() + EPSILON,
                rest,
                breakable,
                min_orphan_items,
                min_widow_items,
            );
            let here = match decision {
                BreakDecision::Place => rest.len(),
                BreakDecision::Split {
                    items_on_current_page,
                } => items_on_current_page,
                BreakDecision::MoveToNextPage if self.at_page_top() => {
                    // An empty page is as good as it gets: take what fits.
                    fitting_prefix(self.remaining() + EPSILON, rest).max(1)
                }
                BreakDecision::MoveToNextPage => {
                    self.new_page();
                    continue;
                }
            };

            for &h in &rest[..here] {
                placements.push(self.take(h));
            }
            rest = &rest[here..];
            if !rest.is_empty() {
                self.new_page();
            }
        }

        placements
    }

    /// Start a fresh page unless the current one is still empty.
    pub fn break_page(&mut self) {
        if !self.at_page_top() {
            self.new_page();
        }
    }

    pub fn push_element(&mut self, page_index: usize, element: LayoutElement) {
        self.pages[page_index].elements.push(element);
    }

    /// Register a clickable region on a page.
    pub fn add_link(&mut self, page_index: usize, link: LinkAnnotation) {
        self.pages[page_index].links.push(link);
    }

    fn take(&mut self, height: f64) -> Placement {
        let placement = Placement {
            page_index: self.cursor.page_index,
            y: self.cursor.y,
        };
        self.cursor.y += height;
        placement
    }

    fn new_page(&mut self) {
        let (width, height) = self.config.size.dimensions();
        self.pages.push(LayoutPage::new(width, height));
        self.cursor = LayoutCursor {
            page_index: self.pages.len() - 1,
            y: self.config.margin.top,
            page_number: self.pages.len(),
        };
        debug!(page = self.cursor.page_number, "opened page");
    }

    /// Stamp "Page i of N" into the bottom margin of every page.
    pub fn finalize(&mut self, font_context: &FontContext, total_pages: usize) {
        let size = self.footer.font_size;
        let line_height = size * 1.2;
        let (page_w, page_h) = self.config.size.dimensions();
        let top = page_h - self.config.margin.bottom / 2.0 - line_height / 2.0;

        for (i, page) in self.pages.iter_mut().enumerate() {
            let text = format!("Page {} of {}", i + 1, total_pages);
            let width = font_context.measure(&text, Face::Regular, size);
            let x = (page_w - width) / 2.0;
            page.elements.push(text_element(
                font_context,
                text,
                width,
                x,
                top,
                line_height,
                Face::Regular,
                size,
                self.footer.color,
                ElementRole::Footer,
            ));
        }
    }

    /// Finalize with the real page count and hand the pages over.
    pub fn finish(mut self, font_context: &FontContext) -> Vec<LayoutPage> {
        let total = self.pages.len();
        self.finalize(font_context, total);
        self.pages
    }
}
