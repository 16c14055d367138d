//! Turn the router's server-rendered pages into plain data.
//!
//! The pages are written for display, not for machines: every table value is
//! rendered twice (a desktop cell and a `visible-xs` mobile cell), some state
//! only exists as a CSS class and per-row handles only live inside `onclick`
//! handlers. Nothing in here fails; missing markup just yields less data.

mod form;
pub use form::{onclick_args, FormFields};

mod icon;
pub use icon::sim_slot;

mod table;
pub use table::{ExtractedTable, TableValue};

use scraper::{ElementRef, Node, Selector};
use thiserror::Error;

/// Two sequences scraped independently from one page that were expected to
/// line up one to one, but don't.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected {expected} {what}, found {found}")]
pub struct ExtractionGap {
    pub what: &'static str,
    pub expected: usize,
    pub found: usize,
}

/// Pair `left[n]` with `right[n]`, refusing to guess if the lengths differ.
pub fn zip_exact<'a, A, B: 'a>(
    left: &'a mut [A],
    right: Vec<B>,
    what: &'static str,
) -> Result<impl Iterator<Item = (&'a mut A, B)> + 'a, ExtractionGap> {
    if left.len() != right.len() {
        return Err(ExtractionGap {
            what,
            expected: left.len(),
            found: right.len(),
        });
    }
    Ok(left.iter_mut().zip(right))
}

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// All text below `element`, concatenated.
pub(crate) fn text_of(element: ElementRef) -> String {
    element.text().collect()
}

/// Like [`text_of`], but every `<br>` becomes a newline.
pub(crate) fn text_with_breaks(element: ElementRef) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}
