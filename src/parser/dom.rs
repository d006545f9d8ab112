//! Rigid structural navigation over a parsed page.
//!
//! A path is a fixed list of steps from some starting element. Any step that
//! finds nothing ends the walk with `None`; nothing is guessed.

use scraper::ElementRef;

use crate::normalize::normalize_reference;

#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// First direct child element with this tag.
    Child(&'static str),
    /// N-th (0-based) descendant element with this tag, in document order.
    Nth(&'static str, usize),
}

use Step::{Child, Nth};

/// What to read from the element a path ends on.
#[derive(Debug, Clone, Copy)]
pub enum Field {
    Text,
    Src,
}

pub fn resolve<'a>(root: ElementRef<'a>, path: &[Step]) -> Option<ElementRef<'a>> {
    path.iter().try_fold(root, |el, step| match *step {
        Child(tag) => child(el, tag),
        Nth(tag, n) => descendants(el, tag).nth(n),
    })
}

pub fn extract_field(root: ElementRef<'_>, path: &[Step], field: Field) -> Option<String> {
    let el = resolve(root, path)?;
    Some(match field {
        Field::Text => text_of(el),
        Field::Src => src_of(el),
    })
}

pub fn child<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .find(|c| c.value().name() == tag)
}

/// Descendant elements named `tag`, excluding `el` itself.
pub fn descendants<'a>(el: ElementRef<'a>, tag: &'a str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |d| d.value().name() == tag)
}

pub fn find_all<'a>(el: ElementRef<'a>, tag: &'a str) -> Vec<ElementRef<'a>> {
    descendants(el, tag).collect()
}

pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

pub fn src_of(el: ElementRef<'_>) -> String {
    normalize_reference(el.value().attr("src").unwrap_or(""))
}
