//! Cleanup of extracted page text and page-list operations.

use tracing::info;

use crate::corpus::PageText;

/// Rejoin words hyphenated across line breaks, then join lines with spaces.
///
/// When a line ends with `-`, the hyphen is dropped and the first
/// space-delimited word of the next line is moved up.
pub fn remove_hyphens(text: &str) -> String {
    let mut lines: Vec<String> = text.split('\n').map(|l| l.trim_end().to_string()).collect();

    for i in 0..lines.len().saturating_sub(1) {
        if lines[i].ends_with('-') {
            let suffix = lines[i + 1].split(' ').next().unwrap_or("").to_string();
            lines[i].pop();
            lines[i].push_str(&suffix);
            lines[i + 1] = lines[i + 1][suffix.len()..].to_string();
        }
    }

    lines.join(" ")
}

/// Lowercase, collapse whitespace and fix doubled ligatures
pub fn basic_format(text: &str) -> String {
    let collapsed = text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .replace("fifi", "fi")
        .replace("flfl", "fl")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full cleanup applied to one page of extracted text
pub fn clean_page_text(text: &str) -> String {
    basic_format(&remove_hyphens(text))
}

/// Clean every page, dropping pages left empty
pub fn clean_pages(pages: Vec<PageText>) -> Vec<PageText> {
    let before = pages.len();
    let cleaned: Vec<PageText> = pages
        .into_iter()
        .map(|p| PageText::new(p.page_number, clean_page_text(&p.page_text)))
        .filter(|p| !p.page_text.is_empty())
        .collect();
    info!(before, after = cleaned.len(), "page text cleaned");
    cleaned
}

/// Shift page numbers by `offset`; pages shifted below 1 are dropped
pub fn offset_pages(pages: Vec<PageText>, offset: i64) -> Vec<PageText> {
    if offset == 0 {
        return pages;
    }
    let shifted: Vec<PageText> = pages
        .into_iter()
        .filter_map(|p| {
            let number = p.page_number as i64 + offset;
            u32::try_from(number)
                .ok()
                .filter(|n| *n >= 1)
                .map(|n| PageText::new(n, p.page_text))
        })
        .collect();
    info!(offset, pages = shifted.len(), "pages renumbered");
    shifted
}

/// Keep pages numbered `first..=last`; `last` defaults to the page count
pub fn filter_page_range(pages: Vec<PageText>, first: u32, last: Option<u32>) -> Vec<PageText> {
    let last = last.unwrap_or(pages.len() as u32);
    let kept: Vec<PageText> = pages
        .into_iter()
        .filter(|p| (first..=last).contains(&p.page_number))
        .collect();
    info!(first, last, pages = kept.len(), "pages filtered");
    kept
}
