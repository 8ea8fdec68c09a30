use scraper::{ElementRef, Html, Selector};

use super::sources::{group_title, SourceGroups};

/// Tooltip used when a referenced group has no usable title.
pub const DEFAULT_REF_TITLE: &str = "Technical Order";

/// An inline citation marker found in rendered answer markup, e.g.
/// `<span class="citation" data-document="TO-1-1" data-page="12">[1]</span>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Citation {
    pub document: Option<String>,
    pub page: Option<String>,
    pub text: String,
}

/// A citation paired with the source group it points at, if one was rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct CitationLink {
    pub citation: Citation,
    /// Position of the matching group in the sources accordion.
    pub group: Option<usize>,
}

/// A `document-ref` element together with its tooltip title.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRef {
    pub document: String,
    pub title: Option<String>,
}

/// Parse markup as a fragment and collect every element matching `css`.
fn select<T>(markup: &str, css: &str, f: impl Fn(ElementRef<'_>) -> T) -> Vec<T> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };
    let fragment = Html::parse_fragment(markup);
    let found: Vec<T> = fragment.select(&selector).map(f).collect();
    found
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn data_attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Find every citation marker in freshly inserted markup.
pub fn scan_citations(markup: &str) -> Vec<Citation> {
    select(markup, ".citation", |el| Citation {
        document: data_attr(el, "data-document"),
        page: data_attr(el, "data-page"),
        text: element_text(el),
    })
}

/// Cross-reference citations against the rendered source groups by document id.
pub fn link_citations(citations: Vec<Citation>, groups: &SourceGroups) -> Vec<CitationLink> {
    citations
        .into_iter()
        .map(|citation| {
            let group = citation
                .document
                .as_deref()
                .and_then(|doc| groups.position(doc));
            CitationLink { citation, group }
        })
        .collect()
}

/// Resolve the tooltip title of every `document-ref` element. References
/// to documents with no rendered group get no title.
pub fn scan_document_refs(markup: &str, groups: &SourceGroups) -> Vec<DocumentRef> {
    select(markup, ".document-ref", element_text)
        .into_iter()
        .filter(|document| !document.is_empty())
        .map(|document| {
            let title = groups.get(document.as_str()).map(|records| {
                let title = group_title(&document, records);
                if title.is_empty() {
                    DEFAULT_REF_TITLE.to_string()
                } else {
                    title.to_string()
                }
            });
            DocumentRef { document, title }
        })
        .collect()
}
