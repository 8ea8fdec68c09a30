use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::hash::Hash;

use super::markup::{escape_html, Trust};
use super::types::SourceRecord;

pub const NO_SOURCES: &str =
    r#"<p class="text-muted">No specific sources available for this response.</p>"#;

/// Insertion-ordered multimap: keys iterate in first-seen order and values
/// keep their push order within each key.
#[derive(Debug, Clone)]
pub struct OrderedGroups<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<(K, Vec<V>)>,
}

impl<K, V> Default for OrderedGroups<K, V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> OrderedGroups<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: K, value: V) {
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1.push(value),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, vec![value]));
            }
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&[V]>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.position(key).map(|pos| self.entries[pos].1.as_slice())
    }

    /// Zero-based group position in iteration order.
    pub fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).copied()
    }

    pub fn nth(&self, pos: usize) -> Option<(&K, &[V])> {
        self.entries.get(pos).map(|(k, v)| (k, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

/// Citations grouped by document identifier.
pub type SourceGroups = OrderedGroups<String, SourceRecord>;

pub fn group_sources(sources: &[SourceRecord]) -> SourceGroups {
    let mut groups = SourceGroups::new();
    for source in sources {
        groups.push(source.document_id(), source.clone());
    }
    groups
}

/// Header title of a group: its first record's title, else the identifier.
pub fn group_title<'a>(document: &'a str, records: &'a [SourceRecord]) -> &'a str {
    records
        .first()
        .and_then(|r| r.title())
        .unwrap_or(document)
}

/// Render a flat source list as an accordion, one panel per document.
pub fn render_sources(sources: &[SourceRecord], trust: Trust) -> String {
    render_groups(&group_sources(sources), trust)
}

/// The first group starts expanded, the rest collapsed. No reordering by
/// relevance and no deduplication happen here.
pub fn render_groups(groups: &SourceGroups, trust: Trust) -> String {
    if groups.is_empty() {
        return NO_SOURCES.to_string();
    }

    let mut html = String::from(r#"<div class="accordion" id="sourcesAccordion">"#);

    for (counter, (document, records)) in groups.iter().enumerate() {
        let title = group_title(document, records);
        let expanded = counter == 0;

        let _ = write!(
            html,
            r##"<div class="accordion-item source-item" data-document="{doc_attr}" data-title="{title_attr}"><h2 class="accordion-header" id="heading{counter}"><button class="accordion-button{collapsed}" type="button" data-bs-toggle="collapse" data-bs-target="#collapse{counter}" aria-expanded="{expanded}" aria-controls="collapse{counter}"><div class="source-header"><div class="source-document">{doc}</div><div class="source-title">{title}</div></div></button></h2><div id="collapse{counter}" class="accordion-collapse collapse{show}" aria-labelledby="heading{counter}" data-bs-parent="#sourcesAccordion"><div class="accordion-body"><ul class="source-details-list">"##,
            doc_attr = escape_html(document),
            title_attr = escape_html(title),
            counter = counter,
            collapsed = if expanded { "" } else { " collapsed" },
            expanded = expanded,
            doc = trust.apply(document),
            title = trust.apply(title),
            show = if expanded { " show" } else { "" },
        );

        for record in records {
            html.push_str(&render_record(record, trust));
        }

        html.push_str("</ul></div></div></div>");
    }

    html.push_str("</div>");
    html
}

fn render_record(record: &SourceRecord, trust: Trust) -> String {
    let mut metadata = Vec::new();
    if let Some(page) = record.page() {
        metadata.push(format!(
            r#"<span class="source-page">Page {}</span>"#,
            trust.apply(&page.to_string())
        ));
    }
    if let Some(section) = record.section() {
        metadata.push(format!(
            r#"<span class="source-section">Section {}</span>"#,
            trust.apply(&section.to_string())
        ));
    }
    if let Some(percent) = record.relevance_percent() {
        metadata.push(format!(
            r#"<span class="relevance-score">{}% match</span>"#,
            percent
        ));
    }

    format!(
        r#"<li class="source-detail"><div class="source-metadata">{}</div><div class="source-content">{}</div></li>"#,
        metadata.join(" "),
        trust.apply(record.content())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::{Label, UNKNOWN_DOCUMENT};

    fn record(document: Option<&str>, content: &str) -> SourceRecord {
        SourceRecord {
            document: document.map(Label::from),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_ordered_groups_keep_first_seen_order() {
        let mut groups = OrderedGroups::new();
        groups.push("b", 1);
        groups.push("a", 2);
        groups.push("b", 3);
        groups.push("c", 4);
        groups.push("a", 5);

        let collected: Vec<_> = groups.iter().map(|(k, v)| (*k, v.to_vec())).collect();
        assert_eq!(
            collected,
            vec![("b", vec![1, 3]), ("a", vec![2, 5]), ("c", vec![4])]
        );
        assert_eq!(groups.position("a"), Some(1));
        assert_eq!(groups.get("c"), Some(&[4][..]));
        assert!(groups.get("z").is_none());
    }

    #[test]
    fn test_group_sources_counts_and_order() {
        let sources = vec![
            record(Some("TO-2"), "a"),
            record(Some("TO-1"), "b"),
            record(Some("TO-2"), "c"),
            record(Some("TO-3"), "d"),
            record(Some("TO-1"), "e"),
        ];
        let groups = group_sources(&sources);
        assert_eq!(groups.len(), 3);

        let keys: Vec<_> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["TO-2", "TO-1", "TO-3"]);

        let contents: Vec<_> = groups
            .get("TO-1")
            .unwrap()
            .iter()
            .map(|r| r.content())
            .collect();
        assert_eq!(contents, vec!["b", "e"]);
    }

    #[test]
    fn test_missing_documents_share_unknown_bucket() {
        let sources = vec![
            record(None, "a"),
            record(Some("TO-1"), "b"),
            record(None, "c"),
        ];
        let groups = group_sources(&sources);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.position(UNKNOWN_DOCUMENT), Some(0));
        assert_eq!(groups.get(UNKNOWN_DOCUMENT).unwrap().len(), 2);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let sources = vec![record(Some("TO-1"), "same"), record(Some("TO-1"), "same")];
        let html = render_sources(&sources, Trust::Markup);
        assert_eq!(html.matches(r#"<li class="source-detail">"#).count(), 2);
    }

    #[test]
    fn test_empty_sources_render_placeholder() {
        let html = render_sources(&[], Trust::Markup);
        assert_eq!(html, NO_SOURCES);
        assert!(!html.contains("accordion-item"));
    }

    #[test]
    fn test_first_group_expanded_others_collapsed() {
        let sources = vec![record(Some("TO-1"), "a"), record(Some("TO-2"), "b")];
        let html = render_sources(&sources, Trust::Markup);
        assert_eq!(html.matches("accordion-item source-item").count(), 2);
        assert!(html.contains(r#"id="collapse0" class="accordion-collapse collapse show""#));
        assert!(html.contains(r#"id="collapse1" class="accordion-collapse collapse""#));
        assert!(html.contains(r#"class="accordion-button collapsed""#));
        assert_eq!(html.matches(r#"aria-expanded="true""#).count(), 1);
    }

    #[test]
    fn test_group_title_falls_back_to_document() {
        let mut titled = record(Some("TO-1"), "a");
        titled.title = Some("Refueling Procedures".to_string());
        let html = render_sources(&[titled, record(Some("TO-2"), "b")], Trust::Markup);
        assert!(html.contains(r#"<div class="source-title">Refueling Procedures</div>"#));
        assert!(html.contains(r#"<div class="source-title">TO-2</div>"#));
    }

    #[test]
    fn test_record_metadata() {
        let full = SourceRecord {
            document: Some("TO-1".into()),
            page: Some(12u64.into()),
            section: Some("3.2".into()),
            relevance: Some(0.864),
            content: Some("Bond the aircraft.".to_string()),
            ..Default::default()
        };
        let html = render_sources(&[full], Trust::Markup);
        assert!(html.contains("Page 12"));
        assert!(html.contains("Section 3.2"));
        assert!(html.contains("86% match"));
        assert!(html.contains("Bond the aircraft."));

        let bare = record(Some("TO-1"), "text");
        let html = render_sources(&[bare], Trust::Markup);
        assert!(!html.contains("% match"));
        assert!(!html.contains("Page "));
        assert!(!html.contains("Section "));
    }

    #[test]
    fn test_attributes_always_escaped() {
        let mut hostile = record(Some(r#"x" onclick="evil"#), "<b>bold</b>");
        hostile.title = Some("<i>t</i>".to_string());

        let html = render_sources(&[hostile.clone()], Trust::Markup);
        assert!(html.contains(r#"data-document="x&quot; onclick=&quot;evil""#));
        assert!(html.contains("<b>bold</b>"));

        let html = render_sources(&[hostile], Trust::Escape);
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(html.contains("&lt;i&gt;t&lt;/i&gt;"));
    }
}
