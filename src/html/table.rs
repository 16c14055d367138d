use scraper::{ElementRef, Html};
use serde::Serialize;

use super::{selector, text_of};

/// What a table row holds after its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TableValue {
    Text(String),
    List(Vec<String>),
}

impl TableValue {
    /// The value as one string, list items joined by a space.
    pub fn joined(&self) -> String {
        match self {
            TableValue::Text(s) => s.clone(),
            TableValue::List(items) => items.join(" "),
        }
    }

    pub fn as_list(&self) -> &[String] {
        match self {
            TableValue::Text(s) => std::slice::from_ref(s),
            TableValue::List(items) => items,
        }
    }
}

/// Label/value rows scraped from every `<table>` in a page, in page order.
///
/// Keys are unique: the second `SCC` row is stored under `SCC2`, the third
/// under `SCC3` and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedTable {
    rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Row {
    /// Label as printed on the page
    label: String,
    /// Label made unique within the table
    key: String,
    value: TableValue,
}

impl ExtractedTable {
    /// Rows built from the `td p.visible-xs` cells only.
    pub fn parse(html: &str) -> ExtractedTable {
        Self::parse_inner(html, false)
    }

    /// Rows where `<th>` cells may also provide the label.
    pub fn parse_with_headers(html: &str) -> ExtractedTable {
        Self::parse_inner(html, true)
    }

    fn parse_inner(html: &str, include_headers: bool) -> ExtractedTable {
        let document = Html::parse_document(html);
        let table_sel = selector("table");
        let row_sel = selector("tr");

        let mut table = ExtractedTable::default();
        for html_table in document.select(&table_sel) {
            for row in html_table.select(&row_sel) {
                let mut cells = row_texts(row, include_headers).into_iter();
                let Some(label) = cells.next() else {
                    continue;
                };
                let mut values = cells.map(|s| s.replace('\n', "")).collect::<Vec<_>>();
                let value = match values.len() {
                    0 => TableValue::Text(String::new()),
                    1 => TableValue::Text(values.remove(0)),
                    _ => TableValue::List(values),
                };
                table.push(label, value);
            }
        }
        table
    }

    /// Append a row, numbering its key if the label was seen before.
    pub fn push(&mut self, label: String, value: TableValue) {
        let key = self.unique_key(&label);
        self.rows.push(Row { label, key, value });
    }

    /// Append all rows of `other` as if they came after this table's rows.
    pub fn merge(&mut self, other: ExtractedTable) {
        for row in other.rows {
            self.push(row.label, row.value);
        }
    }

    fn unique_key(&self, label: &str) -> String {
        if !self.contains(label) {
            return label.to_string();
        }
        (2..)
            .map(|n| format!("{label}{n}"))
            .find(|key| !self.contains(key))
            .expect("unbounded counter always finds a free key")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rows.iter().any(|row| row.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&TableValue> {
        self.rows.iter().find(|row| row.key == key).map(|row| &row.value)
    }

    /// The value under `key` as text, `None` if absent or blank.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(TableValue::joined)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableValue)> {
        self.rows.iter().map(|row| (row.key.as_str(), &row.value))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn row_texts(row: ElementRef, include_headers: bool) -> Vec<String> {
    let header_sel = selector("th");
    let cell_sel = selector("td p.visible-xs");

    let headers = include_headers
        .then(|| row.select(&header_sel).collect::<Vec<_>>())
        .unwrap_or_default();

    headers
        .into_iter()
        .chain(row.select(&cell_sel))
        .map(|el| text_of(el).trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
