use std::collections::HashMap;

use lazy_regex::regex;
use scraper::Html;

use super::{selector, text_of};

/// Current values of the `input` and `textarea` elements of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    fields: HashMap<String, String>,
}

impl FormFields {
    /// Fields are keyed by `name`, falling back to `id`; unnamed ones are
    /// skipped. A missing `value` reads as an empty string.
    pub fn parse(html: &str) -> FormFields {
        let document = Html::parse_document(html);
        let mut fields = HashMap::new();

        for input in document.select(&selector("input")) {
            let el = input.value();
            if let Some(name) = el.attr("name").or_else(|| el.attr("id")) {
                let value = el.attr("value").unwrap_or_default();
                fields.insert(name.to_string(), value.to_string());
            }
        }
        for textarea in document.select(&selector("textarea")) {
            let el = textarea.value();
            if let Some(name) = el.attr("name").or_else(|| el.attr("id")) {
                fields.insert(name.to_string(), text_of(textarea));
            }
        }

        FormFields { fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Like [`FormFields::get`] but treats an empty value as absent.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The quoted string arguments of every `<button onclick="callback(...)">`.
///
/// One entry per matching button, in page order. Buttons whose handler has
/// no string literal at all are left out.
pub fn onclick_args(html: &str, callback: &str) -> Vec<Vec<String>> {
    let document = Html::parse_document(html);

    document
        .select(&selector("button[onclick]"))
        .filter_map(|button| button.value().attr("onclick"))
        .filter(|onclick| onclick.starts_with(callback))
        .map(|onclick| {
            regex!(r#"['"]([^'"]+)['"]"#)
                .captures_iter(onclick)
                .map(|caps| caps[1].to_string())
                .collect::<Vec<_>>()
        })
        .filter(|args| !args.is_empty())
        .collect()
}
