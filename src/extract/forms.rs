//! Form state harvesting

use crate::extract::element_text;
use crate::normalize::parse_date;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

/// Everything a backend needs to resubmit a server-rendered form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSnapshot {
    /// Raw `action` attribute, `None` when absent or blank
    pub action: Option<String>,

    /// Hidden inputs in document order
    pub hidden: Vec<(String, String)>,

    pub radios: Vec<RadioGroup>,

    pub selects: Vec<SelectField>,

    /// Submit buttons (`input[type=submit]`) as name/value pairs
    pub submits: Vec<(String, String)>,

    /// Names of text-like inputs (`text`, `date` or untyped)
    pub text_inputs: Vec<String>,
}

/// A named group of radio buttons
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadioGroup {
    pub name: String,
    pub values: Vec<String>,
    pub checked: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectField {
    pub name: String,
    pub options: Vec<SelectOption>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl FormSnapshot {
    /// Returns the value of a hidden input by name
    pub fn hidden_value(&self, name: &str) -> Option<&str> {
        self.hidden
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn radio(&self, name: &str) -> Option<&RadioGroup> {
        self.radios.iter().find(|g| g.name == name)
    }

    /// Returns the first select whose option values parse as dates
    ///
    /// Portals encode week-start dates as option values; placeholder options
    /// with blank values are ignored.
    pub fn week_selector(&self) -> Option<&SelectField> {
        self.selects.iter().find(|s| !s.week_starts().is_empty())
    }

    /// Returns the first text input whose name ends with `suffix`
    pub fn text_input_ending_with(&self, suffix: &str) -> Option<&str> {
        self.text_inputs
            .iter()
            .find(|n| n.ends_with(suffix))
            .map(String::as_str)
    }

    /// Returns the first submit button whose name ends with `suffix`
    pub fn submit_ending_with(&self, suffix: &str) -> Option<&(String, String)> {
        self.submits.iter().find(|(n, _)| n.ends_with(suffix))
    }
}

impl SelectField {
    /// Option values that parse as dates, paired with the parsed date
    pub fn week_starts(&self) -> Vec<(String, NaiveDate)> {
        self.options
            .iter()
            .filter_map(|o| parse_date(&o.value).map(|d| (o.value.clone(), d)))
            .collect()
    }
}

impl RadioGroup {
    /// Checked value, else the first option containing `hint`, else `fallback`
    pub fn value_or(&self, hint: &str, fallback: &str) -> String {
        if let Some(checked) = &self.checked {
            return checked.clone();
        }
        let hint = hint.to_lowercase();
        self.values
            .iter()
            .find(|v| v.to_lowercase().contains(&hint))
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Snapshots the first form matching a CSS selector
///
/// # Example
///
/// ```
/// use planning_harvester::extract::find_form;
/// use scraper::Html;
///
/// let html = Html::parse_document(
///     r#"<form name="searchCriteriaForm" action="/search.do">
///          <input type="hidden" name="org.apache.struts.taglib.html.TOKEN" value="abc">
///        </form>"#,
/// );
/// let form = find_form(&html, "form[name=searchCriteriaForm]").unwrap();
/// assert_eq!(form.action.as_deref(), Some("/search.do"));
/// assert_eq!(form.hidden_value("org.apache.struts.taglib.html.TOKEN"), Some("abc"));
/// ```
pub fn find_form(document: &Html, selector: &str) -> Option<FormSnapshot> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next().map(|form| snapshot(&form))
}

/// Snapshots the first form containing an input with the given name
pub fn find_form_with_field(document: &Html, field: &str) -> Option<FormSnapshot> {
    let forms = Selector::parse("form").ok()?;
    let inputs = Selector::parse("input").ok()?;

    document
        .select(&forms)
        .find(|form| {
            form.select(&inputs)
                .any(|input| input.value().attr("name") == Some(field))
        })
        .map(|form| snapshot(&form))
}

fn snapshot(form: &ElementRef<'_>) -> FormSnapshot {
    let mut result = FormSnapshot {
        action: form
            .value()
            .attr("action")
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string),
        ..FormSnapshot::default()
    };

    if let Ok(inputs) = Selector::parse("input") {
        for input in form.select(&inputs) {
            let attrs = input.value();
            let Some(name) = attrs.attr("name").filter(|n| !n.is_empty()) else {
                continue;
            };
            let value = attrs.attr("value").unwrap_or_default().to_string();
            let kind = attrs.attr("type").unwrap_or("text").to_ascii_lowercase();

            match kind.as_str() {
                "hidden" => result.hidden.push((name.to_string(), value)),
                "radio" => {
                    let checked = attrs.attr("checked").is_some();
                    add_radio(&mut result.radios, name, value, checked);
                }
                "submit" => result.submits.push((name.to_string(), value)),
                "text" | "date" | "search" => result.text_inputs.push(name.to_string()),
                _ => {}
            }
        }
    }

    if let (Ok(selects), Ok(options)) = (Selector::parse("select"), Selector::parse("option")) {
        for select in form.select(&selects) {
            let Some(name) = select.value().attr("name") else {
                continue;
            };
            let options = select
                .select(&options)
                .map(|option| {
                    let label = element_text(&option);
                    SelectOption {
                        value: option
                            .value()
                            .attr("value")
                            .map(|v| v.trim().to_string())
                            .unwrap_or_else(|| label.clone()),
                        label,
                        selected: option.value().attr("selected").is_some(),
                    }
                })
                .collect();
            result.selects.push(SelectField {
                name: name.to_string(),
                options,
            });
        }
    }

    result
}

fn add_radio(groups: &mut Vec<RadioGroup>, name: &str, value: String, checked: bool) {
    let group = match groups.iter().position(|g| g.name == name) {
        Some(index) => &mut groups[index],
        None => {
            groups.push(RadioGroup {
                name: name.to_string(),
                ..RadioGroup::default()
            });
            let last = groups.len() - 1;
            &mut groups[last]
        }
    };
    if checked && group.checked.is_none() {
        group.checked = Some(value.clone());
    }
    group.values.push(value);
}
