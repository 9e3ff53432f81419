//! Filter selections and the multi-select toggle used by customer-style pickers.

use chrono::NaiveDate;
use serde::Serialize;

/// The value chosen for one filter field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Selection {
    /// No restriction.
    #[default]
    All,
    /// Equality match.
    One(String),
    /// Union match over the listed values.
    Many(Vec<String>),
    /// Inclusive date window; an open bound is unbounded.
    Range {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

/// `""` and `"All"` mean "no restriction" for every field.
pub fn is_all_sentinel(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "All"
}

/// A generic sentinel, or the field's own "All" label such as `"All Years"`.
fn is_all_for(value: &str, all_label: &str) -> bool {
    is_all_sentinel(value) || value.trim() == all_label
}

impl Selection {
    /// A single-choice selection from a UI value, honouring "All" sentinels.
    pub fn single(value: Option<&str>) -> Self {
        Self::single_labelled(value, "All")
    }

    /// Like `single`, also treating the field's own label (e.g. `"All Years"`) as `All`.
    pub fn single_labelled(value: Option<&str>, all_label: &str) -> Self {
        match value {
            Some(v) if !is_all_for(v, all_label) => Selection::One(v.trim().to_string()),
            _ => Selection::All,
        }
    }

    /// A multi-choice selection. Any sentinel in the list, or an empty list, means `All`.
    pub fn many<S: AsRef<str>>(values: &[S]) -> Self {
        if values.is_empty() || values.iter().any(|v| is_all_sentinel(v.as_ref())) {
            return Selection::All;
        }
        Selection::Many(values.iter().map(|v| v.as_ref().trim().to_string()).collect())
    }

    pub fn range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        if from.is_none() && to.is_none() {
            Selection::All
        } else {
            Selection::Range { from, to }
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    /// Whether a row's key passes. Rows with no key only pass an `All` selection.
    pub fn matches_text(&self, key: Option<&str>) -> bool {
        match self {
            Selection::All | Selection::Range { .. } => true,
            Selection::One(v) => key == Some(v.as_str()),
            Selection::Many(vs) => key.is_some_and(|k| vs.iter().any(|v| v == k)),
        }
    }

    pub fn matches_date(&self, date: Option<NaiveDate>) -> bool {
        match self {
            Selection::Range { from, to } => date.is_some_and(|d| {
                from.map_or(true, |f| d >= f) && to.map_or(true, |t| d <= t)
            }),
            _ => self.matches_text(date.map(iso_day).as_deref()),
        }
    }
}

/// Text key used when a date field takes part in an equality filter.
pub(crate) fn iso_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Toggle state machine behind "All Customers"-style pickers.
///
/// Picking the "All" entry clears every individual choice. Picking an item removes
/// "All" and toggles that item. Deselecting the last item falls back to "All".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSelect {
    all_label: String,
    selected: Vec<String>,
}

impl MultiSelect {
    pub fn new(all_label: impl Into<String>) -> Self {
        Self {
            all_label: all_label.into(),
            selected: Vec::new(),
        }
    }

    /// Rebuild from a list of UI values, e.g. `["All Customers"]` or `["X", "Y"]`.
    pub fn from_values<S: AsRef<str>>(all_label: impl Into<String>, values: &[S]) -> Self {
        let mut state = Self::new(all_label);
        for v in values {
            let v = v.as_ref();
            if is_all_for(v, &state.all_label) {
                state.selected.clear();
                break;
            }
            if !state.selected.iter().any(|s| s == v) {
                state.selected.push(v.to_string());
            }
        }
        state
    }

    pub fn toggle(&mut self, item: &str) {
        if item == self.all_label {
            self.selected.clear();
        } else if let Some(pos) = self.selected.iter().position(|s| s == item) {
            self.selected.remove(pos);
        } else {
            self.selected.push(item.to_string());
        }
    }

    pub fn is_all(&self) -> bool {
        self.selected.is_empty()
    }

    /// What the picker shows as checked.
    pub fn values(&self) -> Vec<String> {
        if self.selected.is_empty() {
            vec![self.all_label.clone()]
        } else {
            self.selected.clone()
        }
    }

    pub fn selection(&self) -> Selection {
        if self.selected.is_empty() {
            Selection::All
        } else {
            Selection::Many(self.selected.clone())
        }
    }
}
