//! Scroll state persisted to the URL query string.
//!
//! The engine emits [`UrlParams`] through `Effect::ReplaceUrl` so a host can
//! update the address bar without reloading. Reading them back on startup
//! resumes the list at the same anchor and geometry.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Query parameter names used for persisted scroll state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlParamNames {
    /// Name of the render-window offset parameter.
    pub offset: String,
    /// Name of the anchor token parameter.
    pub offset_relative_to: String,
    /// Name of the reserved-height parameter.
    pub min_height: String,
    /// Name of the window transform parameter.
    pub translate_y: String,
}

impl Default for UrlParamNames {
    fn default() -> Self {
        Self {
            offset: "offset".to_string(),
            offset_relative_to: "offsetRelativeTo".to_string(),
            min_height: "minHeight".to_string(),
            translate_y: "translateY".to_string(),
        }
    }
}

/// Resumable scroll state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlParams {
    /// Index of the first rendered item, relative to the anchor.
    pub offset: i64,
    /// Anchor token the offset is relative to.
    pub offset_relative_to: String,
    /// Height reserved above the rendered window.
    pub min_height: i64,
    /// Transform of the rendered window.
    pub translate_y: i64,
}

impl UrlParams {
    /// Render as `(name, value)` pairs, in a stable order.
    ///
    /// Percent-encoding is left to the host.
    pub fn to_query_pairs(&self, names: &UrlParamNames) -> Vec<(String, String)> {
        vec![
            (names.offset.clone(), self.offset.to_string()),
            (
                names.offset_relative_to.clone(),
                self.offset_relative_to.clone(),
            ),
            (names.min_height.clone(), self.min_height.to_string()),
            (names.translate_y.clone(), self.translate_y.to_string()),
        ]
    }

    /// Parse from decoded query pairs.
    ///
    /// Returns `None` when the anchor parameter is absent or empty: without an
    /// anchor there is nothing to resume. Malformed numbers fall back to 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use infiniscroll::model::{UrlParamNames, UrlParams};
    ///
    /// let names = UrlParamNames::default();
    /// let params = UrlParams::from_query_pairs(
    ///     [("offset", "12"), ("offsetRelativeTo", "abc")],
    ///     &names,
    /// )
    /// .unwrap();
    /// assert_eq!(params.offset, 12);
    /// assert_eq!(params.min_height, 0);
    /// ```
    pub fn from_query_pairs<I, K, V>(pairs: I, names: &UrlParamNames) -> Option<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut anchor = None;
        let mut offset = 0;
        let mut min_height = 0;
        let mut translate_y = 0;

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            if key == names.offset_relative_to {
                anchor = Some(value.to_string()).filter(|v| !v.is_empty());
            } else if key == names.offset {
                offset = parse_number(key, value);
            } else if key == names.min_height {
                min_height = parse_number(key, value);
            } else if key == names.translate_y {
                translate_y = parse_number(key, value);
            }
        }

        anchor.map(|offset_relative_to| Self {
            offset,
            offset_relative_to,
            min_height,
            translate_y,
        })
    }
}

fn parse_number(key: &str, value: &str) -> i64 {
    value.parse().unwrap_or_else(|_| {
        warn!(param = key, value, "Ignoring malformed URL parameter");
        0
    })
}
