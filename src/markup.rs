//! Pre-escaped HTML fragments.
//!
//! Every fragment the renderer emits travels as a [`Markup`]. Untrusted text
//! only enters one through [`Markup::text`] or the `escape_*` helpers, so a
//! post body can never smuggle raw tags into the page.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Markup(String);

impl Markup {
    pub fn new() -> Self {
        Self(String::new())
    }

    /// Wrap markup produced by this crate's own templates.
    pub(crate) fn trusted(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    /// Escape untrusted text; newlines become `<br/>`.
    pub fn text(raw: &str) -> Self {
        Self(escape_text(raw).replace('\n', "<br/>"))
    }

    pub fn push(&mut self, other: &Markup) {
        self.0.push_str(&other.0);
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromIterator<Markup> for Markup {
    fn from_iter<I: IntoIterator<Item = Markup>>(iter: I) -> Self {
        let mut out = Markup::new();
        for m in iter {
            out.push(&m);
        }
        out
    }
}

pub fn escape_text(raw: &str) -> Cow<'_, str> {
    html_escape::encode_text(raw)
}

pub fn escape_attr(raw: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(raw)
}
