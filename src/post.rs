use std::fmt::Write;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Appended to every excerpt, truncated or not.
pub const ELLIPSIS: &str = "...";

/// A normalized feed entry, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub link: String,
    pub date: String,
    pub author: String,
    pub thumbnail: Option<String>,
}

/// A feed entry as delivered, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub guid: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub pub_date: String,
    pub author: String,
    pub thumbnail: Option<String>,
}

impl Post {
    pub fn from_raw(raw: RawItem, excerpt_length: usize, date_format: &str) -> Self {
        Self {
            id: raw.guid,
            title: raw.title,
            excerpt: excerpt(&raw.description, excerpt_length),
            link: raw.link,
            date: format_pub_date(&raw.pub_date, date_format),
            author: raw.author,
            thumbnail: raw.thumbnail.filter(|t| !t.is_empty()),
        }
    }
}

/// Outcome of a feed fetch. Failures are values, never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Success { posts: Vec<Post>, total: usize },
    Failure { error: String },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }

    pub fn posts(&self) -> &[Post] {
        match self {
            FetchResult::Success { posts, .. } => posts,
            FetchResult::Failure { .. } => &[],
        }
    }

    pub fn total(&self) -> usize {
        match self {
            FetchResult::Success { total, .. } => *total,
            FetchResult::Failure { .. } => 0,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchResult::Success { .. } => None,
            FetchResult::Failure { error } => Some(error),
        }
    }
}

// Wire shape: {"success": bool, "posts": [...], "total": n} or {"success": false, "posts": [], "error": "..."}
impl Serialize for FetchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FetchResult", 3)?;
        match self {
            FetchResult::Success { posts, total } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("posts", posts)?;
                state.serialize_field("total", total)?;
            }
            FetchResult::Failure { error } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("posts", &Vec::<Post>::new())?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

/// Plain-text summary: tags removed, cut to `max_chars` characters, ellipsis appended.
pub fn excerpt(description: &str, max_chars: usize) -> String {
    let mut text: String = strip_tags(description).chars().take(max_chars).collect();
    text.push_str(ELLIPSIS);
    text
}

/// Remove HTML tags and comments, keeping the text between them.
///
/// A `<` that does not open a tag (followed by whitespace, a digit, or never
/// closed) is kept as text.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match markup_len(candidate) {
            Some(len) => rest = &candidate[len..],
            None => {
                out.push('<');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Byte length of the tag or comment at the start of `s`, if `s` opens one.
fn markup_len(s: &str) -> Option<usize> {
    if let Some(body) = s.strip_prefix("<!--") {
        return body.find("-->").map(|end| 4 + end + 3);
    }

    let opener = s[1..].chars().next()?;
    if !(opener.is_ascii_alphabetic() || matches!(opener, '/' | '!' | '?')) {
        return None;
    }

    let mut quote: Option<char> = None;
    // Where the tag would end if a stray quote never closes
    let mut first_gt: Option<usize> = None;
    for (i, c) in s.char_indices().skip(1) {
        if c == '>' && first_gt.is_none() {
            first_gt = Some(i + 1);
        }
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '>' => return Some(i + 1),
                _ => {}
            },
        }
    }
    first_gt
}

/// Parse the date formats feeds and the JSON proxy emit.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

/// Render a publish date with `format`; unparseable input passes through as-is.
pub fn format_pub_date(raw: &str, format: &str) -> String {
    let Some(published) = parse_pub_date(raw) else {
        return raw.to_string();
    };

    let mut rendered = String::new();
    // An invalid format string surfaces as fmt::Error rather than a panic
    match write!(rendered, "{}", published.format(format)) {
        Ok(()) => rendered,
        Err(_) => raw.to_string(),
    }
}
