//! Page requests and page envelopes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::cursor::{Cursor, CursorError};

/// Query parameter carrying the opaque cursor.
const CURSOR_PARAM: &str = "cursor";
/// Query parameter carrying the page size.
const LIMIT_PARAM: &str = "limit";

/// Validation failures for incoming page requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// The requested limit is outside the endpoint bounds.
    #[error("limit must be between 1 and {max}, got {requested}")]
    LimitOutOfRange {
        /// Value supplied by the caller.
        requested: usize,
        /// Largest accepted value.
        max: usize,
    },
    /// The cursor could not be decoded.
    #[error("invalid cursor: {0}")]
    Cursor(#[from] CursorError),
}

/// Default and maximum page sizes for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitBounds {
    default: usize,
    max: usize,
}

impl LimitBounds {
    /// Build bounds, clamping the default into `1..=max`.
    pub fn new(default: usize, max: usize) -> Self {
        let max = max.max(1);
        Self {
            default: default.clamp(1, max),
            max,
        }
    }

    /// Page size used when the caller omits `limit`.
    pub const fn default_limit(self) -> usize {
        self.default
    }

    /// Largest accepted page size.
    pub const fn max_limit(self) -> usize {
        self.max
    }
}

/// Validated page request positioned after an optional key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<K> {
    limit: usize,
    after: Option<K>,
}

impl<K> PageRequest<K> {
    /// Start at the first page with the given limit.
    pub const fn first(limit: usize) -> Self {
        Self { limit, after: None }
    }

    /// Continue after `key`.
    pub const fn after(limit: usize, key: K) -> Self {
        Self {
            limit,
            after: Some(key),
        }
    }

    /// Number of items the caller wants.
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Rows an adapter should fetch to detect a following page.
    pub const fn probe_limit(&self) -> usize {
        self.limit.saturating_add(1)
    }

    /// Key of the last item on the previous page.
    pub const fn after_key(&self) -> Option<&K> {
        self.after.as_ref()
    }
}

impl<K: DeserializeOwned> PageRequest<K> {
    /// Validate raw query values against `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::LimitOutOfRange`] for a zero or oversized
    /// limit and [`PaginationError::Cursor`] for an undecodable cursor.
    ///
    /// # Examples
    ///
    /// ```
    /// use pagination::{LimitBounds, PageRequest};
    ///
    /// let request: PageRequest<i64> =
    ///     PageRequest::parse(None, None, LimitBounds::new(25, 100)).expect("valid");
    /// assert_eq!(request.limit(), 25);
    /// assert!(request.after_key().is_none());
    /// ```
    pub fn parse(
        limit: Option<usize>,
        cursor: Option<&str>,
        bounds: LimitBounds,
    ) -> Result<Self, PaginationError> {
        let limit = limit.unwrap_or(bounds.default_limit());
        if limit == 0 || limit > bounds.max_limit() {
            return Err(PaginationError::LimitOutOfRange {
                requested: limit,
                max: bounds.max_limit(),
            });
        }
        let after = match cursor.filter(|raw| !raw.trim().is_empty()) {
            Some(raw) => Some(Cursor::<K>::decode(raw)?.into_key()),
            None => None,
        };
        Ok(Self { limit, after })
    }
}

/// One page of results plus the cursor for the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Build a page from rows fetched with [`PageRequest::probe_limit`].
    ///
    /// Rows beyond `limit` are dropped; their presence means another page
    /// exists, so the cursor is taken from the last kept row.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Serialise`] when the key cannot be encoded.
    ///
    /// # Examples
    ///
    /// ```
    /// use pagination::Page;
    ///
    /// let page = Page::from_probe(vec![1, 2, 3], 2, |n| *n).expect("encodes");
    /// assert_eq!(page.items(), &[1, 2]);
    /// assert!(page.next_cursor().is_some());
    /// ```
    pub fn from_probe<K, F>(mut rows: Vec<T>, limit: usize, key_of: F) -> Result<Self, CursorError>
    where
        K: Serialize,
        F: Fn(&T) -> K,
    {
        if rows.len() <= limit {
            return Ok(Self {
                items: rows,
                next_cursor: None,
            });
        }
        rows.truncate(limit);
        let next_cursor = match rows.last() {
            Some(last) => Some(Cursor::new(key_of(last)).encode()?),
            None => None,
        };
        Ok(Self {
            items: rows,
            next_cursor,
        })
    }

    /// Items on this page.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Cursor for the following page, if any.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    /// Transform every item while keeping the cursor.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }

    /// Split into items and cursor.
    pub fn into_parts(self) -> (Vec<T>, Option<String>) {
        (self.items, self.next_cursor)
    }

    /// Build the URL of the next page from the current request URL.
    ///
    /// Existing `cursor` and `limit` parameters are replaced; other query
    /// parameters are preserved.
    pub fn next_link(&self, current: &Url, limit: usize) -> Option<Url> {
        let cursor = self.next_cursor.as_deref()?;
        let retained: Vec<(String, String)> = current
            .query_pairs()
            .filter(|(name, _)| name != CURSOR_PARAM && name != LIMIT_PARAM)
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        let mut next = current.clone();
        next.query_pairs_mut()
            .clear()
            .extend_pairs(retained)
            .append_pair(LIMIT_PARAM, &limit.to_string())
            .append_pair(CURSOR_PARAM, cursor);
        Some(next)
    }
}
