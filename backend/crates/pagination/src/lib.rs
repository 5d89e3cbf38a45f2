//! Opaque cursors and page envelopes for keyset-paginated endpoints.
//!
//! Endpoints fetch one row more than the requested limit, hand the rows to
//! [`Page::from_probe`], and receive a page whose `next_cursor` encodes the
//! ordering key of the last returned row. Clients treat cursors as opaque
//! strings and echo them back unchanged.

mod cursor;
mod page;

pub use cursor::{Cursor, CursorError};
pub use page::{LimitBounds, Page, PageRequest, PaginationError};
