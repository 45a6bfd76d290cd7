//! Read-only access to the page-structured store file.
pub mod cursor;
pub mod header;
pub mod page;
pub mod pager;
pub mod record;
pub mod scanner;
pub mod varint;
