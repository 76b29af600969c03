//! Confluence API types.
//!
//! Every type keeps the fields it does not model in an `extra` map, so a
//! response can be written to disk and read back without losing anything.

mod attachment;
mod page;
mod space;

pub use attachment::{Attachment, AttachmentExtensions, AttachmentsResponse};
pub use page::{Ancestor, Body, ContentRef, Links, Page, SearchResponse, SpaceRef, Storage, Version};
pub use space::{Homepage, Space, SpacesResponse};
