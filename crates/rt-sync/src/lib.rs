//! Round-trip synchronization between Confluence and local files.
//!
//! - [`Puller`]: fetches pages and writes formatted `page.xml` working copies
//! - [`diff_tree`]: compares working copies with the pulled snapshot or the
//!   live page
//! - [`Pusher`]: sends changed working copies back with a version message
//!
//! All remote access goes through [`rt_confluence::ContentStore`].
//!
//! ```ignore
//! use rt_sync::{Pusher, PushOptions, Puller, PullOptions};
//!
//! let puller = Puller::new(&client, "confluence-export", PullOptions::default());
//! puller.pull_page("123")?;
//!
//! // ...edit confluence-export/SPACE/Page/page.xml...
//!
//! let dirs = Pusher::collect(Path::new("confluence-export/SPACE/Page"), false)?;
//! let result = Pusher::new(&client, PushOptions::default()).push(&dirs, "Fix typo")?;
//! ```

mod attachments;
mod changeset;
mod diff;
mod error;
mod pull;
mod push;
pub mod workspace;
pub mod xml;

pub use changeset::ChangeSet;
pub use diff::{DiffBase, DiffResult, PageDiff, RemoteOnly, diff_page, diff_tree};
pub use error::SyncError;
pub use pull::{PullOptions, PullResult, Puller};
pub use push::{
    Decision, PagePlan, PushOptions, PushPlan, PushResult, Pusher, validate_message,
};
pub use workspace::{DocumentState, LocalPage, document_state, find_page_dir};
