//! Comments domain module.
//!
//! Comments hang off a listing and are owned by their author. Existence of the
//! listing is checked by the caller (it needs a store); everything else lives here.

pub mod comment;

pub use comment::{Comment, MAX_COMMENT_LEN, newest_first};
