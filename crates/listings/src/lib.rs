//! Pet listings domain module (Lost/Found posts).
//!
//! This crate contains the rules for listings (validation, partial updates,
//! counters, filtering) implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod filter;
pub mod listing;

pub use filter::{LISTING_PAGE_LIMIT, ListingFilter, OwnerScope, newest_first};
pub use listing::{
    ImageRef, ListingParts, ListingPatch, ListingStatus, MAX_DESCRIPTION_LEN, NewListing,
    PetListing, Species, parse_last_seen,
};
