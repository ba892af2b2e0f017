//! Browse/search rules for listings.
//!
//! These rules are shared by every store adapter: the in-memory store applies
//! [`ListingFilter::select`] directly, the SQL store translates the same
//! predicate into a `WHERE` clause.

use core::str::FromStr;

use petconnect_core::{DomainError, DomainResult, Entity};

use crate::listing::{ListingStatus, PetListing, Species};

/// Maximum number of listings returned by a browse query. There is no cursor.
pub const LISTING_PAGE_LIMIT: usize = 50;

/// Public browse filters. Every `None` means "not supplied".
///
/// Resolved listings are always excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    /// Case-insensitive substring of the city.
    pub city: Option<String>,
    pub species: Option<Species>,
    pub status: Option<ListingStatus>,
    /// Case-insensitive substring of name, description or breed.
    pub search: Option<String>,
}

impl ListingFilter {
    /// Build a filter from raw query values, treating blank values as absent.
    pub fn from_query(
        city: Option<&str>,
        species: Option<&str>,
        status: Option<&str>,
        search: Option<&str>,
    ) -> DomainResult<Self> {
        Ok(Self {
            city: supplied(city).map(str::to_string),
            species: supplied(species).map(Species::from_str).transpose()?,
            status: supplied(status).map(ListingStatus::from_str).transpose()?,
            search: supplied(search).map(str::to_string),
        })
    }

    pub fn matches(&self, listing: &PetListing) -> bool {
        if listing.is_resolved() {
            return false;
        }
        if let Some(city) = &self.city {
            if !contains_ignore_case(listing.city(), city) {
                return false;
            }
        }
        if let Some(species) = self.species {
            if listing.species() != species {
                return false;
            }
        }
        if let Some(status) = self.status {
            if listing.status() != status {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let hit = contains_ignore_case(listing.name(), search)
                || contains_ignore_case(listing.description(), search)
                || contains_ignore_case(listing.breed(), search);
            if !hit {
                return false;
            }
        }
        true
    }

    /// Filter, order newest-first and cap at [`LISTING_PAGE_LIMIT`].
    pub fn select(&self, listings: impl IntoIterator<Item = PetListing>) -> Vec<PetListing> {
        let mut hits: Vec<PetListing> = listings.into_iter().filter(|l| self.matches(l)).collect();
        newest_first(&mut hits);
        hits.truncate(LISTING_PAGE_LIMIT);
        hits
    }
}

/// Which of the caller's own listings to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OwnerScope {
    #[default]
    All,
    /// Not yet resolved.
    Active,
    Resolved,
}

impl OwnerScope {
    pub fn includes(&self, listing: &PetListing) -> bool {
        match self {
            OwnerScope::All => true,
            OwnerScope::Active => !listing.is_resolved(),
            OwnerScope::Resolved => listing.is_resolved(),
        }
    }
}

impl FromStr for OwnerScope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(OwnerScope::All),
            "active" => Ok(OwnerScope::Active),
            "resolved" => Ok(OwnerScope::Resolved),
            _ => Err(DomainError::validation("state must be one of: all, active, resolved")),
        }
    }
}

/// Sort by creation time, newest first. Ties fall back to the (time-ordered) id.
pub fn newest_first(listings: &mut [PetListing]) {
    listings.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().as_uuid().cmp(a.id().as_uuid()))
    });
}

fn supplied(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
