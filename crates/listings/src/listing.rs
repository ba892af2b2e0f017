use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use petconnect_core::{DomainError, DomainResult, Entity, PetId, UserId};

/// Upper bound on the free-text description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Kind of animal a listing is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Dog,
    Cat,
    Bird,
    Rabbit,
    Other,
}

impl Species {
    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Dog => "Dog",
            Species::Cat => "Cat",
            Species::Bird => "Bird",
            Species::Rabbit => "Rabbit",
            Species::Other => "Other",
        }
    }
}

impl core::fmt::Display for Species {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Species {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Dog" => Ok(Species::Dog),
            "Cat" => Ok(Species::Cat),
            "Bird" => Ok(Species::Bird),
            "Rabbit" => Ok(Species::Rabbit),
            "Other" => Ok(Species::Other),
            _ => Err(DomainError::validation(
                "type must be one of: Dog, Cat, Bird, Rabbit, Other",
            )),
        }
    }
}

/// Whether the pet was lost by its owner or found by someone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingStatus {
    Lost,
    Found,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Lost => "Lost",
            ListingStatus::Found => "Found",
        }
    }
}

impl core::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ListingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Lost" => Ok(ListingStatus::Lost),
            "Found" => Ok(ListingStatus::Found),
            _ => Err(DomainError::validation("status must be one of: Lost, Found")),
        }
    }
}

/// Reference to an image held by the media backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(rename = "imageUrl")]
    pub url: String,
    /// Provider-side id used to destroy the image; `None` for external urls.
    #[serde(rename = "imagePublicId")]
    pub public_id: Option<String>,
}

/// Parse a last-seen date as sent by clients.
///
/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_last_seen(raw: &str) -> DomainResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| DomainError::validation("lastSeenDate must be a date (YYYY-MM-DD) or RFC 3339 timestamp"))
}

/// Payload for a new listing (everything the poster supplies except the image).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListing {
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub status: ListingStatus,
    pub description: String,
    pub location: String,
    pub city: String,
    pub contact: String,
    pub last_seen_date: Option<DateTime<Utc>>,
}

impl NewListing {
    /// Check required fields and bounds without consuming the payload.
    ///
    /// Services call this before uploading the image so that an invalid
    /// post never leaves an orphaned upload behind.
    pub fn validate(&self) -> DomainResult<()> {
        required("name", &self.name)?;
        required("description", &self.description)?;
        required("location", &self.location)?;
        required("city", &self.city)?;
        required("contact", &self.contact)?;
        check_description(&self.description)
    }
}

/// Partial update. `None` (or a blank string) leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPatch {
    pub name: Option<String>,
    pub species: Option<Species>,
    pub breed: Option<String>,
    pub status: Option<ListingStatus>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub contact: Option<String>,
    pub last_seen_date: Option<DateTime<Utc>>,
    pub is_resolved: Option<bool>,
}

/// Plain field bag used by persistence adapters to rehydrate a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingParts {
    pub id: PetId,
    pub owner_id: UserId,
    pub owner_name: String,
    pub name: String,
    pub species: Species,
    pub breed: String,
    pub status: ListingStatus,
    pub description: String,
    pub location: String,
    pub city: String,
    pub contact: String,
    pub image: ImageRef,
    pub last_seen_date: DateTime<Utc>,
    pub views: u64,
    pub shares: u64,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// A Lost/Found pet post.
///
/// # Invariants
/// - The owner (`owner_id`) is fixed at creation; no operation changes it.
/// - `views` and `shares` only ever increase.
/// - `name`, `description`, `location`, `city` and `contact` are never blank,
///   and `description` is at most [`MAX_DESCRIPTION_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PetListing {
    id: PetId,
    #[serde(rename = "userId")]
    owner_id: UserId,
    #[serde(rename = "userName")]
    owner_name: String,
    name: String,
    #[serde(rename = "type")]
    species: Species,
    breed: String,
    status: ListingStatus,
    description: String,
    location: String,
    city: String,
    contact: String,
    #[serde(flatten)]
    image: ImageRef,
    last_seen_date: DateTime<Utc>,
    views: u64,
    shares: u64,
    is_resolved: bool,
    created_at: DateTime<Utc>,
}

impl PetListing {
    /// Create a fresh, unresolved listing with zeroed counters.
    pub fn create(
        id: PetId,
        owner_id: UserId,
        owner_name: impl Into<String>,
        draft: NewListing,
        image: ImageRef,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        draft.validate()?;

        Ok(Self {
            id,
            owner_id,
            owner_name: owner_name.into(),
            name: draft.name.trim().to_string(),
            species: draft.species,
            breed: draft.breed.map(|b| b.trim().to_string()).unwrap_or_default(),
            status: draft.status,
            description: draft.description.trim().to_string(),
            location: draft.location.trim().to_string(),
            city: draft.city.trim().to_string(),
            contact: draft.contact.trim().to_string(),
            image,
            last_seen_date: draft.last_seen_date.unwrap_or(now),
            views: 0,
            shares: 0,
            is_resolved: false,
            created_at: now,
        })
    }

    pub fn restore(parts: ListingParts) -> Self {
        Self {
            id: parts.id,
            owner_id: parts.owner_id,
            owner_name: parts.owner_name,
            name: parts.name,
            species: parts.species,
            breed: parts.breed,
            status: parts.status,
            description: parts.description,
            location: parts.location,
            city: parts.city,
            contact: parts.contact,
            image: parts.image,
            last_seen_date: parts.last_seen_date,
            views: parts.views,
            shares: parts.shares,
            is_resolved: parts.is_resolved,
            created_at: parts.created_at,
        }
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn breed(&self) -> &str {
        &self.breed
    }

    pub fn status(&self) -> ListingStatus {
        self.status
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn last_seen_date(&self) -> DateTime<Utc> {
        self.last_seen_date
    }

    pub fn views(&self) -> u64 {
        self.views
    }

    pub fn shares(&self) -> u64 {
        self.shares
    }

    pub fn is_resolved(&self) -> bool {
        self.is_resolved
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Apply a partial update.
    ///
    /// The whole patch is validated before any field is written, so a
    /// rejected patch leaves the listing untouched.
    pub fn apply_patch(&mut self, patch: ListingPatch) -> DomainResult<()> {
        let name = non_blank(patch.name);
        let breed = non_blank(patch.breed);
        let description = non_blank(patch.description);
        let location = non_blank(patch.location);
        let city = non_blank(patch.city);
        let contact = non_blank(patch.contact);

        if let Some(description) = &description {
            check_description(description)?;
        }

        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = patch.species {
            self.species = v;
        }
        if let Some(v) = breed {
            self.breed = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = description {
            self.description = v;
        }
        if let Some(v) = location {
            self.location = v;
        }
        if let Some(v) = city {
            self.city = v;
        }
        if let Some(v) = contact {
            self.contact = v;
        }
        if let Some(v) = patch.last_seen_date {
            self.last_seen_date = v;
        }
        if let Some(v) = patch.is_resolved {
            self.is_resolved = v;
        }
        Ok(())
    }

    /// Swap in a new image, returning the one it replaces.
    pub fn replace_image(&mut self, image: ImageRef) -> ImageRef {
        core::mem::replace(&mut self.image, image)
    }

    pub fn record_view(&mut self) -> u64 {
        self.views = self.views.saturating_add(1);
        self.views
    }

    pub fn record_share(&mut self) -> u64 {
        self.shares = self.shares.saturating_add(1);
        self.shares
    }

    /// Take ownership, counters and creation time from the stored copy.
    ///
    /// Editable fields are left as they are. Counters never move backwards,
    /// even when `stored` is older than `self`.
    pub fn carry_tracked_fields(&mut self, stored: &PetListing) {
        self.owner_id = stored.owner_id;
        self.owner_name.clone_from(&stored.owner_name);
        self.created_at = stored.created_at;
        self.views = self.views.max(stored.views);
        self.shares = self.shares.max(stored.shares);
    }
}

impl Entity for PetListing {
    type Id = PetId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn required(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(())
}

fn check_description(description: &str) -> DomainResult<()> {
    if description.trim().chars().count() > MAX_DESCRIPTION_LEN {
        return Err(DomainError::validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn draft() -> NewListing {
        NewListing {
            name: "  Bruno ".to_string(),
            species: Species::Dog,
            breed: Some("Labrador".to_string()),
            status: ListingStatus::Lost,
            description: "Brown lab with a red collar".to_string(),
            location: "Near Juhu beach".to_string(),
            city: "Mumbai".to_string(),
            contact: "+91 98200 00000".to_string(),
            last_seen_date: None,
        }
    }

    fn image(id: &str) -> ImageRef {
        ImageRef {
            url: format!("https://img.example/{id}.jpg"),
            public_id: Some(id.to_string()),
        }
    }

    fn listing() -> PetListing {
        PetListing::create(PetId::new(), UserId::new(), "Asha", draft(), image("a"), test_time()).unwrap()
    }

    #[test]
    fn create_starts_with_zero_counters_and_unresolved() {
        let l = listing();
        assert_eq!(l.views(), 0);
        assert_eq!(l.shares(), 0);
        assert!(!l.is_resolved());
        assert_eq!(l.name(), "Bruno");
        assert_eq!(l.owner_name(), "Asha");
        assert_eq!(l.last_seen_date(), test_time());
        assert_eq!(l.created_at(), test_time());
    }

    #[test]
    fn create_defaults_missing_breed_to_empty() {
        let mut d = draft();
        d.breed = None;
        let l = PetListing::create(PetId::new(), UserId::new(), "Asha", d, image("a"), test_time()).unwrap();
        assert_eq!(l.breed(), "");
    }

    #[test]
    fn create_rejects_blank_required_fields() {
        for field in ["name", "description", "location", "city", "contact"] {
            let mut d = draft();
            match field {
                "name" => d.name = "   ".to_string(),
                "description" => d.description = String::new(),
                "location" => d.location = String::new(),
                "city" => d.city = " ".to_string(),
                _ => d.contact = String::new(),
            }
            let err = PetListing::create(PetId::new(), UserId::new(), "Asha", d, image("a"), test_time())
                .unwrap_err();
            assert_eq!(err, DomainError::validation(format!("{field} is required")));
        }
    }

    #[test]
    fn create_rejects_overlong_description() {
        let mut d = draft();
        d.description = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        let err = PetListing::create(PetId::new(), UserId::new(), "Asha", d, image("a"), test_time())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn description_limit_counts_characters_not_bytes() {
        let mut d = draft();
        d.description = "é".repeat(MAX_DESCRIPTION_LEN);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn patch_only_overwrites_supplied_fields() {
        let mut l = listing();
        let owner = l.owner_id();
        l.apply_patch(ListingPatch {
            city: Some("Pune".to_string()),
            name: Some("".to_string()),
            is_resolved: Some(true),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(l.city(), "Pune");
        assert_eq!(l.name(), "Bruno");
        assert!(l.is_resolved());
        assert_eq!(l.owner_id(), owner);
    }

    #[test]
    fn rejected_patch_leaves_listing_untouched() {
        let mut l = listing();
        let before = l.clone();
        let err = l
            .apply_patch(ListingPatch {
                city: Some("Pune".to_string()),
                description: Some("y".repeat(MAX_DESCRIPTION_LEN + 10)),
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(l, before);
    }

    #[test]
    fn is_resolved_can_be_reset_to_false() {
        let mut l = listing();
        l.apply_patch(ListingPatch { is_resolved: Some(true), ..Default::default() }).unwrap();
        l.apply_patch(ListingPatch { is_resolved: Some(false), ..Default::default() }).unwrap();
        assert!(!l.is_resolved());
    }

    #[test]
    fn counters_increase_by_one() {
        let mut l = listing();
        assert_eq!(l.record_view(), 1);
        assert_eq!(l.record_view(), 2);
        assert_eq!(l.record_share(), 1);
        assert_eq!(l.views(), 2);
        assert_eq!(l.shares(), 1);
    }

    #[test]
    fn carried_fields_come_from_the_stored_copy() {
        let stored = {
            let mut l = listing();
            l.record_view();
            l.record_view();
            l.record_share();
            l
        };
        let mut edited = stored.clone();
        edited.views = 0;
        edited.shares = 0;
        edited.owner_id = UserId::new();
        edited.created_at = test_time() + chrono::Duration::days(1);
        edited
            .apply_patch(ListingPatch { city: Some("Pune".to_string()), ..Default::default() })
            .unwrap();

        edited.carry_tracked_fields(&stored);

        assert_eq!(edited.views(), 2);
        assert_eq!(edited.shares(), 1);
        assert_eq!(edited.owner_id(), stored.owner_id());
        assert_eq!(edited.created_at(), stored.created_at());
        assert_eq!(edited.city(), "Pune");
    }

    #[test]
    fn replace_image_returns_previous() {
        let mut l = listing();
        let old = l.replace_image(image("b"));
        assert_eq!(old, image("a"));
        assert_eq!(l.image(), &image("b"));
    }

    #[test]
    fn parse_last_seen_accepts_date_and_timestamp() {
        assert_eq!(
            parse_last_seen("2024-03-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(parse_last_seen("2024-03-01T12:00:00Z").unwrap(), test_time());
        assert!(parse_last_seen("yesterday").is_err());
    }

    #[test]
    fn species_and_status_parse_exactly() {
        assert_eq!("Rabbit".parse::<Species>().unwrap(), Species::Rabbit);
        assert!("dog".parse::<Species>().is_err());
        assert_eq!("Found".parse::<ListingStatus>().unwrap(), ListingStatus::Found);
        assert!("Stolen".parse::<ListingStatus>().is_err());
    }

    #[test]
    fn serializes_in_client_shape() {
        let l = listing();
        let json = serde_json::to_value(&l).unwrap();
        assert_eq!(json["type"], "Dog");
        assert_eq!(json["status"], "Lost");
        assert_eq!(json["userName"], "Asha");
        assert_eq!(json["imageUrl"], "https://img.example/a.jpg");
        assert_eq!(json["imagePublicId"], "a");
        assert_eq!(json["isResolved"], false);
        assert_eq!(json["views"], 0);
        assert!(json.get("lastSeenDate").is_some());
        assert!(json.get("createdAt").is_some());
    }
}
