use axum::extract::Multipart;
use serde::Deserialize;

use petconnect_infra::ImageUpload;
use petconnect_listings::{ListingPatch, ListingStatus, NewListing, Species, parse_last_seen};

use crate::app::errors::ServiceError;

/// Multipart field carrying the listing image.
pub const IMAGE_FIELD: &str = "image";

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListPetsQuery {
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub species: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MyPostsQuery {
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(rename = "petId", default)]
    pub pet_id: String,
    #[serde(default)]
    pub text: String,
}

/// Listing fields as sent by clients, either as multipart text fields or as
/// a JSON body. Everything is optional here; required-ness is decided by
/// whether the fields feed a create or an update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetFields {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub species: Option<String>,
    pub breed: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub contact: Option<String>,
    pub last_seen_date: Option<String>,
    pub is_resolved: Option<bool>,
}

impl PetFields {
    pub fn into_new_listing(self) -> Result<NewListing, ServiceError> {
        let species: Species = supplied(self.species.as_deref())
            .ok_or_else(|| ServiceError::Validation("type is required".to_string()))?
            .parse()?;
        let status: ListingStatus = supplied(self.status.as_deref())
            .ok_or_else(|| ServiceError::Validation("status is required".to_string()))?
            .parse()?;
        let last_seen_date = supplied(self.last_seen_date.as_deref())
            .map(parse_last_seen)
            .transpose()?;

        Ok(NewListing {
            name: self.name.unwrap_or_default(),
            species,
            breed: self.breed,
            status,
            description: self.description.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            city: self.city.unwrap_or_default(),
            contact: self.contact.unwrap_or_default(),
            last_seen_date,
        })
    }

    pub fn into_patch(self) -> Result<ListingPatch, ServiceError> {
        Ok(ListingPatch {
            species: supplied(self.species.as_deref()).map(str::parse).transpose()?,
            status: supplied(self.status.as_deref()).map(str::parse).transpose()?,
            last_seen_date: supplied(self.last_seen_date.as_deref())
                .map(parse_last_seen)
                .transpose()?,
            name: self.name,
            breed: self.breed,
            description: self.description,
            location: self.location,
            city: self.city,
            contact: self.contact,
            is_resolved: self.is_resolved,
        })
    }
}

/// A parsed multipart listing form.
#[derive(Debug, Default)]
pub struct PetForm {
    pub fields: PetFields,
    pub image: Option<ImageUpload>,
}

impl PetForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ServiceError> {
        let mut form = PetForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == IMAGE_FIELD {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let file_name = field.file_name().filter(|n| !n.is_empty()).map(str::to_string);
                let bytes = field.bytes().await?;
                // Browsers send an empty, nameless part when no file was picked.
                if bytes.is_empty() && file_name.is_none() {
                    continue;
                }
                form.image = Some(ImageUpload {
                    bytes,
                    content_type,
                    file_name,
                });
                continue;
            }

            let value = field.text().await?;
            let fields = &mut form.fields;
            match name.as_str() {
                "name" => fields.name = Some(value),
                "type" => fields.species = Some(value),
                "breed" => fields.breed = Some(value),
                "status" => fields.status = Some(value),
                "description" => fields.description = Some(value),
                "location" => fields.location = Some(value),
                "city" => fields.city = Some(value),
                "contact" => fields.contact = Some(value),
                "lastSeenDate" => fields.last_seen_date = Some(value),
                "isResolved" => fields.is_resolved = parse_flag(&value)?,
                other => tracing::debug!(field = other, "ignoring unknown form field"),
            }
        }

        Ok(form)
    }
}

fn supplied(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_flag(raw: &str) -> Result<Option<bool>, ServiceError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" => Ok(Some(true)),
        "false" | "0" => Ok(Some(false)),
        _ => Err(ServiceError::Validation("isResolved must be true or false".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> PetFields {
        PetFields {
            name: Some("Bruno".into()),
            species: Some("Dog".into()),
            breed: None,
            status: Some("Lost".into()),
            description: Some("Brown labrador with a red collar".into()),
            location: Some("Carter Road".into()),
            city: Some("Mumbai".into()),
            contact: Some("555-0101".into()),
            last_seen_date: Some("2024-02-10".into()),
            is_resolved: None,
        }
    }

    #[test]
    fn complete_fields_become_a_new_listing() {
        let draft = complete().into_new_listing().unwrap();
        assert_eq!(draft.species, Species::Dog);
        assert_eq!(draft.status, ListingStatus::Lost);
        assert!(draft.last_seen_date.is_some());
        draft.validate().unwrap();
    }

    #[test]
    fn missing_enums_are_validation_errors() {
        let fields = PetFields {
            species: None,
            ..complete()
        };
        assert!(matches!(fields.into_new_listing(), Err(ServiceError::Validation(m)) if m == "type is required"));

        let fields = PetFields {
            status: Some("Stolen".into()),
            ..complete()
        };
        assert!(matches!(fields.into_new_listing(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn patch_ignores_blank_enum_values() {
        let patch = PetFields {
            species: Some(" ".into()),
            status: Some("Found".into()),
            is_resolved: Some(true),
            ..Default::default()
        }
        .into_patch()
        .unwrap();
        assert_eq!(patch.species, None);
        assert_eq!(patch.status, Some(ListingStatus::Found));
        assert_eq!(patch.is_resolved, Some(true));
    }

    #[test]
    fn json_body_uses_client_field_names() {
        let fields: PetFields =
            serde_json::from_str(r#"{"type":"Cat","isResolved":true,"lastSeenDate":"2024-01-05"}"#).unwrap();
        assert_eq!(fields.species.as_deref(), Some("Cat"));
        assert_eq!(fields.is_resolved, Some(true));
        assert_eq!(fields.last_seen_date.as_deref(), Some("2024-01-05"));
    }

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag("TRUE").unwrap(), Some(true));
        assert_eq!(parse_flag("0").unwrap(), Some(false));
        assert_eq!(parse_flag("").unwrap(), None);
        assert!(parse_flag("maybe").is_err());
    }
}
