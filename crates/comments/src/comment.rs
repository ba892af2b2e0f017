use chrono::{DateTime, Utc};
use serde::Serialize;

use petconnect_core::{CommentId, DomainError, DomainResult, Entity, PetId, UserId};

/// Upper bound on comment text, in characters.
pub const MAX_COMMENT_LEN: usize = 500;

/// A comment on a pet listing.
///
/// `author_name` is a snapshot taken when the comment is written; later
/// display-name changes do not rewrite old comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub pet_id: PetId,
    #[serde(rename = "userId")]
    pub author_id: UserId,
    #[serde(rename = "userName")]
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        id: CommentId,
        pet_id: PetId,
        author_id: UserId,
        author_name: impl Into<String>,
        text: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("Comment cannot be empty"));
        }
        if text.chars().count() > MAX_COMMENT_LEN {
            return Err(DomainError::validation(format!(
                "Comment must be at most {MAX_COMMENT_LEN} characters"
            )));
        }

        Ok(Self {
            id,
            pet_id,
            author_id,
            author_name: author_name.into(),
            text: text.to_string(),
            created_at: now,
        })
    }

    pub fn is_authored_by(&self, user: UserId) -> bool {
        self.author_id == user
    }
}

impl Entity for Comment {
    type Id = CommentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Sort by creation time, newest first.
pub fn newest_first(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 9, 30, 0).unwrap()
    }

    fn comment(text: &str) -> DomainResult<Comment> {
        Comment::new(CommentId::new(), PetId::new(), UserId::new(), "Meera", text, test_time())
    }

    #[test]
    fn empty_text_is_rejected() {
        for text in ["", "   ", "\n\t"] {
            let err = comment(text).unwrap_err();
            assert_eq!(err, DomainError::validation("Comment cannot be empty"));
        }
    }

    #[test]
    fn overlong_text_is_rejected() {
        let err = comment(&"a".repeat(MAX_COMMENT_LEN + 1)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(comment(&"a".repeat(MAX_COMMENT_LEN)).is_ok());
    }

    #[test]
    fn text_is_trimmed_and_author_snapshotted() {
        let c = comment("  Saw him near the station  ").unwrap();
        assert_eq!(c.text, "Saw him near the station");
        assert_eq!(c.author_name, "Meera");
        assert!(c.is_authored_by(c.author_id));
        assert!(!c.is_authored_by(UserId::new()));
    }

    #[test]
    fn newest_first_orders_by_created_at() {
        let pet = PetId::new();
        let author = UserId::new();
        let mut comments: Vec<Comment> = (0..3)
            .map(|i| {
                Comment::new(CommentId::new(), pet, author, "Meera", &format!("c{i}"), test_time() + Duration::minutes(i))
                    .unwrap()
            })
            .collect();

        newest_first(&mut comments);
        let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["c2", "c1", "c0"]);
    }

    #[test]
    fn serializes_in_client_shape() {
        let c = comment("hello").unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["userName"], "Meera");
        assert_eq!(json["text"], "hello");
        assert_eq!(json["petId"], c.pet_id.to_string());
        assert!(json.get("createdAt").is_some());
    }
}
