//! Review record written by a user about a place.

use crate::model::kind::Kind;
use crate::model::place::PlaceId;
use crate::model::user::UserId;
use crate::model::validation::{require_non_blank, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub place_id: PlaceId,
    /// Author of the review; the owner for authorization purposes.
    pub user_id: UserId,
    pub rating: u8,
    pub comment: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Review {
    pub fn new(
        place_id: impl Into<PlaceId>,
        user_id: impl Into<UserId>,
        rating: u8,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            place_id: place_id.into(),
            user_id: user_id.into(),
            rating,
            comment: comment.into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank(Kind::Review, "place_id", &self.place_id)?;
        require_non_blank(Kind::Review, "user_id", &self.user_id)?;
        require_non_blank(Kind::Review, "comment", &self.comment)?;
        if !(1..=5).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange(self.rating));
        }
        Ok(())
    }
}
