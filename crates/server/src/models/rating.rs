use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A single vote, always within `Stars::MIN..=Stars::MAX`.
#[derive(Clone, Debug, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Stars(i16);

impl Stars {
    pub const MIN: i16 = 1;
    pub const MAX: i16 = 5;

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as i16))
        } else {
            Err(ValidationError::InvalidRatingValue(value))
        }
    }

    pub fn get(self) -> i16 {
        self.0
    }
}

impl fmt::Display for Stars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a user currently holds for a resource.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UserRating {
    NotRated,
    Rated { stars: Stars },
}

impl From<Option<Stars>> for UserRating {
    fn from(stars: Option<Stars>) -> Self {
        match stars {
            Some(stars) => Self::Rated { stars },
            None => Self::NotRated,
        }
    }
}

impl UserRating {
    #[cfg(test)]
    pub fn stars(self) -> Option<Stars> {
        match self {
            Self::Rated { stars } => Some(stars),
            Self::NotRated => None,
        }
    }
}

/// Running aggregate kept next to each resource.
#[derive(Clone, Debug, Copy, Default, PartialEq, Eq)]
pub struct RatingAggregate {
    pub count: i64,
    pub sum: i64,
}

impl RatingAggregate {
    pub fn new(count: i64, sum: i64) -> Self {
        Self { count, sum }
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    pub(crate) fn with_added(self, stars: Stars) -> Self {
        Self {
            count: self.count + 1,
            sum: self.sum + i64::from(stars.get()),
        }
    }

    pub(crate) fn with_replaced(self, prev: Stars, stars: Stars) -> Self {
        Self {
            count: self.count,
            sum: self.sum + i64::from(stars.get()) - i64::from(prev.get()),
        }
    }
}

#[derive(Serialize)]
struct RatingAggregateBody {
    rating_count: i64,
    rating_mean: f64,
}

impl Serialize for RatingAggregate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RatingAggregateBody {
            rating_count: self.count,
            rating_mean: self.mean(),
        }
        .serialize(serializer)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AddRatingRequest {
    pub stars: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateRatingRequest {
    pub stars: i64,
    pub prev_stars: i64,
}
