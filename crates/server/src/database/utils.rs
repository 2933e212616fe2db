use crate::error::{Entity, RequestError};

pub fn map_not_found_as_none<T>(result: Result<T, sqlx::Error>) -> Result<Option<T>, sqlx::Error> {
    match result {
        Ok(ok) => Ok(Some(ok)),
        Err(e) => {
            if matches!(e, sqlx::Error::RowNotFound) {
                Ok(None)
            } else {
                Err(e)
            }
        }
    }
}

/// Turns a dangling foreign key into a `NotFound` for the referenced row.
pub fn map_foreign_key_violation<I: ToString>(
    entity: Entity,
    id: I,
) -> impl FnOnce(sqlx::Error) -> RequestError {
    move |e| {
        let dangling = e
            .as_database_error()
            .is_some_and(|db_error| db_error.is_foreign_key_violation());
        if dangling {
            RequestError::not_found(entity, id)
        } else {
            e.into()
        }
    }
}
