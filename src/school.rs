/*!
The school directory: name-keyed get-or-create and the resolution rules
that tie a student request to a school row.
*/
use crate::error::Error;
use crate::store::Store;
use crate::user::{Role, School};

/**
Fetch the school called `name`, creating it if it doesn't exist yet.

Names are trimmed before lookup, so `" Acme "` and `"Acme"` land on the
same row. Concurrent calls with the same name resolve to one school; the
store's insert-if-absent carries that guarantee.
*/
pub async fn get_or_create(store: &Store, name: &str) -> Result<School, Error> {
    log::trace!("school::get_or_create( [ Store ], {:?} ) called.", name);

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument("School name is required".to_owned()));
    }

    let school = store.get_or_create_school(name).await?;
    log::info!("School {:?} resolves to id {}.", &school.name, school.id);
    Ok(school)
}

pub async fn list_all(store: &Store) -> Result<Vec<School>, Error> {
    log::trace!("school::list_all( [ Store ] ) called.");

    Ok(store.get_all_schools().await?)
}

/**
Figure out which school (if any) a create or update request refers to.

An explicit `school_id` wins and must exist; failing that, a non-blank
`school_name` is resolved through [`get_or_create`]. With neither, only a
SUPERADMIN may go schoolless; every other role requires one.
*/
pub async fn resolve(
    store: &Store,
    school_id: Option<i64>,
    school_name: Option<&str>,
    role: Role,
) -> Result<Option<School>, Error> {
    log::trace!(
        "school::resolve( [ Store ], {:?}, {:?}, {} ) called.",
        &school_id, &school_name, role
    );

    if let Some(id) = school_id {
        return match store.get_school_by_id(id).await? {
            Some(school) => Ok(Some(school)),
            None => Err(Error::InvalidArgument("School not found".to_owned())),
        };
    }

    if let Some(name) = school_name {
        if !name.trim().is_empty() {
            return Ok(Some(get_or_create(store, name).await?));
        }
    }

    if role == Role::Superadmin {
        return Ok(None);
    }

    Err(Error::InvalidArgument("School is required".to_owned()))
}
