/*!
`Store` methods for the schools table.

```sql
CREATE TABLE schools (
    id   BIGSERIAL PRIMARY KEY,
    name TEXT UNIQUE NOT NULL
);
```
*/
use tokio_postgres::Row;

use super::{DbError, Store};
use crate::user::School;

fn school_from_row(row: &Row) -> Result<School, DbError> {
    Ok(School {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}

impl Store {
    pub async fn get_school_by_id(&self, id: i64) -> Result<Option<School>, DbError> {
        log::trace!("Store::get_school_by_id( {} ) called.", id);

        let client = self.connect().await?;
        match client.query_opt(
            "SELECT id, name FROM schools WHERE id = $1",
            &[&id]
        ).await? {
            Some(row) => Ok(Some(school_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /**
    Fetch the school called `name`, inserting it first if it isn't there.

    The UNIQUE constraint on `schools.name` backstops the lookup/insert
    race: if a concurrent caller's insert lands first, ours comes back
    empty and the next pass of the loop finds the winner's row.
    */
    pub async fn get_or_create_school(&self, name: &str) -> Result<School, DbError> {
        log::trace!("Store::get_or_create_school( {:?} ) called.", name);

        let client = self.connect().await?;

        loop {
            if let Some(row) = client.query_opt(
                "SELECT id, name FROM schools WHERE name = $1",
                &[&name]
            ).await? {
                return school_from_row(&row);
            }

            let inserted = client.query_opt(
                "INSERT INTO schools (name) VALUES ($1)
                    ON CONFLICT (name) DO NOTHING
                    RETURNING id, name",
                &[&name]
            ).await.map_err(|e| DbError::from(e)
                .annotate("Error inserting school"))?;

            if let Some(row) = inserted {
                log::trace!("    ...inserted new school {:?}.", name);
                return school_from_row(&row);
            }
        }
    }

    pub async fn get_all_schools(&self) -> Result<Vec<School>, DbError> {
        log::trace!("Store::get_all_schools() called.");

        let client = self.connect().await?;
        let rows = client.query("SELECT id, name FROM schools", &[]).await?;

        let mut schools: Vec<School> = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            schools.push(school_from_row(row)?);
        }

        Ok(schools)
    }
}
