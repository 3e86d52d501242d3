/*!
Database interaction module.

The Postgres database to which this connects holds the student records
and the schools they reference:

```sql
CREATE TABLE schools (
    id   BIGSERIAL PRIMARY KEY,
    name TEXT UNIQUE NOT NULL
);

CREATE TABLE students (
    id       BIGSERIAL PRIMARY KEY,
    name     TEXT,
    email    TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,       /* salted digest, never plaintext */
    role     TEXT NOT NULL,       /* one of { 'USER', 'ADMIN', 'SUPERADMIN' } */
    school   BIGINT REFERENCES schools(id)
);
```

The UNIQUE constraints on `schools.name` and `students.email` are the
correctness backstop for the get-or-create and registration races; the
methods in `schools.rs` and `students.rs` lean on them.
*/
use std::fmt::Write;

use tokio_postgres::{Client, NoTls};

pub mod schools;
pub mod students;

static SCHEMA: &[(&str, &str, &str)] = &[
    // Schools first; students reference them.

    (
        "SELECT FROM information_schema.tables WHERE table_name = 'schools'",
        "CREATE TABLE schools (
            id   BIGSERIAL PRIMARY KEY,
            name TEXT UNIQUE NOT NULL
        )",
        "DROP TABLE schools",
    ),

    (
        "SELECT FROM information_schema.tables WHERE table_name = 'students'",
        "CREATE TABLE students (
            id       BIGSERIAL PRIMARY KEY,
            name     TEXT,
            email    TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL,
            role     TEXT NOT NULL,
            school   BIGINT REFERENCES schools(id)
        )",
        "DROP TABLE students",
    ),
];

#[derive(Debug, PartialEq)]
pub struct DbError(String);

impl DbError {
    /// Prepend some contextual `annotation` for the error.
    pub(crate) fn annotate(self, annotation: &str) -> Self {
        let s = format!("{}: {}", annotation, &self.0);
        Self(s)
    }

    pub fn display(&self) -> &str { &self.0 }
}

impl From<tokio_postgres::error::Error> for DbError {
    fn from(e: tokio_postgres::error::Error) -> DbError {
        let mut s = format!("{}", &e);
        if let Some(dbe) = e.as_db_error() {
            write!(&mut s, "; {}", dbe).unwrap();
        }
        DbError(s)
    }
}

impl From<String> for DbError {
    fn from(s: String) -> DbError { DbError(s) }
}

#[derive(Debug)]
pub struct Store {
    connection_string: String,
}

impl Store {
    pub fn new(connection_string: String) -> Self {
        log::trace!("Store::new( {:?} ) called.", &connection_string);

        Self { connection_string }
    }

    pub(crate) async fn connect(&self) -> Result<Client, DbError> {
        log::trace!(
            "Store::connect() called w/connection string {:?}",
            &self.connection_string
        );

        match tokio_postgres::connect(&self.connection_string, NoTls).await {
            Ok((client, connection)) => {
                log::trace!("    ...connection successful.");
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        log::error!("Data DB connection error: {}", &e);
                    } else {
                        log::trace!("tokio connection runtime drops.");
                    }
                });
                Ok(client)
            },
            Err(e) => {
                let dberr = DbError::from(e);
                log::trace!("    ...connection failed: {:?}", &dberr);
                Err(dberr.annotate("Unable to connect"))
            }
        }
    }

    pub async fn ensure_db_schema(&self) -> Result<(), DbError> {
        log::trace!("Store::ensure_db_schema() called.");

        let mut client = self.connect().await?;
        let t = client.transaction().await
            .map_err(|e| DbError::from(e)
                .annotate("Data DB unable to begin transaction"))?;

        for (test_stmt, create_stmt, _) in SCHEMA.iter() {
            if t.query_opt(*test_stmt, &[]).await?.is_none() {
                log::info!(
                    "{:?} returned no results; attempting to insert table.",
                    test_stmt
                );
                t.execute(*create_stmt, &[]).await?;
            }
        }

        t.commit().await
            .map_err(|e| DbError::from(e)
                .annotate("Error committing transaction"))
    }

    /**
    Drop all database tables to fully reset database state.

    This is only meant for cleanup after testing. It is advisable to look at
    the ERROR level log output when testing to ensure this method did its job.
    */
    #[cfg(test)]
    pub async fn nuke_database(&self) -> Result<(), DbError> {
        log::trace!("Store::nuke_database() called.");

        let client = self.connect().await?;

        for (_, _, drop_stmt) in SCHEMA.iter().rev() {
            if let Err(e) = client.execute(*drop_stmt, &[]).await {
                let err = DbError::from(e);
                log::error!("Error dropping: {:?}: {}", &drop_stmt, &err.display());
            }
        }

        log::trace!("    ...nuking complete.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    /*!
    These tests assume you have a Postgres instance running on your local
    machine with resources named according to what you see in the
    `static TEST_CONNECTION &str`:

    ```text
    user: rollbook_test
    password: rollbook_test

    with write access to:

    database: rollbook_store_test
    ```

    They are all `#[ignore]`d so a bare `cargo test` stays hermetic; run
    them with

    ```bash
    cargo test -- --ignored
    ```
    */
    use super::*;
    use crate::tests::{TEST_CONNECTION, ensure_logging};

    use serial_test::serial;

    /**
    This function is for getting the database back in a blank slate state if
    a test panics partway through and leaves it munged.

    ```bash
    cargo test reset_store -- --ignored
    ```
    */
    #[tokio::test]
    #[ignore]
    #[serial]
    async fn reset_store() {
        ensure_logging();
        let db = Store::new(TEST_CONNECTION.to_owned());
        db.nuke_database().await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    #[serial]
    async fn create_store() {
        ensure_logging();

        let db = Store::new(TEST_CONNECTION.to_owned());
        db.ensure_db_schema().await.unwrap();
        db.nuke_database().await.unwrap();
    }
}
