/*!
Authentication collaborators: the credential hasher, password checks
against stored student records, and the bearer-key database.

Keys are opaque random strings bound to a username and an expiry. They
live in their own database, apart from the student records:

```sql
CREATE TABLE keys (
    key    TEXT PRIMARY KEY,
    uname  TEXT NOT NULL,
    expiry TIMESTAMPTZ NOT NULL
);
```
*/
use std::fmt::Write;

use rand::{Rng, distributions};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use tokio_postgres::{Client, NoTls};

use crate::store::{DbError, Store};
use crate::user::Student;

const DEFAULT_SALT_LENGTH: usize = 16;
const DEFAULT_KEY_LENGTH: usize = 32;
const TOKEN_CHARS: &str =
"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static KEY_SCHEMA: &[(&str, &str, &str)] = &[
    (
        "SELECT FROM information_schema.tables WHERE table_name = 'keys'",
        "CREATE TABLE keys (
            key    TEXT PRIMARY KEY,
            uname  TEXT NOT NULL,
            expiry TIMESTAMPTZ NOT NULL
        )",
        "DROP TABLE keys",
    ),
];

/// Generate a random string of `length` characters drawn from `chars`.
fn random_token(chars: &[char], length: usize) -> String {
    // The character slice is built from a nonempty `&str` constant, so it
    // never has zero length.
    let dist = distributions::Slice::new(chars).unwrap();
    let rng = rand::thread_rng();
    rng.sample_iter(&dist).take(length).collect()
}

fn hex_digest(salt: &str, plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plaintext.as_bytes());
    let digest = hasher.finalize();

    let mut hex = String::with_capacity(2 * digest.len());
    for byte in digest.iter() {
        write!(&mut hex, "{:02x}", byte).unwrap();
    }
    hex
}

/**
One-way credential transform.

The registry only ever talks to this trait; what's behind it produces an
opaque digest string that `verify` can later check a plaintext against.
*/
pub trait Hasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> String;
    fn verify(&self, plaintext: &str, digest: &str) -> bool;
}

/// Salted SHA-256 hasher. Digests look like `<salt>$<hex>`, so the salt
/// travels with the digest and nothing else needs storing.
#[derive(Debug)]
pub struct SaltedHasher {
    salt_chars: Vec<char>,
    salt_length: usize,
}

impl Default for SaltedHasher {
    fn default() -> Self {
        Self {
            salt_chars: TOKEN_CHARS.chars().collect(),
            salt_length: DEFAULT_SALT_LENGTH,
        }
    }
}

impl Hasher for SaltedHasher {
    fn hash(&self, plaintext: &str) -> String {
        let salt = random_token(&self.salt_chars, self.salt_length);
        let hex = hex_digest(&salt, plaintext);
        format!("{}${}", salt, hex)
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        match digest.split_once('$') {
            Some((salt, hex)) => hex_digest(salt, plaintext) == hex,
            None => false,
        }
    }
}

#[derive(Debug)]
pub enum AuthResult {
    Valid(Student),
    BadPassword,
    NoSuchUser,
}

/// Check `password` against the stored record for `uname`.
///
/// The two failure variants exist so callers can log the difference; the
/// response to the client should not distinguish them.
pub async fn check_password(
    store: &Store,
    hasher: &dyn Hasher,
    uname: &str,
    password: &str,
) -> Result<AuthResult, DbError> {
    log::trace!("check_password( [ Store ], [ Hasher ], {:?}, ... ) called.", uname);

    match store.get_student_by_email(uname).await? {
        None => Ok(AuthResult::NoSuchUser),
        Some(stud) => {
            if hasher.verify(password, &stud.password) {
                Ok(AuthResult::Valid(stud))
            } else {
                Ok(AuthResult::BadPassword)
            }
        },
    }
}

#[derive(Debug, PartialEq)]
pub enum KeyStatus {
    /// Key is live; carries the uname it was issued to.
    Valid(String),
    /// Key existed but its expiry has passed.
    Expired(String),
    Invalid,
}

/// The authorization key database.
#[derive(Debug)]
pub struct Db {
    connection_string: String,
    key_chars: Vec<char>,
    key_length: usize,
    key_lifetime: Duration,
}

impl Db {
    pub fn new(connection_string: String, key_lifetime_minutes: i64) -> Self {
        log::trace!(
            "auth::Db::new( {:?}, {} ) called.",
            &connection_string, key_lifetime_minutes
        );

        Self {
            connection_string,
            key_chars: TOKEN_CHARS.chars().collect(),
            key_length: DEFAULT_KEY_LENGTH,
            key_lifetime: Duration::minutes(key_lifetime_minutes),
        }
    }

    async fn connect(&self) -> Result<Client, DbError> {
        log::trace!(
            "auth::Db::connect() called w/connection string {:?}",
            &self.connection_string
        );

        match tokio_postgres::connect(&self.connection_string, NoTls).await {
            Ok((client, connection)) => {
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        log::error!("Auth DB connection error: {}", &e);
                    }
                });
                Ok(client)
            },
            Err(e) => Err(DbError::from(e).annotate("Unable to connect to auth DB")),
        }
    }

    pub async fn ensure_db_schema(&self) -> Result<(), DbError> {
        log::trace!("auth::Db::ensure_db_schema() called.");

        let client = self.connect().await?;
        for (test_stmt, create_stmt, _) in KEY_SCHEMA.iter() {
            if client.query_opt(*test_stmt, &[]).await?.is_none() {
                log::info!(
                    "{:?} returned no results; attempting to insert table.",
                    test_stmt
                );
                client.execute(*create_stmt, &[]).await?;
            }
        }

        Ok(())
    }

    /**
    Issue a fresh key for `uname`, good for the configured lifetime.

    Expired keys get swept here, on issue; there is no background reaper.
    */
    pub async fn issue_key(&self, uname: &str) -> Result<String, DbError> {
        log::trace!("auth::Db::issue_key( {:?} ) called.", uname);

        let client = self.connect().await?;

        let now = OffsetDateTime::now_utc();
        let n = client.execute(
            "DELETE FROM keys WHERE expiry < $1",
            &[&now]
        ).await?;
        if n > 0 {
            log::trace!("Swept {} expired keys.", n);
        }

        let expiry = now + self.key_lifetime;
        loop {
            let key = random_token(&self.key_chars, self.key_length);
            let n = client.execute(
                "INSERT INTO keys (key, uname, expiry)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (key) DO NOTHING",
                &[&key, &uname, &expiry]
            ).await?;

            if n == 1 {
                return Ok(key);
            }
            // Collided with an existing key. Roll again.
        }
    }

    pub async fn check_key(&self, key: &str) -> Result<KeyStatus, DbError> {
        log::trace!("auth::Db::check_key( {:?} ) called.", key);

        let client = self.connect().await?;
        match client.query_opt(
            "SELECT uname, expiry FROM keys WHERE key = $1",
            &[&key]
        ).await? {
            None => Ok(KeyStatus::Invalid),
            Some(row) => {
                let uname: String = row.try_get("uname")?;
                let expiry: OffsetDateTime = row.try_get("expiry")?;
                if expiry < OffsetDateTime::now_utc() {
                    Ok(KeyStatus::Expired(uname))
                } else {
                    Ok(KeyStatus::Valid(uname))
                }
            },
        }
    }

    #[cfg(test)]
    pub async fn nuke_database(&self) -> Result<(), DbError> {
        log::trace!("auth::Db::nuke_database() called.");

        let client = self.connect().await?;
        for (_, _, drop_stmt) in KEY_SCHEMA.iter().rev() {
            if let Err(e) = client.execute(*drop_stmt, &[]).await {
                let err = DbError::from(e);
                log::error!("Error dropping: {:?}: {}", &drop_stmt, &err.display());
            }
        }

        Ok(())
    }
}
