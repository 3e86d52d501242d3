/*!
Structs to hold configuration data and global variables.
*/
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::auth::{self, Hasher, SaltedHasher};
use crate::store::Store;
use crate::user::Role;

#[derive(Deserialize)]
struct ConfigFile {
    auth_db_connect_string: Option<String>,
    data_db_connect_string: Option<String>,
    superadmin_name: Option<String>,
    superadmin_email: Option<String>,
    superadmin_password: Option<String>,
    key_lifetime_minutes: Option<i64>,
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug)]
pub struct Cfg {
    pub auth_db_connect_string: String,
    pub data_db_connect_string: String,
    pub default_superadmin_name: String,
    pub default_superadmin_email: String,
    pub default_superadmin_password: String,
    pub key_lifetime_minutes: i64,
    pub addr: SocketAddr,
}

impl std::default::Default for Cfg {
    fn default() -> Self {
        Self {
            auth_db_connect_string: "host=localhost user=rollbook_test password='rollbook_test' dbname=rollbook_auth_test".to_owned(),
            data_db_connect_string: "host=localhost user=rollbook_test password='rollbook_test' dbname=rollbook_store_test".to_owned(),
            default_superadmin_name: "Root".to_owned(),
            default_superadmin_email: "root@rollbook.not.an.address".to_owned(),
            default_superadmin_password: "toot".to_owned(),
            key_lifetime_minutes: 60,
            addr: SocketAddr::new(
                "0.0.0.0".parse().unwrap(),
                8001
            ),
        }
    }
}

impl Cfg {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let file_contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Unable to read config file: {}", &e))?;
        let cf: ConfigFile = toml::from_str(&file_contents)
            .map_err(|e| format!("Unable to deserialize config file: {}", &e))?;

        let mut c = Self::default();

        if let Some(s) = cf.auth_db_connect_string {
            c.auth_db_connect_string = s;
        }
        if let Some(s) = cf.data_db_connect_string {
            c.data_db_connect_string = s;
        }
        if let Some(s) = cf.superadmin_name {
            c.default_superadmin_name = s;
        }
        if let Some(s) = cf.superadmin_email {
            c.default_superadmin_email = s;
        }
        if let Some(s) = cf.superadmin_password {
            c.default_superadmin_password = s;
        }
        if let Some(n) = cf.key_lifetime_minutes {
            c.key_lifetime_minutes = n;
        }
        if let Some(s) = cf.host {
            c.addr.set_ip(
                s.parse().map_err(|e| format!(
                    "Error parsing {:?} as IP address: {}",
                    &s, &e
                ))?
            );
        }
        if let Some(n) = cf.port {
            c.addr.set_port(n);
        }

        Ok(c)
    }
}

/**
This guy will haul around some global variables and be passed in an
`axum::Extension` to the handlers who need him.
*/
#[derive(Debug)]
pub struct Glob {
    pub store: Store,
    pub auth: auth::Db,
    pub hasher: SaltedHasher,
    pub addr: SocketAddr,
}

/// Loads system configuration and ensures all appropriate database tables
/// exist.
///
/// Also assures existence of the default SUPERADMIN; without one, the
/// admin-creation operation would be unreachable on a fresh database.
pub async fn load_configuration<P: AsRef<Path>>(path: P) -> Result<Glob, String> {
    let path = path.as_ref();
    let cfg = if path.exists() {
        Cfg::from_file(path)?
    } else {
        log::warn!(
            "No config file at {}; falling back to defaults.",
            path.display()
        );
        Cfg::default()
    };
    log::info!("Configuration:\n{:#?}", &cfg);

    log::trace!("Checking state of auth DB...");
    let auth_db = auth::Db::new(
        cfg.auth_db_connect_string.clone(),
        cfg.key_lifetime_minutes,
    );
    if let Err(e) = auth_db.ensure_db_schema().await {
        let estr = format!("Unable to ensure state of auth DB: {}", e.display());
        return Err(estr);
    }
    log::trace!("...auth DB okay.");

    log::trace!("Checking state of data DB...");
    let store = Store::new(cfg.data_db_connect_string.clone());
    if let Err(e) = store.ensure_db_schema().await {
        let estr = format!("Unable to ensure state of data DB: {}", e.display());
        return Err(estr);
    }
    log::trace!("...data DB okay.");

    let hasher = SaltedHasher::default();

    log::trace!("Checking existence of default SUPERADMIN...");
    match store.get_student_by_email(&cfg.default_superadmin_email).await {
        Err(e) => {
            let estr = format!(
                "Error attempting to check existence of default SUPERADMIN ({}): {}",
                &cfg.default_superadmin_email, e.display()
            );
            return Err(estr);
        },
        Ok(None) => {
            log::info!(
                "Default SUPERADMIN ({}) doesn't exist; inserting.",
                &cfg.default_superadmin_email
            );
            let digest = hasher.hash(&cfg.default_superadmin_password);
            if let Err(e) = store.insert_student(
                Some(&cfg.default_superadmin_name),
                &cfg.default_superadmin_email,
                &digest,
                Role::Superadmin,
                None,
            ).await {
                let estr = format!(
                    "Error inserting default SUPERADMIN: {}",
                    e.display()
                );
                return Err(estr);
            }
        },
        Ok(Some(_)) => {
            log::trace!("Default SUPERADMIN OK.");
        },
    }

    let glob = Glob {
        store,
        auth: auth_db,
        hasher,
        addr: cfg.addr,
    };

    Ok(glob)
}
