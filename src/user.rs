/*!
Database users: students, the schools they belong to, and their roles.
*/
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let token = match self {
            Role::User       => "USER",
            Role::Admin      => "ADMIN",
            Role::Superadmin => "SUPERADMIN",
        };

        write!(f, "{}", token)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER"       => Ok(Role::User),
            "ADMIN"      => Ok(Role::Admin),
            "SUPERADMIN" => Ok(Role::Superadmin),
            _ => Err(format!("{:?} is not a valid Role.", s)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    pub id: i64,
    pub name: String,
}

/**
A student record, which doubles as the principal for every request.

The `password` field holds the salted digest, never the plaintext, and
stays out of any serialized representation.
*/
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Student {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub school: Option<School>,
}
