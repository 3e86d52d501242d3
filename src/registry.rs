/*!
Student record CRUD, every operation gated by the access policy.

The flow is the same everywhere: resolve the acting principal, load
whatever record the operation addresses, ask `policy` for a decision,
then touch the store. For id-addressed operations the existence check
comes *before* the access check, so a missing record answers `NotFound`
while a forbidden one answers `AccessDenied`.
*/
use serde::Deserialize;

use crate::auth::Hasher;
use crate::error::Error;
use crate::policy::{self, Visibility};
use crate::school;
use crate::store::Store;
use crate::user::{Role, Student};

/**
The write-side request shape shared by registration, admin creation, and
update. Every field is optional; each operation decides what it requires.
*/
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub school_id: Option<i64>,
    pub school_name: Option<String>,
    pub role: Option<Role>,
}

/**
Map the ambient identity (if any) to the full student record.

No identity at all is `Unauthenticated`; an identity with no matching
record is `AccessDenied` rather than `NotFound`, so probing can't reveal
which identities exist.
*/
pub async fn current_principal(
    store: &Store,
    ident: Option<&str>,
) -> Result<Student, Error> {
    log::trace!("registry::current_principal( [ Store ], {:?} ) called.", &ident);

    let uname = match ident {
        Some(u) => u,
        None => {
            log::warn!("Unauthenticated access attempt.");
            return Err(Error::Unauthenticated);
        },
    };

    match store.get_student_by_email(uname).await? {
        Some(stud) => Ok(stud),
        None => {
            log::warn!("Identity {:?} maps to no student record.", uname);
            Err(Error::AccessDenied("User not found".to_owned()))
        },
    }
}

/// The shared creation path behind [`add_student`] and [`add_admin`]:
/// validate, check the email is unclaimed, resolve the school, hash,
/// save.
async fn create_student(
    store: &Store,
    hasher: &dyn Hasher,
    request: &StudentRequest,
    role: Role,
) -> Result<Student, Error> {
    let email = match &request.email {
        Some(email) if !email.trim().is_empty() => email.as_str(),
        _ => {
            log::warn!("Create student failed: missing email.");
            return Err(Error::InvalidArgument("Email is required".to_owned()));
        },
    };
    let password = match &request.password {
        Some(pw) if !pw.trim().is_empty() => pw.as_str(),
        _ => {
            log::warn!("Create student failed: missing password.");
            return Err(Error::InvalidArgument("Password is required".to_owned()));
        },
    };

    // This lookup and the insert below aren't atomic; the unique index
    // on students.email is the backstop for a racing duplicate.
    if store.get_student_by_email(email).await?.is_some() {
        log::warn!("Create student failed: email {:?} already registered.", email);
        return Err(Error::InvalidArgument("Email already registered".to_owned()));
    }

    let school = school::resolve(
        store,
        request.school_id,
        request.school_name.as_deref(),
        role,
    ).await?;

    let digest = hasher.hash(password);
    let saved = store.insert_student(
        request.name.as_deref(),
        email,
        &digest,
        role,
        school.as_ref(),
    ).await?;

    log::info!("Added {} {:?} with id {}.", role, &saved.email, saved.id);
    Ok(saved)
}

/// Register a new student. Open to anybody; the role defaults to USER
/// when the request doesn't name one.
pub async fn add_student(
    store: &Store,
    hasher: &dyn Hasher,
    request: &StudentRequest,
) -> Result<Student, Error> {
    log::trace!("registry::add_student( ..., {:?} ) called.", &request.email);

    let role = request.role.unwrap_or(Role::User);
    create_student(store, hasher, request, role).await
}

/// Create an ADMIN account. Only a SUPERADMIN principal may do this, and
/// that check comes before any look at the request body.
pub async fn add_admin(
    store: &Store,
    hasher: &dyn Hasher,
    ident: Option<&str>,
    request: &StudentRequest,
) -> Result<Student, Error> {
    log::trace!(
        "registry::add_admin( ..., {:?}, {:?} ) called.",
        &ident, &request.email
    );

    let current = current_principal(store, ident).await?;
    if !policy::can_create_admins(&current) {
        log::warn!(
            "Add admin denied for {:?} ({}).",
            &current.email, current.role
        );
        return Err(Error::AccessDenied(
            "Only SUPERADMIN can create admins".to_owned()
        ));
    }

    create_student(store, hasher, request, Role::Admin).await
}

/// List the student records the principal's role lets them see.
pub async fn get_all_students(
    store: &Store,
    ident: Option<&str>,
) -> Result<Vec<Student>, Error> {
    log::trace!("registry::get_all_students( [ Store ], {:?} ) called.", &ident);

    let current = current_principal(store, ident).await?;
    match policy::visibility(&current) {
        Visibility::Everyone => Ok(store.get_all_students().await?),
        Visibility::School(id) => Ok(store.get_students_by_school(id).await?),
        Visibility::SelfOnly => Ok(vec![current]),
        Visibility::NoOne => Ok(Vec::new()),
    }
}

/// Load the record at `id`, then make sure the principal may touch it.
async fn load_for_access(
    store: &Store,
    ident: Option<&str>,
    id: i64,
) -> Result<Student, Error> {
    let target = match store.get_student_by_id(id).await? {
        Some(stud) => stud,
        None => {
            return Err(Error::NotFound(
                format!("Student not found with id {}", id)
            ));
        },
    };

    let current = current_principal(store, ident).await?;
    if !policy::can_access(&current, &target) {
        log::warn!(
            "Access denied: {:?} on student {}.",
            &current.email, target.id
        );
        return Err(Error::AccessDenied("Not allowed".to_owned()));
    }

    Ok(target)
}

pub async fn get_student_by_id(
    store: &Store,
    ident: Option<&str>,
    id: i64,
) -> Result<Student, Error> {
    log::trace!("registry::get_student_by_id( ..., {:?}, {} ) called.", &ident, id);

    load_for_access(store, ident, id).await
}

pub async fn delete_student(
    store: &Store,
    ident: Option<&str>,
    id: i64,
) -> Result<(), Error> {
    log::trace!("registry::delete_student( ..., {:?}, {} ) called.", &ident, id);

    load_for_access(store, ident, id).await?;
    store.delete_student(id).await?;
    log::info!("Deleted student {}.", id);
    Ok(())
}

/**
Update the record at `id`.

Name and email apply exactly as given, blank or not; update does no
re-validation. The school is re-resolved only when the request names one
(by id, or by a non-blank name), using the record's existing role. The
password is re-hashed only when a non-blank one is supplied.
*/
pub async fn update_student(
    store: &Store,
    hasher: &dyn Hasher,
    ident: Option<&str>,
    id: i64,
    request: &StudentRequest,
) -> Result<Student, Error> {
    log::trace!("registry::update_student( ..., {:?}, {} ) called.", &ident, id);

    let mut stud = load_for_access(store, ident, id).await?;

    stud.name = request.name.clone();
    stud.email = request.email.clone().unwrap_or_default();

    let wants_school = request.school_id.is_some()
        || request.school_name.as_deref()
            .map(|n| !n.trim().is_empty())
            .unwrap_or(false);
    if wants_school {
        stud.school = school::resolve(
            store,
            request.school_id,
            request.school_name.as_deref(),
            stud.role,
        ).await?;
    }

    if let Some(pw) = &request.password {
        if !pw.trim().is_empty() {
            stud.password = hasher.hash(pw);
        }
    }

    store.update_student(&stud).await?;
    log::info!("Updated student {}.", stud.id);
    Ok(stud)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serial_test::serial;

    use crate::auth::{Hasher, SaltedHasher};
    use crate::tests::{TEST_CONNECTION, ensure_logging};

    #[test]
    fn requests_deserialize_from_camel_case() {
        let req: StudentRequest = serde_json::from_str(
            r#"{
                "name": "Jenny",
                "email": "jenny@example.com",
                "password": "hunter2",
                "schoolId": 3,
                "schoolName": "Acme",
                "role": "ADMIN"
            }"#
        ).unwrap();

        assert_eq!(req.school_id, Some(3));
        assert_eq!(req.school_name.as_deref(), Some("Acme"));
        assert_eq!(req.role, Some(Role::Admin));

        let sparse: StudentRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(sparse.email.is_none());
        assert!(sparse.role.is_none());
    }

    fn req(
        name: &str,
        email: &str,
        password: &str,
        school_name: Option<&str>,
        role: Option<Role>,
    ) -> StudentRequest {
        StudentRequest {
            name: Some(name.to_owned()),
            email: Some(email.to_owned()),
            password: Some(password.to_owned()),
            school_id: None,
            school_name: school_name.map(|s| s.to_owned()),
            role,
        }
    }

    fn emails(mut students: Vec<Student>) -> Vec<String> {
        let mut v: Vec<String> = students.drain(..).map(|s| s.email).collect();
        v.sort();
        v
    }

    /**
    The whole life of a small district, end to end.

    Needs the local test Postgres described in `store::tests`; run with
    `cargo test -- --ignored`.
    */
    #[tokio::test]
    #[ignore]
    #[serial]
    async fn district_end_to_end() {
        ensure_logging();

        let db = Store::new(TEST_CONNECTION.to_owned());
        db.ensure_db_schema().await.unwrap();
        let hasher = SaltedHasher::default();

        // The open registration path honors an explicit role, which is
        // how the first SUPERADMIN gets made.
        let boss = add_student(
            &db, &hasher,
            &req("Thelma", "boss@example.com", "toot", None, Some(Role::Superadmin)),
        ).await.unwrap();
        assert_eq!(boss.role, Role::Superadmin);
        assert!(boss.school.is_none());

        // Blank credentials never get as far as the store.
        match add_student(&db, &hasher, &req("X", "  ", "pw", None, None)).await {
            Err(Error::InvalidArgument(msg)) => assert_eq!(msg, "Email is required"),
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
        match add_student(&db, &hasher, &req("X", "x@example.com", " ", None, None)).await {
            Err(Error::InvalidArgument(msg)) => assert_eq!(msg, "Password is required"),
            other => panic!("expected InvalidArgument, got {:?}", other),
        }

        // A USER can't register schoolless...
        match add_student(
            &db, &hasher,
            &req("X", "x@example.com", "pw", None, None),
        ).await {
            Err(Error::InvalidArgument(msg)) => assert_eq!(msg, "School is required"),
            other => panic!("expected InvalidArgument, got {:?}", other),
        }

        // ...so everybody below names a school, which get-or-creates it.
        let admin = add_admin(
            &db, &hasher,
            Some("boss@example.com"),
            &req("Ada", "ada@example.com", "adminpw", Some("Lincoln High"), None),
        ).await.unwrap();
        assert_eq!(admin.role, Role::Admin);
        let lincoln = admin.school.clone().unwrap();
        assert_eq!(lincoln.name, "Lincoln High");

        // Only the SUPERADMIN mints admins.
        match add_admin(
            &db, &hasher,
            Some("ada@example.com"),
            &req("Eve", "eve@example.com", "pw", Some("Lincoln High"), None),
        ).await {
            Err(Error::AccessDenied(msg)) => {
                assert_eq!(msg, "Only SUPERADMIN can create admins");
            },
            other => panic!("expected AccessDenied, got {:?}", other),
        }

        let x = add_student(
            &db, &hasher,
            &req("Xavier", "x@example.com", "xpw", Some("Lincoln High"), None),
        ).await.unwrap();
        assert_eq!(x.role, Role::User);
        assert_eq!(x.school.as_ref().unwrap().id, lincoln.id);

        let y = add_student(
            &db, &hasher,
            &req("Yolanda", "y@example.com", "ypw", Some("Washington"), None),
        ).await.unwrap();
        assert_ne!(y.school.as_ref().unwrap().id, lincoln.id);

        // Duplicate email, exact match.
        match add_student(
            &db, &hasher,
            &req("Imposter", "x@example.com", "pw", Some("Washington"), None),
        ).await {
            Err(Error::InvalidArgument(msg)) => {
                assert_eq!(msg, "Email already registered");
            },
            other => panic!("expected InvalidArgument, got {:?}", other),
        }

        // Listing scopes by role.
        assert_eq!(
            emails(get_all_students(&db, Some("boss@example.com")).await.unwrap()),
            vec!["ada@example.com", "boss@example.com", "x@example.com", "y@example.com"]
        );
        assert_eq!(
            emails(get_all_students(&db, Some("ada@example.com")).await.unwrap()),
            vec!["ada@example.com", "x@example.com"]
        );
        assert_eq!(
            emails(get_all_students(&db, Some("y@example.com")).await.unwrap()),
            vec!["y@example.com"]
        );
        assert_eq!(
            get_all_students(&db, None).await,
            Err(Error::Unauthenticated)
        );
        match get_all_students(&db, Some("ghost@example.com")).await {
            Err(Error::AccessDenied(msg)) => assert_eq!(msg, "User not found"),
            other => panic!("expected AccessDenied, got {:?}", other),
        }

        // Fetch by id: existence answers before access does.
        match get_student_by_id(&db, Some("y@example.com"), x.id + 1000).await {
            Err(Error::NotFound(_)) => {},
            other => panic!("expected NotFound, got {:?}", other),
        }
        match get_student_by_id(&db, Some("y@example.com"), x.id).await {
            Err(Error::AccessDenied(msg)) => assert_eq!(msg, "Not allowed"),
            other => panic!("expected AccessDenied, got {:?}", other),
        }
        let fetched = get_student_by_id(&db, Some("ada@example.com"), x.id).await.unwrap();
        assert_eq!(fetched.email, "x@example.com");

        // Update: a denied update leaves the record alone.
        let before = get_student_by_id(&db, Some("boss@example.com"), x.id).await.unwrap();
        match update_student(
            &db, &hasher,
            Some("y@example.com"),
            x.id,
            &req("Hacked", "x@example.com", "owned", Some("Washington"), None),
        ).await {
            Err(Error::AccessDenied(_)) => {},
            other => panic!("expected AccessDenied, got {:?}", other),
        }
        let after = get_student_by_id(&db, Some("boss@example.com"), x.id).await.unwrap();
        assert_eq!(before, after);

        // Update without a password keeps the old digest; with one, the
        // new plaintext verifies against the new digest.
        let no_pw = StudentRequest {
            name: Some("Yolanda Q".to_owned()),
            email: Some("y@example.com".to_owned()),
            ..StudentRequest::default()
        };
        let updated = update_student(
            &db, &hasher, Some("y@example.com"), y.id, &no_pw
        ).await.unwrap();
        assert_eq!(updated.password, y.password);
        assert_eq!(updated.name.as_deref(), Some("Yolanda Q"));
        // No school in the request, so the old one sticks.
        assert_eq!(updated.school, y.school);

        let new_pw = StudentRequest {
            email: Some("y@example.com".to_owned()),
            password: Some("fresh-password".to_owned()),
            ..StudentRequest::default()
        };
        let updated = update_student(
            &db, &hasher, Some("y@example.com"), y.id, &new_pw
        ).await.unwrap();
        assert_ne!(updated.password, y.password);
        assert!(hasher.verify("fresh-password", &updated.password));

        // Delete: same gate, then the row really goes away.
        match delete_student(&db, Some("y@example.com"), x.id).await {
            Err(Error::AccessDenied(_)) => {},
            other => panic!("expected AccessDenied, got {:?}", other),
        }
        delete_student(&db, Some("boss@example.com"), x.id).await.unwrap();
        match delete_student(&db, Some("boss@example.com"), x.id).await {
            Err(Error::NotFound(_)) => {},
            other => panic!("expected NotFound, got {:?}", other),
        }

        db.nuke_database().await.unwrap();
    }
}
