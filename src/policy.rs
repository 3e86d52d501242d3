/*!
The access policy.

Pure decisions over already-loaded records; nothing in here touches the
database. The registry loads the principal and the target, asks these
functions, and acts on the answer.

The rules, in full:

  * A SUPERADMIN may do anything to anyone.
  * An ADMIN may act on any record in the same school. An ADMIN with no
    school administers nobody.
  * Everybody may act on their own record. "Own" means the emails match;
    email is the login identity, and ids aren't trusted in transit.
*/
use crate::user::{Role, Student};

/// May `current` view, update, or delete `target`?
pub fn can_access(current: &Student, target: &Student) -> bool {
    match current.role {
        Role::Superadmin => true,
        Role::Admin => match (&current.school, &target.school) {
            (Some(mine), Some(theirs)) if mine.id == theirs.id => true,
            _ => current.email == target.email,
        },
        Role::User => current.email == target.email,
    }
}

/// Which student records a listing shows `current`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Every record there is.
    Everyone,
    /// Records whose school has this id.
    School(i64),
    /// Only the principal's own record.
    SelfOnly,
    /// Nothing at all.
    NoOne,
}

pub fn visibility(current: &Student) -> Visibility {
    match current.role {
        Role::Superadmin => Visibility::Everyone,
        Role::Admin => match &current.school {
            Some(school) => Visibility::School(school.id),
            None => Visibility::NoOne,
        },
        Role::User => Visibility::SelfOnly,
    }
}

/// Only a SUPERADMIN may mint new ADMIN accounts.
pub fn can_create_admins(current: &Student) -> bool {
    matches!(current.role, Role::Superadmin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::School;

    fn school(id: i64) -> Option<School> {
        Some(School { id, name: format!("School {}", id) })
    }

    fn student(email: &str, role: Role, school: Option<School>) -> Student {
        Student {
            id: 0,
            name: None,
            email: email.to_owned(),
            password: String::new(),
            role,
            school,
        }
    }

    #[test]
    fn superadmin_accesses_everyone() {
        let boss = student("boss@example.com", Role::Superadmin, None);
        let targets = [
            student("a@example.com", Role::User, None),
            student("b@example.com", Role::User, school(1)),
            student("c@example.com", Role::Admin, school(2)),
            student("d@example.com", Role::Superadmin, None),
        ];
        for t in targets.iter() {
            assert!(can_access(&boss, t));
        }
    }

    #[test]
    fn admin_is_scoped_to_their_school() {
        let admin = student("admin@example.com", Role::Admin, school(1));

        assert!(can_access(&admin, &student("a@example.com", Role::User, school(1))));
        assert!(can_access(&admin, &student("b@example.com", Role::Admin, school(1))));

        assert!(!can_access(&admin, &student("c@example.com", Role::User, school(2))));
        assert!(!can_access(&admin, &student("d@example.com", Role::User, None)));
    }

    #[test]
    fn schoolless_admin_administers_nobody_but_themself() {
        let admin = student("admin@example.com", Role::Admin, None);

        assert!(!can_access(&admin, &student("a@example.com", Role::User, school(1))));
        assert!(!can_access(&admin, &student("b@example.com", Role::User, None)));
        assert!(can_access(&admin, &student("admin@example.com", Role::Admin, None)));
    }

    #[test]
    fn self_access_holds_for_every_role() {
        for role in [Role::User, Role::Admin, Role::Superadmin] {
            let me = student("me@example.com", role, None);
            // Matching emails are what matters, not matching ids or schools.
            let mut also_me = student("me@example.com", role, school(9));
            also_me.id = 42;
            assert!(can_access(&me, &also_me));
        }
    }

    #[test]
    fn user_accesses_only_themself() {
        let u = student("me@example.com", Role::User, school(1));
        assert!(can_access(&u, &u));
        // Same school doesn't help a plain USER.
        assert!(!can_access(&u, &student("peer@example.com", Role::User, school(1))));
        assert!(!can_access(&u, &student("other@example.com", Role::User, None)));
    }

    #[test]
    fn visibility_by_role() {
        assert_eq!(
            visibility(&student("s@example.com", Role::Superadmin, None)),
            Visibility::Everyone
        );
        assert_eq!(
            visibility(&student("a@example.com", Role::Admin, school(3))),
            Visibility::School(3)
        );
        assert_eq!(
            visibility(&student("a@example.com", Role::Admin, None)),
            Visibility::NoOne
        );
        assert_eq!(
            visibility(&student("u@example.com", Role::User, school(3))),
            Visibility::SelfOnly
        );
    }

    #[test]
    fn only_superadmins_create_admins() {
        assert!(can_create_admins(&student("s@example.com", Role::Superadmin, None)));
        assert!(!can_create_admins(&student("a@example.com", Role::Admin, school(1))));
        assert!(!can_create_admins(&student("u@example.com", Role::User, None)));
    }
}
