/*!
`Store` methods for the students table.

```sql
CREATE TABLE students (
    id       BIGSERIAL PRIMARY KEY,
    name     TEXT,
    email    TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,
    role     TEXT NOT NULL,
    school   BIGINT REFERENCES schools(id)
);
```

Every fetch joins the schools table so a `Student` comes back with its
school resolved; `email` lookups are exact, case-sensitive matches on the
stored value.
*/
use tokio_postgres::Row;

use super::{DbError, Store};
use crate::user::{Role, School, Student};

static STUDENT_QUERY: &str =
"SELECT students.id, students.name, students.email, students.password,
        students.role, schools.id AS school_id, schools.name AS school_name
    FROM students LEFT JOIN schools ON students.school = schools.id";

fn student_from_row(row: &Row) -> Result<Student, DbError> {
    log::trace!("student_from_row( {:?} ) called.", row);

    let role_str: &str = row.try_get("role")?;
    let school = match row.try_get::<_, Option<i64>>("school_id")? {
        Some(id) => Some(School {
            id,
            name: row.try_get("school_name")?,
        }),
        None => None,
    };

    Ok(Student {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password: row.try_get("password")?,
        role: role_str.parse()?,
        school,
    })
}

impl Store {
    pub async fn get_student_by_id(&self, id: i64) -> Result<Option<Student>, DbError> {
        log::trace!("Store::get_student_by_id( {} ) called.", id);

        let client = self.connect().await?;
        let stmt = format!("{} WHERE students.id = $1", STUDENT_QUERY);
        match client.query_opt(stmt.as_str(), &[&id]).await? {
            Some(row) => Ok(Some(student_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_student_by_email(&self, email: &str) -> Result<Option<Student>, DbError> {
        log::trace!("Store::get_student_by_email( {:?} ) called.", email);

        let client = self.connect().await?;
        let stmt = format!("{} WHERE students.email = $1", STUDENT_QUERY);
        match client.query_opt(stmt.as_str(), &[&email]).await? {
            Some(row) => Ok(Some(student_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_all_students(&self) -> Result<Vec<Student>, DbError> {
        log::trace!("Store::get_all_students() called.");

        let client = self.connect().await?;
        let rows = client.query(STUDENT_QUERY, &[]).await?;

        let mut students: Vec<Student> = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            students.push(student_from_row(row)?);
        }

        Ok(students)
    }

    pub async fn get_students_by_school(
        &self,
        school_id: i64,
    ) -> Result<Vec<Student>, DbError> {
        log::trace!("Store::get_students_by_school( {} ) called.", school_id);

        let client = self.connect().await?;
        let stmt = format!("{} WHERE students.school = $1", STUDENT_QUERY);
        let rows = client.query(stmt.as_str(), &[&school_id]).await?;

        let mut students: Vec<Student> = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            students.push(student_from_row(row)?);
        }

        Ok(students)
    }

    /// Insert a new student row and return the saved record.
    ///
    /// `password` is the already-hashed digest; hashing is the caller's
    /// business. The UNIQUE index on `email` makes a racing duplicate
    /// registration fail here rather than slip through.
    pub async fn insert_student(
        &self,
        name: Option<&str>,
        email: &str,
        password: &str,
        role: Role,
        school: Option<&School>,
    ) -> Result<Student, DbError> {
        log::trace!(
            "Store::insert_student( {:?}, {:?}, [ digest ], {}, {:?} ) called.",
            name, email, role, &school
        );

        let school_id: Option<i64> = school.map(|s| s.id);
        let client = self.connect().await?;
        let row = client.query_one(
            "INSERT INTO students (name, email, password, role, school)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id",
            &[&name, &email, &password, &role.to_string(), &school_id]
        ).await.map_err(|e| DbError::from(e)
            .annotate("Error inserting student"))?;

        let stud = Student {
            id: row.try_get("id")?,
            name: name.map(|s| s.to_owned()),
            email: email.to_owned(),
            password: password.to_owned(),
            role,
            school: school.cloned(),
        };

        log::trace!("Inserted student {:?} with id {}.", email, stud.id);
        Ok(stud)
    }

    pub async fn update_student(&self, student: &Student) -> Result<(), DbError> {
        log::trace!("Store::update_student( [ student {} ] ) called.", student.id);

        let school_id: Option<i64> = student.school.as_ref().map(|s| s.id);
        let client = self.connect().await?;
        let n = client.execute(
            "UPDATE students
                SET name = $1, email = $2, password = $3, role = $4, school = $5
                WHERE id = $6",
            &[
                &student.name,
                &student.email,
                &student.password,
                &student.role.to_string(),
                &school_id,
                &student.id,
            ]
        ).await.map_err(|e| DbError::from(e)
            .annotate("Error updating student"))?;

        if n == 0 {
            Err(DbError(format!("There is no student with id {}.", student.id)))
        } else {
            Ok(())
        }
    }

    pub async fn delete_student(&self, id: i64) -> Result<(), DbError> {
        log::trace!("Store::delete_student( {} ) called.", id);

        let client = self.connect().await?;
        let n = client.execute(
            "DELETE FROM students WHERE id = $1",
            &[&id]
        ).await?;

        if n == 0 {
            Err(DbError(format!("There is no student with id {}.", id)))
        } else {
            log::trace!("Student {} deleted.", id);
            Ok(())
        }
    }
}
