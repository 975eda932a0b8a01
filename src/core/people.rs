//! Student and teacher records.
//!
//! Students are identified by an opaque code only. Creating a student is always an
//! explicit call here; no other operation creates students as a side effect.

use crate::{
    config::school::StudentRules,
    core::model::{Religion, grade_of, normalize_class_id, normalize_code},
    entities::{RequiredTitle, Student, Teacher, required_title, student, teacher},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, Set, prelude::*};
use std::collections::BTreeSet;
use tracing::{info, instrument};

/// Input for creating or updating a student.
#[derive(Debug, Clone)]
pub struct NewStudent {
    /// Opaque student code
    pub student_id: String,
    /// Class id, any casing
    pub class_id: String,
    /// GU track flag
    pub is_gu: bool,
    /// Religion class
    pub religion: Option<Religion>,
    /// Elective course
    pub course: Option<String>,
    /// Whether the student takes part in lending
    pub active: bool,
}

impl NewStudent {
    /// An active regular-track student without religion or course.
    pub fn new(student_id: impl Into<String>, class_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            class_id: class_id.into(),
            is_gu: false,
            religion: None,
            course: None,
            active: true,
        }
    }
}

/// Outcome of [`ensure_student_exists`].
#[derive(Debug, Clone)]
pub struct EnsuredStudent {
    /// The stored student
    pub student: student::Model,
    /// `true` if the call created the record
    pub created: bool,
}

fn validate_student(rules: StudentRules, new: NewStudent) -> Result<NewStudent> {
    let student_id = normalize_code(&new.student_id, "student id")?;
    let class_id = normalize_class_id(&new.class_id)?;
    let course = new
        .course
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    if let (Some(course), Some(min_grade)) = (&course, rules.course_min_grade) {
        match grade_of(&class_id) {
            Some(grade) if grade < min_grade => {
                return Err(Error::validation(format!(
                    "course '{course}' cannot be set in class {class_id} (courses start in grade {min_grade})"
                )));
            }
            _ => {}
        }
    }

    Ok(NewStudent {
        student_id,
        class_id,
        course,
        ..new
    })
}

/// Looks up a student by code.
pub async fn get_student<C>(db: &C, student_id: &str) -> Result<Option<student::Model>>
where
    C: ConnectionTrait,
{
    Student::find_by_id(student_id.trim().to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks up a student by code, failing with [`Error::NotFound`].
pub async fn require_student<C>(db: &C, student_id: &str) -> Result<student::Model>
where
    C: ConnectionTrait,
{
    let id = normalize_code(student_id, "student id")?;
    get_student(db, &id)
        .await?
        .ok_or_else(|| Error::not_found("student", id))
}

async fn insert_student(db: &DatabaseConnection, new: NewStudent) -> Result<student::Model> {
    let now = chrono::Utc::now().naive_utc();
    student::ActiveModel {
        student_id: Set(new.student_id),
        class_id: Set(new.class_id),
        is_gu: Set(new.is_gu),
        religion: Set(new.religion.map(|r| r.as_str().to_string())),
        course: Set(new.course),
        active: Set(new.active),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates the student if it does not exist. An existing record is returned unchanged.
#[instrument(skip(db, rules, new), fields(student_id = %new.student_id))]
pub async fn ensure_student_exists(
    db: &DatabaseConnection,
    rules: StudentRules,
    new: NewStudent,
) -> Result<EnsuredStudent> {
    let new = validate_student(rules, new)?;
    if let Some(student) = get_student(db, &new.student_id).await? {
        return Ok(EnsuredStudent {
            student,
            created: false,
        });
    }

    let student = insert_student(db, new).await?;
    info!("Created student {} in class {}", student.student_id, student.class_id);
    Ok(EnsuredStudent {
        student,
        created: true,
    })
}

/// Creates a student or overwrites all attributes of an existing one.
#[instrument(skip(db, rules, new), fields(student_id = %new.student_id))]
pub async fn upsert_student(
    db: &DatabaseConnection,
    rules: StudentRules,
    new: NewStudent,
) -> Result<student::Model> {
    let new = validate_student(rules, new)?;
    let Some(existing) = get_student(db, &new.student_id).await? else {
        let student = insert_student(db, new).await?;
        info!("Created student {}", student.student_id);
        return Ok(student);
    };

    let mut model: student::ActiveModel = existing.into();
    model.class_id = Set(new.class_id);
    model.is_gu = Set(new.is_gu);
    model.religion = Set(new.religion.map(|r| r.as_str().to_string()));
    model.course = Set(new.course);
    model.active = Set(new.active);
    model.updated_at = Set(chrono::Utc::now().naive_utc());
    let student = model.update(db).await?;
    info!("Updated student {}", student.student_id);
    Ok(student)
}

/// Activates or deactivates a student. Inactive students drop out of class rosters.
pub async fn set_student_active(
    db: &DatabaseConnection,
    student_id: &str,
    active: bool,
) -> Result<student::Model> {
    let mut model: student::ActiveModel = require_student(db, student_id).await?.into();
    model.active = Set(active);
    model.updated_at = Set(chrono::Utc::now().naive_utc());
    model.update(db).await.map_err(Into::into)
}

/// Students of a class ordered by code. Class matching ignores case and surrounding
/// whitespace.
pub async fn students_in_class<C>(
    db: &C,
    class_id: &str,
    active_only: bool,
) -> Result<Vec<student::Model>>
where
    C: ConnectionTrait,
{
    let class_id = normalize_class_id(class_id)?;
    let mut query = Student::find().filter(student::Column::ClassId.eq(class_id));
    if active_only {
        query = query.filter(student::Column::Active.eq(true));
    }
    query
        .order_by_asc(student::Column::StudentId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Normalizes a class id and checks that a student or a rule refers to it.
///
/// # Errors
/// [`Error::NotFound`] if no student (active or not) and no rule names the class.
pub async fn require_class<C>(db: &C, class_id: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    let class_id = normalize_class_id(class_id)?;
    let students = Student::find()
        .filter(student::Column::ClassId.eq(class_id.as_str()))
        .count(db)
        .await?;
    if students > 0 {
        return Ok(class_id);
    }
    let class_rules = RequiredTitle::find()
        .filter(required_title::Column::ClassId.eq(class_id.as_str()))
        .count(db)
        .await?;
    if class_rules == 0 {
        return Err(Error::not_found("class", class_id));
    }
    Ok(class_id)
}

/// All class ids known from students or required-title rules, sorted.
pub async fn list_class_ids(db: &DatabaseConnection) -> Result<Vec<String>> {
    let from_students: Vec<String> = Student::find()
        .select_only()
        .column(student::Column::ClassId)
        .distinct()
        .into_tuple()
        .all(db)
        .await?;
    let from_rules: Vec<String> = RequiredTitle::find()
        .select_only()
        .column(required_title::Column::ClassId)
        .distinct()
        .into_tuple()
        .all(db)
        .await?;

    let ids: BTreeSet<String> = from_students.into_iter().chain(from_rules).collect();
    Ok(ids.into_iter().collect())
}

/// Looks up a teacher by code.
pub async fn get_teacher<C>(db: &C, teacher_id: &str) -> Result<Option<teacher::Model>>
where
    C: ConnectionTrait,
{
    Teacher::find_by_id(teacher_id.trim().to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a teacher or updates its active flag.
pub async fn upsert_teacher(
    db: &DatabaseConnection,
    teacher_id: &str,
    active: bool,
) -> Result<teacher::Model> {
    let id = normalize_code(teacher_id, "teacher id")?;
    if let Some(existing) = get_teacher(db, &id).await? {
        let mut model: teacher::ActiveModel = existing.into();
        model.active = Set(active);
        return model.update(db).await.map_err(Into::into);
    }

    let teacher = teacher::ActiveModel {
        teacher_id: Set(id),
        active: Set(active),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(db)
    .await?;
    info!("Created teacher {}", teacher.teacher_id);
    Ok(teacher)
}

/// Activates or deactivates an existing teacher.
pub async fn set_teacher_active(
    db: &DatabaseConnection,
    teacher_id: &str,
    active: bool,
) -> Result<teacher::Model> {
    let id = normalize_code(teacher_id, "teacher id")?;
    let existing = get_teacher(db, &id)
        .await?
        .ok_or_else(|| Error::not_found("teacher", id))?;
    let mut model: teacher::ActiveModel = existing.into();
    model.active = Set(active);
    model.update(db).await.map_err(Into::into)
}

/// All teachers ordered by code.
pub async fn list_teachers(db: &DatabaseConnection) -> Result<Vec<teacher::Model>> {
    Teacher::find()
        .order_by_asc(teacher::Column::TeacherId)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_validation_runs_before_database() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let rules = StudentRules::default();

        let result = ensure_student_exists(&db, rules, NewStudent::new("  ", "5a")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = upsert_student(&db, rules, NewStudent::new("S1", " ")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_course_requires_min_grade() -> Result<()> {
        let db = setup_test_db().await?;
        let rules = StudentRules {
            course_min_grade: Some(10),
        };

        let mut young = NewStudent::new("S1", "7b");
        young.course = Some("Bio".to_string());
        assert!(matches!(
            upsert_student(&db, rules, young).await,
            Err(Error::Validation { .. })
        ));

        let mut senior = NewStudent::new("S2", "10a");
        senior.course = Some(" Bio ".to_string());
        let stored = upsert_student(&db, rules, senior).await?;
        assert_eq!(stored.course.as_deref(), Some("Bio"));
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_student_does_not_overwrite() -> Result<()> {
        let db = setup_test_db().await?;
        let rules = StudentRules::default();

        let first = ensure_student_exists(&db, rules, NewStudent::new("S1", " 5A ")).await?;
        assert!(first.created);
        assert_eq!(first.student.class_id, "5a");

        let second = ensure_student_exists(&db, rules, NewStudent::new("S1", "6b")).await?;
        assert!(!second.created);
        assert_eq!(second.student.class_id, "5a");
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_student_overwrites() -> Result<()> {
        let db = setup_test_db().await?;
        let rules = StudentRules::default();
        create_test_student(&db, "S1", "5a").await?;

        let mut changed = NewStudent::new("S1", "5B");
        changed.is_gu = true;
        changed.religion = Some(Religion::Rk);
        let stored = upsert_student(&db, rules, changed).await?;

        assert_eq!(stored.class_id, "5b");
        assert!(stored.is_gu);
        assert_eq!(stored.religion.as_deref(), Some("RK"));
        Ok(())
    }

    #[tokio::test]
    async fn test_students_in_class_is_case_insensitive() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_student(&db, "S2", "5a").await?;
        create_test_student(&db, "S1", "5A").await?;
        create_test_student(&db, "S3", "5b").await?;
        set_student_active(&db, "S2", false).await?;

        let all = students_in_class(&db, " 5a ", false).await?;
        let ids: Vec<_> = all.iter().map(|s| s.student_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2"]);

        let active = students_in_class(&db, "5A", true).await?;
        assert_eq!(active.len(), 1);

        assert_eq!(list_class_ids(&db).await?, vec!["5a", "5b"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_require_class() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_student(&db, "S1", "5a").await?;
        set_student_active(&db, "S1", false).await?;
        create_test_title_with_copies(&db, "BIO_6", 20.0, &[]).await?;
        crate::core::rules::add_rule(&db, crate::core::rules::NewRule::new("6a", "BIO_6")).await?;

        // Inactive students and rules both make a class known
        assert_eq!(require_class(&db, " 5A ").await?, "5a");
        assert_eq!(require_class(&db, "6a").await?, "6a");

        let unknown = require_class(&db, "9z").await;
        assert!(matches!(unknown, Err(Error::NotFound { entity: "class", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_teacher_lifecycle() -> Result<()> {
        let db = setup_test_db().await?;
        upsert_teacher(&db, "T2", true).await?;
        upsert_teacher(&db, "T1", true).await?;
        let toggled = set_teacher_active(&db, "T1", false).await?;
        assert!(!toggled.active);

        let teachers = list_teachers(&db).await?;
        assert_eq!(teachers.len(), 2);
        assert_eq!(teachers[0].teacher_id, "T1");

        let result = set_teacher_active(&db, "T9", true).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "teacher", .. })));
        Ok(())
    }
}
