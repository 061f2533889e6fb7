//! Seed records and the seeding configuration.

use chrono::NaiveDate;
use escola_core::UserRole;
use escola_models::{ClassId, UserId};
use escola_models::attendance::AttendanceStatus;

/// Subjects handed out to seeded classes, in order.
pub const SUBJECTS: &[&str] = &[
    "Matemática",
    "Português",
    "História",
    "Geografia",
    "Ciências",
    "Inglês",
];

pub struct UserSeed {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub enrollment: Option<String>,
}

pub struct ClassSeed {
    pub name: String,
    pub year: i32,
    pub subject: String,
    pub teacher_id: UserId,
}

/// A class together with the students enrolled in it.
#[derive(Clone)]
pub struct SeededClass {
    pub id: ClassId,
    pub subject: String,
    pub teacher_id: UserId,
    pub students: Vec<UserId>,
}

pub struct GradeSeed {
    pub student_id: UserId,
    pub subject: String,
    pub value: f64,
    pub bimester: i16,
    pub recorded_by: UserId,
}

pub struct AttendanceSeed {
    pub class_id: ClassId,
    pub date: NaiveDate,
    pub recorded_by: UserId,
    pub marks: Vec<(UserId, AttendanceStatus)>,
}

#[derive(Clone)]
pub struct SeedConfig {
    pub classes: usize,
    pub teachers: usize,
    pub students: usize,
    /// Grades per student, subject and bimester
    pub grades_per_bimester: usize,
    /// Bimesters (1..=4) that receive grades
    pub bimesters: i16,
    /// School days of attendance per class
    pub attendance_days: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            classes: 6,
            teachers: 3,
            students: 30,
            grades_per_bimester: 2,
            bimesters: 2,
            attendance_days: 20,
        }
    }
}

impl SeedConfig {
    pub fn new(classes: usize) -> Self {
        Self {
            classes,
            ..Default::default()
        }
    }

    pub fn with_teachers(mut self, teachers: usize) -> Self {
        self.teachers = teachers.max(1);
        self
    }

    pub fn with_students(mut self, students: usize) -> Self {
        self.students = students;
        self
    }

    pub fn with_attendance_days(mut self, days: usize) -> Self {
        self.attendance_days = days;
        self
    }

    /// Each cohort takes one class per subject.
    pub fn cohorts(&self) -> usize {
        self.classes.div_ceil(SUBJECTS.len()).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cohorts() {
        assert_eq!(SeedConfig::new(0).cohorts(), 1);
        assert_eq!(SeedConfig::new(6).cohorts(), 1);
        assert_eq!(SeedConfig::new(7).cohorts(), 2);
        assert_eq!(SeedConfig::new(12).cohorts(), 2);
    }

    #[test]
    fn test_teachers_at_least_one() {
        assert_eq!(SeedConfig::default().with_teachers(0).teachers, 1);
    }
}
