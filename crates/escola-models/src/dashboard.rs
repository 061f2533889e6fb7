//! Role-specific dashboard payloads.

use chrono::{DateTime, Utc};
use escola_core::UserRole;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::events::EventKind;
use crate::ids::{ClassId, ContactId, EventId, GradeId, UserId};
use crate::report_card::{OneDecimal, StudentRef};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct RecentGrade {
    pub id: GradeId,
    pub value: f64,
    pub subject: String,
    pub bimester: i16,
    pub student_name: String,
    pub teacher_name: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct EventBrief {
    pub id: EventId,
    pub title: String,
    pub kind: EventKind,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ContactBrief {
    pub id: ContactId,
    pub name: String,
    pub role_title: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BimesterAverage {
    pub subject: String,
    #[schema(value_type = String, example = "7.5")]
    pub average: OneDecimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentGrades {
    pub recent: Vec<RecentGrade>,
    pub bimester: i16,
    pub bimester_averages: Vec<BimesterAverage>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentDashboard {
    pub grades: StudentGrades,
    pub events: Vec<EventBrief>,
    pub contacts: Vec<ContactBrief>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ClassBrief {
    pub id: ClassId,
    pub name: String,
    pub student_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassesStats {
    pub total: usize,
    pub classes: Vec<ClassBrief>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GradesTodayStats {
    pub count: usize,
    pub subjects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AssessmentBrief {
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpcomingAssessments {
    pub count: usize,
    pub next: Option<AssessmentBrief>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeacherStats {
    pub classes: ClassesStats,
    pub grades_today: GradesTodayStats,
    pub upcoming_assessments: UpcomingAssessments,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeacherDashboard {
    pub stats: TeacherStats,
    pub events: Vec<EventBrief>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DependentAverages {
    pub student: StudentRef,
    pub averages: Vec<BimesterAverage>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GuardianDashboard {
    pub bimester: i16,
    pub dependents: Vec<DependentAverages>,
    pub grades: Vec<RecentGrade>,
    pub events: Vec<EventBrief>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchoolStats {
    pub students: i64,
    pub teachers: i64,
    pub classes: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ManagerDashboard {
    pub stats: SchoolStats,
    pub events: Vec<EventBrief>,
    pub latest_grades: Vec<RecentGrade>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum DashboardData {
    Student(StudentDashboard),
    Teacher(TeacherDashboard),
    Guardian(GuardianDashboard),
    Manager(ManagerDashboard),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub user: DashboardUser,
    pub timestamp: DateTime<Utc>,
    pub data: DashboardData,
}
