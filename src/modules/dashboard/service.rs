use escola_core::{AppError, UserRole};
use escola_models::UserId;
use escola_models::report_card::{OneDecimal, StudentRef};
use sqlx::PgPool;
use std::collections::BTreeMap;
use tracing::instrument;

use crate::middleware::auth::Caller;
use crate::modules::dashboard::model::{
    AssessmentBrief, BimesterAverage, ClassBrief, ClassesStats, ContactBrief, DashboardData,
    DependentAverages, EventBrief, GradesTodayStats, GuardianDashboard, ManagerDashboard,
    RecentGrade, SchoolStats, StudentDashboard, StudentGrades, TeacherDashboard, TeacherStats,
    UpcomingAssessments,
};
use crate::modules::events::model::Event;
use crate::modules::events::service::EventService;

const EVENTS_LIMIT: i64 = 5;
const CONTACTS_LIMIT: i64 = 5;
const STUDENT_RECENT_GRADES: i64 = 5;
const GUARDIAN_RECENT_GRADES: i64 = 10;
const MANAGER_LATEST_GRADES: i64 = 5;

/// Bimester in progress for a calendar month (1 = January).
pub fn current_bimester(month: u32) -> i16 {
    match month {
        1..=4 => 1,
        5..=7 => 2,
        8..=10 => 3,
        _ => 4,
    }
}

/// Mean grade per subject, subjects in alphabetical order.
pub fn bimester_averages<'a>(
    grades: impl IntoIterator<Item = (&'a str, f64)>,
) -> Vec<BimesterAverage> {
    let mut totals: BTreeMap<&str, (f64, u32)> = BTreeMap::new();
    for (subject, value) in grades {
        let entry = totals.entry(subject).or_default();
        entry.0 += value;
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(subject, (sum, count))| BimesterAverage {
            subject: subject.to_string(),
            average: OneDecimal::round(sum / f64::from(count)),
        })
        .collect()
}

fn brief(event: Event) -> EventBrief {
    EventBrief {
        id: event.id,
        title: event.title,
        kind: event.kind,
        starts_at: event.starts_at,
        location: event.location,
    }
}

pub struct DashboardService;

impl DashboardService {
    async fn recent_grades(
        db: &PgPool,
        students: Option<&[UserId]>,
        limit: i64,
    ) -> Result<Vec<RecentGrade>, AppError> {
        let grades = sqlx::query_as::<_, RecentGrade>(
            r#"SELECT g.id, g.value, g.subject, g.bimester, s.name AS student_name,
                      t.name AS teacher_name, g.created_at AS recorded_at
               FROM grades g
               JOIN users s ON s.id = g.student_id
               JOIN users t ON t.id = g.recorded_by
               WHERE ($1::uuid[] IS NULL OR g.student_id = ANY($1))
               ORDER BY g.created_at DESC
               LIMIT $2"#,
        )
        .bind(students)
        .bind(limit)
        .fetch_all(db)
        .await?;

        Ok(grades)
    }

    async fn bimester_grades(
        db: &PgPool,
        students: &[UserId],
        bimester: i16,
    ) -> Result<Vec<(UserId, String, f64)>, AppError> {
        let rows = sqlx::query_as::<_, (UserId, String, f64)>(
            "SELECT student_id, subject, value FROM grades WHERE student_id = ANY($1) AND bimester = $2",
        )
        .bind(students)
        .bind(bimester)
        .fetch_all(db)
        .await?;

        Ok(rows)
    }

    async fn upcoming_events(
        db: &PgPool,
        caller: Caller,
        created_by: Option<UserId>,
    ) -> Result<Vec<EventBrief>, AppError> {
        let events = EventService::upcoming(db, caller, created_by, EVENTS_LIMIT).await?;
        Ok(events.into_iter().map(brief).collect())
    }

    async fn student(
        db: &PgPool,
        caller: Caller,
        bimester: i16,
    ) -> Result<StudentDashboard, AppError> {
        let own = std::slice::from_ref(&caller.id);
        let recent = Self::recent_grades(db, Some(own), STUDENT_RECENT_GRADES).await?;
        let grades = Self::bimester_grades(db, own, bimester).await?;
        let events = Self::upcoming_events(db, caller, None).await?;

        let contacts = sqlx::query_as::<_, ContactBrief>(
            r#"SELECT c.id, u.name, c.role_title, c.professional_email AS email
               FROM contacts c
               JOIN users u ON u.id = c.user_id
               WHERE c.is_active
               ORDER BY u.name
               LIMIT $1"#,
        )
        .bind(CONTACTS_LIMIT)
        .fetch_all(db)
        .await?;

        Ok(StudentDashboard {
            grades: StudentGrades {
                recent,
                bimester,
                bimester_averages: bimester_averages(
                    grades.iter().map(|(_, subject, value)| (subject.as_str(), *value)),
                ),
            },
            events,
            contacts,
        })
    }

    async fn teacher(db: &PgPool, caller: Caller) -> Result<TeacherDashboard, AppError> {
        let classes = sqlx::query_as::<_, ClassBrief>(
            r#"SELECT c.id, c.name, COUNT(cs.student_id) AS student_count
               FROM classes c
               LEFT JOIN class_students cs ON cs.class_id = c.id
               WHERE c.teacher_id = $1 AND c.is_active
               GROUP BY c.id, c.name
               ORDER BY c.name"#,
        )
        .bind(caller.id)
        .fetch_all(db)
        .await?;

        let today_subjects = sqlx::query_scalar::<_, String>(
            r#"SELECT subject FROM grades
               WHERE recorded_by = $1 AND created_at >= date_trunc('day', NOW())"#,
        )
        .bind(caller.id)
        .fetch_all(db)
        .await?;

        let assessments = sqlx::query_as::<_, AssessmentBrief>(
            r#"SELECT title, starts_at, kind FROM events
               WHERE created_by = $1
                 AND kind IN ('exam', 'assignment')
                 AND status = 'scheduled'
                 AND starts_at >= NOW() AND starts_at <= NOW() + INTERVAL '7 days'
               ORDER BY starts_at"#,
        )
        .bind(caller.id)
        .fetch_all(db)
        .await?;

        let events = Self::upcoming_events(db, caller, Some(caller.id)).await?;

        let graded_today = today_subjects.len();
        let mut subjects = today_subjects;
        subjects.sort();
        subjects.dedup();

        Ok(TeacherDashboard {
            stats: TeacherStats {
                classes: ClassesStats {
                    total: classes.len(),
                    classes,
                },
                grades_today: GradesTodayStats {
                    count: graded_today,
                    subjects,
                },
                upcoming_assessments: UpcomingAssessments {
                    count: assessments.len(),
                    next: assessments.into_iter().next(),
                },
            },
            events,
        })
    }

    async fn guardian(
        db: &PgPool,
        caller: Caller,
        bimester: i16,
    ) -> Result<GuardianDashboard, AppError> {
        let dependents = sqlx::query_as::<_, StudentRef>(
            "SELECT id, name FROM users WHERE guardian_id = $1 AND role = 'student' ORDER BY name",
        )
        .bind(caller.id)
        .fetch_all(db)
        .await?;

        let ids: Vec<UserId> = dependents.iter().map(|d| d.id).collect();
        let grades = Self::bimester_grades(db, &ids, bimester).await?;
        let recent = Self::recent_grades(db, Some(ids.as_slice()), GUARDIAN_RECENT_GRADES).await?;
        let events = Self::upcoming_events(db, caller, None).await?;

        let dependents = dependents
            .into_iter()
            .map(|student| {
                let averages = bimester_averages(
                    grades
                        .iter()
                        .filter(|(id, _, _)| *id == student.id)
                        .map(|(_, subject, value)| (subject.as_str(), *value)),
                );
                DependentAverages { student, averages }
            })
            .collect();

        Ok(GuardianDashboard {
            bimester,
            dependents,
            grades: recent,
            events,
        })
    }

    async fn manager(db: &PgPool, caller: Caller) -> Result<ManagerDashboard, AppError> {
        let (students, teachers, classes) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"SELECT
                   (SELECT COUNT(*) FROM users WHERE role = 'student' AND is_active),
                   (SELECT COUNT(*) FROM users WHERE role = 'teacher' AND is_active),
                   (SELECT COUNT(*) FROM classes WHERE is_active)"#,
        )
        .fetch_one(db)
        .await?;

        let events = Self::upcoming_events(db, caller, None).await?;
        let latest_grades = Self::recent_grades(db, None, MANAGER_LATEST_GRADES).await?;

        Ok(ManagerDashboard {
            stats: SchoolStats {
                students,
                teachers,
                classes,
            },
            events,
            latest_grades,
        })
    }

    #[instrument(skip(db))]
    pub async fn build(db: &PgPool, caller: Caller, month: u32) -> Result<DashboardData, AppError> {
        let bimester = current_bimester(month);

        let data = match caller.role {
            UserRole::Student => DashboardData::Student(Self::student(db, caller, bimester).await?),
            UserRole::Teacher => DashboardData::Teacher(Self::teacher(db, caller).await?),
            UserRole::Guardian => {
                DashboardData::Guardian(Self::guardian(db, caller, bimester).await?)
            }
            UserRole::Manager => DashboardData::Manager(Self::manager(db, caller).await?),
        };

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_bimester_by_month() {
        let expected = [1, 1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4];
        for (month, bimester) in (1..=12).zip(expected) {
            assert_eq!(current_bimester(month), bimester, "month {month}");
        }
    }

    #[test]
    fn test_bimester_averages_per_subject() {
        let averages = bimester_averages([
            ("Português", 7.0),
            ("Matemática", 8.0),
            ("Português", 8.5),
            ("Matemática", 6.5),
            ("Matemática", 5.0),
        ]);

        let json = serde_json::to_value(&averages).unwrap();
        assert_eq!(json[0]["subject"], "Matemática");
        assert_eq!(json[0]["average"], "6.5");
        assert_eq!(json[1]["subject"], "Português");
        assert_eq!(json[1]["average"], "7.8");
    }

    #[test]
    fn test_no_grades_no_averages() {
        assert!(bimester_averages(std::iter::empty()).is_empty());
    }
}
