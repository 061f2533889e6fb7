use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use escola_core::UserRole;
use escola_models::announcements::{
    Announcement, AnnouncementKind, CreateAnnouncementDto, UpdateAnnouncementDto,
};
use escola_models::attendance::{
    AttendanceEntry, AttendanceSessionWithEntries, AttendanceStatus, CreateAttendanceDto,
    JustifyAbsenceDto, StudentAttendanceReport,
};
use escola_models::auth::{
    AuthResponse, LoginRequest, MessageResponse, RefreshTokenRequest, RegisterRequest,
};
use escola_models::calendar::{
    CalendarEntry, CalendarKind, CreateCalendarEntryDto, Recurrence, UpdateCalendarEntryDto,
};
use escola_models::classes::{ClassStudentsDto, ClassWithStudents, CreateClassDto, UpdateClassDto};
use escola_models::contacts::{
    Availability, Contact, ContactListResponse, ContactSearchResponse, CreateContactDto,
    OfficeHours, SchoolDay, UpdateContactDto,
};
use escola_models::dashboard::{DashboardData, DashboardResponse};
use escola_models::events::{
    CreateEventDto, Event, EventKind, EventStatus, PeriodEventsResponse, PeriodKind,
    UpdateEventDto,
};
use escola_models::grades::{
    CreateGradeDto, Grade, GradeView, PaginatedGradesResponse, SubjectAverage, UpdateGradeDto,
};
use escola_models::notifications::{Notification, NotificationKind, RegisterDeviceTokenDto};
use escola_models::report_card::ReportCardResponse;
use escola_models::tasks::{CreateTaskDto, Task, UpdateTaskDto};
use escola_models::users::{User, UserSummary};

use crate::router::HealthResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::router::health,
        crate::modules::auth::controller::register_user,
        crate::modules::auth::controller::login_user,
        crate::modules::auth::controller::refresh_token,
        crate::modules::auth::controller::get_me,
        crate::modules::classes::controller::list_classes,
        crate::modules::classes::controller::create_class,
        crate::modules::classes::controller::update_class,
        crate::modules::classes::controller::add_students,
        crate::modules::classes::controller::remove_students,
        crate::modules::grades::controller::create_grade,
        crate::modules::grades::controller::list_my_grades,
        crate::modules::grades::controller::list_grades,
        crate::modules::grades::controller::filter_grades,
        crate::modules::grades::controller::get_report_card,
        crate::modules::grades::controller::get_subject_average,
        crate::modules::grades::controller::update_grade,
        crate::modules::grades::controller::delete_grade,
        crate::modules::attendance::controller::record_attendance,
        crate::modules::attendance::controller::list_class_attendance,
        crate::modules::attendance::controller::justify_absence,
        crate::modules::attendance::controller::get_student_attendance,
        crate::modules::events::controller::create_event,
        crate::modules::events::controller::list_events,
        crate::modules::events::controller::update_event,
        crate::modules::events::controller::cancel_event,
        crate::modules::events::controller::list_events_by_period,
        crate::modules::calendar::controller::create_calendar_entry,
        crate::modules::calendar::controller::list_calendar_entries,
        crate::modules::calendar::controller::list_class_calendar,
        crate::modules::calendar::controller::update_calendar_entry,
        crate::modules::calendar::controller::delete_calendar_entry,
        crate::modules::announcements::controller::create_announcement,
        crate::modules::announcements::controller::list_announcements,
        crate::modules::announcements::controller::mark_announcement_read,
        crate::modules::announcements::controller::update_announcement,
        crate::modules::announcements::controller::delete_announcement,
        crate::modules::tasks::controller::create_task,
        crate::modules::tasks::controller::list_my_tasks,
        crate::modules::tasks::controller::list_teacher_tasks,
        crate::modules::tasks::controller::update_task,
        crate::modules::tasks::controller::delete_task,
        crate::modules::contacts::controller::list_contacts,
        crate::modules::contacts::controller::search_contacts,
        crate::modules::contacts::controller::get_contact,
        crate::modules::contacts::controller::create_contact,
        crate::modules::contacts::controller::update_contact,
        crate::modules::notifications::controller::list_my_notifications,
        crate::modules::notifications::controller::mark_notification_read,
        crate::modules::notifications::controller::register_device_token,
        crate::modules::notifications::controller::remove_device_tokens,
        crate::modules::dashboard::controller::get_dashboard,
    ),
    components(
        schemas(
            HealthResponse,
            User,
            UserRole,
            UserSummary,
            RegisterRequest,
            LoginRequest,
            RefreshTokenRequest,
            AuthResponse,
            MessageResponse,
            ClassWithStudents,
            CreateClassDto,
            UpdateClassDto,
            ClassStudentsDto,
            Grade,
            GradeView,
            CreateGradeDto,
            UpdateGradeDto,
            PaginatedGradesResponse,
            SubjectAverage,
            ReportCardResponse,
            AttendanceStatus,
            AttendanceEntry,
            AttendanceSessionWithEntries,
            CreateAttendanceDto,
            JustifyAbsenceDto,
            StudentAttendanceReport,
            Event,
            EventKind,
            EventStatus,
            CreateEventDto,
            UpdateEventDto,
            PeriodKind,
            PeriodEventsResponse,
            CalendarEntry,
            CalendarKind,
            Recurrence,
            CreateCalendarEntryDto,
            UpdateCalendarEntryDto,
            Announcement,
            AnnouncementKind,
            CreateAnnouncementDto,
            UpdateAnnouncementDto,
            Task,
            CreateTaskDto,
            UpdateTaskDto,
            Contact,
            OfficeHours,
            SchoolDay,
            Availability,
            CreateContactDto,
            UpdateContactDto,
            ContactListResponse,
            ContactSearchResponse,
            Notification,
            NotificationKind,
            RegisterDeviceTokenDto,
            DashboardData,
            DashboardResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness probe"),
        (name = "Authentication", description = "Registration, login and token refresh"),
        (name = "Classes", description = "Teacher-owned classes and their rosters"),
        (name = "Grades", description = "Grades, report cards and subject averages"),
        (name = "Attendance", description = "Attendance sessions and absence justification"),
        (name = "Events", description = "School events and period timelines"),
        (name = "Calendar", description = "Academic calendar entries"),
        (name = "Announcements", description = "Targeted announcements with read receipts"),
        (name = "Tasks", description = "Tasks assigned by teachers to students"),
        (name = "Contacts", description = "Staff directory and office-hour availability"),
        (name = "Notifications", description = "In-app notifications and push device tokens"),
        (name = "Dashboard", description = "Role-specific home screen data")
    ),
    info(
        title = "Escola API",
        version = "0.1.0",
        description = "School management REST API built with Rust, Axum, and PostgreSQL.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
