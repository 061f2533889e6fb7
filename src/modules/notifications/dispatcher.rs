//! In-process notification pipeline.
//!
//! Request handlers call [`NotificationDispatcher::emit`], which never blocks
//! and never fails the request. A single [`NotificationWorker`] drains the
//! bounded queue: it stores one notification row per recipient and then pushes
//! it to the recipient's registered devices.

use escola_models::UserId;
use escola_models::notifications::NotificationKind;
use escola_models::report_card::OneDecimal;
use serde_json::{Value, json};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, instrument, warn};

use super::push::{PushMessage, PushOutcome, PushProvider};
use super::service::NotificationService;
use crate::metrics::{
    track_notification_delivered, track_notification_dropped, track_notification_enqueued,
    track_notification_failed,
};

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification queue is full")]
    QueueFull,

    #[error("notification worker has stopped")]
    QueueClosed,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("push request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("push authentication failed: {0}")]
    Auth(String),

    #[error("push provider returned {status}: {message}")]
    Provider { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    GradePosted {
        student_id: UserId,
        subject: String,
        value: f64,
        bimester: i16,
    },
    LowAverage {
        student_id: UserId,
        subject: String,
        average: OneDecimal,
    },
    LowAttendance {
        student_id: UserId,
        subject: String,
        percentage: OneDecimal,
    },
}

/// Who receives a rendered notification besides the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Student,
    Guardian,
    Teacher,
}

/// Title, message and payload stored for one recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: Value,
}

impl NotificationEvent {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationEvent::GradePosted { .. } => NotificationKind::GradePosted,
            NotificationEvent::LowAverage { .. } => NotificationKind::LowAverage,
            NotificationEvent::LowAttendance { .. } => NotificationKind::LowAttendance,
        }
    }

    pub fn student_id(&self) -> UserId {
        match self {
            NotificationEvent::GradePosted { student_id, .. }
            | NotificationEvent::LowAverage { student_id, .. }
            | NotificationEvent::LowAttendance { student_id, .. } => *student_id,
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            NotificationEvent::GradePosted { subject, .. }
            | NotificationEvent::LowAverage { subject, .. }
            | NotificationEvent::LowAttendance { subject, .. } => subject,
        }
    }

    /// Text shown to `audience`; `student_name` is used in third-person messages.
    pub fn render(&self, audience: Audience, student_name: &str) -> RenderedNotification {
        let student_id = self.student_id();
        let (title, message, mut data) = match self {
            NotificationEvent::GradePosted {
                subject,
                value,
                bimester,
                ..
            } => {
                let data = json!({"subject": subject, "value": value, "bimester": bimester});
                match audience {
                    Audience::Student => (
                        format!("Nova nota de {}", subject),
                        format!("Você recebeu nota {} no {}º bimestre", value, bimester),
                        data,
                    ),
                    Audience::Guardian | Audience::Teacher => (
                        format!("Nova nota de {} - {}", subject, student_name),
                        format!(
                            "{} recebeu nota {} em {} no {}º bimestre",
                            student_name, value, subject, bimester
                        ),
                        data,
                    ),
                }
            }
            NotificationEvent::LowAverage {
                subject, average, ..
            } => {
                let data = json!({"subject": subject, "average": average.to_string()});
                match audience {
                    Audience::Student => (
                        format!("Atenção: Média baixa em {}", subject),
                        format!(
                            "Sua média em {} está {}. Procure seu professor para orientações.",
                            subject, average
                        ),
                        data,
                    ),
                    Audience::Guardian | Audience::Teacher => (
                        format!("Atenção: {} - Média baixa em {}", student_name, subject),
                        format!("A média de {} em {} está {}.", student_name, subject, average),
                        data,
                    ),
                }
            }
            NotificationEvent::LowAttendance {
                subject,
                percentage,
                ..
            } => {
                let data = json!({"subject": subject, "percentage": percentage.to_string()});
                match audience {
                    Audience::Student => (
                        format!("Frequência Baixa - {}", subject),
                        format!(
                            "Sua frequência em {} está em {}%. Procure seu professor para orientações.",
                            subject, percentage
                        ),
                        data,
                    ),
                    Audience::Guardian | Audience::Teacher => (
                        format!("Frequência Baixa - {}", student_name),
                        format!(
                            "A frequência de {} em {} está em {}%.",
                            student_name, subject, percentage
                        ),
                        data,
                    ),
                }
            }
        };

        if audience != Audience::Student {
            data["student"] = json!({"id": student_id, "name": student_name});
        }
        data["kind"] = json!(self.kind().as_str());

        RenderedNotification {
            kind: self.kind(),
            title,
            message,
            data,
        }
    }
}

/// Cloneable sending half of the notification queue.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<NotificationEvent>,
}

impl NotificationDispatcher {
    /// Creates the dispatcher and the receiver to hand to [`NotificationWorker`].
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn try_emit(&self, event: NotificationEvent) -> Result<(), NotificationError> {
        let kind = event.kind();
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => NotificationError::QueueFull,
            TrySendError::Closed(_) => NotificationError::QueueClosed,
        })?;
        track_notification_enqueued(kind.as_str());
        Ok(())
    }

    /// Enqueues without waiting; a full or closed queue drops the event.
    pub fn emit(&self, event: NotificationEvent) {
        let kind = event.kind();
        let student_id = event.student_id();
        if let Err(e) = self.try_emit(event) {
            warn!(
                kind = kind.as_str(),
                student_id = %student_id,
                error = %e,
                "notification dropped"
            );
            track_notification_dropped(kind.as_str());
        }
    }
}

pub struct NotificationWorker {
    db: PgPool,
    receiver: mpsc::Receiver<NotificationEvent>,
    push: Arc<dyn PushProvider>,
}

impl NotificationWorker {
    pub fn new(
        db: PgPool,
        receiver: mpsc::Receiver<NotificationEvent>,
        push: Arc<dyn PushProvider>,
    ) -> Self {
        Self { db, receiver, push }
    }

    /// Processes events until every dispatcher clone has been dropped.
    pub async fn run(mut self) {
        info!(provider = self.push.name(), "notification worker started");

        while let Some(event) = self.receiver.recv().await {
            if let Err(e) = self.handle(&event).await {
                error!(
                    kind = event.kind().as_str(),
                    student_id = %event.student_id(),
                    error = %e,
                    "failed to process notification"
                );
                track_notification_failed(event.kind().as_str(), "lookup");
            }
        }

        info!("notification worker drained");
    }

    #[instrument(skip(self, event), fields(kind = event.kind().as_str()))]
    async fn handle(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        let Some(student) = NotificationService::find_student(&self.db, event.student_id()).await?
        else {
            warn!(student_id = %event.student_id(), "notification for unknown student skipped");
            return Ok(());
        };
        let kind = event.kind().as_str();
        let name = student.name.as_str();

        // The student's copy is stored before any other recipient is resolved.
        deliver_each(kind, vec![(student.id, Audience::Student)], move |id, audience| {
            self.deliver(event, name, id, audience)
        })
        .await;

        let others = match event {
            NotificationEvent::GradePosted { .. } | NotificationEvent::LowAverage { .. } => student
                .guardian_id
                .map(|guardian_id| vec![(guardian_id, Audience::Guardian)])
                .unwrap_or_default(),
            NotificationEvent::LowAttendance { subject, .. } => {
                match NotificationService::subject_teachers(&self.db, student.id, subject).await {
                    Ok(teachers) => teachers
                        .into_iter()
                        .map(|id| (id, Audience::Teacher))
                        .collect(),
                    Err(e) => {
                        error!(student_id = %student.id, error = %e, "failed to load subject teachers");
                        track_notification_failed(kind, "recipients");
                        Vec::new()
                    }
                }
            }
        };

        deliver_each(kind, others, move |id, audience| {
            self.deliver(event, name, id, audience)
        })
        .await;

        Ok(())
    }

    async fn deliver(
        &self,
        event: &NotificationEvent,
        student_name: &str,
        recipient_id: UserId,
        audience: Audience,
    ) -> Result<(), NotificationError> {
        let rendered = event.render(audience, student_name);
        NotificationService::store(&self.db, recipient_id, &rendered).await?;
        self.push_to_devices(recipient_id, &rendered).await;
        Ok(())
    }

    /// Push failures are logged per device and never abort the event.
    async fn push_to_devices(&self, recipient_id: UserId, rendered: &RenderedNotification) {
        let kind = rendered.kind.as_str();
        let tokens = match NotificationService::device_tokens(&self.db, recipient_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                error!(recipient_id = %recipient_id, error = %e, "failed to load device tokens");
                track_notification_failed(kind, "push");
                return;
            }
        };

        for token in tokens {
            let message = PushMessage::new(token, &rendered.title, &rendered.message, &rendered.data);
            match self.push.send(&message).await {
                Ok(PushOutcome::Delivered) => track_notification_delivered(kind),
                Ok(PushOutcome::Skipped) => {}
                Ok(PushOutcome::InvalidToken) => {
                    info!(recipient_id = %recipient_id, "removing rejected device token");
                    if let Err(e) =
                        NotificationService::remove_token(&self.db, recipient_id, &message.token)
                            .await
                    {
                        error!(recipient_id = %recipient_id, error = %e, "failed to remove device token");
                    }
                }
                Err(e) => {
                    warn!(recipient_id = %recipient_id, error = %e, "push delivery failed");
                    track_notification_failed(kind, "push");
                }
            }
        }
    }
}

/// Runs `deliver` for every recipient in order. A failure is logged and the
/// remaining recipients are still served. Returns how many failed.
async fn deliver_each<F, Fut>(
    kind: &'static str,
    recipients: Vec<(UserId, Audience)>,
    mut deliver: F,
) -> usize
where
    F: FnMut(UserId, Audience) -> Fut,
    Fut: Future<Output = Result<(), NotificationError>>,
{
    let mut failed = 0;
    for (recipient_id, audience) in recipients {
        if let Err(e) = deliver(recipient_id, audience).await {
            error!(recipient_id = %recipient_id, kind, error = %e, "failed to store notification");
            track_notification_failed(kind, "store");
            failed += 1;
        }
    }
    failed
}
