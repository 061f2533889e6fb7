use crate::env_parse;

#[derive(Clone, Debug)]
pub struct NotificationConfig {
    /// Capacity of the in-process notification queue; events beyond it are dropped
    pub queue_capacity: usize,
    /// Final averages strictly below this emit a low-average alert
    pub low_average_threshold: f64,
    /// Attendance percentages strictly below this emit a low-attendance alert
    pub low_attendance_threshold: f64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            low_average_threshold: 6.0,
            low_attendance_threshold: 75.0,
        }
    }
}

impl NotificationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            queue_capacity: env_parse("NOTIFICATION_QUEUE_CAPACITY", defaults.queue_capacity)
                .max(1),
            low_average_threshold: env_parse(
                "LOW_AVERAGE_THRESHOLD",
                defaults.low_average_threshold,
            ),
            low_attendance_threshold: env_parse(
                "LOW_ATTENDANCE_THRESHOLD",
                defaults.low_attendance_threshold,
            ),
        }
    }
}
