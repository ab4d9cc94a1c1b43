//! Background jobs.
//!
//! Two loops run beside the HTTP server:
//!
//! - **Reminders**: every `reminder_interval`, email customers whose
//!   appointment starts within `reminder_lead`. An appointment is marked
//!   only after its reminder was sent, so a failed send is retried on the
//!   next tick.
//! - **Blog drafts**: every `blog_interval`, ask Claude for a post on the
//!   next configured topic and write it as a draft into the blog directory.
//!
//! The schedule is passed in as [`JobsConfig`]; nothing is global. Call
//! [`JobHandle::shutdown`] during graceful shutdown to stop both loops.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::claude::ClaudeClient;
use crate::config::JobsConfig;
use crate::content::{generate_draft, write_draft};
use crate::db::{AppointmentRepository, RepositoryError};
use crate::services::{NotificationReport, Notifier};
use crate::state::AppState;

/// Upper bound on the reminder window.
const MAX_REMINDER_LEAD_DAYS: i64 = 30;

/// What the jobs need from the application.
#[derive(Clone)]
pub struct JobDeps {
    pub pool: PgPool,
    pub notifier: Notifier,
    /// `None` disables blog drafts.
    pub claude: Option<ClaudeClient>,
    /// Where generated drafts are written.
    pub blog_dir: PathBuf,
}

impl JobDeps {
    /// Take the shared services from the application state.
    #[must_use]
    pub fn from_state(state: &AppState) -> Self {
        Self {
            pool: state.pool().clone(),
            notifier: state.notifier().clone(),
            claude: state.recommendations().client().cloned(),
            blog_dir: state.config().content_dir.join("blog"),
        }
    }
}

/// Outcome of one reminder pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSummary {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Starts the background loops.
pub struct JobRunner;

impl JobRunner {
    /// Spawn every job enabled by `config` and `deps`.
    ///
    /// Reminders need email and a non-zero interval. Blog drafts need a
    /// Claude client, a non-zero interval and at least one topic.
    #[must_use]
    pub fn start(config: JobsConfig, deps: JobDeps) -> JobHandle {
        let (shutdown, signal) = watch::channel(false);
        let mut tasks = Vec::new();

        if deps.notifier.can_email() && config.reminder_interval.is_zero() {
            warn!("Reminder interval is zero, appointment reminder job disabled");
        } else if deps.notifier.can_email() {
            info!(
                interval_secs = config.reminder_interval.as_secs(),
                lead_secs = config.reminder_lead.as_secs(),
                "Starting appointment reminder job"
            );
            tasks.push(tokio::spawn(reminder_loop(
                deps.clone(),
                config.reminder_interval,
                config.reminder_lead,
                signal.clone(),
            )));
        } else {
            info!("Email not configured, appointment reminder job disabled");
        }

        match (config.blog_interval, deps.claude.clone()) {
            (Some(period), Some(client))
                if !period.is_zero() && !config.blog_topics.is_empty() =>
            {
                info!(
                    interval_secs = period.as_secs(),
                    topics = config.blog_topics.len(),
                    "Starting blog draft job"
                );
                tasks.push(tokio::spawn(blog_loop(
                    client,
                    deps.blog_dir,
                    period,
                    config.blog_topics,
                    signal,
                )));
            }
            (Some(_), None) => {
                warn!("Blog generation interval set but Claude is not configured");
            }
            _ => debug!("Blog draft job disabled"),
        }

        JobHandle { shutdown, tasks }
    }
}

/// Running jobs. Dropping the handle without calling
/// [`shutdown`](Self::shutdown) also stops the loops, without waiting.
pub struct JobHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl JobHandle {
    /// Number of running loops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no job was started.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Signal every loop to stop and wait for it. A pass already in
    /// progress finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Background job panicked");
            }
        }
        info!("Background jobs stopped");
    }
}

async fn reminder_loop(
    deps: JobDeps,
    period: Duration,
    lead: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let lead = chrono::Duration::from_std(lead)
        .unwrap_or_else(|_| chrono::Duration::days(MAX_REMINDER_LEAD_DAYS))
        .min(chrono::Duration::days(MAX_REMINDER_LEAD_DAYS));

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                match send_due_reminders(&deps, lead).await {
                    Ok(summary) if summary == ReminderSummary::default() => {}
                    Ok(summary) => info!(
                        sent = summary.sent,
                        skipped = summary.skipped,
                        failed = summary.failed,
                        "Reminder pass finished"
                    ),
                    Err(e) => error!(error = %e, "Reminder pass failed"),
                }
            }
        }
    }
}

/// Send reminders for every appointment due within `lead`.
///
/// # Errors
///
/// Returns `RepositoryError` if the due appointments cannot be loaded.
/// Failures marking a single appointment are logged and counted.
pub async fn send_due_reminders(
    deps: &JobDeps,
    lead: chrono::Duration,
) -> Result<ReminderSummary, RepositoryError> {
    let repo = AppointmentRepository::new(&deps.pool);
    let now = Utc::now();
    let due = repo.due_for_reminder(now, lead).await?;

    let mut summary = ReminderSummary::default();
    for appointment in &due {
        match deps.notifier.send_reminder(appointment).await {
            NotificationReport::Sent { .. } => {
                summary.sent += 1;
                if let Err(e) = repo.mark_reminded(appointment.id, Utc::now()).await {
                    // The email went out; the next pass may send it again.
                    error!(appointment_id = %appointment.id, error = %e, "Failed to mark reminder sent");
                }
            }
            NotificationReport::Skipped { .. } => summary.skipped += 1,
            NotificationReport::Failed { .. } => summary.failed += 1,
        }
    }

    Ok(summary)
}

async fn blog_loop(
    client: ClaudeClient,
    blog_dir: PathBuf,
    period: Duration,
    topics: Vec<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    // First draft one full period after startup, not on every restart.
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut topics = topics.iter().cycle();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let Some(topic) = topics.next() else { break };
                write_blog_draft(&client, &blog_dir, topic).await;
            }
        }
    }
}

async fn write_blog_draft(client: &ClaudeClient, blog_dir: &std::path::Path, topic: &str) {
    let today = Utc::now().date_naive();
    let draft = match generate_draft(client, topic, today).await {
        Ok(draft) => draft,
        Err(e) => {
            warn!(topic, error = %e, "Blog draft generation failed");
            return;
        }
    };

    match write_draft(blog_dir, &draft).await {
        Ok(path) => info!(topic, path = %path.display(), title = %draft.title, "Blog draft written"),
        Err(e) => error!(topic, error = %e, "Failed to write blog draft"),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::config::EmailConfig;
    use crate::services::EmailService;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://frameshop@127.0.0.1:1/frameshop")
            .expect("lazy pool")
    }

    fn deps(email: Option<EmailService>) -> JobDeps {
        let pool = lazy_pool();
        JobDeps {
            notifier: Notifier::new(email, None, pool.clone()),
            pool,
            claude: None,
            blog_dir: PathBuf::from("target/never-written"),
        }
    }

    fn email_service() -> EmailService {
        let config = EmailConfig {
            smtp_host: "127.0.0.1".to_string(),
            smtp_port: 1,
            smtp_username: "shop".to_string(),
            smtp_password: SecretString::from("unused-in-tests"),
            from_address: "Frame Shop <shop@example.com>".to_string(),
            shop_address: None,
        };
        EmailService::new(&config, "http://localhost:3000").expect("email service")
    }

    fn config() -> JobsConfig {
        JobsConfig {
            reminder_interval: Duration::from_millis(50),
            blog_interval: Some(Duration::from_millis(50)),
            ..JobsConfig::default()
        }
    }

    #[tokio::test]
    async fn test_nothing_starts_without_email_or_claude() {
        let handle = JobRunner::start(config(), deps(None));
        assert!(handle.is_empty());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reminder_job_starts_with_email_and_stops() {
        let handle = JobRunner::start(config(), deps(Some(email_service())));
        assert_eq!(handle.len(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("jobs stop promptly");
    }

    #[tokio::test]
    async fn test_zero_reminder_interval_disables_job() {
        let config = JobsConfig {
            reminder_interval: Duration::ZERO,
            ..config()
        };
        let handle = JobRunner::start(config, deps(Some(email_service())));
        assert!(handle.is_empty());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reminder_pass_reports_database_errors() {
        let result = send_due_reminders(&deps(None), chrono::Duration::hours(24)).await;
        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }
}
