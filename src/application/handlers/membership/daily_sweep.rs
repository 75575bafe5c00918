//! DailySweep - expires lapsed memberships and warns members before expiry.
//!
//! Meant to be triggered once a day by an external scheduler. Each warning
//! is guarded by a per-membership marker, so re-running the sweep never
//! sends the same email twice.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{Clock, Timestamp};
use crate::domain::membership::{Membership, MembershipError, MembershipView};
use crate::ports::{EmailMessage, EmailSender, MembershipRepository, NotificationKind, NotificationLog};

use super::MembershipLifecycle;

pub const EXPIRED_TEMPLATE: &str = "membership_expired";
pub const EXPIRING_TEMPLATE: &str = "membership_expiring";

const EXPIRED_SUBJECT: &str = "Your membership has expired";
const EXPIRING_SUBJECT: &str = "Your membership is expiring soon";

const SECS_PER_DAY: i64 = 86_400;

/// Counts from one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Memberships moved to expired by this run.
    pub expired: usize,
    /// Expiry warnings sent by this run.
    pub warned: usize,
}

pub struct DailySweep {
    lifecycle: Arc<MembershipLifecycle>,
    memberships: Arc<dyn MembershipRepository>,
    notifications: Arc<dyn NotificationLog>,
    emails: Arc<dyn EmailSender>,
    clock: Arc<dyn Clock>,
    warning_days: u32,
}

impl DailySweep {
    pub fn new(
        lifecycle: Arc<MembershipLifecycle>,
        memberships: Arc<dyn MembershipRepository>,
        notifications: Arc<dyn NotificationLog>,
        emails: Arc<dyn EmailSender>,
        clock: Arc<dyn Clock>,
        warning_days: u32,
    ) -> Self {
        Self {
            lifecycle,
            memberships,
            notifications,
            emails,
            clock,
            warning_days,
        }
    }

    /// Runs both passes.
    ///
    /// A failure on one membership is logged and skipped. Only a failure to
    /// query the candidates aborts the run.
    pub async fn run_daily(&self) -> Result<SweepReport, MembershipError> {
        let mut report = SweepReport::default();
        let now = self.clock.now();

        let due = self.memberships.find_due_for_expiry(&now).await?;
        for membership in due {
            match self.lifecycle.expire_by_id(membership.id).await {
                Ok(expired) => {
                    report.expired += 1;
                    self.notify(&expired, NotificationKind::Expired).await;
                }
                Err(err) => {
                    tracing::error!(
                        membership_id = %membership.id,
                        error = %err,
                        "Failed to expire membership"
                    );
                }
            }
        }

        let horizon = now.add_days(i64::from(self.warning_days));
        let ending = self.memberships.find_ending_between(&now, &horizon).await?;
        for membership in ending {
            if self.notify(&membership, NotificationKind::Expiring).await {
                report.warned += 1;
            }
        }

        tracing::info!(
            expired = report.expired,
            warned = report.warned,
            warning_days = self.warning_days,
            "Daily sweep finished"
        );
        Ok(report)
    }

    /// Sends the email for `kind` unless the marker is already set. Returns
    /// true only when an email went out and the marker was recorded.
    async fn notify(&self, membership: &Membership, kind: NotificationKind) -> bool {
        match self
            .notifications
            .was_notified(&membership.user_id, &membership.id, kind)
            .await
        {
            Ok(true) => return false,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(membership_id = %membership.id, %kind, error = %err, "Marker lookup failed");
                return false;
            }
        }

        let view = match self.lifecycle.get_by_id(membership.id).await {
            Ok(view) => view,
            Err(err) => {
                tracing::warn!(membership_id = %membership.id, error = %err, "Membership vanished before notification");
                return false;
            }
        };
        let Some(message) = notification_message(&view, kind, self.clock.now()) else {
            tracing::warn!(
                membership_id = %membership.id,
                user_id = %membership.user_id,
                %kind,
                "Member has no email address, notification skipped"
            );
            return false;
        };

        if let Err(err) = self.emails.send(message).await {
            tracing::warn!(membership_id = %membership.id, %kind, error = %err, "Notification email failed");
            return false;
        }

        let now = self.clock.now();
        if let Err(err) = self
            .notifications
            .mark_notified(&membership.user_id, &membership.id, kind, &now)
            .await
        {
            tracing::error!(membership_id = %membership.id, %kind, error = %err, "Failed to record notification marker");
            return false;
        }
        tracing::info!(membership_id = %membership.id, user_id = %membership.user_id, %kind, "Member notified");
        true
    }
}

fn notification_message(
    view: &MembershipView,
    kind: NotificationKind,
    now: Timestamp,
) -> Option<EmailMessage> {
    let recipient = view.user_email.as_deref().filter(|e| !e.is_empty())?;
    let (template, subject) = match kind {
        NotificationKind::Expired => (EXPIRED_TEMPLATE, EXPIRED_SUBJECT),
        NotificationKind::Expiring => (EXPIRING_TEMPLATE, EXPIRING_SUBJECT),
    };
    let membership = &view.membership;
    let days_left = match kind {
        NotificationKind::Expiring => membership.end_date.map(|end| days_until(now, end)),
        NotificationKind::Expired => None,
    };

    Some(
        EmailMessage::new(template, recipient)
            .set_subject(subject)
            .with_data("membership_id", membership.id.as_i64())
            .with_data("level_id", membership.level_id.as_i64())
            .with_optional("level_name", view.level_name.clone())
            .with_optional("display_name", view.display_name.clone())
            .with_optional("user_login", view.user_login.clone())
            .with_optional("end_date", membership.end_date.map(|d| d.to_string()))
            .with_optional("days_left", days_left),
    )
}

/// Whole days until `end`, rounded up. A partial day counts as one.
fn days_until(now: Timestamp, end: Timestamp) -> i64 {
    let secs = end.duration_since(&now).num_seconds().max(0);
    (secs + SECS_PER_DAY - 1) / SECS_PER_DAY
}
