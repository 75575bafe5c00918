//! MembershipLifecycle - owns membership transitions and capability grants.
//!
//! Every operation follows the same order: load the row, apply the
//! transition in memory, persist it with a version check, then reconcile
//! the user's capabilities and publish an event. The row is written before
//! any side effect, so a failure afterwards leaves the row as the source of
//! truth and `recalculate_capabilities` can repair the grants.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::{Clock, LevelId, MembershipId, StateMachine, Timestamp, UserId};
use crate::domain::membership::{
    BillingTerms, Capability, CapabilitySet, Level, Membership, MembershipError,
    MembershipEvent, MembershipStatus, MembershipView, NewMembership, TermsUpdate,
};
use crate::ports::{
    CapabilityGrantor, EventSink, GracePeriodPolicy, LevelCatalog, MembershipRepository,
    UserDirectory,
};

/// Optional settings for `assign`.
#[derive(Debug, Clone, Default)]
pub struct AssignOptions {
    /// Defaults to now.
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub billing: Option<BillingTerms>,
    pub reason: Option<String>,
}

pub struct MembershipLifecycle {
    memberships: Arc<dyn MembershipRepository>,
    levels: Arc<dyn LevelCatalog>,
    users: Arc<dyn UserDirectory>,
    capabilities: Arc<dyn CapabilityGrantor>,
    grace_policy: Arc<dyn GracePeriodPolicy>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl MembershipLifecycle {
    pub fn new(
        memberships: Arc<dyn MembershipRepository>,
        levels: Arc<dyn LevelCatalog>,
        users: Arc<dyn UserDirectory>,
        capabilities: Arc<dyn CapabilityGrantor>,
        grace_policy: Arc<dyn GracePeriodPolicy>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            memberships,
            levels,
            users,
            capabilities,
            grace_policy,
            events,
            clock,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assignment
    // ════════════════════════════════════════════════════════════════════════════

    /// Gives a user a level.
    ///
    /// If the current row for the pair is already active it is kept (billing
    /// terms and end date are refreshed when supplied); otherwise a new
    /// active row is created and becomes current.
    pub async fn assign(
        &self,
        user_id: UserId,
        level_id: LevelId,
        options: AssignOptions,
    ) -> Result<Membership, MembershipError> {
        self.levels
            .find_level(&level_id)
            .await?
            .ok_or(MembershipError::LevelNotFound(level_id))?;

        let now = self.clock.now();

        if let Some(mut current) = self.memberships.find_current(&user_id, &level_id).await? {
            if current.status == MembershipStatus::Active {
                if options.billing.is_some() || options.end_date.is_some() {
                    current.renew(options.billing, options.end_date, now);
                    current = self.memberships.update(&current).await?;
                }
                tracing::debug!(
                    membership_id = %current.id,
                    user_id = %user_id,
                    level_id = %level_id,
                    "Level already active, assignment kept"
                );
                self.sync_capabilities(&user_id).await;
                return Ok(current);
            }
        }

        let mut draft = NewMembership::active(user_id, level_id, now);
        draft.start_date = options.start_date.unwrap_or(now);
        draft.end_date = options.end_date;
        draft.billing = options.billing.unwrap_or_default();
        draft.status_reason = options.reason;

        let membership = self.memberships.insert(draft).await?;
        tracing::info!(
            membership_id = %membership.id,
            user_id = %user_id,
            level_id = %level_id,
            "Membership assigned"
        );

        self.sync_capabilities(&user_id).await;
        self.events
            .publish(
                MembershipEvent::Assigned {
                    membership_id: membership.id,
                    user_id,
                    level_id,
                    occurred_at: now,
                }
                .into(),
            )
            .await;

        Ok(membership)
    }

    /// Applies gateway-reported billing terms and end date to the current
    /// row for the pair. The row must be active.
    pub async fn update_terms(
        &self,
        user_id: UserId,
        level_id: LevelId,
        update: TermsUpdate,
    ) -> Result<Membership, MembershipError> {
        let mut membership = self.current(&user_id, &level_id).await?;
        if update.is_empty() {
            return Ok(membership);
        }
        membership.update_terms(&update, self.clock.now())?;

        let saved = self.memberships.update(&membership).await?;
        tracing::info!(
            membership_id = %saved.id,
            user_id = %user_id,
            level_id = %level_id,
            end_date = ?saved.end_date.map(|d| d.to_string()),
            "Membership terms updated"
        );
        self.sync_capabilities(&user_id).await;
        Ok(saved)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Transitions
    // ════════════════════════════════════════════════════════════════════════════

    /// Cancels the current membership for the pair, entering grace when the
    /// grace policy grants days.
    pub async fn cancel(
        &self,
        user_id: UserId,
        level_id: LevelId,
        reason: Option<String>,
    ) -> Result<Membership, MembershipError> {
        let membership = self.current(&user_id, &level_id).await?;
        self.cancel_membership(membership, reason).await
    }

    pub async fn cancel_by_id(
        &self,
        id: MembershipId,
        reason: Option<String>,
    ) -> Result<Membership, MembershipError> {
        let membership = self.by_id(&id).await?;
        self.cancel_membership(membership, reason).await
    }

    /// Valid from cancelled or grace only.
    pub async fn reactivate(
        &self,
        user_id: UserId,
        level_id: LevelId,
    ) -> Result<Membership, MembershipError> {
        let membership = self.current(&user_id, &level_id).await?;
        self.transition(membership, None, |m, now| m.reactivate(now)).await
    }

    pub async fn reactivate_by_id(&self, id: MembershipId) -> Result<Membership, MembershipError> {
        let membership = self.by_id(&id).await?;
        self.transition(membership, None, |m, now| m.reactivate(now)).await
    }

    /// Suspends access until `until`, or indefinitely when `None`.
    pub async fn pause(
        &self,
        user_id: UserId,
        level_id: LevelId,
        until: Option<Timestamp>,
        reason: Option<String>,
    ) -> Result<Membership, MembershipError> {
        let membership = self.current(&user_id, &level_id).await?;
        self.pause_membership(membership, until, reason).await
    }

    pub async fn pause_by_id(
        &self,
        id: MembershipId,
        until: Option<Timestamp>,
        reason: Option<String>,
    ) -> Result<Membership, MembershipError> {
        let membership = self.by_id(&id).await?;
        self.pause_membership(membership, until, reason).await
    }

    /// Valid from paused only.
    pub async fn resume(
        &self,
        user_id: UserId,
        level_id: LevelId,
        reason: Option<String>,
    ) -> Result<Membership, MembershipError> {
        let membership = self.current(&user_id, &level_id).await?;
        let logged = reason.clone();
        self.transition(membership, logged, move |m, now| m.resume(now, reason))
            .await
    }

    pub async fn resume_by_id(
        &self,
        id: MembershipId,
        reason: Option<String>,
    ) -> Result<Membership, MembershipError> {
        let membership = self.by_id(&id).await?;
        let logged = reason.clone();
        self.transition(membership, logged, move |m, now| m.resume(now, reason))
            .await
    }

    /// Forces the current membership for the pair to expired. Already
    /// cancelled or expired rows are returned untouched.
    pub async fn expire(
        &self,
        user_id: UserId,
        level_id: LevelId,
    ) -> Result<Membership, MembershipError> {
        let membership = self.current(&user_id, &level_id).await?;
        self.expire_membership(membership).await
    }

    pub async fn expire_by_id(&self, id: MembershipId) -> Result<Membership, MembershipError> {
        let membership = self.by_id(&id).await?;
        self.expire_membership(membership).await
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Reads and deletion
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn get_by_id(&self, id: MembershipId) -> Result<MembershipView, MembershipError> {
        let membership = self.by_id(&id).await?;
        self.hydrate(membership).await
    }

    /// Views for every id that exists, in id order.
    pub async fn get_many(&self, ids: &[MembershipId]) -> Result<Vec<MembershipView>, MembershipError> {
        let rows = self.memberships.find_many(ids).await?;
        let mut views = Vec::with_capacity(rows.len());
        for membership in rows {
            views.push(self.hydrate(membership).await?);
        }
        Ok(views)
    }

    /// Removes a membership row and drops whatever it granted.
    pub async fn delete_by_id(&self, id: MembershipId) -> Result<(), MembershipError> {
        let membership = self.by_id(&id).await?;
        if !self.memberships.delete(&id).await? {
            return Err(MembershipError::not_found(id));
        }
        tracing::info!(
            membership_id = %id,
            user_id = %membership.user_id,
            level_id = %membership.level_id,
            "Membership deleted"
        );

        self.sync_capabilities(&membership.user_id).await;
        self.events
            .publish(
                MembershipEvent::Deleted {
                    membership_id: id,
                    user_id: membership.user_id,
                    level_id: membership.level_id,
                    occurred_at: self.clock.now(),
                }
                .into(),
            )
            .await;
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Capabilities
    // ════════════════════════════════════════════════════════════════════════════

    /// Recomputes the user's capabilities from the current membership of
    /// each level and reconciles the grantor to exactly that set. Older rows
    /// for a level never grant anything. Returns the resulting set.
    pub async fn recalculate_capabilities(
        &self,
        user_id: &UserId,
    ) -> Result<CapabilitySet, MembershipError> {
        let now = self.clock.now();
        let rows = self.memberships.find_by_user(user_id).await?;

        let mut current: HashMap<LevelId, &Membership> = HashMap::new();
        for membership in &rows {
            current
                .entry(membership.level_id)
                .and_modify(|held| {
                    if membership.id > held.id {
                        *held = membership;
                    }
                })
                .or_insert(membership);
        }

        let mut levels: HashMap<LevelId, Option<Level>> = HashMap::new();
        let mut desired = CapabilitySet::new();
        for membership in current.values().filter(|m| m.grants_capabilities(now)) {
            if !levels.contains_key(&membership.level_id) {
                let level = self.levels.find_level(&membership.level_id).await?;
                levels.insert(membership.level_id, level);
            }
            match levels.get(&membership.level_id).and_then(Option::as_ref) {
                Some(level) => desired.extend(level.capabilities()),
                None => {
                    desired.insert(Capability::for_level(membership.level_id));
                }
            }
        }

        let granted = self.capabilities.granted(user_id).await?;
        let missing: Vec<&Capability> = desired.difference(&granted).collect();
        let extra: Vec<&Capability> = granted.difference(&desired).collect();

        for capability in &missing {
            self.capabilities.grant(user_id, capability).await?;
        }
        for capability in &extra {
            self.capabilities.revoke(user_id, capability).await?;
        }

        if !missing.is_empty() || !extra.is_empty() {
            tracing::debug!(
                user_id = %user_id,
                granted = missing.len(),
                revoked = extra.len(),
                "Capabilities reconciled"
            );
        }
        Ok(desired)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internals
    // ════════════════════════════════════════════════════════════════════════════

    async fn cancel_membership(
        &self,
        membership: Membership,
        reason: Option<String>,
    ) -> Result<Membership, MembershipError> {
        let grace_days = self.grace_policy.grace_days(&membership, reason.as_deref());
        let logged = reason.clone();
        self.transition(membership, logged, move |m, now| m.cancel(now, grace_days, reason))
            .await
    }

    async fn pause_membership(
        &self,
        membership: Membership,
        until: Option<Timestamp>,
        reason: Option<String>,
    ) -> Result<Membership, MembershipError> {
        let logged = reason.clone();
        self.transition(membership, logged, move |m, now| m.pause(now, until, reason))
            .await
    }

    async fn expire_membership(&self, membership: Membership) -> Result<Membership, MembershipError> {
        if membership.status.is_terminal() {
            tracing::debug!(
                membership_id = %membership.id,
                status = %membership.status,
                "Expire skipped, membership already closed"
            );
            return Ok(membership);
        }
        self.transition(membership, None, |m, now| m.expire(now).map(|_| ()))
            .await
    }

    /// Applies `apply` to a copy, persists it, then runs side effects.
    async fn transition<F>(
        &self,
        membership: Membership,
        reason: Option<String>,
        apply: F,
    ) -> Result<Membership, MembershipError>
    where
        F: FnOnce(&mut Membership, Timestamp) -> Result<(), MembershipError> + Send,
    {
        let now = self.clock.now();
        let from = membership.status;
        let mut next = membership;
        apply(&mut next, now)?;

        let saved = self.memberships.update(&next).await?;
        tracing::info!(
            membership_id = %saved.id,
            user_id = %saved.user_id,
            level_id = %saved.level_id,
            from = %from,
            to = %saved.status,
            "Membership status changed"
        );

        self.sync_capabilities(&saved.user_id).await;
        self.events
            .publish(
                MembershipEvent::StatusChanged {
                    membership_id: saved.id,
                    user_id: saved.user_id,
                    level_id: saved.level_id,
                    from,
                    to: saved.status,
                    reason,
                    occurred_at: now,
                }
                .into(),
            )
            .await;

        Ok(saved)
    }

    /// Capability failures after a committed write are logged, not returned.
    async fn sync_capabilities(&self, user_id: &UserId) {
        if let Err(err) = self.recalculate_capabilities(user_id).await {
            tracing::warn!(
                user_id = %user_id,
                error = %err,
                "Capability sync failed after membership write"
            );
        }
    }

    async fn current(&self, user_id: &UserId, level_id: &LevelId) -> Result<Membership, MembershipError> {
        self.memberships
            .find_current(user_id, level_id)
            .await?
            .ok_or_else(|| MembershipError::not_found_for_pair(*user_id, *level_id))
    }

    async fn by_id(&self, id: &MembershipId) -> Result<Membership, MembershipError> {
        self.memberships
            .find_by_id(id)
            .await?
            .ok_or_else(|| MembershipError::not_found(*id))
    }

    async fn hydrate(&self, membership: Membership) -> Result<MembershipView, MembershipError> {
        let level = self.levels.find_level(&membership.level_id).await?;
        let user = self.users.find_user(&membership.user_id).await?;
        Ok(MembershipView {
            membership,
            level_name: level.map(|l| l.name),
            user_login: user.as_ref().map(|u| u.login.clone()),
            user_email: user.as_ref().map(|u| u.email.clone()),
            display_name: user.map(|u| u.display_name),
        })
    }
}
