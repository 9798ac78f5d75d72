use {
    crate::domain::entity::{
        EntityKind, Gift, GiftPaymentStatus, GiftStatus, GiftUpdate, Order, OrderStatus,
        OrderUpdate, ResolvedEntity, Subscription, SubscriptionStatus, SubscriptionUpdate,
    },
    crate::domain::error::ReconcileError,
    crate::domain::gateway::{CanonicalRecord, GatewayClient},
    crate::domain::idempotency::IdempotencyGuard,
    crate::domain::notification::{InboundNotification, NotificationKind},
    crate::domain::notifier::Notifier,
    crate::domain::repository::EntityRepository,
    crate::domain::status_map::StatusMapper,
    crate::services::dispatcher::{DispatchOutcome, SideEffectDispatcher},
    crate::services::resolver::EntityResolver,
    chrono::Utc,
    std::sync::Arc,
    tracing::Instrument,
    uuid::Uuid,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Key already handled; nothing fetched or written.
    Duplicate,
    /// Gateway status maps to what is already stored; no write.
    Unchanged {
        entity: EntityKind,
        id: i64,
        dispatch: Option<DispatchOutcome>,
    },
    /// Status moved and was persisted with a fresh snapshot.
    Updated {
        entity: EntityKind,
        id: i64,
        from: &'static str,
        to: &'static str,
        dispatch: Option<DispatchOutcome>,
    },
}

/// Result of applying one canonical record to one entity.
struct Applied {
    entity: EntityKind,
    id: i64,
    change: Option<(&'static str, &'static str)>,
    followup: Option<ResolvedEntity>,
}

/// Drives a notification from "some id changed" to a persisted status and,
/// where due, a one-shot email.
pub struct ReconciliationEngine {
    guard: Arc<dyn IdempotencyGuard>,
    gateway: Arc<dyn GatewayClient>,
    repo: Arc<dyn EntityRepository>,
    resolver: EntityResolver,
    mapper: Arc<StatusMapper>,
    dispatcher: SideEffectDispatcher,
}

impl ReconciliationEngine {
    pub fn new(
        guard: Arc<dyn IdempotencyGuard>,
        gateway: Arc<dyn GatewayClient>,
        repo: Arc<dyn EntityRepository>,
        notifier: Arc<dyn Notifier>,
        mapper: StatusMapper,
    ) -> Self {
        Self {
            guard,
            gateway,
            resolver: EntityResolver::new(repo.clone()),
            dispatcher: SideEffectDispatcher::new(repo.clone(), notifier),
            repo,
            mapper: Arc::new(mapper),
        }
    }

    /// Detached-task entry point: reconcile and log. Never returns an error;
    /// the gateway was acknowledged before this started.
    pub async fn handle(&self, notification: InboundNotification) {
        let key = notification.idempotency_key();
        let span = tracing::info_span!(
            "reconcile",
            run_id = %Uuid::now_v7(),
            key = %key,
        );

        async {
            match self.reconcile(&notification).await {
                Ok(ReconcileOutcome::Duplicate) => {
                    tracing::info!("duplicate notification, already processed");
                }
                Ok(ReconcileOutcome::Unchanged { entity, id, dispatch }) => {
                    tracing::info!(%entity, id, ?dispatch, "status unchanged");
                }
                Ok(ReconcileOutcome::Updated {
                    entity,
                    id,
                    from,
                    to,
                    dispatch,
                }) => {
                    tracing::info!(%entity, id, from, to, ?dispatch, "status updated");
                }
                Err(ReconcileError::EntityNotFound(msg)) => {
                    tracing::warn!(reason = %msg, "no matching entity, dropping notification");
                }
                Err(ReconcileError::GatewayFetch(msg)) => {
                    tracing::error!(error = %msg, "gateway fetch failed, relying on redelivery");
                }
                Err(ReconcileError::Persistence(msg)) => {
                    tracing::error!(error = %msg, "persistence failed, key released for retry");
                }
                Err(e) => {
                    tracing::error!(error = %e, "reconciliation failed");
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn reconcile(
        &self,
        notification: &InboundNotification,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let key = notification.idempotency_key();

        let claimed = match self.guard.claim(&key).await {
            Ok(true) => true,
            Ok(false) => return Ok(ReconcileOutcome::Duplicate),
            Err(e) => {
                tracing::warn!(error = %e, "idempotency guard unavailable, processing anyway");
                false
            }
        };

        let applied = match self.fetch_and_apply(notification).await {
            Ok(applied) => applied,
            Err(e) => {
                if claimed {
                    if let Err(release) = self.guard.release(&key).await {
                        tracing::warn!(error = %release, "failed to release idempotency key");
                    }
                }
                return Err(e);
            }
        };

        let dispatch = match &applied.followup {
            Some(entity) => Some(self.dispatch(entity).await),
            None => None,
        };

        Ok(match applied.change {
            Some((from, to)) => ReconcileOutcome::Updated {
                entity: applied.entity,
                id: applied.id,
                from,
                to,
                dispatch,
            },
            None => ReconcileOutcome::Unchanged {
                entity: applied.entity,
                id: applied.id,
                dispatch,
            },
        })
    }

    async fn fetch_and_apply(
        &self,
        notification: &InboundNotification,
    ) -> Result<Applied, ReconcileError> {
        let record = match notification.kind {
            NotificationKind::Payment => self.gateway.fetch_payment(&notification.gateway_id).await?,
            NotificationKind::SubscriptionEvent => {
                self.gateway
                    .fetch_subscription(&notification.gateway_id)
                    .await?
            }
        };

        let entity = self.resolver.resolve(&record).await?;
        self.apply(entity, &record).await
    }

    async fn apply(
        &self,
        entity: ResolvedEntity,
        record: &CanonicalRecord,
    ) -> Result<Applied, ReconcileError> {
        match entity {
            ResolvedEntity::Order(order) => self.apply_order(order, record).await,
            ResolvedEntity::Gift(gift) => self.apply_gift(gift, record).await,
            ResolvedEntity::Subscription(sub) => self.apply_subscription(sub, record).await,
        }
    }

    async fn apply_order(
        &self,
        mut order: Order,
        record: &CanonicalRecord,
    ) -> Result<Applied, ReconcileError> {
        if !self.mapper.order.knows(&record.gateway_status) {
            tracing::warn!(gateway_status = %record.gateway_status, "unrecognized status for order, treating as pending");
        }
        let from = order.status;
        let to = self.mapper.map_order(&record.gateway_status);

        let change = if from != to {
            self.repo
                .update_order(&OrderUpdate {
                    id: order.id,
                    status: to,
                    gateway_payment_id: record.gateway_id.clone(),
                    payment_details: record.snapshot(),
                })
                .await?;
            order.status = to;
            order.gateway_payment_id = Some(record.gateway_id.clone());
            Some((from.as_str(), to.as_str()))
        } else {
            None
        };

        let due = order.status == OrderStatus::Paid && order.notified_at.is_none();
        Ok(Applied {
            entity: EntityKind::Order,
            id: order.id,
            change,
            followup: due.then_some(ResolvedEntity::Order(order)),
        })
    }

    async fn apply_gift(
        &self,
        mut gift: Gift,
        record: &CanonicalRecord,
    ) -> Result<Applied, ReconcileError> {
        if !self.mapper.gift.knows(&record.gateway_status) {
            tracing::warn!(gateway_status = %record.gateway_status, "unrecognized status for gift, treating as pending");
        }
        let from = gift.payment_status;
        let to = self.mapper.map_gift(&record.gateway_status);

        let change = if from != to {
            let status = match (to, gift.status) {
                (_, GiftStatus::Notified) => GiftStatus::Notified,
                (GiftPaymentStatus::Paid, _) => GiftStatus::Paid,
                _ => GiftStatus::Pending,
            };
            self.repo
                .update_gift(&GiftUpdate {
                    id: gift.id,
                    payment_status: to,
                    status,
                    gateway_payment_id: record.gateway_id.clone(),
                    payment_details: record.snapshot(),
                })
                .await?;
            gift.payment_status = to;
            gift.status = status;
            gift.gateway_payment_id = Some(record.gateway_id.clone());
            Some((from.as_str(), to.as_str()))
        } else {
            None
        };

        let due = gift.payment_status == GiftPaymentStatus::Paid
            && gift.notified_at.is_none()
            && gift.status != GiftStatus::Notified;
        Ok(Applied {
            entity: EntityKind::Gift,
            id: gift.id,
            change,
            followup: due.then_some(ResolvedEntity::Gift(gift)),
        })
    }

    async fn apply_subscription(
        &self,
        mut sub: Subscription,
        record: &CanonicalRecord,
    ) -> Result<Applied, ReconcileError> {
        if !self.mapper.subscription.knows(&record.gateway_status) {
            tracing::warn!(gateway_status = %record.gateway_status, "unrecognized status for subscription, treating as pending");
        }
        let from = sub.status;
        let to = self.mapper.map_subscription(&record.gateway_status);

        // First entry into active stamps started_at; later ones never touch it.
        let started_at = (to == SubscriptionStatus::Active && sub.started_at.is_none())
            .then(Utc::now);

        let change = if from != to || started_at.is_some() {
            self.repo
                .update_subscription(&SubscriptionUpdate {
                    id: sub.id,
                    status: to,
                    started_at,
                    gateway_details: record.snapshot(),
                })
                .await?;
            sub.status = to;
            sub.started_at = sub.started_at.or(started_at);
            (from != to).then(|| (from.as_str(), to.as_str()))
        } else {
            None
        };

        let due = sub.status == SubscriptionStatus::Active && sub.notified_at.is_none();
        Ok(Applied {
            entity: EntityKind::Subscription,
            id: sub.id,
            change,
            followup: due.then_some(ResolvedEntity::Subscription(sub)),
        })
    }

    async fn dispatch(&self, entity: &ResolvedEntity) -> DispatchOutcome {
        match entity {
            ResolvedEntity::Order(order) => self.dispatcher.notify_order_paid(order).await,
            ResolvedEntity::Gift(gift) => self.dispatcher.notify_gift_paid(gift).await,
            ResolvedEntity::Subscription(sub) => {
                self.dispatcher.notify_subscription_activated(sub).await
            }
        }
    }
}
