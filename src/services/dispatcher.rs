use {
    crate::domain::entity::{
        EntityKind, Gift, GiftPaymentStatus, GiftStatus, Order, OrderStatus, Subscription,
        SubscriptionStatus,
    },
    crate::domain::notifier::{EmailMessage, Notifier},
    crate::domain::repository::EntityRepository,
    chrono::Utc,
    std::sync::Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Email went out (the flag may still have lost a race, see logs).
    Sent,
    /// Persisted flag was already set when re-checked.
    AlreadyNotified,
    /// Entity no longer in its success state, or gone.
    NotEligible,
    /// Transport or lookup failure; logged and swallowed.
    Failed,
}

/// One-shot emails for terminal success states. The persisted `notified_at`
/// flag is the only gate; status comparisons play no part here.
#[derive(Clone)]
pub struct SideEffectDispatcher {
    repo: Arc<dyn EntityRepository>,
    notifier: Arc<dyn Notifier>,
}

impl SideEffectDispatcher {
    pub fn new(repo: Arc<dyn EntityRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self { repo, notifier }
    }

    pub async fn notify_order_paid(&self, order: &Order) -> DispatchOutcome {
        let fresh = match self.repo.find_order(order.id).await {
            Ok(Some(o)) => o,
            Ok(None) => return DispatchOutcome::NotEligible,
            Err(e) => {
                tracing::error!(order_id = order.id, error = %e, "re-check before email failed");
                return DispatchOutcome::Failed;
            }
        };
        if fresh.notified_at.is_some() {
            return DispatchOutcome::AlreadyNotified;
        }
        if fresh.status != OrderStatus::Paid {
            return DispatchOutcome::NotEligible;
        }

        let message = order_paid_message(&fresh);
        self.deliver(EntityKind::Order, fresh.id, &message).await
    }

    pub async fn notify_gift_paid(&self, gift: &Gift) -> DispatchOutcome {
        let fresh = match self.repo.find_gift(gift.id).await {
            Ok(Some(g)) => g,
            Ok(None) => return DispatchOutcome::NotEligible,
            Err(e) => {
                tracing::error!(gift_id = gift.id, error = %e, "re-check before email failed");
                return DispatchOutcome::Failed;
            }
        };
        if fresh.notified_at.is_some() || fresh.status == GiftStatus::Notified {
            return DispatchOutcome::AlreadyNotified;
        }
        if fresh.payment_status != GiftPaymentStatus::Paid {
            return DispatchOutcome::NotEligible;
        }

        let message = gift_paid_message(&fresh);
        self.deliver(EntityKind::Gift, fresh.id, &message).await
    }

    pub async fn notify_subscription_activated(&self, subscription: &Subscription) -> DispatchOutcome {
        let fresh = match self
            .repo
            .find_subscription_by_gateway_id(&subscription.gateway_subscription_id)
            .await
        {
            Ok(Some(s)) => s,
            Ok(None) => return DispatchOutcome::NotEligible,
            Err(e) => {
                tracing::error!(subscription_id = subscription.id, error = %e, "re-check before email failed");
                return DispatchOutcome::Failed;
            }
        };
        if fresh.notified_at.is_some() {
            return DispatchOutcome::AlreadyNotified;
        }
        if fresh.status != SubscriptionStatus::Active {
            return DispatchOutcome::NotEligible;
        }

        let message = subscription_active_message(&fresh);
        self.deliver(EntityKind::Subscription, fresh.id, &message).await
    }

    async fn deliver(&self, entity: EntityKind, id: i64, message: &EmailMessage) -> DispatchOutcome {
        if let Err(e) = self.notifier.send(message).await {
            tracing::error!(%entity, id, to = %message.to, error = %e, "email delivery failed");
            return DispatchOutcome::Failed;
        }

        let now = Utc::now();
        let marked = match entity {
            EntityKind::Order => self.repo.mark_order_notified(id, now).await,
            EntityKind::Gift => self.repo.mark_gift_notified(id, now).await,
            EntityKind::Subscription => self.repo.mark_subscription_notified(id, now).await,
        };

        match marked {
            Ok(true) => {
                tracing::info!(%entity, id, to = %message.to, "notification sent");
            }
            Ok(false) => {
                tracing::warn!(%entity, id, "notified flag already set by a concurrent dispatch");
            }
            Err(e) => {
                tracing::error!(%entity, id, error = %e, "email sent but notified flag not persisted");
            }
        }
        DispatchOutcome::Sent
    }
}

pub fn order_paid_message(order: &Order) -> EmailMessage {
    EmailMessage {
        to: order.customer_email.clone(),
        subject: format!("Payment confirmed for order #{}", order.id),
        html: format!(
            "<p>We received your payment for order <strong>#{}</strong>.</p>\
             <p>We'll let you know as soon as it ships.</p>",
            order.id
        ),
    }
}

pub fn gift_paid_message(gift: &Gift) -> EmailMessage {
    let note = gift
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map(|m| format!("<blockquote>{}</blockquote>", escape_html(m)))
        .unwrap_or_default();

    EmailMessage {
        to: gift.recipient_email.clone(),
        subject: format!("{} sent you a gift", gift.purchaser_name),
        html: format!(
            "<p>Hi {},</p><p><strong>{}</strong> gifted you a subscription.</p>{}",
            escape_html(&gift.recipient_name),
            escape_html(&gift.purchaser_name),
            note
        ),
    }
}

pub fn subscription_active_message(subscription: &Subscription) -> EmailMessage {
    EmailMessage {
        to: subscription.subscriber_email.clone(),
        subject: format!("Your {} subscription is active", subscription.plan_name),
        html: format!(
            "<p>Your <strong>{}</strong> subscription is now active.</p>",
            escape_html(&subscription.plan_name)
        ),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
