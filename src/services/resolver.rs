use {
    crate::domain::entity::ResolvedEntity,
    crate::domain::error::ReconcileError,
    crate::domain::gateway::CanonicalRecord,
    crate::domain::id::GatewayId,
    crate::domain::repository::EntityRepository,
    std::sync::Arc,
};

/// One way of locating a local entity for a canonical record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Gift(i64),
    Subscription(GatewayId),
    Order(i64),
    OrderByPaymentId(GatewayId),
}

/// Lookups to try, in order. A gift reference or a subscription id decides
/// the kind outright; only orders have a fallback.
pub fn lookup_chain(record: &CanonicalRecord) -> Result<Vec<Lookup>, ReconcileError> {
    if let Some(gift_id) = record.external_reference.gift_id() {
        let gift_id = gift_id.map_err(|e| ReconcileError::EntityNotFound(e.to_string()))?;
        return Ok(vec![Lookup::Gift(gift_id)]);
    }

    if let Some(subscription_id) = &record.subscription_id {
        return Ok(vec![Lookup::Subscription(subscription_id.clone())]);
    }

    let mut chain = Vec::with_capacity(2);
    if let Some(order_id) = record.external_reference.order_id() {
        chain.push(Lookup::Order(order_id));
    }
    chain.push(Lookup::OrderByPaymentId(record.gateway_id.clone()));
    Ok(chain)
}

#[derive(Clone)]
pub struct EntityResolver {
    repo: Arc<dyn EntityRepository>,
}

impl EntityResolver {
    pub fn new(repo: Arc<dyn EntityRepository>) -> Self {
        Self { repo }
    }

    pub async fn resolve(&self, record: &CanonicalRecord) -> Result<ResolvedEntity, ReconcileError> {
        for lookup in lookup_chain(record)? {
            if let Some(entity) = self.load(&lookup).await? {
                tracing::debug!(?lookup, entity = %entity.kind(), id = entity.id(), "resolved");
                return Ok(entity);
            }
        }

        Err(ReconcileError::EntityNotFound(format!(
            "no entity for gateway_id={} external_reference={:?}",
            record.gateway_id,
            record.external_reference.as_str()
        )))
    }

    async fn load(&self, lookup: &Lookup) -> Result<Option<ResolvedEntity>, ReconcileError> {
        Ok(match lookup {
            Lookup::Gift(id) => self.repo.find_gift(*id).await?.map(ResolvedEntity::Gift),
            Lookup::Subscription(id) => self
                .repo
                .find_subscription_by_gateway_id(id)
                .await?
                .map(ResolvedEntity::Subscription),
            Lookup::Order(id) => self.repo.find_order(*id).await?.map(ResolvedEntity::Order),
            Lookup::OrderByPaymentId(id) => self
                .repo
                .find_order_by_payment_id(id)
                .await?
                .map(ResolvedEntity::Order),
        })
    }
}
