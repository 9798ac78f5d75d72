use {
    super::entity::{GiftPaymentStatus, OrderStatus, SubscriptionStatus},
    super::error::ReconcileError,
    serde::Deserialize,
    std::collections::HashMap,
};

/// Gateway status string → internal status, with a fallback for anything the
/// table does not know. Lookups are case-insensitive and never fail.
#[derive(Debug, Clone)]
pub struct StatusTable<S> {
    entries: HashMap<String, S>,
    fallback: S,
}

impl<S: Copy> StatusTable<S> {
    pub fn new(fallback: S) -> Self {
        Self {
            entries: HashMap::new(),
            fallback,
        }
    }

    pub fn with(mut self, gateway_status: &str, status: S) -> Self {
        self.insert(gateway_status, status);
        self
    }

    pub fn insert(&mut self, gateway_status: &str, status: S) {
        self.entries
            .insert(gateway_status.trim().to_ascii_lowercase(), status);
    }

    pub fn map(&self, gateway_status: &str) -> S {
        self.entries
            .get(&gateway_status.trim().to_ascii_lowercase())
            .copied()
            .unwrap_or(self.fallback)
    }

    pub fn knows(&self, gateway_status: &str) -> bool {
        self.entries
            .contains_key(&gateway_status.trim().to_ascii_lowercase())
    }
}

/// Extra table rows loaded from configuration, merged over the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusOverrides {
    #[serde(default)]
    pub order: HashMap<String, OrderStatus>,
    #[serde(default)]
    pub gift: HashMap<String, GiftPaymentStatus>,
    #[serde(default)]
    pub subscription: HashMap<String, SubscriptionStatus>,
}

/// One table per entity kind.
#[derive(Debug, Clone)]
pub struct StatusMapper {
    pub order: StatusTable<OrderStatus>,
    pub gift: StatusTable<GiftPaymentStatus>,
    pub subscription: StatusTable<SubscriptionStatus>,
}

impl Default for StatusMapper {
    fn default() -> Self {
        use {GiftPaymentStatus as G, OrderStatus as O, SubscriptionStatus as S};

        let order = StatusTable::new(O::Pending)
            .with("approved", O::Paid)
            .with("authorized", O::Paid)
            .with("pending", O::Pending)
            .with("in_process", O::Processing)
            .with("rejected", O::Cancelled)
            .with("cancelled", O::Cancelled)
            .with("refunded", O::Refunded)
            .with("charged_back", O::Refunded);

        let gift = StatusTable::new(G::Pending)
            .with("approved", G::Paid)
            .with("authorized", G::Paid)
            .with("pending", G::Pending)
            .with("in_process", G::Pending)
            .with("rejected", G::Failed)
            .with("cancelled", G::Failed);

        let subscription = StatusTable::new(S::Pending)
            .with("approved", S::Active)
            .with("authorized", S::Active)
            .with("pending", S::Pending)
            .with("in_process", S::Pending)
            .with("rejected", S::Cancelled)
            .with("cancelled", S::Cancelled)
            .with("paused", S::Paused);

        Self {
            order,
            gift,
            subscription,
        }
    }
}

impl StatusMapper {
    pub fn map_order(&self, gateway_status: &str) -> OrderStatus {
        self.order.map(gateway_status)
    }

    pub fn map_gift(&self, gateway_status: &str) -> GiftPaymentStatus {
        self.gift.map(gateway_status)
    }

    pub fn map_subscription(&self, gateway_status: &str) -> SubscriptionStatus {
        self.subscription.map(gateway_status)
    }

    pub fn apply(&mut self, overrides: StatusOverrides) {
        for (k, v) in overrides.order {
            self.order.insert(&k, v);
        }
        for (k, v) in overrides.gift {
            self.gift.insert(&k, v);
        }
        for (k, v) in overrides.subscription {
            self.subscription.insert(&k, v);
        }
    }

    /// Defaults plus the rows in `json`, e.g.
    /// `{"subscription": {"expired": "cancelled"}}`.
    pub fn from_overrides_json(json: &str) -> Result<Self, ReconcileError> {
        let overrides: StatusOverrides = serde_json::from_str(json)?;
        let mut mapper = Self::default();
        mapper.apply(overrides);
        Ok(mapper)
    }
}
