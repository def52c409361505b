//! Order lifecycle manager
//!
//! Orders are keyed `order/{order_id}` with ids built from the creation
//! timestamp plus a random three-digit suffix. Status changes go through
//! [`OrderManager::update_status`], which validates the forward-only
//! transition under a compare-and-swap loop; field patches shallow-merge
//! without touching status.

use std::sync::Arc;

use caseflow_model::{Order, OrderId, OrderStatus};
use caseflow_store::{Collection, KvStore, StoreError, MAX_CAS_ATTEMPTS};
use chrono::Utc;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::rand_suffix;

/// Bounded rerolls for timestamp-random id collisions.
const CREATE_ID_ATTEMPTS: u32 = 4;

/// Shallow-merge patch for non-status order fields.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub confirmation_code: Option<String>,
    pub pdf_uploaded: Option<bool>,
    pub html_generated: Option<bool>,
}

impl OrderPatch {
    fn apply(&self, order: &mut Order) {
        if let Some(email) = &self.email {
            order.email = email.clone();
        }
        if let Some(company_name) = &self.company_name {
            order.company_name = company_name.clone();
        }
        if let Some(code) = &self.confirmation_code {
            order.confirmation_code = Some(code.clone());
        }
        if let Some(pdf_uploaded) = self.pdf_uploaded {
            order.pdf_uploaded = pdf_uploaded;
        }
        if let Some(html_generated) = self.html_generated {
            order.html_generated = html_generated;
        }
    }
}

/// CRUD and status advancement over order records
#[derive(Debug, Clone)]
pub struct OrderManager {
    orders: Collection<Order>,
}

impl OrderManager {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            orders: Collection::new(store, "order"),
        }
    }

    /// Create an order in `pending_payment`.
    ///
    /// # Errors
    /// Validation failure on empty fields or an implausible email.
    pub async fn create_order(
        &self,
        template_type: &str,
        email: &str,
        company_name: &str,
    ) -> Result<Order, CoreError> {
        if template_type.trim().is_empty() {
            return Err(CoreError::Validation("templateType is required".into()));
        }
        if company_name.trim().is_empty() {
            return Err(CoreError::Validation("companyName is required".into()));
        }
        let email = email.trim();
        if !email.contains('@') || email.len() < 3 {
            return Err(CoreError::Validation("email is not valid".into()));
        }

        // Ids are timestamp-plus-random; on the rare same-minute suffix
        // collision we reroll instead of overwriting the existing order.
        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = Utc::now();
            let order_id = OrderId::from_parts(now, rand_suffix());
            let order = Order::new(
                order_id.clone(),
                template_type.trim(),
                email,
                company_name.trim(),
                now,
            );
            match self.orders.put_new(order_id.as_str(), &order).await {
                Ok(()) => {
                    info!(order_id = %order_id, template_type, "order created");
                    return Ok(order);
                }
                Err(e) if e.is_conflict() && attempt < CREATE_ID_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>, CoreError> {
        Ok(self.orders.get(order_id.as_str()).await?)
    }

    /// Shallow-merge `patch`; `Ok(None)` when the order does not exist.
    pub async fn update_order(
        &self,
        order_id: &OrderId,
        patch: OrderPatch,
    ) -> Result<Option<Order>, CoreError> {
        let updated = self
            .orders
            .update(order_id.as_str(), |order| patch.apply(order))
            .await?;
        Ok(updated)
    }

    /// Advance the order's status, validating the forward-only transition.
    ///
    /// # Errors
    /// Not-found for an unknown id; an illegal transition is a conflict.
    pub async fn update_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, CoreError> {
        // Manual CAS loop: the transition check must rerun against the
        // freshest state on every attempt.
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some((mut order, version)) =
                self.orders.get_versioned(order_id.as_str()).await?
            else {
                return Err(CoreError::not_found("order", order_id.as_str()));
            };
            order.advance(status)?;
            match self.orders.put_version(order_id.as_str(), &order, version).await {
                Ok(_) => {
                    info!(order_id = %order_id, status = status.as_str(), "order status advanced");
                    return Ok(order);
                }
                Err(e) if e.is_conflict() => {
                    warn!(order_id = %order_id, attempt, "status update conflicted, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::RetriesExhausted {
            key: format!("order/{}", order_id.as_str()),
            attempts: MAX_CAS_ATTEMPTS,
        }
        .into())
    }

    /// Every order, newest first.
    pub async fn all_orders(&self) -> Result<Vec<Order>, CoreError> {
        let mut orders = self.orders.list().await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    pub async fn orders_by_status(
        &self,
        status: OrderStatus,
    ) -> Result<Vec<Order>, CoreError> {
        Ok(self
            .all_orders()
            .await?
            .into_iter()
            .filter(|o| o.status == status)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use caseflow_store::{Document, Expected, MemoryStore};

    fn manager() -> OrderManager {
        OrderManager::new(Arc::new(MemoryStore::new()))
    }

    /// Store where every read is immediately invalidated by a competing
    /// same-bytes write, so version tokens are always stale.
    struct FlappingStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl KvStore for FlappingStore {
        async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
            let doc = self.inner.get(key).await?;
            if let Some(doc) = &doc {
                self.inner.put(key, doc.bytes.clone(), Expected::Any).await?;
            }
            Ok(doc)
        }

        async fn put(
            &self,
            key: &str,
            bytes: Vec<u8>,
            expected: Expected,
        ) -> Result<u64, StoreError> {
            self.inner.put(key, bytes, expected).await
        }

        async fn delete(&self, key: &str, expected: Expected) -> Result<bool, StoreError> {
            self.inner.delete(key, expected).await
        }

        async fn scan(&self, prefix: &str) -> Result<Vec<(String, Document)>, StoreError> {
            self.inner.scan(prefix).await
        }

        async fn increment(&self, counter: &str) -> Result<u64, StoreError> {
            self.inner.increment(counter).await
        }
    }

    #[tokio::test]
    async fn create_order_initial_state_and_id_shape() {
        let orders = manager();
        let order = orders
            .create_order("amr", "a@b.com", "Acme")
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert!(order.confirmation_code.is_none());
        assert!(OrderId::is_well_formed(order.order_id.as_str()));
    }

    #[tokio::test]
    async fn create_order_validates_fields() {
        let orders = manager();
        assert!(orders.create_order("", "a@b.com", "Acme").await.is_err());
        assert!(orders.create_order("amr", "not-an-email", "Acme").await.is_err());
        assert!(orders.create_order("amr", "a@b.com", "  ").await.is_err());
    }

    #[tokio::test]
    async fn patch_merges_without_touching_status() {
        let orders = manager();
        let order = orders.create_order("amr", "a@b.com", "Acme").await.unwrap();
        let patched = orders
            .update_order(
                &order.order_id,
                OrderPatch {
                    pdf_uploaded: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(patched.pdf_uploaded);
        assert_eq!(patched.status, OrderStatus::PendingPayment);
        assert_eq!(patched.email, "a@b.com");
    }

    #[tokio::test]
    async fn patch_unknown_order_is_none() {
        let orders = manager();
        let out = orders
            .update_order(&OrderId::from("20260101-0000-000"), OrderPatch::default())
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn status_advances_forward_only() {
        let orders = manager();
        let order = orders.create_order("amr", "a@b.com", "Acme").await.unwrap();
        orders
            .update_status(&order.order_id, OrderStatus::CodeGenerated)
            .await
            .unwrap();
        let err = orders
            .update_status(&order.order_id, OrderStatus::PendingPayment)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::IllegalTransition(_)));
        let err = orders
            .update_status(&order.order_id, OrderStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::IllegalTransition(_)));
    }

    #[tokio::test]
    async fn status_update_gives_up_after_bounded_conflicts() {
        let orders = OrderManager::new(Arc::new(FlappingStore {
            inner: MemoryStore::new(),
        }));
        let order = orders.create_order("amr", "a@b.com", "Acme").await.unwrap();
        let err = orders
            .update_status(&order.order_id, OrderStatus::CodeGenerated)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Store(StoreError::RetriesExhausted {
                attempts: MAX_CAS_ATTEMPTS,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn all_orders_newest_first() {
        let orders = manager();
        // Created in the same minute; sort must still be stable by created_at.
        let a = orders.create_order("amr", "a@b.com", "A").await.unwrap();
        let b = orders.create_order("amr", "b@b.com", "B").await.unwrap();
        let all = orders.all_orders().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].created_at >= all[1].created_at);
        let ids: Vec<_> = all.iter().map(|o| o.order_id.clone()).collect();
        assert!(ids.contains(&a.order_id));
        assert!(ids.contains(&b.order_id));
    }

    #[tokio::test]
    async fn filter_by_status() {
        let orders = manager();
        let a = orders.create_order("amr", "a@b.com", "A").await.unwrap();
        orders.create_order("amr", "b@b.com", "B").await.unwrap();
        orders
            .update_status(&a.order_id, OrderStatus::CodeGenerated)
            .await
            .unwrap();
        let pending = orders
            .orders_by_status(OrderStatus::PendingPayment)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        let generated = orders
            .orders_by_status(OrderStatus::CodeGenerated)
            .await
            .unwrap();
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].order_id, a.order_id);
    }
}
