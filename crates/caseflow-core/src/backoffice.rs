//! Back-office facade
//!
//! Composes the managers into the operations the HTTP layer exposes:
//! activation (issue code + advance), code redemption (verify + mark used +
//! advance), template population and final download. Holds the template
//! directory so route handlers stay free of filesystem knowledge.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use caseflow_model::{ConfirmationCode, Order, OrderId, OrderStatus, SafetyCaseData};
use caseflow_store::KvStore;
use caseflow_template::load_template;
use tracing::info;

use crate::codes::{CodeIssuer, VerifiedCode};
use crate::error::CoreError;
use crate::leads::LeadManager;
use crate::orders::{OrderManager, OrderPatch};

/// One handle over the whole back-office core.
#[derive(Debug, Clone)]
pub struct Backoffice {
    orders: OrderManager,
    codes: CodeIssuer,
    leads: LeadManager,
    template_dir: PathBuf,
}

impl Backoffice {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, template_dir: impl Into<PathBuf>) -> Self {
        Self {
            orders: OrderManager::new(Arc::clone(&store)),
            codes: CodeIssuer::new(Arc::clone(&store)),
            leads: LeadManager::new(store),
            template_dir: template_dir.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn orders(&self) -> &OrderManager {
        &self.orders
    }

    #[inline]
    #[must_use]
    pub fn codes(&self) -> &CodeIssuer {
        &self.codes
    }

    #[inline]
    #[must_use]
    pub fn leads(&self) -> &LeadManager {
        &self.leads
    }

    #[inline]
    #[must_use]
    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Issue a confirmation code for a paid order and advance it to
    /// `code_generated`.
    ///
    /// # Errors
    /// Not-found for an unknown order; conflict when the order already has
    /// a code.
    pub async fn activate_order(
        &self,
        order_id: &OrderId,
    ) -> Result<(Order, ConfirmationCode), CoreError> {
        let Some(order) = self.orders.get_order(order_id).await? else {
            return Err(CoreError::not_found("order", order_id.as_str()));
        };
        if order.confirmation_code.is_some() {
            return Err(CoreError::AlreadyActivated(order_id.clone()));
        }

        let code = self.codes.issue(order_id).await?;
        self.orders
            .update_order(
                order_id,
                OrderPatch {
                    confirmation_code: Some(code.code.clone()),
                    ..Default::default()
                },
            )
            .await?;
        let order = self
            .orders
            .update_status(order_id, OrderStatus::CodeGenerated)
            .await?;
        info!(order_id = %order_id, code = %code.code, "order activated");
        Ok((order, code))
    }

    /// Redeem a confirmation code: verify, mark used, advance the order to
    /// `pdf_uploaded`.
    pub async fn redeem_code(&self, code: &str) -> Result<(Order, VerifiedCode), CoreError> {
        let verified = self.codes.verify(code).await?;
        self.codes.mark_used(&verified.code).await?;
        let order = self
            .orders
            .update_status(&verified.order_id, OrderStatus::PdfUploaded)
            .await?;
        info!(order_id = %verified.order_id, code = %verified.code, "code redeemed");
        Ok((order, verified))
    }

    /// Populate the order's template with extracted data.
    pub async fn populate(
        &self,
        order_id: &OrderId,
        data: &SafetyCaseData,
    ) -> Result<String, CoreError> {
        let Some(order) = self.orders.get_order(order_id).await? else {
            return Err(CoreError::not_found("order", order_id.as_str()));
        };
        if !data.is_viable() {
            return Err(CoreError::Validation(
                "safety case data needs companyName and robotModel".into(),
            ));
        }
        let template = load_template(&self.template_dir, &order.template_type)?;
        Ok(template.render(data))
    }

    /// Render the final document and mark the order completed with
    /// `html_generated` set. Re-downloading a completed order re-renders
    /// without another status change.
    pub async fn download(
        &self,
        order_id: &OrderId,
        data: &SafetyCaseData,
    ) -> Result<(Order, String), CoreError> {
        let html = self.populate(order_id, data).await?;
        let order = self
            .orders
            .update_order(
                order_id,
                OrderPatch {
                    html_generated: Some(true),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| CoreError::not_found("order", order_id.as_str()))?;

        let order = if order.status == OrderStatus::Completed {
            order
        } else {
            self.orders
                .update_status(order_id, OrderStatus::Completed)
                .await?
        };
        Ok((order, html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_store::MemoryStore;

    async fn backoffice_with_template() -> (Backoffice, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("amr.html"),
            "<h1>[COMPANY_NAME] — [ROBOT_MODEL]</h1>",
        )
        .unwrap();
        (
            Backoffice::new(Arc::new(MemoryStore::new()), dir.path()),
            dir,
        )
    }

    fn data() -> SafetyCaseData {
        SafetyCaseData {
            company_name: "Acme".to_string(),
            robot_model: "AMR-7".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn full_order_lifecycle() {
        let (bo, _dir) = backoffice_with_template().await;
        let order = bo
            .orders()
            .create_order("amr", "a@b.com", "Acme")
            .await
            .unwrap();
        assert!(caseflow_model::OrderId::is_well_formed(order.order_id.as_str()));

        let (order, code) = bo.activate_order(&order.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::CodeGenerated);
        assert!(code.code.starts_with("UNLOCK-"));
        assert_eq!(order.confirmation_code.as_deref(), Some(code.code.as_str()));

        let (order, _) = bo.redeem_code(&code.code).await.unwrap();
        assert_eq!(order.status, OrderStatus::PdfUploaded);

        // Second redemption fails distinctly.
        let err = bo.redeem_code(&code.code).await.unwrap_err();
        assert!(matches!(err, CoreError::CodeUsed(_)));

        let (order, html) = bo.download(&order.order_id, &data()).await.unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.html_generated);
        assert_eq!(html, "<h1>Acme — AMR-7</h1>");
    }

    #[tokio::test]
    async fn activate_twice_is_conflict() {
        let (bo, _dir) = backoffice_with_template().await;
        let order = bo
            .orders()
            .create_order("amr", "a@b.com", "Acme")
            .await
            .unwrap();
        bo.activate_order(&order.order_id).await.unwrap();
        let err = bo.activate_order(&order.order_id).await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyActivated(_)));
    }

    #[tokio::test]
    async fn activate_unknown_order_is_not_found() {
        let (bo, _dir) = backoffice_with_template().await;
        let err = bo
            .activate_order(&OrderId::from("20260101-0000-000"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn populate_rejects_unviable_data() {
        let (bo, _dir) = backoffice_with_template().await;
        let order = bo
            .orders()
            .create_order("amr", "a@b.com", "Acme")
            .await
            .unwrap();
        let err = bo
            .populate(&order.order_id, &SafetyCaseData::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn populate_unknown_template_type() {
        let (bo, _dir) = backoffice_with_template().await;
        let order = bo
            .orders()
            .create_order("humanoid", "a@b.com", "Acme")
            .await
            .unwrap();
        let err = bo.populate(&order.order_id, &data()).await.unwrap_err();
        assert!(matches!(err, CoreError::Template(_)));
    }

    #[tokio::test]
    async fn redownload_completed_order_is_idempotent() {
        let (bo, _dir) = backoffice_with_template().await;
        let order = bo
            .orders()
            .create_order("amr", "a@b.com", "Acme")
            .await
            .unwrap();
        let (_, code) = bo.activate_order(&order.order_id).await.unwrap();
        bo.redeem_code(&code.code).await.unwrap();
        bo.download(&order.order_id, &data()).await.unwrap();
        let (order, _) = bo.download(&order.order_id, &data()).await.unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
    }
}
