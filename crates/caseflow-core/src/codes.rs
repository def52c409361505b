//! Confirmation code issuer
//!
//! Sequence numbers come from the store's atomic counter, replacing the
//! original max-plus-one scan over every issued code (which raced under
//! concurrent issuance). Verification and marking-used are separate steps:
//! `verify` never mutates.

use std::sync::Arc;

use caseflow_model::{ConfirmationCode, OrderId};
use caseflow_store::{Collection, KvStore};
use chrono::Utc;
use tracing::info;

use crate::error::CoreError;

/// Counter key feeding the `UNLOCK-NNN` sequence.
const CODE_SEQ: &str = "seq/confirmation_code";

/// Successful verification outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCode {
    pub code: String,
    pub order_id: OrderId,
}

/// Issues and redeems one-time confirmation codes.
#[derive(Clone)]
pub struct CodeIssuer {
    store: Arc<dyn KvStore>,
    codes: Collection<ConfirmationCode>,
}

impl std::fmt::Debug for CodeIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeIssuer")
            .field("codes", &self.codes)
            .finish_non_exhaustive()
    }
}

impl CodeIssuer {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            codes: Collection::new(Arc::clone(&store), "code"),
            store,
        }
    }

    /// Issue the next sequential code for `order_id`.
    pub async fn issue(&self, order_id: &OrderId) -> Result<ConfirmationCode, CoreError> {
        let seq = self.store.increment(CODE_SEQ).await?;
        let code = ConfirmationCode::new(seq, order_id.clone(), Utc::now());
        self.codes.put_new(&code.code, &code).await?;
        info!(code = %code.code, order_id = %order_id, "confirmation code issued");
        Ok(code)
    }

    /// Check a code without consuming it.
    ///
    /// # Errors
    /// [`CoreError::CodeUnknown`] and [`CoreError::CodeUsed`] are distinct
    /// kinds so callers never match on message text.
    pub async fn verify(&self, code: &str) -> Result<VerifiedCode, CoreError> {
        let code = code.trim();
        let Some(record) = self.codes.get(code).await? else {
            return Err(CoreError::CodeUnknown(code.to_string()));
        };
        if record.used {
            return Err(CoreError::CodeUsed(code.to_string()));
        }
        Ok(VerifiedCode {
            code: record.code,
            order_id: record.order_id,
        })
    }

    /// Permanently mark a code used. `Ok(None)` for an unknown code;
    /// re-marking an already-used code only rewrites `used_at`.
    pub async fn mark_used(&self, code: &str) -> Result<Option<ConfirmationCode>, CoreError> {
        let now = Utc::now();
        let updated = self
            .codes
            .update(code.trim(), |record| record.mark_used(now))
            .await?;
        Ok(updated)
    }

    /// Every issued code, in code order.
    pub async fn all_codes(&self) -> Result<Vec<ConfirmationCode>, CoreError> {
        Ok(self.codes.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_model::code;
    use caseflow_store::MemoryStore;

    fn issuer() -> CodeIssuer {
        CodeIssuer::new(Arc::new(MemoryStore::new()))
    }

    fn order_id() -> OrderId {
        OrderId::from("20260314-0926-535")
    }

    #[tokio::test]
    async fn sequence_has_no_gaps_or_repeats() {
        let issuer = issuer();
        for n in 1..=5u64 {
            let code = issuer.issue(&order_id()).await.unwrap();
            assert_eq!(code.code, code::format_code(n));
        }
    }

    #[tokio::test]
    async fn verify_unknown_vs_used_are_distinct() {
        let issuer = issuer();
        let err = issuer.verify("UNLOCK-001").await.unwrap_err();
        assert!(matches!(err, CoreError::CodeUnknown(_)));

        let issued = issuer.issue(&order_id()).await.unwrap();
        let ok = issuer.verify(&issued.code).await.unwrap();
        assert_eq!(ok.order_id, order_id());

        issuer.mark_used(&issued.code).await.unwrap().unwrap();
        let err = issuer.verify(&issued.code).await.unwrap_err();
        assert!(matches!(err, CoreError::CodeUsed(_)));
    }

    #[tokio::test]
    async fn verify_does_not_consume() {
        let issuer = issuer();
        let issued = issuer.issue(&order_id()).await.unwrap();
        issuer.verify(&issued.code).await.unwrap();
        // Still valid until mark_used.
        issuer.verify(&issued.code).await.unwrap();
    }

    #[tokio::test]
    async fn all_codes_lists_in_code_order() {
        let issuer = issuer();
        for _ in 0..3 {
            issuer.issue(&order_id()).await.unwrap();
        }
        let codes: Vec<String> = issuer
            .all_codes()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(codes, vec!["UNLOCK-001", "UNLOCK-002", "UNLOCK-003"]);
    }

    #[test]
    fn debug_output_skips_the_raw_store() {
        let text = format!("{:?}", issuer());
        assert!(text.starts_with("CodeIssuer"));
        assert!(!text.contains("MemoryStore"));
    }

    #[tokio::test]
    async fn mark_used_unknown_is_none() {
        let issuer = issuer();
        assert!(issuer.mark_used("UNLOCK-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remark_rewrites_used_at_only() {
        let issuer = issuer();
        let issued = issuer.issue(&order_id()).await.unwrap();
        let first = issuer.mark_used(&issued.code).await.unwrap().unwrap();
        let second = issuer.mark_used(&issued.code).await.unwrap().unwrap();
        assert!(second.used);
        assert!(second.used_at >= first.used_at);
        assert_eq!(second.code, first.code);
    }
}
