//! End-to-end back-office flows over real stores

use std::sync::Arc;

use caseflow_core::{parse_lead_csv, Backoffice, CoreError};
use caseflow_model::{LeadStatus, OrderStatus};
use caseflow_store::{FileStore, KvStore};
use caseflow_testkit::{
    full_safety_case, memory_backoffice, minimal_safety_case, write_template, SAMPLE_CSV,
};

#[tokio::test]
async fn full_order_lifecycle_survives_reopen() {
    let data_dir = tempfile::tempdir().unwrap();
    let template_dir = tempfile::tempdir().unwrap();
    write_template(template_dir.path(), "standard");

    let store: Arc<dyn KvStore> = Arc::new(FileStore::open(data_dir.path()).await.unwrap());
    let backoffice = Backoffice::new(store, template_dir.path().to_path_buf());

    let order = backoffice
        .orders()
        .create_order("standard", "jo@acme.example", "Acme Robotics")
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::PendingPayment);

    let (order, code) = backoffice.activate_order(&order.order_id).await.unwrap();
    assert_eq!(code.code, "UNLOCK-001");
    assert_eq!(order.status, OrderStatus::CodeGenerated);
    assert_eq!(order.confirmation_code.as_deref(), Some("UNLOCK-001"));

    // Second activation is a conflict, not a second code.
    let err = backoffice.activate_order(&order.order_id).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyActivated(_)));

    let (order, verified) = backoffice.redeem_code("UNLOCK-001").await.unwrap();
    assert_eq!(verified.order_id, order.order_id);
    assert_eq!(order.status, OrderStatus::PdfUploaded);

    // A spent code stays spent.
    let err = backoffice.redeem_code("UNLOCK-001").await.unwrap_err();
    assert!(matches!(err, CoreError::CodeUsed(_)));

    let (order, html) = backoffice
        .download(&order.order_id, &full_safety_case())
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.html_generated);
    assert!(html.contains("Acme Robotics"));
    assert!(html.contains("pinch point at lift"));

    // Reopen the store: the completed order and the spent code persist.
    let store: Arc<dyn KvStore> = Arc::new(FileStore::open(data_dir.path()).await.unwrap());
    let reopened = Backoffice::new(store, template_dir.path().to_path_buf());
    let persisted = reopened.orders().get_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(persisted.status, OrderStatus::Completed);
    let err = reopened.redeem_code("UNLOCK-001").await.unwrap_err();
    assert!(matches!(err, CoreError::CodeUsed(_)));

    // The counter also persists; a new order gets the next code.
    let next = reopened
        .orders()
        .create_order("standard", "sam@borg.example", "Borg Automation")
        .await
        .unwrap();
    let (_, next_code) = reopened.activate_order(&next.order_id).await.unwrap();
    assert_eq!(next_code.code, "UNLOCK-002");
}

#[tokio::test]
async fn completed_order_can_be_downloaded_again() {
    let template_dir = tempfile::tempdir().unwrap();
    write_template(template_dir.path(), "standard");
    let backoffice = memory_backoffice(template_dir.path());

    let order = backoffice
        .orders()
        .create_order("standard", "jo@acme.example", "Acme Robotics")
        .await
        .unwrap();
    let (order, code) = backoffice.activate_order(&order.order_id).await.unwrap();
    backoffice.redeem_code(&code.code).await.unwrap();
    let (order, _) = backoffice.download(&order.order_id, &minimal_safety_case()).await.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);

    let (order, html) = backoffice.download(&order.order_id, &minimal_safety_case()).await.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(html.contains("AMR-7"));
}

#[tokio::test]
async fn conditional_sections_follow_the_payload() {
    let template_dir = tempfile::tempdir().unwrap();
    write_template(template_dir.path(), "standard");
    let backoffice = memory_backoffice(template_dir.path());

    let order = backoffice
        .orders()
        .create_order("standard", "jo@acme.example", "Acme Robotics")
        .await
        .unwrap();

    // Full payload: cybersecurity present, the other two sections absent.
    let html = backoffice.populate(&order.order_id, &full_safety_case()).await.unwrap();
    assert!(html.contains("network segmented"));
    assert!(!html.contains("AI &amp; ML"));
    assert!(!html.contains("Maintenance</h2>"));

    // Empty repeat arrays leave no marker rows behind.
    let html = backoffice
        .populate(&order.order_id, &minimal_safety_case())
        .await
        .unwrap();
    assert!(!html.contains("data-template"));
    assert!(!html.contains("[HAZARD]"));
    // Absent scalars stay literal for the operator to spot.
    assert!(html.contains("[SIL_RATING]"));
}

#[tokio::test]
async fn csv_import_dedups_and_feeds_stats() {
    let template_dir = tempfile::tempdir().unwrap();
    let backoffice = memory_backoffice(template_dir.path());
    let leads = backoffice.leads();

    let rows = parse_lead_csv(SAMPLE_CSV);
    // The no-email row is dropped at parse time.
    assert_eq!(rows.len(), 3);

    let created = leads.import_csv(rows, "leads.csv").await.unwrap();
    // The repeated acme address is deduplicated case-insensitively.
    assert_eq!(created.len(), 2);

    // Re-importing the same file creates nothing new.
    let again = leads
        .import_csv(parse_lead_csv(SAMPLE_CSV), "leads.csv")
        .await
        .unwrap();
    assert!(again.is_empty());

    let stats = leads.crm_stats().await.unwrap();
    assert_eq!(stats.total_leads, 2);
    assert_eq!(stats.new_leads, 2);
    assert_eq!(stats.customers, 0);
    assert_eq!(stats.conversion_rate, 0.0);

    // Promote one to customer and check the rate.
    let promoted = created[0].id.clone();
    leads
        .update_lead(
            &promoted,
            caseflow_core::LeadPatch {
                status: Some(LeadStatus::Customer),
                estimated_value: Some(12_000.0),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    let stats = leads.crm_stats().await.unwrap();
    assert_eq!(stats.customers, 1);
    assert_eq!(stats.conversion_rate, 50.0);
    assert_eq!(stats.average_deal_value, 12_000.0);
}
