// ==========================================
// 保留期清理集成测试
// ==========================================

mod test_helpers;

use chrono::NaiveDate;
use material_requests::config::{config_keys, ConfigManager, DefaultConfig};
use material_requests::engine::{QuantityCorrectionService, RetentionService, ScanScope};
use material_requests::repository::RequestRepository;
use material_requests::HistoryAction;
use std::sync::Arc;
use test_helpers::{create_test_repo, seed_batch, seed_request, utc};

#[tokio::test]
async fn test_purge_soft_deletes_only_expired_requests() {
    let (_db, repo) = create_test_repo().unwrap();
    let old = seed_request(repo.as_ref(), 10, utc(2025, 8, 1, 12)).await;
    let recent = seed_request(repo.as_ref(), 20, utc(2025, 10, 1, 12)).await;

    let service = RetentionService::new(Arc::clone(&repo), DefaultConfig);
    let now = utc(2025, 10, 14, 3);
    let report = service.purge(now).await.unwrap();

    assert_eq!(report.retention_days, 45);
    assert_eq!(report.cutoff, NaiveDate::from_ymd_opt(2025, 8, 30).unwrap());
    assert_eq!(report.purged, 1);
    assert_eq!(report.request_ids, vec![old]);

    let purged = repo.find_request(old).await.unwrap().unwrap();
    assert!(purged.is_deleted());
    assert!(!repo.find_request(recent).await.unwrap().unwrap().is_deleted());

    let history = repo.list_history(old).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, HistoryAction::Excluido);

    let again = service.purge(now).await.unwrap();
    assert_eq!(again.purged, 0);
}

#[tokio::test]
async fn test_purged_requests_leave_correction_scans() {
    let (_db, repo) = create_test_repo().unwrap();
    seed_batch(repo.as_ref(), "lote-antigo", utc(2025, 8, 1, 8)).await;
    let id = seed_request(repo.as_ref(), 155564, utc(2025, 8, 1, 9)).await;

    RetentionService::new(Arc::clone(&repo), DefaultConfig)
        .purge(utc(2025, 10, 14, 3))
        .await
        .unwrap();

    let service = QuantityCorrectionService::new(Arc::clone(&repo), DefaultConfig);
    let report = service.apply(ScanScope::AllBatches, true).await.unwrap();
    assert_eq!(report.total_flagged, 0);
    assert_eq!(repo.find_request(id).await.unwrap().unwrap().quantity, 155564);
}

#[tokio::test]
async fn test_retention_days_are_configurable() {
    let (_db, repo) = create_test_repo().unwrap();
    let id = seed_request(repo.as_ref(), 10, utc(2025, 10, 1, 12)).await;

    let config = ConfigManager::from_connection(repo.connection()).unwrap();
    config
        .set_global_config_value(config_keys::RETENTION_DAYS, "7")
        .unwrap();

    let report = RetentionService::new(Arc::clone(&repo), config)
        .purge(utc(2025, 10, 14, 3))
        .await
        .unwrap();
    assert_eq!(report.retention_days, 7);
    assert_eq!(report.request_ids, vec![id]);
}
