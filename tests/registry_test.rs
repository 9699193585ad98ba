//! Integration tests for the instance registry.
//!
//! A counting connector wraps the real SQLite connector so the tests can
//! observe how many physical connections were opened.

use async_trait::async_trait;
use db_adapter::config::{PoolOption, PoolSettings};
use db_adapter::context::Context;
use db_adapter::db::{Connector, Db, InstanceRegistry, SqlxConnector};
use db_adapter::error::ExceptionKind;
use db_adapter::models::{ConnectionConfig, DatabaseType};
use db_adapter::params;
use sqlx::AnyPool;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug)]
struct CountingConnector {
    inner: SqlxConnector,
    opens: AtomicUsize,
    delay: Duration,
}

impl CountingConnector {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: SqlxConnector::new(DatabaseType::SQLite),
            opens: AtomicUsize::new(0),
            delay,
        })
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for CountingConnector {
    fn family(&self) -> DatabaseType {
        self.inner.family()
    }

    async fn connect(
        &self,
        config: &ConnectionConfig,
        settings: &PoolSettings,
    ) -> Result<AnyPool, sqlx::Error> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.connect(config, settings).await
    }
}

fn sqlite_config(dir: &TempDir, file: &str) -> ConnectionConfig {
    ConnectionConfig::sqlite(dir.path().join(file).to_str().unwrap())
}

#[tokio::test]
async fn test_same_name_shares_one_connection() {
    let dir = TempDir::new().unwrap();
    let connector = CountingConnector::new(Duration::ZERO);
    let registry = InstanceRegistry::new(connector.clone());

    let first = registry
        .fabricate("main_db", &sqlite_config(&dir, "main.db"), &[])
        .await
        .unwrap();
    // Second call points elsewhere; the stored connection wins.
    let second = registry
        .fabricate("main_db", &sqlite_config(&dir, "other.db"), &[])
        .await
        .unwrap();

    assert_eq!(connector.opens(), 1);
    assert_eq!(registry.len().await, 1);
    assert_eq!(registry.instance_names().await, vec!["sqlite-main_db"]);

    let ctx = Context::background();
    first
        .exec_context(&ctx, "create", "CREATE TABLE t (v INTEGER)", &params![])
        .await
        .unwrap();
    second
        .exec_context(&ctx, "insert", "INSERT INTO t (v) VALUES (?)", &params![7])
        .await
        .unwrap();

    // Same handle: closing through one adapter closes the other.
    first.pool().close().await;
    assert!(second.pool().is_closed());
}

#[tokio::test]
async fn test_different_names_get_distinct_connections() {
    let dir = TempDir::new().unwrap();
    let connector = CountingConnector::new(Duration::ZERO);
    let registry = InstanceRegistry::new(connector.clone());

    let main = registry
        .fabricate("main_db", &sqlite_config(&dir, "main.db"), &[])
        .await
        .unwrap();
    let reporting = registry
        .fabricate("reporting", &sqlite_config(&dir, "reporting.db"), &[])
        .await
        .unwrap();

    assert_eq!(connector.opens(), 2);
    assert_eq!(
        registry.instance_names().await,
        vec!["sqlite-main_db", "sqlite-reporting"]
    );

    main.pool().close().await;
    assert!(!reporting.pool().is_closed());
    assert!(registry.close_all().await.is_empty());
}

#[tokio::test]
async fn test_concurrent_fabrication_opens_once() {
    let dir = TempDir::new().unwrap();
    // The delay keeps the first open in flight while the others arrive.
    let connector = CountingConnector::new(Duration::from_millis(100));
    let registry = Arc::new(InstanceRegistry::new(connector.clone()));
    let config = sqlite_config(&dir, "main.db");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            registry.fabricate("main_db", &config, &[]).await
        }));
    }

    let mut adapters = Vec::new();
    for handle in handles {
        adapters.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(connector.opens(), 1);
    assert_eq!(registry.len().await, 1);

    let pool = registry.get_instance("main_db").await.unwrap();
    pool.close().await;
    assert!(adapters.iter().all(|db| db.pool().is_closed()));
}

#[tokio::test]
async fn test_get_instance() {
    let dir = TempDir::new().unwrap();
    let registry = InstanceRegistry::sqlite();

    let exc = registry.get_instance("main_db").await.unwrap_err();
    assert_eq!(exc.kind(), ExceptionKind::NotFound);

    let db = registry
        .fabricate("main_db", &sqlite_config(&dir, "main.db"), &[])
        .await
        .unwrap();
    let pool = registry.get_instance("main_db").await.unwrap();

    pool.close().await;
    assert!(db.pool().is_closed());
}

#[tokio::test]
async fn test_failed_open_can_be_retried() {
    let dir = TempDir::new().unwrap();
    let connector = CountingConnector::new(Duration::ZERO);
    let registry = InstanceRegistry::new(connector.clone());

    let exc = registry
        .fabricate("main_db", &ConnectionConfig::default(), &[])
        .await
        .unwrap_err();
    assert_eq!(exc.kind(), ExceptionKind::Unexpected);
    assert_eq!(exc.title(), "error opening sqlite connection");
    assert_eq!(exc.detail(), "instance name: sqlite-main_db");
    assert!(registry.is_empty().await);
    assert_eq!(
        registry.get_instance("main_db").await.unwrap_err().kind(),
        ExceptionKind::NotFound
    );

    registry
        .fabricate("main_db", &sqlite_config(&dir, "main.db"), &[])
        .await
        .unwrap();
    assert_eq!(connector.opens(), 2);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_pool_options_apply() {
    let dir = TempDir::new().unwrap();
    let registry = InstanceRegistry::sqlite();
    let db = registry
        .fabricate(
            "main_db",
            &sqlite_config(&dir, "main.db"),
            &[
                PoolOption::MaxOpenConnections(3),
                PoolOption::MaxIdleConnections(1),
                PoolOption::MaxOpenConnections(4),
                PoolOption::ConnMaxLifetime(Duration::from_secs(60)),
            ],
        )
        .await
        .unwrap();

    let options = db.pool().options();
    assert_eq!(options.get_max_connections(), 4);
    assert_eq!(options.get_min_connections(), 1);
    assert_eq!(options.get_max_lifetime(), Some(Duration::from_secs(60)));
}

#[tokio::test]
async fn test_close_all_success() {
    let dir = TempDir::new().unwrap();
    let registry = InstanceRegistry::sqlite();
    let db = registry
        .fabricate("main_db", &sqlite_config(&dir, "main.db"), &[])
        .await
        .unwrap();
    db.ping(&Context::background()).await.unwrap();

    assert!(registry.close_all().await.is_empty());
    assert!(registry.is_empty().await);
    assert!(db.pool().is_closed());
    assert!(registry.get_instance("main_db").await.is_err());
}

#[tokio::test]
async fn test_close_all_reports_each_failure() {
    let dir = TempDir::new().unwrap();
    let registry = InstanceRegistry::sqlite().with_close_timeout(Duration::from_millis(100));

    let busy = registry
        .fabricate("busy", &sqlite_config(&dir, "busy.db"), &[])
        .await
        .unwrap();
    registry
        .fabricate("idle", &sqlite_config(&dir, "idle.db"), &[])
        .await
        .unwrap();

    // A checked-out connection keeps its pool from closing.
    let held = busy.pool().acquire().await.unwrap();

    let errors = registry.close_all().await;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ExceptionKind::Unexpected);
    assert_eq!(errors[0].title(), "error closing sqlite connection");
    assert_eq!(errors[0].detail(), "instance name: sqlite-busy");

    // The sweep still removed every instance.
    assert!(registry.is_empty().await);
    drop(held);
}
