//! Publish modes against a directory-backed catalog.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use extractflow_catalog::{
    CatalogPublisher, Credentials, LocalCatalog, PublishPhase, PublishRequest, ServerConfig,
};
use extractflow_protocol::{
    CatalogTarget, ColumnDef, ColumnType, CreateMode, Dataset, PublishMode, Schema, TableName,
    Value,
};
use extractflow_sinks::{read_extract, ExtractWriter};
use tempfile::TempDir;

const SITE: &str = "finance";

struct Fixture {
    dir: TempDir,
    catalog: Arc<LocalCatalog>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("catalog").join(SITE).join("Reports")).unwrap();
        let catalog = Arc::new(LocalCatalog::new(dir.path().join("catalog")));
        Self { dir, catalog }
    }

    fn publisher(&self) -> CatalogPublisher {
        self.publisher_as(Credentials::UsernamePassword {
            username: "analyst".into(),
            password: "pw".into(),
        })
    }

    fn publisher_as(&self, credentials: Credentials) -> CatalogPublisher {
        CatalogPublisher::new(
            Box::new(self.catalog.clone()),
            ServerConfig::new("file:///unused", SITE),
            credentials,
        )
    }

    fn entry(&self) -> PathBuf {
        self.catalog.entry_path(SITE, &target())
    }

    fn extract(&self, file: &str, schema: &Schema, dataset: &Dataset) -> PathBuf {
        let path = self.dir.path().join(file);
        ExtractWriter::open(&path)
            .unwrap()
            .write(CreateMode::OrReplace, schema, dataset)
            .unwrap();
        path
    }

    fn seed_entry(&self, schema: &Schema, dataset: &Dataset) {
        ExtractWriter::open(self.entry())
            .unwrap()
            .write(CreateMode::OrReplace, schema, dataset)
            .unwrap();
    }
}

fn target() -> CatalogTarget {
    CatalogTarget::new("Reports", "Orders")
}

fn orders_schema() -> Schema {
    Schema::try_new(
        TableName::default(),
        vec![
            ColumnDef::new("id", ColumnType::Integer),
            ColumnDef::new("city", ColumnType::Text),
        ],
    )
    .unwrap()
}

fn orders(ids: &[i64]) -> Dataset {
    Dataset::from_columns(vec![
        ("id", ids.iter().map(|id| Value::Integer(*id)).collect()),
        (
            "city",
            ids.iter().map(|id| Value::from(format!("city-{}", id))).collect(),
        ),
    ])
    .unwrap()
}

fn unrelated() -> (Schema, Dataset) {
    let schema = Schema::try_new(
        TableName::default(),
        vec![ColumnDef::new("legacy", ColumnType::Float)],
    )
    .unwrap();
    let dataset = Dataset::from_columns(vec![(
        "legacy",
        vec![Value::Float(0.5), Value::Float(1.5), Value::Float(2.5)],
    )])
    .unwrap();
    (schema, dataset)
}

fn ids(path: &Path) -> Vec<Value> {
    let extract = read_extract(path).unwrap();
    extract.rows.iter().map(|row| row[0].clone()).collect()
}

#[test]
fn test_overwrite_replaces_unrelated_entry() {
    let fx = Fixture::new();
    let (old_schema, old_rows) = unrelated();
    fx.seed_entry(&old_schema, &old_rows);

    let extract = fx.extract("orders.extract", &orders_schema(), &orders(&[1, 2]));
    let mut publisher = fx.publisher();
    let published = publisher
        .publish(&PublishRequest::new(&extract, target(), PublishMode::Overwrite))
        .unwrap();

    assert_eq!(published.row_count, Some(2));
    assert_eq!(published.datasource_id, "Reports/Orders");
    let entry = read_extract(&fx.entry()).unwrap();
    assert_eq!(entry.schema, orders_schema());
    assert_eq!(entry.num_rows(), 2);
    assert_eq!(fx.catalog.open_sessions(), 0);
}

#[test]
fn test_overwrite_creates_missing_entry() {
    let fx = Fixture::new();
    let extract = fx.extract("orders.extract", &orders_schema(), &orders(&[7]));
    fx.publisher()
        .publish(&PublishRequest::new(&extract, target(), PublishMode::Overwrite))
        .unwrap();
    assert_eq!(ids(&fx.entry()), vec![Value::Integer(7)]);
}

#[test]
fn test_append_adds_rows_after_existing() {
    let fx = Fixture::new();
    fx.seed_entry(&orders_schema(), &orders(&[1, 2]));
    let extract = fx.extract("more.extract", &orders_schema(), &orders(&[3]));

    let published = fx
        .publisher()
        .publish(&PublishRequest::new(&extract, target(), PublishMode::Append))
        .unwrap();
    assert_eq!(published.row_count, Some(3));
    assert_eq!(
        ids(&fx.entry()),
        vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
    );
}

#[test]
fn test_append_requires_existing_entry() {
    let fx = Fixture::new();
    let extract = fx.extract("orders.extract", &orders_schema(), &orders(&[1]));
    let mut publisher = fx.publisher();

    let err = publisher
        .publish(&PublishRequest::new(&extract, target(), PublishMode::Append))
        .unwrap_err();
    assert_eq!(err.kind(), "precondition");
    assert_eq!(publisher.phase(), PublishPhase::Failed);
    assert!(!fx.entry().exists());
    assert_eq!(fx.catalog.open_sessions(), 0);
}

#[test]
fn test_append_rejects_schema_mismatch() {
    let fx = Fixture::new();
    let (old_schema, old_rows) = unrelated();
    fx.seed_entry(&old_schema, &old_rows);
    let before = fs::read(fx.entry()).unwrap();

    let extract = fx.extract("orders.extract", &orders_schema(), &orders(&[1]));
    let err = fx
        .publisher()
        .publish(&PublishRequest::new(&extract, target(), PublishMode::Append))
        .unwrap_err();
    assert_eq!(err.kind(), "precondition");
    assert!(err.to_string().contains("schema mismatch"));
    assert_eq!(fs::read(fx.entry()).unwrap(), before);
    assert_eq!(fx.catalog.open_sessions(), 0);
}

#[test]
fn test_create_new_refuses_existing_entry() {
    let fx = Fixture::new();
    fx.seed_entry(&orders_schema(), &orders(&[1, 2]));
    let before = fs::read(fx.entry()).unwrap();

    let extract = fx.extract("orders.extract", &orders_schema(), &orders(&[9]));
    let err = fx
        .publisher()
        .publish(&PublishRequest::new(&extract, target(), PublishMode::CreateNew))
        .unwrap_err();
    assert_eq!(err.kind(), "precondition");
    assert_eq!(fs::read(fx.entry()).unwrap(), before);
}

#[test]
fn test_create_new_on_fresh_entry() {
    let fx = Fixture::new();
    let extract = fx.extract("orders.extract", &orders_schema(), &orders(&[4, 5]));
    fx.publisher()
        .publish(&PublishRequest::new(&extract, target(), PublishMode::CreateNew))
        .unwrap();
    assert_eq!(ids(&fx.entry()), vec![Value::Integer(4), Value::Integer(5)]);
}

#[test]
fn test_missing_project_is_precondition() {
    let fx = Fixture::new();
    let extract = fx.extract("orders.extract", &orders_schema(), &orders(&[1]));
    let err = fx
        .publisher()
        .publish(&PublishRequest::new(
            &extract,
            CatalogTarget::new("Nowhere", "Orders"),
            PublishMode::Overwrite,
        ))
        .unwrap_err();
    assert_eq!(err.kind(), "precondition");
    assert_eq!(fx.catalog.open_sessions(), 0);
}

#[test]
fn test_unknown_site_is_auth_failure() {
    let fx = Fixture::new();
    let extract = fx.extract("orders.extract", &orders_schema(), &orders(&[1]));
    let mut publisher = CatalogPublisher::new(
        Box::new(fx.catalog.clone()),
        ServerConfig::new("file:///unused", "marketing"),
        Credentials::UsernamePassword {
            username: "analyst".into(),
            password: "pw".into(),
        },
    );
    let err = publisher
        .publish(&PublishRequest::new(&extract, target(), PublishMode::Overwrite))
        .unwrap_err();
    assert_eq!(err.kind(), "auth");
    assert!(!fx.entry().exists());
}

#[test]
fn test_access_list_checks_credentials() {
    let fx = Fixture::new();
    fs::write(
        fx.catalog.site_dir(SITE).join("access.json"),
        r#"{ "users": { "analyst": "pw" }, "tokens": { "ci": "s3cret" } }"#,
    )
    .unwrap();
    let extract = fx.extract("orders.extract", &orders_schema(), &orders(&[1]));
    let request = PublishRequest::new(&extract, target(), PublishMode::Overwrite);

    let err = fx
        .publisher_as(Credentials::UsernamePassword {
            username: "analyst".into(),
            password: "wrong".into(),
        })
        .publish(&request)
        .unwrap_err();
    assert_eq!(err.kind(), "auth");
    assert!(!err.to_string().contains("wrong"));

    fx.publisher_as(Credentials::AccessToken {
        name: "ci".into(),
        secret: "s3cret".into(),
    })
    .publish(&request)
    .unwrap();
    assert_eq!(fx.catalog.open_sessions(), 0);
}

#[test]
fn test_unreadable_extract_fails_before_sign_in() {
    let fx = Fixture::new();
    let bogus = fx.dir.path().join("bogus.extract");
    fs::write(&bogus, b"not an extract").unwrap();

    let err = fx
        .publisher()
        .publish(&PublishRequest::new(&bogus, target(), PublishMode::Overwrite))
        .unwrap_err();
    assert_eq!(err.kind(), "extract");
    assert!(!fx.entry().exists());
}

#[test]
fn test_no_staging_files_left_in_catalog() {
    let fx = Fixture::new();
    let extract = fx.extract("orders.extract", &orders_schema(), &orders(&[1]));
    fx.publisher()
        .publish(&PublishRequest::new(&extract, target(), PublishMode::Overwrite))
        .unwrap();

    let project = fx.entry().parent().unwrap().to_path_buf();
    let leftovers: Vec<_> = fs::read_dir(project)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}
