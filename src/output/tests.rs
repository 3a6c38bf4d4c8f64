//! Tests for output module

use super::*;
use crate::types::{CompressionType, JsonObject};
use arrow::array::{Array, BooleanArray, StringArray};
use arrow::datatypes::DataType;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::tempdir;

fn rows(values: Vec<Value>) -> Vec<JsonObject> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Object(obj) => obj,
            other => panic!("not an object: {other}"),
        })
        .collect()
}

fn column_names(schema: &arrow::datatypes::Schema) -> Vec<&str> {
    schema.fields().iter().map(|f| f.name().as_str()).collect()
}

fn read_parquet(data: Bytes) -> Vec<arrow::record_batch::RecordBatch> {
    ParquetRecordBatchReaderBuilder::try_new(data)
        .unwrap()
        .build()
        .unwrap()
        .collect::<std::result::Result<Vec<_>, _>>()
        .unwrap()
}

// ============================================================================
// Schema Inference Tests
// ============================================================================

#[test]
fn test_infer_schema_empty() {
    let schema = infer_schema(&[]);
    assert!(schema.fields().is_empty());
}

#[test]
fn test_infer_schema_keeps_first_appearance_order() {
    let records = rows(vec![
        json!({"EmpCode": "E1", "Name": "Asha", "Dept": "HR"}),
        json!({"Name": "Ravi", "Location": "Pune", "EmpCode": "E2"}),
        json!({"Grade": "B", "EmpCode": "E3"}),
    ]);

    let schema = infer_schema(&records);
    assert_eq!(
        column_names(&schema),
        vec!["EmpCode", "Name", "Dept", "Location", "Grade"]
    );
    assert!(schema.fields().iter().all(|f| f.is_nullable()));
}

#[test]
fn test_infer_schema_type_merging() {
    let records = rows(vec![
        json!({"salary": 42, "manager": null, "code": 7, "active": true}),
        json!({"salary": 42.5, "manager": "M1", "code": "X7", "active": false}),
    ]);

    let schema = infer_schema(&records);
    assert_eq!(
        schema.field_with_name("salary").unwrap().data_type(),
        &DataType::Float64
    );
    assert_eq!(
        schema.field_with_name("manager").unwrap().data_type(),
        &DataType::Utf8
    );
    assert_eq!(
        schema.field_with_name("code").unwrap().data_type(),
        &DataType::Utf8
    );
    assert_eq!(
        schema.field_with_name("active").unwrap().data_type(),
        &DataType::Boolean
    );
}

#[test]
fn test_infer_schema_merges_nested_objects() {
    let records = rows(vec![
        json!({"address": {"city": "Pune"}}),
        json!({"address": {"city": "Delhi", "pin": 110001}}),
    ]);

    let schema = infer_schema(&records);
    let DataType::Struct(fields) = schema.field_with_name("address").unwrap().data_type() else {
        panic!("expected a struct column");
    };
    let names: Vec<_> = fields.iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["city", "pin"]);
}

#[test]
fn test_infer_schema_list_and_empty_object() {
    let records = rows(vec![
        json!({"tags": [], "extra": {}}),
        json!({"tags": ["a", "b"], "extra": {}}),
    ]);

    let schema = infer_schema(&records);
    let DataType::List(item) = schema.field_with_name("tags").unwrap().data_type() else {
        panic!("expected a list column");
    };
    assert_eq!(item.data_type(), &DataType::Utf8);
    assert_eq!(
        schema.field_with_name("extra").unwrap().data_type(),
        &DataType::Utf8
    );
}

// ============================================================================
// JSON to Arrow Tests
// ============================================================================

#[test]
fn test_json_to_arrow_missing_keys_are_null() {
    let records = rows(vec![
        json!({"EmpCode": "E1", "Dept": "HR"}),
        json!({"EmpCode": "E2"}),
    ]);

    let batch = json_to_arrow(&records, None).unwrap();
    assert_eq!(batch.num_rows(), 2);

    let dept = batch
        .column(1)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(dept.value(0), "HR");
    assert!(dept.is_null(1));
}

#[test]
fn test_json_to_arrow_empty() {
    let batch = json_to_arrow(&[], None).unwrap();
    assert_eq!(batch.num_rows(), 0);
}

#[test]
fn test_json_to_arrow_nested_values() {
    let records = rows(vec![
        json!({"address": {"city": "Pune"}, "skills": ["rust", "sql"]}),
        json!({"address": null, "skills": null}),
    ]);

    let batch = json_to_arrow(&records, None).unwrap();
    assert!(batch.column(0).is_null(1));
    assert!(batch.column(1).is_null(1));

    let back = arrow_to_json(&batch).unwrap();
    assert_eq!(back[0]["address"], json!({"city": "Pune"}));
    assert_eq!(back[0]["skills"], json!(["rust", "sql"]));
    assert_eq!(back[1]["address"], Value::Null);
}

#[test]
fn test_json_to_arrow_mixed_column_as_text() {
    let records = rows(vec![json!({"code": 7}), json!({"code": "X7"})]);

    let batch = json_to_arrow(&records, None).unwrap();
    let code = batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(code.value(0), "7");
    assert_eq!(code.value(1), "X7");
}

// ============================================================================
// Parquet Tests
// ============================================================================

#[test]
fn test_parquet_writer_config_default() {
    let config = ParquetWriterConfig::default();
    assert_eq!(config.compression(), Compression::SNAPPY);
    assert_eq!(config.row_group_size(), 1024 * 1024);
    assert!(config.is_dictionary_enabled());
    assert!(config.is_statistics_enabled());
}

#[test]
fn test_parquet_writer_config_codecs() {
    let config = ParquetWriterConfig::new().with_codec(CompressionType::None);
    assert_eq!(config.compression(), Compression::UNCOMPRESSED);

    let config = ParquetWriterConfig::new().with_codec(CompressionType::Zstd);
    assert!(matches!(config.compression(), Compression::ZSTD(_)));

    let config = ParquetWriterConfig::new().with_codec(CompressionType::Gzip);
    assert!(matches!(config.compression(), Compression::GZIP(_)));

    let config = ParquetWriterConfig::new().with_row_group_size(0);
    assert_eq!(config.row_group_size(), 1);
}

#[test]
fn test_batch_to_parquet_bytes_reads_back() {
    let records = rows(vec![
        json!({"EmpCode": "E1", "isLoadCompleted": false}),
        json!({"EmpCode": "E2", "isLoadCompleted": true}),
    ]);
    let batch = json_to_arrow(&records, None).unwrap();

    let data = batch_to_parquet_bytes(&batch, &ParquetWriterConfig::default()).unwrap();
    assert_eq!(&data[..4], b"PAR1");

    let batches = read_parquet(data);
    let total: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(total, 2);

    let schema = batches[0].schema();
    assert_eq!(column_names(&schema), vec!["EmpCode", "isLoadCompleted"]);

    let flags = batches[0]
        .column(1)
        .as_any()
        .downcast_ref::<BooleanArray>()
        .unwrap();
    assert!(!flags.value(0));
    assert!(flags.value(1));
}

#[test]
fn test_batch_to_parquet_bytes_small_row_groups() {
    let records = rows((0..10).map(|i| json!({"n": i})).collect());
    let batch = json_to_arrow(&records, None).unwrap();
    let config = ParquetWriterConfig::new()
        .with_codec(CompressionType::Zstd)
        .with_row_group_size(3);

    let data = batch_to_parquet_bytes(&batch, &config).unwrap();
    let builder = ParquetRecordBatchReaderBuilder::try_new(data).unwrap();
    assert_eq!(builder.metadata().num_row_groups(), 4);
}

// ============================================================================
// Destination Tests
// ============================================================================

#[tokio::test]
async fn test_memory_destination_put_and_read() {
    let dest = CloudDestination::parse("memory://hrms/").unwrap();
    assert_eq!(dest.scheme(), "memory");
    assert!(!dest.is_cloud());

    let location = dest
        .put("employee/data.parquet", Bytes::from_static(b"abc"))
        .await
        .unwrap();
    assert_eq!(location, "memory://hrms/employee/data.parquet");

    let data = dest.read("employee/data.parquet").await.unwrap();
    assert_eq!(data, Bytes::from_static(b"abc"));
}

#[tokio::test]
async fn test_local_destination_writes_nested_key() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("out");
    let dest = CloudDestination::parse(root.to_str().unwrap()).unwrap();
    assert_eq!(dest.scheme(), "file");

    let location = dest
        .put("logs/run_20240101_000000.log", Bytes::from_static(b"line\n"))
        .await
        .unwrap();

    let on_disk = root.join("logs").join("run_20240101_000000.log");
    assert_eq!(std::fs::read(&on_disk).unwrap(), b"line\n");
    assert!(location.ends_with("logs/run_20240101_000000.log"));
}

#[tokio::test]
async fn test_read_missing_object_is_storage_error() {
    let dest = CloudDestination::memory("");
    let err = dest.read("nope.parquet").await.unwrap_err();
    assert!(matches!(err, crate::error::Error::Storage { .. }));
}

#[test]
fn test_s3_destination_with_explicit_credentials() {
    let s3 = S3Options {
        access_key_id: Some("AKIA".into()),
        secret_access_key: Some("secret".into()),
        region: Some("ap-south-1".into()),
        endpoint: None,
        allow_http: false,
    };

    let dest = CloudDestination::parse_with("s3://hr-bucket/raw/hrms/", &s3).unwrap();
    assert_eq!(dest.scheme(), "s3");
    assert!(dest.is_cloud());
    assert!(!format!("{s3:?}").contains("secret"));
}

#[test]
fn test_s3_destination_requires_bucket() {
    let err = CloudDestination::parse("s3://").unwrap_err();
    assert!(err.to_string().contains("bucket"));
}
