//! Integration tests for configuration parsing and handling.

use docmap::mongodb::{Connections, MongoConfig};
use docmap::prelude::*;
use docmap::schema::SchemaError;
use std::io::Write;

/// Test minimal configuration
#[test]
fn test_config_minimal() {
    let config = DocmapConfig::from_str(
        r#"
        [connections.default]
        database = "app"
        "#,
    )
    .expect("Failed to parse config");

    let default = config.default_connection().expect("default connection");
    assert_eq!(default.uri, "mongodb://localhost:27017");
    assert!(!config.casting.strict);
    assert!(config.casting.log_diagnostics);
}

/// Test full configuration with all options
#[test]
fn test_config_full() {
    let config = DocmapConfig::from_str(
        r#"
        [connections.default]
        uri = "mongodb://db1:27017,db2:27017/?replicaSet=rs0"
        database = "app"
        app_name = "blog-api"
        min_pool_size = 2
        max_pool_size = 20
        connect_timeout_ms = 5000
        server_selection_timeout_ms = 10000
        direct_connection = false

        [connections.reporting]
        uri = "mongodb://reports:27017"
        database = "reports"

        [casting]
        strict = true
        log_diagnostics = false

        [debug]
        log_level = "debug"
        log_format = "pretty"
        "#,
    )
    .expect("Failed to parse config");

    assert_eq!(config.connections.len(), 2);
    assert!(config.casting.strict);
    assert_eq!(config.debug.log_format, "pretty");

    let mongo = MongoConfig::from_connection(config.default_connection().unwrap()).unwrap();
    assert_eq!(mongo.app_name.as_deref(), Some("blog-api"));
    assert_eq!(mongo.min_pool_size, Some(2));
    assert_eq!(mongo.direct_connection, Some(false));
}

/// Test loading configuration from a file
#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[connections.default]\ndatabase = \"from_file\"").unwrap();

    let config = DocmapConfig::from_file(file.path()).expect("Failed to load config");
    assert_eq!(config.default_connection().unwrap().database, "from_file");

    let missing = DocmapConfig::from_file("/definitely/not/here/docmap.toml");
    assert!(matches!(missing, Err(SchemaError::IoError { .. })));
}

/// Test that the casting section drives the translator
#[test]
fn test_casting_config_applies_to_translator() {
    let config = DocmapConfig::from_str("[casting]\nstrict = true\n").unwrap();
    let translator = Translator::with_casting(config.casting.clone());

    let casted = ValueCaster::new().cast("nope".into(), &FieldType::ObjectId);
    assert!(translator.resolve(casted).is_err());
}

/// Test resolving entity connections by name
#[test]
fn test_connections_for_entities() {
    let config = DocmapConfig::from_str(
        r#"
        [connections.default]
        database = "app"

        [connections.reporting]
        database = "reports"
        "#,
    )
    .unwrap();

    let mut connections = Connections::new();
    for (name, connection) in &config.connections {
        connections.insert(name.as_str(), connection.database.clone());
    }

    let post = EntityMeta::builder("BlogPost").build().unwrap();
    let stat = EntityMeta::builder("Stat")
        .annotations("@db reporting")
        .build()
        .unwrap();
    let archived = EntityMeta::builder("Old").db("archive").build().unwrap();

    assert_eq!(connections.for_entity(&post).unwrap(), "app");
    assert_eq!(connections.for_entity(&stat).unwrap(), "reports");
    assert!(connections.for_entity(&archived).is_err());
}
