// Configuration management system tests

use macrepair::cli::config::{init_config, load_config, TOMLConfigParser};
use macrepair::cli::types::{AppConfig, OutputFormat};
use macrepair::command_execution::{ExecutionResult, FollowUp, Outcome};
use macrepair::command_execution::classifier::OperationProfile;

#[tokio::test]
async fn test_toml_parser_serialize_deserialize() {
    let mut config = AppConfig::default();
    config.output_format = OutputFormat::Json;
    config.dispatcher.queue_capacity = Some(3);
    let parser = TOMLConfigParser::new(Some("unused.toml".into())).unwrap();

    let toml_str = parser.serialize_toml(&config).unwrap();
    assert!(toml_str.contains("output_format = \"json\""));

    let parsed = parser.parse_toml(&toml_str).unwrap();
    assert_eq!(parsed, config);
}

#[tokio::test]
async fn test_partial_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    tokio::fs::write(
        &path,
        "auto_open_settings = false\n\n[tools]\nelevation_program = \"/usr/bin/sudo\"\n",
    )
    .await
    .unwrap();

    let config = load_config(Some(path)).await.unwrap();
    assert!(!config.auto_open_settings);
    assert_eq!(config.tools.elevation_program, "/usr/bin/sudo");
    assert_eq!(config.tools.spctl_program, "spctl");
    assert_eq!(config.classification, AppConfig::default().classification);
    assert_eq!(config.dispatcher.queue_capacity, None);
}

#[tokio::test]
async fn test_explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_config(Some(dir.path().join("absent.toml"))).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    tokio::fs::write(&path, "[classification]\nconfirmation_phrases = []\n")
        .await
        .unwrap();

    let err = load_config(Some(path)).await.unwrap_err();
    assert!(err.to_string().contains("confirmation_phrases"));
}

#[tokio::test]
async fn test_init_writes_defaults_and_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let written = init_config(Some(path.clone()), false).await.unwrap();
    assert_eq!(written, path);

    let config = load_config(Some(path.clone())).await.unwrap();
    assert_eq!(config, AppConfig::default());

    assert!(init_config(Some(path.clone()), false).await.is_err());
    assert!(init_config(Some(path), true).await.is_ok());
}

#[tokio::test]
async fn test_custom_phrases_drive_classification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    tokio::fs::write(
        &path,
        "[classification]\nconfirmation_phrases = [\"Bestätigung erforderlich\"]\nsettings_uri = \"x-apple.systempreferences:custom\"\n",
    )
    .await
    .unwrap();

    let config = load_config(Some(path)).await.unwrap();
    let settings = config.maintenance_settings();

    let result = ExecutionResult::exited(1, "", "BESTÄTIGUNG ERFORDERLICH");
    let outcome = settings
        .classifier
        .classify(&result, &OperationProfile::new("Allow apps from anywhere"));

    match outcome {
        Outcome::NeedsConfirmation { follow_up, .. } => assert_eq!(
            follow_up,
            FollowUp::OpenSettings("x-apple.systempreferences:custom".to_string())
        ),
        other => panic!("expected NeedsConfirmation, got {:?}", other),
    }
}
