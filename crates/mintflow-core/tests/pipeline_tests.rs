//! End-to-end runs of the mint pipeline against scripted collaborators.

use mintflow_core::{
    LedgerError, MintPipeline, PipelineError, PipelineInput, PipelineState, Stage, StorageError,
};
use mintflow_test_utils::{item_input, test_config, Call, CallLog, ScriptedLedger, ScriptedStore};
use std::sync::Arc;

fn pipeline(store: ScriptedStore, ledger: ScriptedLedger) -> MintPipeline {
    MintPipeline::new(test_config(), Arc::new(store), Arc::new(ledger))
}

#[tokio::test]
async fn item_five_completes_verified() {
    let log = CallLog::new();
    let store = ScriptedStore::new(&log).then_ok("ar://img5").then_ok("ar://meta5");
    let ledger = ScriptedLedger::new(&log).then_created("ADDR123").then_verified();

    let outcome = pipeline(store, ledger).run(item_input(5)).await.unwrap();

    assert_eq!(outcome.state(), PipelineState::Done);
    assert_eq!(outcome.address().as_str(), "ADDR123");
    assert!(outcome.entry.membership_verified);
    assert_eq!(outcome.image.as_str(), "ar://img5");
    assert_eq!(outcome.descriptor.as_str(), "ar://meta5");

    let calls = log.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(log.upload_names(), vec!["5.jpg", "5.json"]);
    match &calls[2] {
        Call::CreateEntry(request) => {
            assert_eq!(request.uri.as_str(), "ar://meta5");
            assert_eq!(request.name, "Item #5");
            assert_eq!(request.symbol, "NFT");
            assert_eq!(request.seller_fee_basis_points, 0);
        }
        other => panic!("expected CreateEntry third, got {other:?}"),
    }
    assert!(matches!(&calls[3], Call::VerifyMembership { address, .. } if address.as_str() == "ADDR123"));
}

#[tokio::test]
async fn uploaded_descriptor_points_at_image() {
    let log = CallLog::new();
    let store = Arc::new(ScriptedStore::new(&log).then_ok("ar://img5").then_ok("ar://meta5"));
    let ledger = ScriptedLedger::new(&log).then_created("ADDR123").then_verified();
    let pipeline = MintPipeline::new(test_config(), store.clone(), Arc::new(ledger));

    pipeline.run(item_input(5)).await.unwrap();

    let payloads = store.payloads();
    assert_eq!(payloads[0], b"IMG");
    let descriptor: serde_json::Value = serde_json::from_slice(&payloads[1]).unwrap();
    assert_eq!(descriptor["image"], "ar://img5");
    assert_eq!(descriptor["properties"]["files"][0]["uri"], "ar://img5");
    assert_eq!(descriptor["name"], "Item #5");
}

#[tokio::test]
async fn registry_rejection_skips_verification() {
    let log = CallLog::new();
    let store = ScriptedStore::new(&log).then_ok("ar://img5").then_ok("ar://meta5");
    let ledger = ScriptedLedger::new(&log)
        .then_create_err(LedgerError::Rejected("collection is not a group".to_string()))
        .then_verified();

    let failure = pipeline(store, ledger).run(item_input(5)).await.unwrap_err();

    assert_eq!(failure.state(), PipelineState::Failed(Stage::Minting));
    assert!(matches!(failure.error, PipelineError::RegistryRejected(_)));
    assert!(!failure.left_ledger_artifact());
    assert_eq!(log.verify_count(), 0);
}

#[tokio::test]
async fn image_upload_failure_makes_no_further_calls() {
    let log = CallLog::new();
    let store = ScriptedStore::new(&log).then_err(StorageError::Server {
        status: 502,
        message: "bad gateway".to_string(),
    });
    let ledger = ScriptedLedger::new(&log).then_created("ADDR123").then_verified();

    let failure = pipeline(store, ledger).run(item_input(5)).await.unwrap_err();

    assert_eq!(failure.stage, Stage::UploadingAsset);
    assert_eq!(log.upload_names(), vec!["5.jpg"]);
    assert_eq!(log.create_count(), 0);
    assert_eq!(log.verify_count(), 0);
}

#[tokio::test]
async fn descriptor_upload_failure_does_not_mint() {
    let log = CallLog::new();
    let store = ScriptedStore::new(&log)
        .then_ok("ar://img5")
        .then_err(StorageError::Transport("timed out".to_string()));
    let ledger = ScriptedLedger::new(&log).then_created("ADDR123");

    let failure = pipeline(store, ledger).run(item_input(5)).await.unwrap_err();

    assert_eq!(failure.stage, Stage::UploadingDescriptor);
    assert!(matches!(&failure.error, PipelineError::UploadFailed { name, .. } if name == "5.json"));
    assert_eq!(log.create_count(), 0);
}

#[tokio::test]
async fn verification_failure_reports_created_address() {
    let log = CallLog::new();
    let store = ScriptedStore::new(&log).then_ok("ar://img5").then_ok("ar://meta5");
    let ledger = ScriptedLedger::new(&log)
        .then_created("ADDR123")
        .then_verify_err(LedgerError::Unauthorized("not the group authority".to_string()));

    let failure = pipeline(store, ledger).run(item_input(5)).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Verifying);
    assert!(matches!(failure.error, PipelineError::VerificationFailed { .. }));
    assert!(failure.left_ledger_artifact());
    let entry = failure.entry.as_ref().unwrap();
    assert_eq!(entry.address.as_str(), "ADDR123");
    assert!(!entry.membership_verified);
}

#[tokio::test]
async fn out_of_range_fee_rejected_before_ledger() {
    let log = CallLog::new();
    let store = ScriptedStore::new(&log).then_ok("ar://img").then_ok("ar://meta");
    let ledger = ScriptedLedger::new(&log).then_created("ADDR");
    let record = r#"{"name":"Pricey","seller_fee_basis_points":10001,"properties":{"files":[{"uri":""}]}}"#;
    let input = PipelineInput::inline("p.png", b"PNG".to_vec(), "p.json", record);

    let failure = pipeline(store, ledger).run(input).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Minting);
    assert!(matches!(failure.error, PipelineError::RegistryRejected(_)));
    assert_eq!(log.create_count(), 0);
}

#[tokio::test]
async fn fee_beyond_integer_range_rejected_at_minting() {
    for fee in ["18446744073709551615", "-9223372036854775808", "2.5"] {
        let log = CallLog::new();
        let store = ScriptedStore::new(&log).then_ok("ar://img").then_ok("ar://meta");
        let ledger = ScriptedLedger::new(&log).then_created("ADDR");
        let record = format!(
            r#"{{"name":"Huge","seller_fee_basis_points":{fee},"properties":{{"files":[{{"uri":""}}]}}}}"#
        );
        let input = PipelineInput::inline("h.png", b"PNG".to_vec(), "h.json", record);

        let failure = pipeline(store, ledger).run(input).await.unwrap_err();

        assert_eq!(failure.stage, Stage::Minting, "fee {fee}");
        assert!(matches!(failure.error, PipelineError::RegistryRejected(_)), "fee {fee}");
        assert_eq!(log.create_count(), 0);
    }
}

#[tokio::test]
async fn record_symbol_and_fee_reach_ledger() {
    let log = CallLog::new();
    let store = ScriptedStore::new(&log).then_ok("ar://img").then_ok("ar://meta");
    let ledger = ScriptedLedger::new(&log).then_created("ADDR").then_verified();
    let record = r#"{"name":"Signed","symbol":"SIG","seller_fee_basis_points":10000,"properties":{"files":[{"uri":"x"}]}}"#;
    let input = PipelineInput::inline("s.png", b"PNG".to_vec(), "s.json", record);

    pipeline(store, ledger).run(input).await.unwrap();

    let request = log
        .calls()
        .into_iter()
        .find_map(|call| match call {
            Call::CreateEntry(request) => Some(request),
            _ => None,
        })
        .unwrap();
    assert_eq!(request.symbol, "SIG");
    assert_eq!(request.seller_fee_basis_points, 10_000);
}

#[tokio::test]
async fn runs_from_files_use_basenames() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("7.jpg");
    let metadata = dir.path().join("7.json");
    std::fs::write(&image, b"JPEGDATA").unwrap();
    std::fs::write(&metadata, mintflow_test_utils::record_json("Item #7")).unwrap();

    let log = CallLog::new();
    let store = ScriptedStore::new(&log).then_ok("ar://img7").then_ok("ar://meta7");
    let ledger = ScriptedLedger::new(&log).then_created("ADDR7").then_verified();

    let outcome = pipeline(store, ledger)
        .run(PipelineInput::from_paths(&image, &metadata))
        .await
        .unwrap();

    assert_eq!(outcome.address().as_str(), "ADDR7");
    assert_eq!(log.upload_names(), vec!["7.jpg", "7.json"]);
}

#[tokio::test]
async fn concurrent_runs_are_independent() {
    let log = CallLog::new();
    let store = ScriptedStore::new(&log)
        .then_ok("ar://a")
        .then_ok("ar://b")
        .then_ok("ar://c")
        .then_ok("ar://d");
    let ledger = ScriptedLedger::new(&log)
        .then_created("ADDR-1")
        .then_created("ADDR-2")
        .then_verified()
        .then_verified();
    let pipeline = pipeline(store, ledger);

    let (first, second) = tokio::join!(pipeline.run(item_input(1)), pipeline.run(item_input(2)));
    let first = first.unwrap();
    let second = second.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_ne!(first.address(), second.address());
    assert_eq!(log.create_count(), 2);
}
