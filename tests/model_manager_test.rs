use lensclass::{
    ClassificationEngine, ClassifierOptions, EngineError, ModelDescriptor, ModelError, ModelManager,
    OnnxEngine, RunMode, RuntimeConfig,
};

const REMOTE: &str = "https://github.com/onnx/models/raw/main/mobilenetv2-12.onnx";

#[test]
fn test_cached_remote_asset_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let cache = tempfile::tempdir()?;
    let manager = ModelManager::new(cache.path(), cache.path())?;

    // Seed the cache so nothing touches the network
    let cached = manager.get_cached_path(REMOTE);
    assert!(cached.ends_with("mobilenetv2-12.onnx"));
    std::fs::create_dir_all(cached.parent().unwrap())?;
    std::fs::write(&cached, b"weights")?;

    assert!(manager.is_cached(REMOTE));
    assert_eq!(tokio_test::block_on(manager.resolve(REMOTE, None))?, cached);

    manager.remove_cached(REMOTE)?;
    assert!(!manager.is_cached(REMOTE));
    // Removing twice is fine
    manager.remove_cached(REMOTE)?;
    Ok(())
}

#[test]
fn test_hash_mismatch_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let cache = tempfile::tempdir()?;
    let manager = ModelManager::new(cache.path().join("cache"), cache.path())?;
    let path = cache.path().join("model.onnx");
    std::fs::write(&path, b"abc")?;

    let sha_abc = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    assert!(manager.verify_file(&path, sha_abc)?);
    manager.require_hash(&path, &sha_abc.to_uppercase())?;

    let err = manager.require_hash(&path, "00").unwrap_err();
    assert!(matches!(err, ModelError::HashMismatch { ref actual, .. } if actual == sha_abc));
    Ok(())
}

#[tokio::test]
async fn test_engine_reports_missing_assets() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let manager = ModelManager::new(dir.path().join("cache"), dir.path())?;
    let engine = OnnxEngine::new(RuntimeConfig::default(), manager);

    let descriptor = ModelDescriptor::new("X-Ray", "models/missing.onnx");
    let result = engine
        .create_classifier(&descriptor, RunMode::Image, ClassifierOptions::default())
        .await;
    match result {
        Err(EngineError::ModelError(message)) => assert!(message.contains("missing.onnx")),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("a missing model must not build"),
    }
    Ok(())
}

#[tokio::test]
async fn test_engine_rejects_model_with_wrong_digest() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("tampered.onnx"), b"not the published weights")?;
    let manager = ModelManager::new(dir.path().join("cache"), dir.path())?;
    let engine = OnnxEngine::new(RuntimeConfig::default(), manager);

    let descriptor = ModelDescriptor::new("X-Ray", "tampered.onnx")
        .with_sha256("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    let result = engine
        .create_classifier(&descriptor, RunMode::Image, ClassifierOptions::default())
        .await;
    match result {
        Err(EngineError::ModelError(message)) => assert!(message.contains("Hash mismatch")),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("a model with the wrong digest must not build"),
    }
    Ok(())
}
