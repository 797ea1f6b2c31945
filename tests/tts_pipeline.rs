use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ich_agent_pipeline::error::{AppError, AppResult, SpeechError};
use ich_agent_pipeline::models::record::RecordStatus;
use ich_agent_pipeline::services::speech::{SpeechEngine, SpeechRequest};
use ich_agent_pipeline::workflow::speech_flow::MISSING_CONTENT;
use ich_agent_pipeline::{TtsConfig, TtsRunner};

/// 记录调用次数的测试引擎，成功时写出一个假的 wav
#[derive(Clone, Default)]
struct FakeEngine {
    calls: Arc<AtomicUsize>,
    texts: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl FakeEngine {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    async fn synthesize(&self, request: &SpeechRequest<'_>) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(request.text.to_string());
        if self.fail {
            return Err(SpeechError::CommandFailed {
                program: "fake".into(),
                status: "exit status: 1".into(),
                stderr: "engine crashed".into(),
            }
            .into());
        }
        fs::write(request.out_path, b"RIFF").unwrap();
        Ok(())
    }
}

struct Fixture {
    dir: tempfile::TempDir,
    input: PathBuf,
    out: PathBuf,
    speaker: PathBuf,
}

fn fixture(items: Value) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("patient_results.json");
    fs::write(&input, serde_json::to_string(&items).unwrap()).unwrap();
    let speaker = dir.path().join("speaker.wav");
    fs::write(&speaker, b"RIFF").unwrap();
    let out = dir.path().join("gen_audio_data");
    Fixture {
        dir,
        input,
        out,
        speaker,
    }
}

fn config(fx: &Fixture, extra: &[&str]) -> TtsConfig {
    let mut args = vec![
        "tts_batch".to_string(),
        "--input-json".to_string(),
        fx.input.display().to_string(),
        "--output-dir".to_string(),
        fx.out.display().to_string(),
        "--speaker-wav".to_string(),
        fx.speaker.display().to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    TtsConfig::parse_from(args).normalized()
}

fn wav_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "wav"))
                .count()
        })
        .unwrap_or(0)
}

fn three_items() -> Value {
    json!([
        {"content": "Your ICH volume is 20 mL."},
        {"content": "Blood pressure 150/90 mmHg."},
        {"content": "Please rest."},
    ])
}

#[tokio::test]
async fn synthesizes_every_item_with_normalized_text() {
    let fx = fixture(three_items());
    let engine = FakeEngine::default();

    let report = TtsRunner::new(config(&fx, &[]))
        .with_engine(Box::new(engine.clone()))
        .run()
        .await
        .expect("批处理失败");

    assert_eq!(report.successes, 3);
    assert_eq!(engine.calls(), 3);
    assert_eq!(wav_count(&fx.out), 3);
    assert_eq!(report.records[0].output.as_deref(), Some("001.wav"));

    let texts = engine.texts.lock().unwrap();
    assert_eq!(texts[0], "Your intracerebral hemorrhage volume is 20 milliliters.");
    assert!(texts[1].contains("a systolic blood pressure of 150 millimeters of mercury"));
}

#[tokio::test]
async fn dry_run_skips_synthesis_but_keeps_sidecars() {
    let fx = fixture(three_items());
    let engine = FakeEngine::default();

    let report = TtsRunner::new(config(&fx, &["--dry-run", "--write-metadata"]))
        .with_engine(Box::new(engine.clone()))
        .run()
        .await
        .expect("演练失败");

    assert_eq!(engine.calls(), 0);
    assert_eq!(wav_count(&fx.out), 0);
    let meta: Value = serde_json::from_str(&fs::read_to_string(fx.out.join("001.json")).unwrap()).unwrap();
    assert_eq!(meta["filename"], "001.wav");
    assert_eq!(meta["cleaned_content"], "Your intracerebral hemorrhage volume is 20 milliliters.");
    assert_eq!(report.records.len(), 3);
    assert!(report.records.iter().all(|r| r.status == RecordStatus::DryRun));
    assert_eq!(report.successes, 3);
}

#[tokio::test]
async fn resume_skips_existing_wav_files() {
    let fx = fixture(json!([{"content": "first"}, {"content": "second"}]));
    fs::create_dir_all(&fx.out).unwrap();
    fs::write(fx.out.join("001.wav"), b"old").unwrap();
    let engine = FakeEngine::default();

    let report = TtsRunner::new(config(&fx, &["--resume"]))
        .with_engine(Box::new(engine.clone()))
        .run()
        .await
        .unwrap();

    assert_eq!(engine.calls(), 1);
    assert_eq!(report.records[0].status, RecordStatus::Skipped);
    assert_eq!(report.records[1].status, RecordStatus::Succeeded);
    // 已存在的文件保持原样
    assert_eq!(fs::read(fx.out.join("001.wav")).unwrap(), b"old");
}

#[tokio::test]
async fn missing_content_is_recorded_as_failure_without_synthesis() {
    let fx = fixture(json!([{"content": "   "}, {"title": "no content"}, {"content": "ok"}]));
    let engine = FakeEngine::default();
    let results = fx.dir.path().join("tts_results.json");

    let report = TtsRunner::new(config(&fx, &["--results-json", results.to_str().unwrap()]))
        .with_engine(Box::new(engine.clone()))
        .run()
        .await
        .unwrap();

    assert_eq!(engine.calls(), 1);
    assert_eq!(report.failures, 2);
    assert_eq!(report.records[0].error.as_deref(), Some(MISSING_CONTENT));
    assert_eq!(report.records[1].error.as_deref(), Some(MISSING_CONTENT));

    let saved: Value = serde_json::from_str(&fs::read_to_string(&results).unwrap()).unwrap();
    assert_eq!(saved.as_array().unwrap().len(), 3);
    assert_eq!(saved[2]["status"], "succeeded");
}

#[tokio::test]
async fn failure_limit_aborts_remaining_items() {
    let fx = fixture(json!([
        {"content": "a"}, {"content": "b"}, {"content": "c"}, {"content": "d"}
    ]));
    let engine = FakeEngine::failing();
    let hooks = fx.dir.path().join("hooks.jsonl");

    let report = TtsRunner::new(config(
        &fx,
        &["--max-failures", "2", "--hooks-log", hooks.to_str().unwrap()],
    ))
    .with_engine(Box::new(engine.clone()))
    .run()
    .await
    .unwrap();

    assert!(report.aborted);
    assert_eq!(engine.calls(), 2);
    assert_eq!(report.records.len(), 2);
    assert!(report.records[0].error.as_deref().unwrap().contains("engine crashed"));

    let failures = fs::read_to_string(&hooks)
        .unwrap()
        .lines()
        .filter(|line| line.contains("\"item_failure\""))
        .count();
    assert_eq!(failures, 2);
}

#[tokio::test]
async fn missing_speaker_wav_stops_before_any_item() {
    let fx = fixture(three_items());
    fs::remove_file(&fx.speaker).unwrap();
    let engine = FakeEngine::default();

    let result = TtsRunner::new(config(&fx, &[]))
        .with_engine(Box::new(engine.clone()))
        .run()
        .await;

    assert!(matches!(
        result,
        Err(AppError::Speech(SpeechError::SpeakerWavMissing { .. }))
    ));
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn filename_field_and_metadata_sidecar() {
    let fx = fixture(json!([
        {"content": "ICH (left basal ganglia) stable.", "name": "Zhang San: case/01"},
        {"content": "second"},
    ]));
    let engine = FakeEngine::default();

    let report = TtsRunner::new(config(&fx, &["--filename-field", "name", "--write-metadata", "--limit", "1"]))
        .with_engine(Box::new(engine.clone()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.records.len(), 1);
    let stem = "Zhang_San__case_01";
    assert!(fx.out.join(format!("{}.wav", stem)).exists());

    let meta: Value =
        serde_json::from_str(&fs::read_to_string(fx.out.join(format!("{}.json", stem))).unwrap()).unwrap();
    assert_eq!(meta["engine"], "fake");
    assert_eq!(meta["filename"], format!("{}.wav", stem));
    assert_eq!(meta["original_content"], "ICH (left basal ganglia) stable.");
    assert_eq!(meta["cleaned_content"], "intracerebral hemorrhage stable.");
}

#[tokio::test]
async fn http_engine_preprocesses_once_and_writes_returned_audio() {
    let server = MockServer::start().await;
    let fx = fixture(json!([{"content": "ICH is stable."}, {"content": "Rest well."}]));
    let speaker = fx.speaker.display().to_string();

    Mock::given(method("POST"))
        .and(path("/v1/preprocess_and_tran"))
        .and(body_partial_json(json!({"format": "wav", "reference_audio": speaker, "lang": "en"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "asr_format_audio_url": "http://voice/ref_asr.wav",
            "reference_audio_text": "reference words"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/invoke"))
        .and(body_partial_json(json!({
            "format": "wav",
            "reference_audio": "http://voice/ref_asr.wav",
            "reference_text": "reference words",
            "streaming": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF-cloned".to_vec()))
        .expect(2)
        .mount(&server)
        .await;

    let report = TtsRunner::new(config(&fx, &["--engine", "http", "--voice-base-url", server.uri().as_str()]))
        .run()
        .await
        .expect("http 引擎批处理失败");

    assert_eq!(report.successes, 2);
    assert_eq!(fs::read(fx.out.join("001.wav")).unwrap(), b"RIFF-cloned");
    assert_eq!(fs::read(fx.out.join("002.wav")).unwrap(), b"RIFF-cloned");

    let invokes: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/v1/invoke")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(invokes[0]["speaker"], "001");
    assert_eq!(invokes[0]["text"], "intracerebral hemorrhage is stable.");
}

#[tokio::test]
async fn http_engine_preprocess_failure_aborts_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/preprocess_and_tran"))
        .respond_with(ResponseTemplate::new(500).set_body_string("no gpu"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/invoke"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fx = fixture(three_items());
    let result = TtsRunner::new(config(&fx, &["--engine", "http", "--voice-base-url", server.uri().as_str()]))
        .run()
        .await;

    match result {
        Err(AppError::Speech(SpeechError::EngineInit { engine, reason })) => {
            assert_eq!(engine, "http");
            assert!(reason.contains("500"), "错误信息应包含状态码: {reason}");
        }
        other => panic!("预期引擎初始化失败，实际: {:?}", other.map(|r| r.records.len())),
    }
    assert_eq!(wav_count(&fx.out), 0);
}
