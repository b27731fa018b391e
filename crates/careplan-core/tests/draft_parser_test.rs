//! Draft parsing and fallback behaviour seen from the generator.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use careplan_core::draft::{
    Assessment, DraftGenerator, DraftOrigin, GenerationError, ParseStage, TextGenerator,
    fallback_content, parse_draft,
};
use careplan_core::fixtures;

struct Canned(String);

#[async_trait]
impl TextGenerator for Canned {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Ok(self.0.clone())
    }
}

struct Failing;

#[async_trait]
impl TextGenerator for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Connection("http://127.0.0.1:1".into()))
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

#[tokio::test]
async fn well_formed_json_is_returned_unmodified() {
    let body = r#"ご提案します。
{"goals":["血圧を安定させる","転倒しない"],"issues":["高血圧"],"supports":["毎日の血圧測定","手すりの設置","服薬確認"]}
以上です。"#;
    let generator = DraftGenerator::new(Arc::new(Canned(body.into())));
    let patient = fixtures::patient(fixtures::patient_id(1)).unwrap();

    let parsed = generator
        .try_generate(&patient, &Assessment::default(), today())
        .await
        .unwrap();
    assert_eq!(parsed.stage, ParseStage::Json);
    assert_eq!(parsed.content.goals, vec!["血圧を安定させる", "転倒しない"]);
    assert_eq!(parsed.content.issues, vec!["高血圧"]);
    assert_eq!(
        parsed.content.supports,
        vec!["毎日の血圧測定", "手すりの設置", "服薬確認"]
    );
}

#[test]
fn missing_section_gets_placeholders_and_others_parse() {
    let text = "\
目標:
- 血圧の安定
- 室内歩行の自立

支援内容:
1. 血圧測定
2. 歩行訓練
";
    let parsed = parse_draft(text).unwrap();
    assert_eq!(parsed.stage, ParseStage::Heuristic);
    assert_eq!(parsed.content.goals, vec!["血圧の安定", "室内歩行の自立"]);
    assert_eq!(parsed.content.supports, vec!["血圧測定", "歩行訓練"]);
    assert_eq!(parsed.content.issues, vec!["問題点1", "問題点2", "問題点3"]);
}

#[test]
fn numbered_headings_keep_their_bullets() {
    let text = "1. 目標\n- 血圧を安定させる\n- 転倒を防ぐ\n2. 問題点\n- 高血圧\n3. 支援内容\n- バイタル測定";
    let parsed = parse_draft(text).unwrap();
    assert_eq!(parsed.stage, ParseStage::Heuristic);
    assert_eq!(parsed.content.goals, vec!["血圧を安定させる", "転倒を防ぐ"]);
    assert_eq!(parsed.content.issues, vec!["高血圧"]);
    assert_eq!(parsed.content.supports, vec!["バイタル測定"]);
}

#[tokio::test]
async fn bullets_without_headings_are_kept_for_every_section() {
    let body = "提案:\n- 血圧を毎日測定する\n- 室内の段差をなくす\n- 服薬カレンダーを使う\n";
    let generator = DraftGenerator::new(Arc::new(Canned(body.into())));
    let patient = fixtures::patient(fixtures::patient_id(1)).unwrap();

    let outcome = generator.generate(&patient, &Assessment::default()).await;
    assert_eq!(outcome.origin, DraftOrigin::Parsed(ParseStage::Heuristic));
    let expected = vec!["血圧を毎日測定する", "室内の段差をなくす", "服薬カレンダーを使う"];
    assert_eq!(outcome.content.goals, expected);
    assert_eq!(outcome.content.issues, expected);
    assert_eq!(outcome.content.supports, expected);
}

#[tokio::test]
async fn service_failure_yields_fixed_fallback() {
    let generator = DraftGenerator::new(Arc::new(Failing));
    let patient = fixtures::patient(fixtures::patient_id(2)).unwrap();

    let first = generator.generate(&patient, &Assessment::default()).await;
    let second = generator.generate(&patient, &Assessment::default()).await;

    assert_eq!(first.origin, DraftOrigin::Fallback);
    assert_eq!(first.content, fallback_content());
    assert_eq!(first.content, second.content);
    assert_eq!(first.content.goals.len(), 3);
    assert_eq!(first.content.issues.len(), 3);
    assert_eq!(first.content.supports.len(), 3);
}
