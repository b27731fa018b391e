//! Prompt construction for draft generation.

use std::fmt::Write;

use chrono::NaiveDate;

use careplan_db::models::Patient;

use super::Assessment;

const NO_INFO: &str = "情報なし";

fn or_no_info(value: Option<&str>) -> &str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(NO_INFO)
}

/// Build the generation prompt for `patient` and `assessment`. Age is
/// computed as of `today`; absent fields read as "情報なし".
pub fn build_prompt(patient: &Patient, assessment: &Assessment, today: NaiveDate) -> String {
    let mut p = String::with_capacity(1024);

    p.push_str(
        "あなたは訪問看護計画書を作成する専門家です。\
         以下の患者情報と基本情報から、適切な訪問看護計画書を作成してください。\n\n",
    );

    p.push_str("## 患者情報\n");
    let _ = writeln!(p, "- 氏名: {}", patient.name);
    let _ = writeln!(p, "- 年齢: {}歳", patient.age_on(today));
    let _ = writeln!(p, "- 性別: {}", patient.gender.label());
    let _ = writeln!(p, "- 住所: {}", patient.address);
    let _ = writeln!(
        p,
        "- 主治医・医療機関: {}",
        or_no_info(patient.primary_doctor.as_deref())
    );
    let _ = writeln!(p, "- 既往歴: {}", or_no_info(patient.medical_history.as_deref()));
    let _ = writeln!(p, "- 保険種別: {}", patient.insurance_type.label());
    let _ = writeln!(p, "- 要介護度: {}", patient.care_level.label());
    p.push('\n');

    let adl = &assessment.adl;
    p.push_str("## 基本情報\n");
    let _ = writeln!(p, "- 健康状態: {}", or_no_info(assessment.health_status.as_deref()));
    let _ = writeln!(p, "- 移動ADL: {}", adl.mobility.label());
    let _ = writeln!(p, "- 食事ADL: {}", adl.eating.label());
    let _ = writeln!(p, "- トイレADL: {}", adl.toilet.label());
    let _ = writeln!(p, "- 入浴ADL: {}", adl.bathing.label());
    let _ = writeln!(
        p,
        "- 本人・家族の要望: {}",
        or_no_info(assessment.patient_family_request.as_deref())
    );
    let _ = writeln!(
        p,
        "- 医師の指示: {}",
        or_no_info(assessment.doctor_instructions.as_deref())
    );
    let _ = writeln!(p, "- スタッフ所見: {}", or_no_info(assessment.staff_notes.as_deref()));
    p.push('\n');

    p.push_str(
        "## 出力形式\n\
         以下の形式でJSON形式で出力してください。\n\
         {\n  \
           \"goals\": [\"目標1\", \"目標2\", \"目標3\"],\n  \
           \"issues\": [\"問題点1\", \"問題点2\", \"問題点3\"],\n  \
           \"supports\": [\"支援内容1\", \"支援内容2\", \"支援内容3\"]\n\
         }\n\n\
         目標、問題点、支援内容はそれぞれ3〜5項目程度で、\
         具体的かつ患者の状態に合わせた内容にしてください。\n",
    );

    p
}
