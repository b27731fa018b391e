//! Demo patients and plans.
//!
//! Served in offline mode and substituted whenever the backend fails. IDs are
//! fixed so fallback lookups by id stay stable across runs.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use careplan_db::models::{
    AdlLevel, CarePlan, CareLevel, Gender, InsuranceType, Patient, Period, PlanStatus, VisitType,
};

use crate::store::{latest_in_period, newest_first};

/// Staff account that owns all demo records.
pub const DEMO_USER_ID: &str = "12345";

/// Id of the `n`th demo patient (1-based).
pub fn patient_id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// Id of a demo plan (101-based).
pub fn plan_id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    date(y, m, d)
        .and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or_default()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

pub fn patients() -> Vec<Patient> {
    vec![
        Patient {
            id: patient_id(1),
            name: "鈴木 一郎".into(),
            gender: Gender::Male,
            birthdate: date(1945, 5, 15),
            address: "東京都新宿区西新宿1-1-1".into(),
            phone: Some("03-1234-5678".into()),
            emergency_contact: Some("鈴木花子（娘）090-1234-5678".into()),
            medical_history: Some("高血圧、糖尿病、脳梗塞後遺症".into()),
            primary_doctor: Some("佐藤医師・東京中央病院".into()),
            insurance_type: InsuranceType::LongTermCare,
            care_level: CareLevel::Care2,
            user_id: DEMO_USER_ID.into(),
            created_at: midnight(2025, 1, 15),
        },
        Patient {
            id: patient_id(2),
            name: "田中 花子".into(),
            gender: Gender::Female,
            birthdate: date(1950, 10, 20),
            address: "東京都渋谷区渋谷2-2-2".into(),
            phone: Some("03-2345-6789".into()),
            emergency_contact: Some("田中太郎（息子）090-2345-6789".into()),
            medical_history: Some("関節リウマチ、骨粗鬆症".into()),
            primary_doctor: Some("高橋医師・渋谷総合病院".into()),
            insurance_type: InsuranceType::LongTermCare,
            care_level: CareLevel::Care1,
            user_id: DEMO_USER_ID.into(),
            created_at: midnight(2025, 2, 1),
        },
        Patient {
            id: patient_id(3),
            name: "佐藤 健太".into(),
            gender: Gender::Male,
            birthdate: date(1940, 3, 10),
            address: "東京都品川区大崎3-3-3".into(),
            phone: Some("03-3456-7890".into()),
            emergency_contact: Some("佐藤美香（妻）03-3456-7890".into()),
            medical_history: Some("パーキンソン病、心不全".into()),
            primary_doctor: Some("伊藤医師・品川医療センター".into()),
            insurance_type: InsuranceType::LongTermCare,
            care_level: CareLevel::Care3,
            user_id: DEMO_USER_ID.into(),
            created_at: midnight(2025, 2, 15),
        },
    ]
}

pub fn care_plans() -> Vec<CarePlan> {
    vec![
        CarePlan {
            id: plan_id(101),
            patient_id: patient_id(1),
            user_id: DEMO_USER_ID.into(),
            visit_type: VisitType::Both,
            health_status: Some("高血圧症状あり。血圧140-160/90前後で推移。".into()),
            adl_mobility: AdlLevel::Partial,
            adl_eating: AdlLevel::Independent,
            adl_toilet: AdlLevel::Supervision,
            adl_bathing: AdlLevel::Partial,
            patient_family_request: Some("自宅での生活を継続したい。".into()),
            doctor_instructions: Some("血圧管理と転倒予防に注意。".into()),
            staff_notes: Some("認知機能の低下傾向がみられる。".into()),
            goals: strings(&["血圧を安定させる", "室内歩行の安定", "服薬管理の自立"]),
            issues: strings(&["高血圧", "転倒リスク", "服薬管理"]),
            supports: strings(&["血圧測定と記録", "歩行訓練", "服薬カレンダーの活用"]),
            status: PlanStatus::Completed,
            month: 3,
            year: 2025,
            created_at: midnight(2025, 3, 1),
            updated_at: midnight(2025, 3, 1),
        },
        CarePlan {
            id: plan_id(102),
            patient_id: patient_id(2),
            user_id: DEMO_USER_ID.into(),
            visit_type: VisitType::Nurse,
            health_status: Some("関節痛あり。疼痛コントロール良好。".into()),
            adl_mobility: AdlLevel::Supervision,
            adl_eating: AdlLevel::Independent,
            adl_toilet: AdlLevel::Independent,
            adl_bathing: AdlLevel::Partial,
            patient_family_request: Some("痛みなく日常生活を送りたい。".into()),
            doctor_instructions: Some("疼痛管理と関節可動域の維持。".into()),
            staff_notes: Some("家族の介護負担が大きい。".into()),
            goals: strings(&["疼痛コントロール", "関節可動域の維持", "家族の介護負担軽減"]),
            issues: strings(&["関節痛", "活動性低下", "家族の介護負担"]),
            supports: strings(&["疼痛評価と管理", "関節運動の実施", "家族への介護指導"]),
            status: PlanStatus::Completed,
            month: 3,
            year: 2025,
            created_at: midnight(2025, 3, 5),
            updated_at: midnight(2025, 3, 5),
        },
        CarePlan {
            id: plan_id(103),
            patient_id: patient_id(3),
            user_id: DEMO_USER_ID.into(),
            visit_type: VisitType::Both,
            health_status: Some("パーキンソン症状進行中。歩行困難。".into()),
            adl_mobility: AdlLevel::Complete,
            adl_eating: AdlLevel::Partial,
            adl_toilet: AdlLevel::Complete,
            adl_bathing: AdlLevel::Complete,
            patient_family_request: Some("安全に生活したい。".into()),
            doctor_instructions: Some("嚥下機能評価と誤嚥予防。".into()),
            staff_notes: Some("栄養状態に注意が必要。".into()),
            goals: strings(&["安全な食事摂取", "褥瘡予防", "栄養状態の改善"]),
            issues: strings(&["嚥下機能低下", "褥瘡リスク", "低栄養"]),
            supports: strings(&["食事姿勢と食形態の調整", "体位変換と皮膚観察", "栄養評価と指導"]),
            status: PlanStatus::Completed,
            month: 2,
            year: 2025,
            created_at: midnight(2025, 2, 10),
            updated_at: midnight(2025, 2, 10),
        },
    ]
}

pub fn patient(id: Uuid) -> Option<Patient> {
    patients().into_iter().find(|p| p.id == id)
}

pub fn care_plan(id: Uuid) -> Option<CarePlan> {
    care_plans().into_iter().find(|p| p.id == id)
}

/// A demo patient's plans, newest period first.
pub fn plans_for_patient(patient_id: Uuid) -> Vec<CarePlan> {
    let mut plans: Vec<CarePlan> = care_plans()
        .into_iter()
        .filter(|p| p.patient_id == patient_id)
        .collect();
    plans.sort_by(newest_first);
    plans
}

pub fn plan_for_period(patient_id: Uuid, period: Period) -> Option<CarePlan> {
    latest_in_period(&care_plans(), patient_id, period).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_plan_references_a_demo_patient() {
        let ids: Vec<Uuid> = patients().iter().map(|p| p.id).collect();
        for plan in care_plans() {
            assert!(ids.contains(&plan.patient_id), "orphan plan {}", plan.id);
        }
    }

    #[test]
    fn lookups() {
        let suzuki = patient(patient_id(1)).unwrap();
        assert_eq!(suzuki.name, "鈴木 一郎");
        assert_eq!(suzuki.care_level, CareLevel::Care2);

        let march = Period::new(3, 2025).unwrap();
        assert_eq!(plan_for_period(patient_id(1), march).map(|p| p.id), Some(plan_id(101)));
        assert!(plan_for_period(patient_id(3), march).is_none());
        assert_eq!(plans_for_patient(patient_id(3)).len(), 1);
        assert!(care_plan(Uuid::new_v4()).is_none());
    }
}
