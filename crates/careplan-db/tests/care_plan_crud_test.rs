//! Integration tests for patient and care plan queries.
//!
//! Each test runs against its own migrated database on a shared PostgreSQL
//! server (see `careplan-test-utils`). Docker or `CAREPLAN_TEST_PG_URL` is
//! required.

use chrono::NaiveDate;
use sqlx::PgPool;

use careplan_db::models::{
    AdlLevel, AdlRatings, CarePlanUpdate, CareLevel, Gender, InsuranceType, NewCarePlan,
    NewPatient, PatientUpdate, Period, PlanStatus, VisitType,
};
use careplan_db::queries::{care_plans, patients};
use careplan_test_utils::{create_test_db, drop_test_db};

fn sample_patient(name: &str) -> NewPatient {
    NewPatient {
        name: name.to_owned(),
        gender: Gender::Male,
        birthdate: NaiveDate::from_ymd_opt(1945, 5, 15).unwrap(),
        address: "東京都新宿区西新宿1-1-1".into(),
        phone: Some("03-1234-5678".into()),
        emergency_contact: None,
        medical_history: Some("高血圧".into()),
        primary_doctor: None,
        insurance_type: InsuranceType::LongTermCare,
        care_level: CareLevel::Care2,
        user_id: "12345".into(),
    }
}

fn sample_plan(patient_id: uuid::Uuid, period: Period) -> NewCarePlan {
    NewCarePlan {
        patient_id,
        user_id: "12345".into(),
        visit_type: VisitType::Both,
        health_status: Some("血圧不安定".into()),
        adl: AdlRatings {
            mobility: AdlLevel::Partial,
            ..Default::default()
        },
        patient_family_request: None,
        doctor_instructions: None,
        staff_notes: None,
        goals: vec!["血圧の安定".into()],
        issues: vec!["服薬管理".into()],
        supports: vec!["バイタル測定".into()],
        status: PlanStatus::Completed,
        period,
    }
}

async fn with_db<F, Fut>(f: F)
where
    F: FnOnce(PgPool) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let (pool, db_name) = create_test_db().await;
    f(pool.clone()).await;
    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn patient_insert_update_delete() {
    with_db(|pool| async move {
        let created = patients::insert_patient(&pool, &sample_patient("鈴木 一郎"))
            .await
            .unwrap();
        assert_eq!(created.care_level, CareLevel::Care2);
        assert_eq!(created.gender, Gender::Male);

        let update = PatientUpdate {
            phone: Some(String::new()),
            care_level: Some(CareLevel::Care3),
            ..Default::default()
        };
        let updated = patients::update_patient(&pool, created.id, &update)
            .await
            .unwrap()
            .expect("patient exists");
        assert_eq!(updated.phone, None);
        assert_eq!(updated.care_level, CareLevel::Care3);

        assert!(patients::delete_patient(&pool, created.id).await.unwrap());
        assert!(!patients::delete_patient(&pool, created.id).await.unwrap());
        assert!(patients::get_patient(&pool, created.id).await.unwrap().is_none());
    })
    .await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn plans_list_newest_period_first() {
    with_db(|pool| async move {
        let patient = patients::insert_patient(&pool, &sample_patient("田中 花子"))
            .await
            .unwrap();
        for (month, year) in [(2, 2025), (12, 2024), (3, 2025)] {
            let period = Period::new(month, year).unwrap();
            care_plans::insert_care_plan(&pool, &sample_plan(patient.id, period))
                .await
                .unwrap();
        }

        let listed = care_plans::list_care_plans_for_patient(&pool, patient.id)
            .await
            .unwrap();
        let periods: Vec<_> = listed.iter().map(|p| p.period()).collect();
        assert_eq!(
            periods,
            vec![
                Period::new(3, 2025).unwrap(),
                Period::new(2, 2025).unwrap(),
                Period::new(12, 2024).unwrap(),
            ]
        );
        assert_eq!(listed[0].adl_mobility, AdlLevel::Partial);
        assert_eq!(listed[0].goals, vec!["血圧の安定".to_string()]);
    })
    .await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn duplicate_period_is_tolerated_and_latest_update_wins() {
    with_db(|pool| async move {
        let patient = patients::insert_patient(&pool, &sample_patient("佐藤 健太"))
            .await
            .unwrap();
        let period = Period::new(4, 2025).unwrap();
        let first = care_plans::insert_care_plan(&pool, &sample_plan(patient.id, period))
            .await
            .unwrap();
        let second = care_plans::insert_care_plan(&pool, &sample_plan(patient.id, period))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);

        let touched = care_plans::update_care_plan(
            &pool,
            first.id,
            &CarePlanUpdate {
                staff_notes: Some("再訪問".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .expect("plan exists");
        assert!(touched.updated_at >= touched.created_at);

        let found = care_plans::find_care_plan_by_period(&pool, patient.id, period)
            .await
            .unwrap()
            .expect("a plan for the period");
        assert_eq!(found.id, first.id);
        assert_eq!(found.staff_notes.as_deref(), Some("再訪問"));
    })
    .await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn deleting_patient_cascades_to_plans() {
    with_db(|pool| async move {
        let patient = patients::insert_patient(&pool, &sample_patient("鈴木 一郎"))
            .await
            .unwrap();
        let plan = care_plans::insert_care_plan(
            &pool,
            &sample_plan(patient.id, Period::new(3, 2025).unwrap()),
        )
        .await
        .unwrap();

        patients::delete_patient(&pool, patient.id).await.unwrap();
        assert!(care_plans::get_care_plan(&pool, plan.id).await.unwrap().is_none());
    })
    .await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn missing_rows_yield_none() {
    with_db(|pool| async move {
        let id = uuid::Uuid::new_v4();
        assert!(care_plans::get_care_plan(&pool, id).await.unwrap().is_none());
        assert!(
            care_plans::update_care_plan(&pool, id, &CarePlanUpdate::default())
                .await
                .unwrap()
                .is_none()
        );
        assert!(!care_plans::delete_care_plan(&pool, id).await.unwrap());
    })
    .await;
}
