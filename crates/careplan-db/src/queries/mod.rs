pub mod care_plans;
pub mod patients;
