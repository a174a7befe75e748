use ferrous_plan::{
    ApplyPolicy, AssemblyPreset, CandidateSet, CandidateType, Lifetime, PlanApplier, PlanContext, PlanError, Planner,
    PlannerConfig,
};
use serial_test::serial;

const VARS: [&str; 5] = [
    "FPTEST_TREAT_WARNINGS_AS_FATAL",
    "FPTEST_STRICT_DISPOSABLE_CHECK",
    "FPTEST_ASSEMBLY_FIRST",
    "FPTEST_ASSEMBLY_LAST",
    "FPTEST_ASSEMBLY_PRESET",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    clear_env();
    std::env::set_var("FPTEST_TREAT_WARNINGS_AS_FATAL", "true");
    std::env::set_var("FPTEST_ASSEMBLY_LAST", "Legacy,Compat");
    std::env::set_var("FPTEST_ASSEMBLY_PRESET", "tests-last");

    let config = PlannerConfig::default().with_env_overrides("fptest").unwrap();
    clear_env();

    assert!(config.treat_warnings_as_fatal);
    assert!(config.strict_disposable_check);
    assert_eq!(config.assembly_order.last, ["Legacy", "Compat"]);
    assert_eq!(config.assembly_order.preset, AssemblyPreset::TestsLast);
}

#[test]
#[serial]
fn invalid_environment_value_is_rejected() {
    clear_env();
    std::env::set_var("FPTEST_ASSEMBLY_PRESET", "newest-first");
    let result = PlannerConfig::default().with_env_overrides("fptest");
    clear_env();
    assert!(matches!(result, Err(PlanError::Config(_))));
}

#[test]
#[serial]
fn fatal_warnings_policy_comes_from_config() {
    clear_env();
    std::env::set_var("FPTEST_TREAT_WARNINGS_AS_FATAL", "1");
    let config = PlannerConfig::default().with_env_overrides("fptest").unwrap();
    clear_env();

    let candidates: CandidateSet = vec![
        CandidateType::class("App.Cache").lifetime(Lifetime::Singleton).ctor(["App.Session"]),
        CandidateType::class("App.Session").lifetime(Lifetime::Scoped),
    ]
    .into_iter()
    .collect();
    let policy = ApplyPolicy::from(&config);
    let report = Planner::new(PlanContext::new(config)).plan(&candidates).unwrap();

    let err = PlanApplier::new(policy).check(&report).unwrap_err();
    match err {
        PlanError::FatalDiagnostics { errors, warnings, first } => {
            assert_eq!((errors, warnings), (0, 1));
            assert!(first.contains("FP002"), "{first}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[cfg(feature = "config")]
#[test]
fn config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.json");
    std::fs::write(
        &path,
        r#"{
            "strict_disposable_check": false,
            "assembly_order": { "first": ["Core"], "preset": "TestsLast" }
        }"#,
    )
    .unwrap();

    let config = PlannerConfig::from_json_file(&path).unwrap();
    assert!(!config.strict_disposable_check);
    assert_eq!(config.assembly_order.first, ["Core"]);
    assert_eq!(config.assembly_order.preset, AssemblyPreset::TestsLast);
}

#[cfg(feature = "config")]
#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = PlannerConfig::from_json_file(dir.path().join("absent.json"));
    assert!(matches!(result, Err(PlanError::Io(_))));
}
