use ferrous_plan::{CandidateSet, CandidateType, DiagnosticCode, Planner, Severity, TypeRef};

fn cycle_names(types: Vec<CandidateType>) -> Vec<Vec<String>> {
    let candidates: CandidateSet = types.into_iter().collect();
    let report = Planner::default().plan(&candidates).unwrap();
    assert_eq!(
        report.diagnostics.iter().filter(|d| d.code == DiagnosticCode::CycleDetected).count(),
        report.cycles.len(),
        "one diagnostic per cycle"
    );
    report
        .cycles
        .iter()
        .map(|c| c.path.iter().map(|t| t.name().to_string()).collect())
        .collect()
}

#[test]
fn two_element_cycle() {
    let cycles = cycle_names(vec![
        CandidateType::class("A").ctor(["B"]),
        CandidateType::class("B").ctor(["A"]),
    ]);
    assert_eq!(cycles, vec![vec!["A", "B"]]);
}

#[test]
fn three_element_cycle() {
    let cycles = cycle_names(vec![
        CandidateType::class("A").ctor(["B"]),
        CandidateType::class("B").ctor(["C"]),
        CandidateType::class("C").ctor(["A"]),
    ]);
    assert_eq!(cycles, vec![vec!["A", "B", "C"]]);
}

#[test]
fn diamond_dag_has_no_cycle() {
    let cycles = cycle_names(vec![
        CandidateType::class("Top").ctor(["Left", "Right"]),
        CandidateType::class("Left").ctor(["Bottom"]),
        CandidateType::class("Right").ctor(["Bottom"]),
        CandidateType::class("Bottom"),
    ]);
    assert!(cycles.is_empty());
}

#[test]
fn loop_through_an_interface() {
    let cycles = cycle_names(vec![
        CandidateType::interface("App.INotifier"),
        CandidateType::class("App.Notifier").implements("App.INotifier").ctor(["App.Queue"]),
        CandidateType::class("App.Queue").ctor(["App.INotifier"]),
    ]);
    assert_eq!(cycles, vec![vec!["App.Notifier", "App.Queue"]]);
}

#[test]
fn self_dependency_is_a_one_element_cycle() {
    let cycles = cycle_names(vec![CandidateType::class("App.Node").ctor(["App.Node"])]);
    assert_eq!(cycles, vec![vec!["App.Node"]]);
}

#[test]
fn cycle_message_reads_as_a_path() {
    let candidates: CandidateSet = vec![
        CandidateType::class("App.A").ctor(["App.B"]),
        CandidateType::class("App.B").ctor(["App.A"]),
    ]
    .into_iter()
    .collect();
    let report = Planner::default().plan(&candidates).unwrap();
    let diagnostic = &report.diagnostics[0];
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.subject, Some(TypeRef::new("App.A")));
    assert!(diagnostic.message.ends_with("App.A -> App.B -> App.A"));
    assert!(!report.is_valid());
}

#[test]
fn deep_acyclic_chain_plans_without_cycles() {
    let n = 120_000;
    let name = |i: usize| format!("T{:07}", i);
    let mut types: Vec<_> = (0..n - 1)
        .map(|i| CandidateType::class(name(i)).ctor([name(i + 1)]))
        .collect();
    types.push(CandidateType::class(name(n - 1)));

    let candidates: CandidateSet = types.into_iter().collect();
    let report = Planner::default().plan(&candidates).unwrap();
    assert!(report.cycles.is_empty());
    assert_eq!(report.plan.len(), n);
    assert!(report.is_valid());
}
