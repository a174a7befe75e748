//! Multi-unit builds, cancellation and plan consumers.

use std::sync::Arc;

use ferrous_plan::provider::{Attribute, IntrospectionProvider, LoadedAssembly, RuntimeType, SymbolTableProvider};
use ferrous_plan::{
    AssemblyOrderSpec, AssemblyRef, CancellationToken, CandidateCollection, CandidateSet, CandidateType,
    CollectingSink, DefaultGraphExporter, DiagnosticCode, ExportFormat, ExportOptions, GraphDocument, GraphExporter,
    Lifetime, Marker, PlanContext, PlanError, Planner, PlannerConfig, TypeRef,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("ferrous_plan=debug"))
        .with_test_writer()
        .try_init();
}

fn unit_report(planner: &Planner, assembly: LoadedAssembly) -> (AssemblyRef, ferrous_plan::PlanReport) {
    let unit = AssemblyRef::new(assembly.name.as_str());
    let mut collection = CandidateCollection::new();
    collection.add_provider(IntrospectionProvider::new(assembly));
    (unit, planner.plan_collection(&collection).unwrap())
}

#[test]
fn merged_units_follow_assembly_order() {
    init_tracing();
    let config = PlannerConfig {
        assembly_order: AssemblyOrderSpec::new().first(["Zeta"]),
        ..PlannerConfig::default()
    };
    let sink = Arc::new(CollectingSink::new());
    let planner = Planner::new(PlanContext::new(config).with_sink(sink.clone()));

    let alpha = LoadedAssembly::new("Alpha")
        .with_type(RuntimeType::class("Shared.Clock").attribute(Attribute::new("Transient")))
        .with_type(RuntimeType::class("Alpha.Job"))
        .with_type(RuntimeType::class("Alpha.Setup").implements("IServicePlugin"));
    let zeta = LoadedAssembly::new("Zeta")
        .with_type(RuntimeType::class("Shared.Clock"))
        .with_type(RuntimeType::class("Zeta.Setup").implements("IServicePlugin"))
        .with_type(RuntimeType::class("Alpha.Setup").implements("IServicePlugin"));

    let units = vec![unit_report(&planner, alpha), unit_report(&planner, zeta)];
    let merged = planner.merge(units).unwrap();

    // Zeta is processed first, so its Singleton clock wins
    let clock = merged.plan.entry(&TypeRef::new("Shared.Clock")).unwrap();
    assert_eq!(clock.lifetime, Lifetime::Singleton);
    assert_eq!(clock.unit.name(), "Zeta");
    assert_eq!(sink.count(DiagnosticCode::DuplicateRegistration), 1);

    let order: Vec<_> = merged.plan.entries.iter().map(|e| e.ty.name()).collect();
    assert_eq!(order, ["Shared.Clock", "Alpha.Job"]);

    let plugins: Vec<_> = merged.plan.plugins.iter().map(|p| p.plugin_type.name()).collect();
    assert_eq!(plugins, ["Alpha.Setup", "Zeta.Setup"]);
}

fn unit_plan(planner: &Planner, unit: &str, types: Vec<CandidateType>) -> (AssemblyRef, ferrous_plan::PlanReport) {
    let candidates: CandidateSet = types.into_iter().map(|t| t.in_unit(unit)).collect();
    (AssemblyRef::new(unit), planner.plan(&candidates).unwrap())
}

#[test]
fn merged_report_is_independent_of_unit_order() {
    init_tracing();
    let planner = Planner::default();
    let core = || {
        unit_plan(
            &planner,
            "Core",
            vec![
                CandidateType::interface("Core.IRepo"),
                CandidateType::class("Core.Repo").implements("Core.IRepo"),
                CandidateType::class("Core.Dec")
                    .implements("Core.IRepo")
                    .ctor(["Core.IRepo"])
                    .marker(Marker::DecoratorFor { service: "Core.IRepo".into(), order: 1 }),
                CandidateType::class("Core.A").ctor(["Core.B"]),
                CandidateType::class("Core.B").ctor(["Core.A"]),
            ],
        )
    };
    let web = || {
        unit_plan(
            &planner,
            "Web",
            vec![
                CandidateType::class("Web.Dec")
                    .implements("Core.IRepo")
                    .ctor(["Core.IRepo"])
                    .marker(Marker::DecoratorFor { service: "Core.IRepo".into(), order: 2 }),
                CandidateType::class("Web.X").ctor(["Web.Y"]),
                CandidateType::class("Web.Y").ctor(["Web.X"]),
            ],
        )
    };

    let forward = planner.merge(vec![core(), web()]).unwrap();
    let backward = planner.merge(vec![web(), core()]).unwrap();

    assert_eq!(forward.plan, backward.plan);
    assert_eq!(forward.chains, backward.chains);
    assert_eq!(forward.cycles, backward.cycles);
    assert_eq!(forward.mismatches, backward.mismatches);
    assert_eq!(forward.diagnostics, backward.diagnostics);

    let chain: Vec<_> = forward.chains.decorators_of(&TypeRef::new("Core.IRepo")).unwrap().types().collect();
    assert_eq!(chain, [&TypeRef::new("Core.Dec"), &TypeRef::new("Web.Dec")]);
    let starts: Vec<_> = forward.cycles.iter().filter_map(|c| c.start()).map(TypeRef::name).collect();
    assert_eq!(starts, ["Core.A", "Web.X"]);
}

#[test]
fn cancelled_collection_pass_produces_no_diagnostics() {
    let token = CancellationToken::new();
    let sink = Arc::new(CollectingSink::new());
    let planner = Planner::new(
        PlanContext::default()
            .with_cancellation(token.child_token())
            .with_sink(sink.clone()),
    );

    let mut collection = CandidateCollection::new();
    collection.add_provider(SymbolTableProvider::new(
        "unit App\nclass App.A\n  ctor(App.B)\nclass App.B\n  ctor(App.A)\n",
    ));

    token.cancel();
    assert!(matches!(planner.plan_collection(&collection), Err(PlanError::Cancelled)));
    assert!(sink.diagnostics().is_empty());
}

#[test]
fn exported_graph_marks_cycles() {
    init_tracing();
    let mut collection = CandidateCollection::new();
    collection.add_provider(SymbolTableProvider::new(
        "unit App\nclass App.A\n  ctor(App.B)\nclass App.B\n  ctor(App.A)\nclass App.C\n",
    ));
    let report = Planner::default().plan_collection(&collection).unwrap();

    let doc = GraphDocument::from_graph(&report.graph, &report.cycles, &ExportOptions::default());
    assert_eq!(doc.metadata.node_count, 3);
    assert_eq!(doc.metadata.cycle_count, 1);

    let dot = DefaultGraphExporter.export(&doc, ExportFormat::Dot).unwrap();
    assert!(dot.contains("\"App_A\" -> \"App_B\" [style=solid, color=red];"));
    assert!(dot.contains("\"App_C\" [label=\"App.C\\n(Singleton)\""));
}
