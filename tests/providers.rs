//! Both providers must describe the same logical types identically.

use ferrous_plan::provider::{
    Attribute, CandidateProvider, IntrospectionProvider, LoadedAssembly, RuntimeParam, RuntimeType,
    SymbolTableProvider,
};
use ferrous_plan::{CandidateCollection, CandidateSet, Marker, PlanError, Planner, TypeRef};

const SYMBOLS: &str = "\
# application unit
unit App
interface App.ILogger
class App.Logger : App.ILogger, System.IDisposable
  @Singleton
abstract class App.RepoBase : App.IRepo
interface App.IRepo
class App.Repo extends App.RepoBase
  ctor(App.ILogger, App.Settings)
  @Scoped
  @Keyed(\"main\")
struct App.Settings
class App.Settings.Binder
  @Options(\"Settings\")
class App.CachedRepo : App.IRepo
  ctor(App.IRepo)
  @DecoratorFor(App.IRepo, 1)
class App.Setup : IServicePlugin
  @Order(5)
class App.Report
  ctor(App.IRepo, int)
  @DependsOn(App.IRepo)

extern unit System
interface System.IDisposable
";

fn runtime_assembly() -> LoadedAssembly {
    LoadedAssembly::new("App")
        .with_type(RuntimeType::interface("App.ILogger"))
        .with_type(
            RuntimeType::class("App.Logger")
                .implements("App.ILogger")
                .implements("System.IDisposable")
                .attribute(Attribute::new("SingletonAttribute")),
        )
        .with_type(RuntimeType::abstract_class("App.RepoBase").implements("App.IRepo"))
        .with_type(RuntimeType::interface("App.IRepo"))
        .with_type(
            RuntimeType::class("App.Repo")
                .base("App.RepoBase")
                .constructor(vec![RuntimeParam::reference("App.ILogger"), RuntimeParam::value("App.Settings")])
                .attribute(Attribute::new("Scoped"))
                .attribute(Attribute::new("Keyed").str_arg("main")),
        )
        .with_type(RuntimeType::value_type("App.Settings"))
        .with_type(RuntimeType::class("App.Settings.Binder").attribute(Attribute::new("Options").str_arg("Settings")))
        .with_type(
            RuntimeType::class("App.CachedRepo")
                .implements("App.IRepo")
                .constructor(vec![RuntimeParam::reference("App.IRepo")])
                .attribute(Attribute::new("DecoratorFor").type_arg("App.IRepo").int_arg(1)),
        )
        .with_type(
            RuntimeType::class("App.Setup")
                .implements("IServicePlugin")
                .attribute(Attribute::new("Order").int_arg(5)),
        )
        .with_type(
            RuntimeType::class("App.Report")
                .constructor(vec![RuntimeParam::reference("App.IRepo"), RuntimeParam::primitive("int")])
                .attribute(Attribute::new("DependsOn").type_arg("App.IRepo")),
        )
}

fn system_assembly() -> LoadedAssembly {
    LoadedAssembly::new("System").with_type(RuntimeType::interface("System.IDisposable"))
}

#[test]
fn providers_yield_equivalent_candidates() {
    let from_symbols: CandidateSet = SymbolTableProvider::new(SYMBOLS).provide().unwrap().into_iter().collect();
    let from_runtime: CandidateSet = IntrospectionProvider::new(runtime_assembly())
        .with_reference(system_assembly())
        .provide()
        .unwrap()
        .into_iter()
        .collect();

    assert_eq!(from_symbols.len(), from_runtime.len());
    for (a, b) in from_symbols.iter().zip(from_runtime.iter()) {
        assert_eq!(a, b);
        let kinds_a: Vec<_> = a.constructor_parameter_types.iter().map(TypeRef::kind).collect();
        let kinds_b: Vec<_> = b.constructor_parameter_types.iter().map(TypeRef::kind).collect();
        assert_eq!(kinds_a, kinds_b, "parameter kinds of {}", a.full_name);
    }
}

#[test]
fn providers_yield_identical_plans() {
    let planner = Planner::default();

    let mut symbols = CandidateCollection::new();
    symbols.add_provider(SymbolTableProvider::new(SYMBOLS));
    let mut runtime = CandidateCollection::new();
    runtime.add_provider(IntrospectionProvider::new(runtime_assembly()).with_reference(system_assembly()));

    let a = planner.plan_collection(&symbols).unwrap();
    let b = planner.plan_collection(&runtime).unwrap();
    assert_eq!(a.plan, b.plan);
    assert_eq!(a.diagnostics, b.diagnostics);
    assert_eq!(a.cycles, b.cycles);

    assert!(a.plan.contains(&TypeRef::new("App.Report")));
    assert!(a.plan.contains(&TypeRef::new("App.Settings.Binder")));
    assert!(!a.plan.contains(&TypeRef::new("App.Repo")), "value parameter needs a factory");
    assert_eq!(a.plan.plugins.len(), 1);
}

#[test]
fn string_arguments_containing_hash_decode_identically() {
    let table = "unit Geo\nclass Geo.Cache # regional cache\n  @Keyed(\"eu#1\") # first shard\n";
    let from_symbols = SymbolTableProvider::new(table).provide().unwrap();
    let from_runtime = IntrospectionProvider::new(
        LoadedAssembly::new("Geo")
            .with_type(RuntimeType::class("Geo.Cache").attribute(Attribute::new("Keyed").str_arg("eu#1"))),
    )
    .provide()
    .unwrap();

    assert_eq!(from_symbols, from_runtime);
    assert!(from_symbols[0].markers.contains(&Marker::Keyed("eu#1".into())));
}

#[test]
fn failing_provider_does_not_block_the_others() {
    let mut collection = CandidateCollection::new();
    collection
        .add_provider(SymbolTableProvider::new("unit Broken\nenum Broken.Color\n"))
        .add_provider(IntrospectionProvider::new(
            LoadedAssembly::new("Good").with_type(RuntimeType::class("Good.Clock")),
        ));
    assert_eq!(collection.provider_count(), 2);

    let report = Planner::default().plan_collection(&collection).unwrap();
    assert!(report.plan.contains(&TypeRef::new("Good.Clock")));
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0].error, PlanError::SymbolTable { line: 2, .. }));
    assert!(report.format_issues().contains("Provider Failures:"));
}

#[test]
fn symbol_table_reads_from_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.symbols");
    std::fs::write(&path, SYMBOLS).unwrap();

    let provider = SymbolTableProvider::from_file(&path).unwrap();
    assert_eq!(provider.unit().name(), "App");
    assert_eq!(provider.provide().unwrap().len(), 10);
}
