#![no_main]

use ferrous_plan::provider::{CandidateProvider, SymbolTableProvider};
use ferrous_plan::{CandidateSet, Planner};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let provider = SymbolTableProvider::new(text);
    let _ = provider.unit();

    // Whatever parses must plan without panicking
    if let Ok(candidates) = provider.provide() {
        let set: CandidateSet = candidates.into_iter().collect();
        let report = Planner::default().plan(&set).expect("pass was not cancelled");
        let _ = report.format_issues();
        let _ = report.plan.registrations();
    }
});
