#![no_main]

use ferrous_plan::{CandidateSet, CandidateType, Lifetime, Marker, Planner};
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 8] = ["A", "B", "C", "D", "IA", "IB", "P", "X"];

fn name(byte: u8) -> &'static str {
    NAMES[byte as usize % NAMES.len()]
}

fuzz_target!(|data: &[u8]| {
    // Each 4-byte chunk describes one candidate: name, dependency, lifetime, flags
    let types: Vec<CandidateType> = data
        .chunks_exact(4)
        .map(|chunk| {
            let own = name(chunk[0]);
            let mut ty = if own.starts_with('I') {
                CandidateType::interface(own)
            } else {
                CandidateType::class(own)
            };
            ty = ty.ctor([name(chunk[1])]);
            ty = match chunk[2] % 4 {
                0 => ty.lifetime(Lifetime::Singleton),
                1 => ty.lifetime(Lifetime::Scoped),
                2 => ty.lifetime(Lifetime::Transient),
                _ => ty,
            };
            let flags = chunk[3];
            if flags & 1 != 0 {
                ty = ty.implements(name(flags >> 4));
            }
            if flags & 2 != 0 {
                ty = ty.marker(Marker::DecoratorFor { service: name(flags >> 4).into(), order: (flags >> 2) as i32 });
            }
            if flags & 4 != 0 {
                ty = ty.marker(Marker::PluginRole);
            }
            if flags & 8 != 0 {
                ty = ty.marker(Marker::Excluded);
            }
            ty
        })
        .collect();

    let forward: CandidateSet = types.iter().cloned().collect();
    let backward: CandidateSet = types.into_iter().rev().collect();
    let planner = Planner::default();
    let a = planner.plan(&forward).expect("pass was not cancelled");
    let b = planner.plan(&backward).expect("pass was not cancelled");
    assert_eq!(a.cycles, b.cycles);
});
