use criterion::{Criterion, criterion_group, criterion_main};
use crane_jobs::core::execution::format_report;
use crane_jobs::core::models::ExecutionResult;
use crane_jobs::core::planner::plan_from_sections;
use crane_jobs::infra::buildout::BuildoutConfig;
use std::hint::black_box;
use std::path::Path;
use std::time::Duration;

fn buildout_with_parts(count: usize) -> String {
    let mut content = String::from("[buildout]\nparts =\n");
    for i in 0..count {
        content.push_str(&format!("    part{i}\n"));
    }
    for i in 0..count {
        let recipe = match i % 3 {
            0 => "zc.recipe.testrunner",
            1 => "djangorecipe",
            _ => "collective.recipe.omelette",
        };
        content.push_str(&format!("\n[part{i}]\nrecipe = {recipe}\neggs =\n    a\n    b\n"));
    }
    content
}

fn bench_plan(c: &mut Criterion) {
    let content = buildout_with_parts(200);
    let path = Path::new("buildout.cfg");

    c.bench_function("parse_buildout_200_parts", |b| {
        b.iter(|| BuildoutConfig::parse(black_box(&content), path).unwrap());
    });

    let config = BuildoutConfig::parse(&content, path).unwrap();
    c.bench_function("plan_from_sections_200_parts", |b| {
        b.iter(|| plan_from_sections(black_box(&config)).unwrap());
    });
}

fn bench_report(c: &mut Criterion) {
    let results: Vec<ExecutionResult> = (0..50)
        .map(|i| ExecutionResult {
            command: format!("bin/test{i}"),
            exit_code: Some(0),
            output: "ok\n".repeat(200),
            duration: Duration::from_millis(10),
            timed_out: false,
        })
        .collect();

    c.bench_function("format_report_50_results", |b| {
        b.iter(|| format_report(black_box(&results)));
    });
}

criterion_group!(benches, bench_plan, bench_report);
criterion_main!(benches);
