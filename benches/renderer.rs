use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use org_chart_renderer::config::Config;
use org_chart_renderer::interaction::ClickTarget;
use org_chart_renderer::ir::{NodeId, OrgTree, Person, TreeNode};
use org_chart_renderer::layout::{DagreTreeLayout, compute_layout};
use org_chart_renderer::reconcile::reconcile;
use org_chart_renderer::render::SvgMode;
use org_chart_renderer::OrgChart;
use std::hint::black_box;

/// Balanced tree with `fanout` reports per manager, `depth` levels deep.
fn org_tree(fanout: usize, depth: usize) -> OrgTree {
    fn build(id: &mut usize, fanout: usize, depth: usize) -> TreeNode {
        let mut person = Person::new(format!("Person {id}"));
        person.title = Some("Engineering Manager".to_string());
        person.department = Some("Platform".to_string());
        person.total_reports = if depth > 0 { fanout as u32 } else { 0 };
        person.label = Some("reports".to_string());
        let node_id = id.to_string();
        *id += 1;
        let children = if depth == 0 {
            Vec::new()
        } else {
            (0..fanout).map(|_| build(id, fanout, depth - 1)).collect()
        };
        TreeNode::new(node_id.as_str(), person).with_children(children)
    }
    let mut next = 0usize;
    OrgTree::new(build(&mut next, fanout, depth)).expect("generated ids are unique")
}

fn bench_layout(c: &mut Criterion) {
    let config = Config::default();
    let mut group = c.benchmark_group("layout");
    for (fanout, depth) in [(3usize, 2usize), (4, 3), (6, 3)] {
        let tree = org_tree(fanout, depth);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{fanout}x{depth}")),
            &tree,
            |b, tree| b.iter(|| compute_layout(black_box(tree), &DagreTreeLayout, &config.chart)),
        );
    }
    group.finish();
}

fn bench_render_svg(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_svg");
    for (fanout, depth) in [(3usize, 2usize), (4, 3)] {
        let tree = org_tree(fanout, depth);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{fanout}x{depth}")),
            &tree,
            |b, tree| {
                b.iter(|| {
                    let mut chart = OrgChart::new(tree.clone(), Config::default());
                    black_box(chart.svg(SvgMode::Snapshot))
                })
            },
        );
    }
    group.finish();
}

fn bench_toggle(c: &mut Criterion) {
    let tree = org_tree(4, 3);
    let mut chart = OrgChart::new(tree, Config::default());
    chart.render();
    let target = NodeId::new("1");
    c.bench_function("toggle_and_rerender", |b| {
        b.iter(|| {
            chart
                .click(black_box(&target), ClickTarget::Card)
                .expect("node exists")
        })
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let previous: Vec<u32> = (0..2000).collect();
    let next: Vec<u32> = (500..2500).collect();
    c.bench_function("reconcile_2000", |b| {
        b.iter(|| reconcile(black_box(&previous), black_box(&next)))
    });
}

criterion_group!(benches, bench_layout, bench_render_svg, bench_toggle, bench_reconcile);
criterion_main!(benches);
