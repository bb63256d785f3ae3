use fiber_core::{create_root, make_node, Element, MemoryApplier, Props, Root};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const SECTION_COUNT: usize = 4;
const ROWS_PER_SECTION: usize = 32;
const ROW_SAMPLES: &[usize] = &[8, 16, 32, 64];

fn content(sections: usize, rows_per_section: usize, revision: usize) -> Element {
    make_node(
        "main",
        Props::new(),
        (0..sections)
            .map(|section| {
                make_node(
                    "section",
                    Props::new().with("id", format!("section-{section}")),
                    (0..rows_per_section)
                        .map(|row| {
                            make_node(
                                "div",
                                Props::new().with("className", "row"),
                                [
                                    make_node("span", Props::new(), [format!("Item {section}-{row}")]),
                                    make_node("span", Props::new(), [format!("rev {revision}")]),
                                ],
                            )
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .collect::<Vec<_>>(),
    )
}

struct Fixture {
    root: Root<MemoryApplier>,
    sections: usize,
    rows_per_section: usize,
    revision: usize,
}

impl Fixture {
    fn new(sections: usize, rows_per_section: usize) -> Self {
        let mut applier = MemoryApplier::new();
        let container = applier.create_element("root");
        Self {
            root: create_root(applier, container),
            sections,
            rows_per_section,
            revision: 0,
        }
    }

    fn render(&mut self) {
        self.revision += 1;
        self.root
            .render(content(self.sections, self.rows_per_section, self.revision));
        self.root.flush().expect("render pass");
        self.root.with_applier(|applier| black_box(applier.take_mutations()));
    }
}

fn fiber_count(sections: usize, rows_per_section: usize) -> usize {
    2 + sections * (1 + rows_per_section * 5)
}

fn bench_first_pass(c: &mut Criterion) {
    c.bench_function("reconcile_first_pass", |b| {
        b.iter(|| {
            let mut fixture = Fixture::new(SECTION_COUNT, ROWS_PER_SECTION);
            fixture.render();
            black_box(fixture.root.fiber_count());
        });
    });
}

fn bench_update_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_update_pass");
    for &rows_per_section in ROW_SAMPLES {
        group.bench_with_input(
            BenchmarkId::new("fibers", fiber_count(SECTION_COUNT, rows_per_section)),
            &rows_per_section,
            |b, &rows_per_section| {
                let mut fixture = Fixture::new(SECTION_COUNT, rows_per_section);
                // warm up so only update passes are measured
                fixture.render();
                b.iter(|| fixture.render());
            },
        );
    }
    group.finish();
}

criterion_group!(reconcile, bench_first_pass, bench_update_pass);
criterion_main!(reconcile);
