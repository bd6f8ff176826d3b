use court_calib_core::LineSegment;
use court_calib_lines::{ClusterParams, SegmentClusterer};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Court-like scene: five lines broken into short dashes plus clutter.
fn fragmented_scene() -> Vec<LineSegment> {
    let lines = [
        (318.9, 524.3, 1072.1, 524.3),
        (500.5, 368.1, 890.5, 368.1),
        (412.9, 524.3, 500.5, 368.1),
        (978.1, 524.3, 890.5, 368.1),
        (695.5, 368.1, 695.5, 250.0),
    ];
    let mut out = Vec::new();
    for (x1, y1, x2, y2) in lines {
        for k in 0..20 {
            let t0 = k as f64 / 20.0;
            let t1 = t0 + 0.035;
            out.push(LineSegment::new(
                x1 + (x2 - x1) * t0,
                y1 + (y2 - y1) * t0,
                x1 + (x2 - x1) * t1,
                y1 + (y2 - y1) * t1,
            ));
        }
    }
    for k in 0..40 {
        let a = k as f64 * 0.37;
        out.push(LineSegment::new(
            100.0 + 20.0 * k as f64,
            50.0,
            100.0 + 20.0 * k as f64 + 30.0 * a.cos(),
            50.0 + 30.0 * a.sin(),
        ));
    }
    out
}

fn bench_cluster(c: &mut Criterion) {
    let segments = fragmented_scene();
    let clusterer = SegmentClusterer::new(ClusterParams::default());
    c.bench_function("cluster_fragmented_court", |b| {
        b.iter(|| clusterer.cluster(black_box(&segments)))
    });
}

criterion_group!(benches, bench_cluster);
criterion_main!(benches);
