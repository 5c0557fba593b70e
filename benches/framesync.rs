use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use stack_compositor::{
    accel::SoftwareAccelerator,
    config::StackConfig,
    filter::{CollectSink, StackFilter, StackVariant, StepStatus},
    sync::QueueSource,
    video::{Frame, StreamGeometry, StreamInfo, TimeBase},
};

const FRAMES: i64 = 500;

/// Filter with every input fully queued; input k runs at (k + 1) * 25 fps
fn queued_filter(inputs: usize) -> StackFilter {
    let config = StackConfig { inputs, ..StackConfig::default() };
    let mut filter = StackFilter::open(config, StackVariant::Horizontal, Box::new(SoftwareAccelerator::new()))
        .expect("open");

    for index in 0..inputs {
        let rate = 25 * (index as u32 + 1);
        let info = StreamInfo::new(StreamGeometry::nv12(16, 16), TimeBase::new(1, rate).expect("time base"));
        let (source, sender) = QueueSource::new(info);
        for pts in 0..FRAMES * (index as i64 + 1) {
            sender.send(Frame::new_filled(16, 16, [16, 128, 128], Some(pts)));
        }
        sender.finish();
        filter.attach_input(index, Box::new(source)).expect("attach");
    }
    filter.configure_output().expect("configure");
    filter
}

fn drain(mut filter: StackFilter) -> usize {
    let mut sink = CollectSink::new();
    while filter.step(&mut sink).expect("step") != StepStatus::Drained {}
    sink.len()
}

fn bench_framesync(c: &mut Criterion) {
    for inputs in [2, 8] {
        c.bench_function(&format!("stack {} inputs x {} frames", inputs, FRAMES), |b| {
            b.iter_batched(
                || queued_filter(inputs),
                |filter| black_box(drain(filter)),
                BatchSize::LargeInput,
            )
        });
    }
}

criterion_group!(benches, bench_framesync);
criterion_main!(benches);
