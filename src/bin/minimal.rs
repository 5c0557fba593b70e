// Minimal run to verify the core functionality works

use stack_compositor::{
    accel::SoftwareAccelerator,
    config::StackConfig,
    filter::{CollectSink, StackFilter, StackVariant, StepStatus},
    layout::{plan, Orientation},
    sync::SyntheticSource,
    video::{FrameRate, StreamGeometry, TimeBase},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Testing Stack-Compositor core functionality");

    // Test 1: Layout
    println!("\n1. Planning a horizontal layout...");
    let geometries = [StreamGeometry::nv12(320, 240), StreamGeometry::nv12(160, 240)];
    let layout = plan(&geometries, Orientation::Horizontal)?;
    println!("   Canvas: {}x{}", layout.canvas_width, layout.canvas_height);
    for (index, rect) in layout.rects.iter().enumerate() {
        println!("   input{} -> ({}, {}) {}x{}", index, rect.x, rect.y, rect.width, rect.height);
    }

    // Test 2: Time bases
    println!("\n2. Rescaling timestamps...");
    let ntsc = TimeBase::from_frame_rate(FrameRate::FPS_29_97).ok_or("bad frame rate")?;
    let common = TimeBase::common(&[ntsc, TimeBase::new(1, 90000).ok_or("bad time base")?]);
    println!("   {} and 1/90000 -> {}", ntsc, common);
    println!("   frame 10 at {} = {} ticks", ntsc, ntsc.rescale(10, common));

    // Test 3: A full vstack run
    println!("\n3. Running vstack_accel on two synthetic inputs...");
    let mut filter = StackFilter::open(
        StackConfig::default(),
        StackVariant::Vertical,
        Box::new(SoftwareAccelerator::new()),
    )?;
    filter.attach_input(0, Box::new(SyntheticSource::new(64, 48, FrameRate::FPS_25, 10)))?;
    filter.attach_input(
        1,
        Box::new(SyntheticSource::new(64, 32, FrameRate::FPS_25, 6).with_color([200, 60, 180])),
    )?;
    let canvas = filter.configure_output()?;
    println!("   Output: {}x{} {}", canvas.width, canvas.height, canvas.format);

    let mut sink = CollectSink::new();
    while filter.step(&mut sink)? != StepStatus::Drained {}
    println!("   Frames out: {:?}", sink.timestamps());

    match sink.frames().last() {
        Some(frame) => match frame.save_png("minimal_stack_output.png") {
            Ok(()) => println!("   Output saved to: minimal_stack_output.png"),
            Err(e) => println!("   Could not save file: {}", e),
        },
        None => println!("   No frames produced"),
    }

    println!("\nAll core checks completed");
    Ok(())
}
