use log::{debug, info};
use stackscope::context::{ContextDirectory, ContextId, ExecutionContext, GeneratorId, StackModel};
use stackscope::frame::{PREVFR_SLOT, REDOIP_SLOT, SUCCFR_SLOT, SUCCIP_SLOT};
use stackscope::machine::{MachineView, Registers};
use stackscope::sink::LogSink;
use stackscope::symbols::LabelTable;
use stackscope::walk::walk;
use stackscope::zone::{Zone, ZoneId, ZoneRegistry};
use stackscope::{Address, TraceConfig, Tracer, Word};
use std::env;
use std::path::Path;

const MAIN_ENTRY: u64 = 0x100;
const APPEND_ENTRY: u64 = 0x200;
const APPEND_RETRY: u64 = 0x240;
const APPEND_RESUME: u64 = 0x248;

/// Lay out an ordinary choice point at `frame`
fn push_frame(zone: &mut Zone, frame: Address, prev: Address, succip: Word, redoip: Word) {
    zone.write(frame - PREVFR_SLOT, prev as Word);
    zone.write(frame - REDOIP_SLOT, redoip);
    zone.write(frame - SUCCIP_SLOT, succip);
    zone.write(frame - SUCCFR_SLOT, prev as Word);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => TraceConfig::load(Path::new(path))?,
        None => TraceConfig {
            more_windows: "2-5".to_string(),
            special_regs: true,
            stack_model: StackModel::OwnStacks,
            ..Default::default()
        },
    };
    debug!("config: {:?}", config);

    // Main context plus one generator with its own stacks
    let mut zones = ZoneRegistry::new();
    zones.insert(Zone::new(ZoneId(1), "main det", 0x1000, 0x100));
    let mut choice = Zone::new(ZoneId(2), "main nondet", 0x2000, 0x100);
    push_frame(&mut choice, 0x2010, 0x2000, MAIN_ENTRY, 0);
    push_frame(&mut choice, 0x2020, 0x2010, APPEND_RESUME, APPEND_RETRY);
    push_frame(&mut choice, 0x2030, 0x2020, APPEND_RESUME, APPEND_RETRY);
    zones.insert(choice);
    zones.insert(Zone::new(ZoneId(3), "generator det", 0x3000, 0x40));
    zones.insert(Zone::new(ZoneId(4), "generator nondet", 0x4000, 0x40));
    zones.insert(Zone::new(ZoneId(5), "heap", 0x8000, 0x400));

    let mut contexts = ContextDirectory::new(ExecutionContext::main(ContextId(0), ZoneId(1), ZoneId(2)));
    contexts.attach(ExecutionContext::for_generator(
        ContextId(1),
        ZoneId(3),
        ZoneId(4),
        GeneratorId(1),
    ));

    let mut labels = LabelTable::new();
    labels.add_entry(MAIN_ENTRY, Some("main/2-0"));
    labels.add_entry(APPEND_ENTRY, Some("list.append/3-0"));
    labels.add_internal(APPEND_RETRY, "list.append/3-0");
    labels.add_internal(APPEND_RESUME, "list.append/3-0");

    let mut regs = Registers {
        succip: MAIN_ENTRY,
        curfr: 0x2010,
        maxfr: 0x2010,
        hp: 0x8000,
        sp: 0x1004,
        choice_bottom: 0x2000,
        ..Default::default()
    };

    let mut tracer = Tracer::new(config, LogSink::new());

    // main calls append three times, each pushing a choice point
    tracer.call(&MachineView::new(&zones, &contexts, &regs, &labels).with_heap(ZoneId(5)), MAIN_ENTRY, 0)?;
    for frame in [0x2020, 0x2030] {
        regs.curfr = frame;
        regs.maxfr = frame;
        let view = MachineView::new(&zones, &contexts, &regs, &labels).with_heap(ZoneId(5));
        tracer.call(&view, APPEND_ENTRY, APPEND_RESUME)?;
        tracer.make_frame(&view, "list.append/3-0")?;
    }

    let view = MachineView::new(&zones, &contexts, &regs, &labels).with_heap(ZoneId(5));
    tracer.tail_call(&view, APPEND_ENTRY)?;
    tracer.succeed(&view)?;
    tracer.fail(&view)?;

    regs.curfr = 0x2020;
    regs.maxfr = 0x2020;
    let view = MachineView::new(&zones, &contexts, &regs, &labels).with_heap(ZoneId(5));
    tracer.redo(&view)?;
    tracer.proceed(&view)?;
    tracer.call(&view, APPEND_ENTRY, APPEND_RESUME)?;

    let classifier = view.classifier(tracer.config().stack_model);
    for frame in walk(classifier, regs.maxfr, regs.choice_bottom) {
        let frame = frame?;
        info!(
            "frame at offset {} in context {:?}: {} locals",
            frame.offset_in_zone,
            frame.context,
            frame.locals.len()
        );
    }

    info!(
        "{} calls, {} records",
        tracer.window().calls(),
        tracer.sink().count()
    );
    Ok(())
}
