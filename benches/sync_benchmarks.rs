use std::net::SocketAddr;
use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use wallsync::control::{Connection, ConnectionKind};
use wallsync::sync::evaluate;
use wallsync::testing::{RecordingTransport, SimulatedMedia};
use wallsync::{
    CommandRegistry, CorrectionTuning, Dispatcher, EventBus, NodeConfig, PlayerCore, Settings,
    register_all,
};

fn correction_benchmark(c: &mut Criterion) {
    let tuning = CorrectionTuning::default();

    c.bench_function("evaluate_locked", |b| {
        b.iter(|| evaluate(black_box(10.001), black_box(10.0), 1.0, Some(30.0), &tuning))
    });

    c.bench_function("evaluate_nudge", |b| {
        b.iter(|| evaluate(black_box(10.3), black_box(10.0), 1.0, None, &tuning))
    });

    c.bench_function("evaluate_scrub", |b| {
        b.iter(|| evaluate(black_box(42.0), black_box(10.0), 1.5, None, &tuning))
    });
}

fn dispatch_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dispatcher = rt.block_on(async {
        let core = Arc::new(PlayerCore::new(
            NodeConfig::default(),
            Arc::new(SimulatedMedia::new().with_duration(600.0)),
            Arc::new(RecordingTransport::new()),
            Settings::default(),
            EventBus::new(),
        ));
        let mut registry = CommandRegistry::new();
        register_all(&mut registry, &core);
        registry.add_target(core);
        Dispatcher::new(registry)
    });
    let peer: SocketAddr = "192.168.1.20:7756".parse().unwrap();
    let (conn, _replies) = Connection::new(peer, ConnectionKind::Datagram);

    c.bench_function("dispatch_seek_to_time", |b| {
        b.to_async(&rt)
            .iter(|| dispatcher.dispatch(&conn, black_box(b"seek_to_time 12.500")))
    });

    c.bench_function("dispatch_state_document", |b| {
        b.to_async(&rt).iter(|| {
            dispatcher.dispatch(&conn, black_box(br#"{"brightness": 0.8, "looping": true}"#))
        })
    });

    c.bench_function("dispatch_unknown_line", |b| {
        b.to_async(&rt)
            .iter(|| dispatcher.dispatch(&conn, black_box(b"wall-left")))
    });
}

criterion_group!(benches, correction_benchmark, dispatch_benchmark);
criterion_main!(benches);
