use std::hint::black_box;

use asc_prober::classify::{ChannelFlags, ChannelRecord};
use asc_prober::probes::decode::{decode_mask, repeat_stride, via2_decode};
use asc_prober::probes::fifo::fifo_stereo;
use asc_prober::{ProbeConfig, Report};
use asc_sim::{ChipProfile, SimMachine};
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_state_machine(c: &mut Criterion) {
    let none = ChannelFlags {
        half_empty: false,
        full_empty: false,
    };
    let full = ChannelFlags {
        half_empty: false,
        full_empty: true,
    };
    let half = ChannelFlags {
        half_empty: true,
        full_empty: false,
    };
    let empty = ChannelFlags {
        half_empty: true,
        full_empty: true,
    };

    c.bench_function("classify_full_chain", |b| {
        b.iter(|| {
            let mut record = ChannelRecord::default();
            record.primed(black_box(none));
            for written in 0..1024u16 {
                record.observe_fill(black_box(none), written);
            }
            record.observe_fill(black_box(full), 1024);
            record.observe_drain(black_box(half));
            record.observe_empty(black_box(empty));
            black_box(record)
        })
    });
}

fn bench_decode_analysis(c: &mut Criterion) {
    let window: [u8; 0x200] = core::array::from_fn(|i| (i % 0x20) as u8 ^ 0x5A);

    c.bench_function("decode_mask_0x200", |b| b.iter(|| decode_mask(black_box(&window))));
    c.bench_function("repeat_stride_0x200", |b| b.iter(|| repeat_stride(black_box(&window))));
}

fn bench_simulated_probes(c: &mut Criterion) {
    let config = ProbeConfig::default();

    c.bench_function("via2_decode_sonora", |b| {
        b.iter(|| {
            let mut machine = SimMachine::new(ChipProfile::sonora()).unwrap();
            let mut report = Report::default();
            via2_decode(&mut machine, &config, &mut report);
            black_box(report.decode)
        })
    });

    c.bench_function("fifo_stereo_classic", |b| {
        b.iter(|| {
            let mut machine = SimMachine::new(ChipProfile::classic()).unwrap();
            let mut report = Report::default();
            fifo_stereo(&mut machine, &config, &mut report);
            black_box(report.stereo)
        })
    });
}

criterion_group!(
    benches,
    bench_state_machine,
    bench_decode_analysis,
    bench_simulated_probes
);
criterion_main!(benches);
