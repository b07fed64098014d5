//! Benchmarks for address parsing and frame encoding/decoding.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use omron_fins_driver::{
    hostlink, resolve, FinsResponse, HostLinkCommand, MemoryArea, NodePair, ReadWordCommand,
    RegisterAddress, RegisterValue, ValueKind, WriteWordCommand,
};

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    for text in ["D2202", "W100.1", "  h 12_345 "] {
        group.bench_with_input(BenchmarkId::from_parameter(text), text, |b, text| {
            b.iter(|| resolve(black_box(text)))
        });
    }
    group.finish();
}

fn bench_commands(c: &mut Criterion) {
    let nodes = NodePair::new(0x22, 0x01);
    let address = RegisterAddress::word(MemoryArea::DM, 100);

    c.bench_function("read_word_frame", |b| {
        b.iter(|| {
            ReadWordCommand::new(nodes, black_box(7), address, black_box(10))
                .map(|cmd| cmd.to_bytes())
        })
    });

    let mut group = c.benchmark_group("write_word_frame");
    for count in [1usize, 100, 999] {
        let data = vec![0x1234u16; count];
        group.bench_with_input(BenchmarkId::from_parameter(count), &data, |b, data| {
            b.iter(|| {
                WriteWordCommand::new(nodes, 7, address, black_box(data)).map(|cmd| cmd.to_bytes())
            })
        });
    }
    group.finish();
}

fn bench_response(c: &mut Criterion) {
    let mut frame = b"FINS".to_vec();
    frame.extend_from_slice(&(22u32 + 200).to_be_bytes());
    frame.extend_from_slice(&[0, 0, 0, 2, 0, 0, 0, 0]);
    frame.extend_from_slice(&[0xC0, 0, 2, 0, 0x22, 0, 0, 0x01, 0, 0x07, 0x01, 0x01, 0, 0]);
    frame.extend((0..200u8).map(|i| i.wrapping_mul(3)));

    c.bench_function("parse_response_100_words", |b| {
        b.iter(|| {
            FinsResponse::from_bytes(black_box(&frame)).and_then(|response| response.to_words())
        })
    });
}

fn bench_values(c: &mut Criterion) {
    c.bench_function("f32_encode_decode", |b| {
        b.iter(|| {
            let words = RegisterValue::Float32(black_box(25.5)).to_words();
            words.map(|w| RegisterValue::from_words(ValueKind::Float32, &w))
        })
    });
}

fn bench_hostlink(c: &mut Criterion) {
    let address = RegisterAddress::bit(MemoryArea::CIO, 8, 1);
    c.bench_function("hostlink_write_frame", |b| {
        b.iter(|| HostLinkCommand::write_bit(black_box(address), true).map(|cmd| cmd.to_bytes()))
    });
    c.bench_function("hostlink_checksum", |b| {
        b.iter(|| hostlink::checksum(black_box("@00FA000000000010230000008000101")))
    });
}

criterion_group!(
    benches,
    bench_resolve,
    bench_commands,
    bench_response,
    bench_values,
    bench_hostlink
);
criterion_main!(benches);
