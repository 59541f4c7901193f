//! Benchmark for MIDI chart decoding.

use criterion::{Criterion, Throughput};
use tickchart::{binary::encode_vlq, prelude::*};

const TICK_RATE: u16 = 480;

fn chunk(body: &[u8]) -> Vec<u8> {
    let mut bytes = b"MTrk".to_vec();
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

fn named(name: &str) -> Vec<u8> {
    let mut body = vec![0x00, 0xFF, 0x03, name.len() as u8];
    body.extend_from_slice(name.as_bytes());
    body
}

/// A fretted track with `notes` single notes a sixteenth apart on every difficulty,
/// using running status for everything after the first event.
fn fret_track(name: &str, notes: u32) -> Vec<u8> {
    let mut body = named(name);
    let step = u32::from(TICK_RATE) / 4;
    let mut first = true;
    for index in 0..notes {
        let lane = (index % 5) as u8;
        for (difficulty, base) in [60u8, 72, 84, 96].into_iter().enumerate() {
            let delta = if difficulty == 0 && index > 0 { step / 2 } else { 0 };
            body.extend(encode_vlq(delta));
            if first {
                body.push(0x90);
                first = false;
            }
            body.extend_from_slice(&[base + lane, 100]);
        }
        for (difficulty, base) in [60u8, 72, 84, 96].into_iter().enumerate() {
            let delta = if difficulty == 0 { step / 2 } else { 0 };
            body.extend(encode_vlq(delta));
            body.extend_from_slice(&[base + lane, 0]);
        }
    }
    body.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    chunk(&body)
}

fn synthetic_song(notes: u32) -> Vec<u8> {
    let mut sync = vec![0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20];
    sync.extend_from_slice(&[0x00, 0xFF, 0x58, 0x04, 0x04, 0x02, 0x18, 0x08]);
    sync.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    let names = ["PART GUITAR", "PART BASS", "PART RHYTHM", "PART KEYS"];
    let mut bytes = b"MThd".to_vec();
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&(names.len() as u16 + 1).to_be_bytes());
    bytes.extend_from_slice(&TICK_RATE.to_be_bytes());
    bytes.extend(chunk(&sync));
    for name in names {
        bytes.extend(fret_track(name, notes));
    }
    bytes
}

fn bench_parse_midi(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_midi");
    let settings = ParseSettings::default();

    for notes in [1_000, 10_000] {
        let song = synthetic_song(notes);
        group.throughput(Throughput::Bytes(song.len() as u64));
        group.bench_function(format!("{notes}_notes"), |b| {
            b.iter(|| {
                SongChart::from_midi(
                    std::hint::black_box(&song),
                    std::hint::black_box(&settings),
                )
            });
        });
    }

    group.finish();
}

fn main() {
    let mut criterion = Criterion::default();
    bench_parse_midi(&mut criterion);
}
