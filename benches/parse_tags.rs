use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::io::{Cursor, Write};

use mp3tag::id3::tags::FrameTable;
use mp3tag::{Mp3FrameType, TagStore};

fn syncsafe(n: u32) -> [u8; 4] {
    [
        ((n >> 21) & 0x7F) as u8,
        ((n >> 14) & 0x7F) as u8,
        ((n >> 7) & 0x7F) as u8,
        (n & 0x7F) as u8,
    ]
}

/// A v2.4 frame section with one frame per text field plus a few comments.
fn frame_section() -> Vec<u8> {
    let mut out = Vec::new();
    let mut push = |id: &[u8; 4], payload: &[u8]| {
        out.extend_from_slice(id);
        out.extend_from_slice(&syncsafe(payload.len() as u32));
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(payload);
    };

    for frame_type in Mp3FrameType::text_types() {
        let mut payload = vec![0u8];
        payload.extend_from_slice(format!("{} value", frame_type.frame_id_str()).as_bytes());
        push(frame_type.frame_id(), &payload);
    }
    for i in 0..4 {
        push(b"COMM", format!("\x00eng\x00comment {}", i).as_bytes());
    }
    push(b"PRIV", b"owner\x00\x01\x02\x03\x04");
    out.resize(out.len() + 1024, 0);
    out
}

fn tagged_file(section: &[u8]) -> Vec<u8> {
    let mut out = vec![b'I', b'D', b'3', 4, 0, 0];
    out.extend_from_slice(&syncsafe(section.len() as u32));
    out.extend_from_slice(section);
    out.extend((0..256 * 1024u32).map(|i| (i % 251) as u8));
    out
}

fn bench_frame_table(c: &mut Criterion) {
    let section = frame_section();
    c.bench_function("frame_table_parse", |b| {
        b.iter(|| FrameTable::parse(black_box(section.clone()), 4))
    });

    let table = FrameTable::parse(section.clone(), 4);
    c.bench_function("frame_table_get_text", |b| {
        b.iter(|| {
            for frame_type in Mp3FrameType::text_types() {
                black_box(table.get_text(frame_type));
            }
        })
    });

    c.bench_function("frame_table_write", |b| {
        let mut table = FrameTable::parse(section.clone(), 4);
        table.set_text(Mp3FrameType::Title, "Benchmark title").unwrap();
        let mut out = Cursor::new(Vec::with_capacity(section.len()));
        b.iter(|| {
            out.set_position(0);
            table.write_to(&mut out).unwrap();
        })
    });
}

fn bench_store(c: &mut Criterion) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&tagged_file(&frame_section())).unwrap();
    file.flush().unwrap();

    c.bench_function("tag_store_load", |b| {
        let mut store = TagStore::new();
        b.iter(|| store.load(black_box(file.path())).unwrap())
    });
}

criterion_group!(benches, bench_frame_table, bench_store);
criterion_main!(benches);
