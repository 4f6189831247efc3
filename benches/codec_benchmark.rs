use ammeter_gateway::dlt645::{Control, Data, Dlt645Frame, Identifier};
use ammeter_gateway::transport::{Frame, FrameCodec, MessageCode, Montage, Sequence};
use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio_util::codec::Decoder;

fn meter_response() -> Vec<u8> {
    Dlt645Frame {
        address: "220419093277".parse().unwrap(),
        control: Control::from(0x91),
        data: Data::new(
            Identifier::CURRENT,
            vec![0x00, 0x15, 0x00, 0x50, 0x02, 0x00, 0x01, 0x00, 0x00],
        ),
    }
    .encode()
    .unwrap()
}

fn passthrough_wire() -> BytesMut {
    let mut montage = Montage::new();
    montage.push_field(vec![1]).push_field(meter_response());
    Frame::new(
        0x00,
        Sequence([1, 2, 3, 4]),
        MessageCode::PASSTHROUGH_UPLINK,
        Bytes::from(montage.compose().unwrap()),
    )
    .build()
    .unwrap()
}

fn benchmark_frame_decode(c: &mut Criterion) {
    let wire = passthrough_wire();
    let mut codec = FrameCodec::new();

    c.bench_function("frame_decode", |b| {
        b.iter(|| {
            let mut buf = wire.clone();
            let _ = black_box(codec.decode(black_box(&mut buf)));
        })
    });
}

fn benchmark_meter_parse(c: &mut Criterion) {
    let raw = meter_response();

    c.bench_function("meter_parse_and_read", |b| {
        b.iter(|| {
            let frame = Dlt645Frame::parse(black_box(&raw));
            let _ = black_box(frame.map(|f| f.data.reading()));
        })
    });
}

criterion_group!(benches, benchmark_frame_decode, benchmark_meter_parse);
criterion_main!(benches);
