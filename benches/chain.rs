use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use crunchbox::amp::chain::AmplifierChain;
use crunchbox::amp::params::ParamSnapshot;
use crunchbox::amp::stages::waveshaper::AmpType;
use crunchbox::processor::{Processor, StreamFormat};
use std::hint::black_box;

const SAMPLE_RATE: f32 = 48_000.0;
const BUFFER_SIZE: usize = 128;

fn test_signal(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i as f32 * 0.07).sin() * 0.8).collect()
}

fn bench_amp_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("Stereo Chain");

    for amp_type in AmpType::ALL {
        let params = ParamSnapshot {
            gain: 60.0,
            tone_hz: 4_000.0,
            volume: 0.7,
            amp_type,
        };

        group.bench_with_input(
            BenchmarkId::new("sample-by-sample", amp_type),
            &params,
            |b, params| {
                let mut chain = AmplifierChain::new(2, SAMPLE_RATE, params);
                let input = test_signal(BUFFER_SIZE);

                b.iter(|| {
                    for &sample in &input {
                        black_box(chain.process(0, black_box(sample)));
                        black_box(chain.process(1, black_box(sample)));
                    }
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("block", amp_type), &params, |b, params| {
            let mut chain = AmplifierChain::new(2, SAMPLE_RATE, params);
            let mut left = test_signal(BUFFER_SIZE);
            let mut right = test_signal(BUFFER_SIZE);

            b.iter(|| {
                chain.process_block(black_box(&mut [left.as_mut_slice(), right.as_mut_slice()]));
                black_box(&left);
            });
        });
    }

    group.finish();
}

fn bench_processor(c: &mut Criterion) {
    let mut group = c.benchmark_group("Processor");

    for &buffer_size in &[64usize, 128, 512, 1024] {
        group.bench_with_input(
            BenchmarkId::new("planar", buffer_size),
            &buffer_size,
            |b, &buffer_size| {
                let mut processor = Processor::default();
                processor.params().set_amp_type(AmpType::Lead);
                processor.setup(StreamFormat {
                    sample_rate: SAMPLE_RATE,
                    max_block_size: buffer_size,
                    channels: 2,
                });
                let mut left = test_signal(buffer_size);
                let mut right = test_signal(buffer_size);

                b.iter(|| {
                    processor.process_block(black_box(&mut [
                        left.as_mut_slice(),
                        right.as_mut_slice(),
                    ]));
                    black_box(&left);
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("interleaved", buffer_size),
            &buffer_size,
            |b, &buffer_size| {
                let mut processor = Processor::default();
                processor.params().set_amp_type(AmpType::Lead);
                processor.setup(StreamFormat {
                    sample_rate: SAMPLE_RATE,
                    max_block_size: buffer_size,
                    channels: 2,
                });
                let mut buffer = test_signal(buffer_size * 2);

                b.iter(|| {
                    processor.process_interleaved(black_box(&mut buffer));
                    black_box(&buffer);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_amp_types, bench_processor);
criterion_main!(benches);
