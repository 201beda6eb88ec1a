use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use inference::postprocessing::PostProcessor;
use inference::preprocessing::{PreProcessor, TransformParams};
use ndarray::{Array, IxDyn};

const NUM_CLASSES: usize = 80;
const NUM_ANCHORS: usize = 8400;

/// Create mock YOLOv8 output with N high-confidence anchors spread over the image
fn create_mock_yolo_output(num_detections: usize) -> Array<f32, IxDyn> {
    let rows = 4 + NUM_CLASSES;
    let mut data = vec![0.01f32; rows * NUM_ANCHORS];

    for i in 0..num_detections.min(NUM_ANCHORS) {
        let col = (i * 37) % 600 + 20;
        let row = (i * 53) % 600 + 20;
        data[i] = col as f32;
        data[NUM_ANCHORS + i] = row as f32;
        data[2 * NUM_ANCHORS + i] = 40.0;
        data[3 * NUM_ANCHORS + i] = 40.0;
        data[(4 + i % NUM_CLASSES) * NUM_ANCHORS + i] = 0.9;
    }

    Array::from_shape_vec(IxDyn(&[1, rows, NUM_ANCHORS]), data).unwrap()
}

fn benchmark_postprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("postprocessing");

    let postprocessor = PostProcessor::new(0.25, 0.7, 300);
    let transform = TransformParams {
        orig_width: 1280,
        orig_height: 720,
        input_width: 640,
        input_height: 640,
        scale: 0.5,
        offset_x: 0.0,
        offset_y: 140.0,
    };

    for num_detections in [0usize, 10, 100, 1000] {
        let predictions = create_mock_yolo_output(num_detections);

        group.bench_with_input(
            BenchmarkId::new("yolov8_decode_nms", num_detections),
            &predictions,
            |b, predictions| {
                b.iter(|| {
                    postprocessor
                        .parse_detections(black_box(&predictions.view()), black_box(&transform))
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

fn benchmark_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");

    let preprocessor = PreProcessor::new((640, 640));
    let resolutions = [(640, 480), (1280, 720), (1920, 1080)];

    for (width, height) in resolutions.iter() {
        let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            *width,
            *height,
            image::Rgb([128, 128, 128]),
        ));

        group.bench_with_input(
            BenchmarkId::new("letterbox", format!("{}x{}", width, height)),
            &image,
            |b, image| b.iter(|| preprocessor.preprocess(black_box(image)).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_postprocessing, benchmark_preprocessing);
criterion_main!(benches);
