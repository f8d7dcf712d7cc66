use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dssat_weather::raster::{ExtractionStrategy, GeoTransform, MemoryOpener, MemoryRaster, RasterExtractor, TimeAxis};
use dssat_weather::Location;

const WIDTH: usize = 200;
const HEIGHT: usize = 100;
const DAYS_PER_FILE: usize = 31;

fn raster(first_offset: i64) -> MemoryRaster {
    MemoryRaster {
        time_axis: TimeAxis::from_units(
            "days since 1980-1-1 0:0:0",
            (0..DAYS_PER_FILE as i64).map(|d| first_offset + d).collect(),
        )
        .unwrap(),
        transform: GeoTransform {
            origin_x: -10.0,
            pixel_width: 0.05,
            origin_y: 5.0,
            pixel_height: -0.05,
        },
        width: WIDTH,
        height: HEIGHT,
        no_data: Some(-9999.0),
        bands: (0..DAYS_PER_FILE)
            .map(|b| (0..WIDTH * HEIGHT).map(|c| ((b + c) % 50) as f32 / 10.0).collect())
            .collect(),
    }
}

fn bench_strategies(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut opener = MemoryOpener::new();
    for month in 0..6 {
        let name = format!("corr_chirps_2023{:02}.nc", month + 1);
        std::fs::write(dir.path().join(&name), b"").unwrap();
        opener.insert(name, raster(15706 + (month * DAYS_PER_FILE) as i64));
    }
    let locations: Vec<Location> = (0..500)
        .map(|i| Location {
            id: i,
            external_point_id: i,
            latitude: 4.9 - (i % 90) as f64 * 0.05,
            longitude: -9.9 + (i / 90) as f64 * 0.3,
            point_latitude: 0.0,
            point_longitude: 0.0,
        })
        .collect();
    let extractor = RasterExtractor::new(&opener);

    c.bench_function("extract_per_location", |b| {
        b.iter(|| extractor.extract(dir.path(), black_box(&locations), ExtractionStrategy::PerLocation))
    });
    c.bench_function("extract_whole_grid", |b| {
        b.iter(|| extractor.extract(dir.path(), black_box(&locations), ExtractionStrategy::WholeGrid))
    });
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
