//! Benchmarks for terrain operations

use aquascreen_core::crs::Crs;
use aquascreen_core::{GeoTransform, Raster};
use aquascreen_terrain::convert::ConvertParams;
use aquascreen_terrain::slope::{slope, SlopeParams};
use aquascreen_terrain::warp::{warp, WarpParams};
use aquascreen_terrain::convert_slope_units;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn create_dem(size: usize) -> Raster<f64> {
    let mut dem = Raster::new(size, size);
    dem.set_transform(GeoTransform::new(440_000.0, 4_475_000.0, 30.0, -30.0));
    dem.set_crs(Some(Crs::from_epsg(32630)));

    // Varied surface: base plane plus a noise-like pattern
    for row in 0..size {
        for col in 0..size {
            let base = (row + col) as f64;
            let variation = ((row * 7 + col * 13) % 100) as f64 / 10.0;
            dem.set(row, col, base + variation).unwrap();
        }
    }
    dem
}

fn bench_slope(c: &mut Criterion) {
    let mut group = c.benchmark_group("slope");

    for size in [256, 512, 1024].iter() {
        let dem = create_dem(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| slope(black_box(&dem), SlopeParams::default()).unwrap())
        });
    }

    group.finish();
}

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_slope_units");

    for size in [512, 1024].iter() {
        let deg = slope(&create_dem(*size), SlopeParams::default()).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                convert_slope_units(black_box(&deg), ConvertParams::default()).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_warp(c: &mut Criterion) {
    let mut group = c.benchmark_group("warp_to_wgs84");
    group.sample_size(20);

    for size in [256, 512].iter() {
        let dem = create_dem(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| warp(black_box(&dem), WarpParams::default()).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_slope, bench_convert, bench_warp);
criterion_main!(benches);
