// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for tensor operations at classifier-head sizes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tensor_core::{global_avg_pool, matmul, softmax, Shape, Tensor};

fn bench_matmul(c: &mut Criterion) {
    // MobileNet-style head: 1280 features → 1001 classes.
    let lhs = Tensor::from_vec(Shape::matrix(1, 1280), vec![0.5; 1280]).unwrap();
    let rhs = Tensor::from_vec(Shape::matrix(1280, 1001), vec![0.01; 1280 * 1001]).unwrap();
    let mut out = Tensor::zeros(Shape::matrix(1, 1001));

    c.bench_function("matmul 1x1280 @ 1280x1001", |b| {
        b.iter(|| matmul(black_box(&lhs.view()), black_box(&rhs.view()), &mut out).unwrap())
    });
}

fn bench_softmax(c: &mut Criterion) {
    let logits: Vec<f32> = (0..1001).map(|i| (i % 17) as f32 * 0.1).collect();
    let input = Tensor::from_vec(Shape::matrix(1, 1001), logits).unwrap();
    let mut out = Tensor::zeros(Shape::matrix(1, 1001));

    c.bench_function("softmax 1x1001", |b| {
        b.iter(|| softmax(black_box(&input.view()), &mut out).unwrap())
    });
}

fn bench_global_avg_pool(c: &mut Criterion) {
    let shape = Shape::new(vec![1, 224, 224, 3]);
    let input = Tensor::from_vec(shape.clone(), vec![128.0; shape.num_elements()]).unwrap();
    let mut out = Tensor::zeros(Shape::matrix(1, 3));

    c.bench_function("global_avg_pool 1x224x224x3", |b| {
        b.iter(|| global_avg_pool(black_box(&input.view()), &mut out).unwrap())
    });
}

criterion_group!(benches, bench_matmul, bench_softmax, bench_global_avg_pool);
criterion_main!(benches);
