//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use resiliflow::prelude::*;
use std::future::ready;
use std::sync::Arc;

fn layered_pipeline() -> ResiliencePipeline<u64> {
    let mut builder = ResiliencePipelineBuilder::<u64>::new();
    builder
        .continue_on_error()
        .add_retry(RetryOptions::new().with_base_delay_ms(0))
        .add_timeout(TimeoutOptions::new());
    builder.build().expect("valid pipeline")
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("tokio runtime");

    let empty = ResiliencePipelineBuilder::<u64>::new().build().expect("valid pipeline");
    c.bench_function("empty_pipeline", |b| {
        b.iter(|| runtime.block_on(empty.run(|_| Box::pin(ready(Ok(black_box(42)))))))
    });

    let layered = layered_pipeline();
    c.bench_function("continue_retry_timeout", |b| {
        b.iter(|| runtime.block_on(layered.run(|_| Box::pin(ready(Ok(black_box(42)))))))
    });

    let pool = ContextPool::new();
    c.bench_function("pooled_context_execute", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut ctx = pool.acquire(CancellationToken::new());
                let outcome = layered
                    .execute(|_| Box::pin(ready(Ok(black_box(42)))), &mut ctx)
                    .await;
                ctx.release();
                outcome
            })
        })
    });

    let mut registry = PipelineRegistry::<()>::new();
    registry
        .register("orders", |builder| {
            builder.continue_on_error();
        })
        .expect("valid pipeline");
    let adapter = ResilienceExecutionStrategy::new("orders", Arc::new(registry));
    c.bench_function("adapter_execute", |b| {
        b.iter(|| {
            runtime.block_on(adapter.execute(
                message_action(|_| Box::pin(ready(Ok(())))),
                MessageContext::new("OrderPlaced"),
                CancellationToken::new(),
            ))
        })
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
