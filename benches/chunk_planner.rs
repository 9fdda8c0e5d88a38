use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use doc_qa::context::{
    ChunkPlanner, ChunkPolicy, PromptFrame, QuestionPlacement, TiktokenTokenizer, TokenBudget,
    TokenEncoding,
};
use std::sync::Arc;

fn bench_plan(c: &mut Criterion) {
    let tokenizer = Arc::new(TiktokenTokenizer::new(TokenEncoding::Cl100kBase).unwrap());
    let document = "The quick brown fox jumps over the lazy dog. ".repeat(2_000);
    let input = PromptFrame::default().combine(&document, "What does the fox do?");
    let budget = TokenBudget::fixed(512, 8192, 1024).unwrap();

    let mut group = c.benchmark_group("plan");
    for placement in [QuestionPlacement::Combined, QuestionPlacement::EveryChunk] {
        let planner = ChunkPlanner::new(tokenizer.clone(), ChunkPolicy::Split, placement);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", placement)),
            &input,
            |b, input| b.iter(|| planner.plan(black_box(input), &budget).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_plan);
criterion_main!(benches);
