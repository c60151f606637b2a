use criterion::{black_box, criterion_group, criterion_main, Criterion};
use token_window::{
    ApproximateCounter, EvictionStrategy, InMemoryChatHistory, Message, MessageWindow, Prospective,
    Retrospective, TrimPolicy, WindowConfig,
};

fn conversation(turns: usize) -> Vec<Message> {
    (0..turns)
        .flat_map(|i| {
            [
                Message::human(format!("Question {} about the quarterly report figures", i)),
                Message::ai(format!("Answer {} summarizing revenue, costs and the outlook", i)),
            ]
        })
        .collect()
}

fn retrospective_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let counter = ApproximateCounter::default();
    let history = conversation(50);

    c.bench_function("retrospective trim 100 messages", |b| {
        b.to_async(&runtime).iter(|| async {
            Retrospective
                .trim(black_box(history.clone()), None, 400, &counter)
                .await
                .unwrap();
        });
    });
}

fn prospective_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let counter = ApproximateCounter::default();
    let history = conversation(50);
    let pending = Message::human("What changed since last quarter?");

    c.bench_function("prospective trim 100 messages", |b| {
        b.to_async(&runtime).iter(|| async {
            Prospective
                .trim(black_box(history.clone()), Some(&pending), 400, &counter)
                .await
                .unwrap();
        });
    });
}

fn window_load_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let window = MessageWindow::new(
        InMemoryChatHistory::with_messages(conversation(50)),
        ApproximateCounter::default(),
        WindowConfig::default()
            .with_budget(400)
            .with_policy(TrimPolicy::Prospective),
    )
    .unwrap();

    c.bench_function("window load transcript", |b| {
        b.to_async(&runtime).iter(|| async {
            window
                .load_trimmed(black_box(Some("What changed since last quarter?")))
                .await
                .unwrap();
        });
    });
}

criterion_group!(
    benches,
    retrospective_benchmark,
    prospective_benchmark,
    window_load_benchmark
);
criterion_main!(benches);
