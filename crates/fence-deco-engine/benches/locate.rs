use criterion::{Criterion, criterion_group, criterion_main};
use fence_deco_config::Settings;
use fence_deco_engine::{
    EditorState, PluginContext, build_decorations, extract_callout_fence_entries,
    find_fence_line_for_code_block,
};
mod common;

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("locate");
    group.sample_size(10);

    let content = common::generate_callout_document(200);
    let code = common::last_block_code(200);
    group.bench_function("content_match_last_block", |b| {
        b.iter(|| {
            let line = find_fence_line_for_code_block(
                std::hint::black_box(&content),
                std::hint::black_box(&code),
                Some("python"),
                None,
            );
            std::hint::black_box(line);
        });
    });

    group.bench_function("callout_entries", |b| {
        b.iter(|| {
            let entries = extract_callout_fence_entries(std::hint::black_box(&content));
            std::hint::black_box(entries);
        });
    });

    group.finish();
}

fn bench_live_decorations(c: &mut Criterion) {
    let mut group = c.benchmark_group("live");
    group.sample_size(10);

    let ctx = PluginContext::activate(Settings {
        show_line_numbers: true,
        ..Settings::default()
    });
    let state = EditorState::new(&common::generate_markdown_content(100));
    group.bench_function("build_decorations", |b| {
        b.iter(|| {
            let set = ctx.with_env(|env| build_decorations(std::hint::black_box(&state), env));
            std::hint::black_box(set);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_locate, bench_live_decorations);
criterion_main!(benches);
