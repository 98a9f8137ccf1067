use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glyphline::{LineHeight, MonoFonts, TextLayer, TextStyle};
use std::sync::Arc;

fn wrapped_layer(width: i32) -> TextLayer {
    let mut layer = TextLayer::new(Arc::new(MonoFonts::new()));
    layer.set_style(TextStyle {
        pixel_size: 20,
        ..TextStyle::default()
    });
    layer.set_line_height(LineHeight::Px(24));
    layer.set_multiline(true);
    layer.set_autowrap(true);
    layer.set_fixed_size(width, 0);
    layer
}

fn paragraph(words: usize) -> String {
    let mut text = String::new();
    for i in 0..words {
        if i % 12 == 11 {
            text.push('\n');
        } else if i > 0 {
            text.push(' ');
        }
        text.push_str("lorem");
    }
    text
}

fn bench_append_and_wrap(c: &mut Criterion) {
    let text = paragraph(400);
    c.bench_function("append_and_wrap_400_words", |b| {
        b.iter(|| {
            let mut layer = wrapped_layer(600);
            layer.append_text(black_box(&text), None).unwrap();
            layer.update().unwrap();
            black_box(layer.row_count())
        });
    });
}

fn bench_rewrap_on_resize(c: &mut Criterion) {
    let text = paragraph(400);
    c.bench_function("rewrap_on_resize", |b| {
        let mut layer = wrapped_layer(600);
        layer.append_text(&text, None).unwrap();
        layer.update().unwrap();
        let mut narrow = false;
        b.iter(|| {
            narrow = !narrow;
            layer.set_fixed_size(if narrow { 300 } else { 600 }, 0);
            layer.update().unwrap();
            black_box(layer.row_count())
        });
    });
}

fn bench_incremental_edits(c: &mut Criterion) {
    let text = paragraph(400);
    c.bench_function("insert_delete_churn", |b| {
        let mut layer = wrapped_layer(600);
        layer.append_text(&text, None).unwrap();
        layer.update().unwrap();
        let last = layer.row_count() - 1;
        b.iter(|| {
            layer.set_caret(last, 0);
            layer.insert_text("x", None).unwrap();
            layer.update().unwrap();
            layer.backspace(1).unwrap();
            layer.update().unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_append_and_wrap,
    bench_rewrap_on_resize,
    bench_incremental_edits
);
criterion_main!(benches);
