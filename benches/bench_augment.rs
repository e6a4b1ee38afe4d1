use criterion::{Criterion, criterion_group, criterion_main};

use codecopy_lib::augmentor::Augmentor;
use codecopy_lib::clipboard::RecordingClipboard;
use codecopy_lib::config::Settings;
use codecopy_lib::html;

fn tutorial_page(blocks: usize) -> String {
    let mut page = String::from("<!DOCTYPE html><html><body>");
    for i in 0..blocks {
        page.push_str("<h2>Section</h2><p>Some prose about <code>traits</code>.</p>");
        if i % 2 == 0 {
            page.push_str(r#"<div class="highlight"><pre class="highlight"><code>"#);
        } else {
            page.push_str("<pre><code>");
        }
        page.push_str("impl Iterator for Counter {\n    type Item = u32;\n}");
        page.push_str("</code></pre>");
        if i % 2 == 0 {
            page.push_str("</div>");
        }
    }
    page.push_str("</body></html>");
    page
}

fn bench_augment_page(c: &mut Criterion) {
    let source = tutorial_page(200);
    let aug = Augmentor::new(Settings::default(), RecordingClipboard::new());
    c.bench_function("augment_200_blocks", |b| {
        b.iter(|| {
            let mut page = html::parse(&source);
            let _ = aug.run(&mut page);
        })
    });
}

fn bench_parse_serialize(c: &mut Criterion) {
    let source = tutorial_page(200);
    c.bench_function("parse_serialize_200_blocks", |b| {
        b.iter(|| html::serialize(&html::parse(&source)))
    });
}

criterion_group!(benches, bench_augment_page, bench_parse_serialize);
criterion_main!(benches);
