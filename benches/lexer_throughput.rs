use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use synform::csv_lexer::CsvTextLexer;
use synform::ini_lexer::IniTextLexer;
use synform::lexer::Lexer;
use synform::syntax::csv::rfc4180;
use synform::syntax::ini::unix;

fn generate_csv(rows: usize) -> String {
    let mut out = String::from("id,ordered_at,status\r\n");
    for i in 0..rows {
        out.push_str(&format!("{i},2024-01-{:02},shipped\r\n", (i % 28) + 1));
    }
    out
}

fn generate_ini(sections: usize) -> String {
    let mut out = String::new();
    for i in 0..sections {
        out.push_str(&format!("[section{i}]\nkey_a = value_{i}\nkey_b = value_{i}\n"));
    }
    out
}

fn bench_csv_lexer_chunk_sizes(c: &mut Criterion) {
    let input = generate_csv(20_000);
    let mut group = c.benchmark_group("csv_lexer_throughput");

    for chunk_size in [64usize, 4096, 65536] {
        group.bench_function(format!("chunk_{chunk_size}"), |b| {
            b.iter_batched(
                || rfc4180().unwrap(),
                |syntax| {
                    let mut lexer = CsvTextLexer::new(syntax);
                    for chunk in chunk_str(&input, chunk_size) {
                        lexer.process(chunk).expect("process chunk");
                    }
                    lexer.end().expect("end lexer");
                    while lexer.has_tokens() {
                        lexer.next();
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_ini_lexer_chunk_sizes(c: &mut Criterion) {
    let input = generate_ini(5_000);
    let mut group = c.benchmark_group("ini_lexer_throughput");

    for chunk_size in [64usize, 4096, 65536] {
        group.bench_function(format!("chunk_{chunk_size}"), |b| {
            b.iter_batched(
                || unix().unwrap(),
                |syntax| {
                    let mut lexer = IniTextLexer::new(syntax);
                    for chunk in chunk_str(&input, chunk_size) {
                        lexer.process(chunk).expect("process chunk");
                    }
                    lexer.end().expect("end lexer");
                    while lexer.has_tokens() {
                        lexer.next();
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn chunk_str(input: &str, size: usize) -> Vec<&str> {
    let bytes = input.as_bytes();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < bytes.len() {
        let mut end = (start + size).min(bytes.len());
        while end < bytes.len() && !input.is_char_boundary(end) {
            end += 1;
        }
        chunks.push(&input[start..end]);
        start = end;
    }
    chunks
}

criterion_group!(benches, bench_csv_lexer_chunk_sizes, bench_ini_lexer_chunk_sizes);
criterion_main!(benches);
