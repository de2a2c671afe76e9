use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kvikk::parser::RequestParser;

const REQ: &[u8] = b"\
GET /index.html HTTP/1.1\r\n\
Host: www.example.org\r\n\r\n";

const REQ_MED: &[u8] = b"\
GET /api/v1.0/weather/forecast HTTP/1.1\r\n\
Accept:*/*\r\n\
Accept-Encoding:gzip,deflate,br\r\n\
Accept-Language:en-US,en;q=0.5\r\n\
Cache-Control:no-cache\r\n\
Connection:keep-alive\r\n\
Host: www.example.org\r\n\
Pragma:no-cache\r\n\
User-Agent:Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/109.0\r\n\r\n";

const REQ_ABS: &[u8] = b"\
GET http://localhost/wp-content/uploads/2010/03/banner.jpg HTTP/1.1\r\n\
Host: www.example.org\r\n\
Accept: text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8\r\n\
Accept-Language: ja,en-us;q=0.7,en;q=0.3\r\n\
Connection: keep-alive\r\n\r\n";

fn benchmark(c: &mut Criterion) {
    let inputs = [REQ, REQ_MED, REQ_ABS];

    let mut group = c.benchmark_group("parse");
    for &input in inputs.iter() {
        let mut buf = [0u8; 2048];
        buf[..input.len()].copy_from_slice(input);
        let len = input.len();

        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("all", len as u64), &buf, |b, buf| {
            b.iter(|| {
                let mut parser = RequestParser::new();
                parser.advance(buf, len)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
