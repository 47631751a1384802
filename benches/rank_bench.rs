use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nasimport::catalog::OfflineCatalog;
use nasimport::classify::FilenameClassifier;
use nasimport::library::{match_entries, MediaLibrary};
use nasimport::ranking::CandidateRanker;
use nasimport::resolver::{MetadataCache, MetadataResolver};
use std::sync::Arc;
use tokio::runtime::Runtime;

const FILE_NAMES: &[&str] = &[
    "the.wire.s01e02.720p.mkv",
    "Show_Name_2009_S03E11_HDTV.avi",
    "planet.earth.2006.part.3.mkv",
    "some.documentary.pt2.mp4",
    "Heat.1995.1080p.BluRay.x264.mkv",
    "show.1x01.mkv",
    "random.home.video.mov",
];

fn create_library_names(size: usize) -> Vec<String> {
    (0..size)
        .map(|i| format!("Test Show {} ({})", i, 1990 + (i % 30)))
        .collect()
}

fn bench_classification(c: &mut Criterion) {
    let classifier = FilenameClassifier::new().unwrap();

    c.bench_function("classify_all", |b| {
        b.iter(|| {
            for name in FILE_NAMES {
                black_box(classifier.classify_all(black_box(name)));
            }
        })
    });
}

fn bench_local_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_matching");

    for size in [100, 1000] {
        let entries = create_library_names(size);
        group.bench_function(format!("{}_entries", size), |b| {
            b.iter(|| black_box(match_entries(black_box(&entries), "test show 500")))
        });
    }

    group.finish();
}

fn bench_ranking(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let classifier = FilenameClassifier::new().unwrap();
    let classifications = classifier.classify_all("test.show.500.s01e02.mkv");

    let mut library = MediaLibrary::default();
    library.tv.dirs = create_library_names(1000);
    library.documentary.dirs = create_library_names(200);

    c.bench_function("rank_offline_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut resolver = MetadataResolver::new(
                    Arc::new(OfflineCatalog),
                    Arc::new(OfflineCatalog),
                    MetadataCache::new(),
                    5,
                );
                let ranked = CandidateRanker::new(5)
                    .rank(black_box(&classifications), &library, &mut resolver)
                    .await;
                black_box(ranked.len())
            })
        })
    });
}

criterion_group!(benches, bench_classification, bench_local_matching, bench_ranking);
criterion_main!(benches);
