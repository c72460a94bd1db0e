use bytes::Bytes;

use bulkstream_writer::{drive, DocumentGenerator, IndexAdmin, StreamingBulkWriter};

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Chunking
// ══════════════════════════════════════════════════════════════════════════════

/// Uneven block sizes under a small threshold: every chunk boundary lands
/// on the write after the buffered size crossed the limit, and the bytes
/// on the wire are exactly the blocks, in order.
#[tokio::test]
async fn chunks_split_where_buffered_size_crosses_threshold() {
    let mock = MockBulk::start().await;
    let max = 300;
    let blocks: Vec<Bytes> = (1..=40).map(|i| block(i, (i % 7) * 25)).collect();

    let writer = StreamingBulkWriter::new(mock.url()).max_chunk_size(max);
    let mut reports = Vec::new();
    for b in &blocks {
        if let Some(report) = writer.write(b.clone()).await.unwrap() {
            reports.push(report);
        }
    }
    reports.extend(writer.close().await.unwrap());

    let expected = expected_chunks(&blocks, max);
    let bodies = mock.bulk_bodies();
    assert!(expected.len() > 2, "threshold should split the stream");
    assert_eq!(bodies, expected);
    assert_eq!(concat(&bodies), concat(&blocks));

    assert_eq!(reports.len(), expected.len());
    for (report, body) in reports.iter().zip(&bodies) {
        assert_eq!(report.bytes, body.len() as u64);
        assert_eq!(report.items, action_count(body));
        assert!(!report.has_failures());
    }

    let stats = writer.stats().await;
    assert_eq!(stats.blocks, 40);
    assert_eq!(stats.commits, expected.len() as u64);
    assert_eq!(stats.bytes, concat(&blocks).len() as u64);
    assert_eq!(mock.doc_count(TEST_INDEX), 40);
}

/// Every committed chunk except the last is over the limit, but by less
/// than one block.
#[tokio::test]
async fn chunks_exceed_threshold_by_less_than_one_block() {
    let mock = MockBulk::start().await;
    let max = 256;
    let blocks: Vec<Bytes> = (1..=30).map(|i| block(i, 40)).collect();
    let longest = blocks.iter().map(Bytes::len).max().unwrap();

    let writer = StreamingBulkWriter::new(mock.url()).max_chunk_size(max);
    for b in &blocks {
        writer.write(b.clone()).await.unwrap();
    }
    writer.close().await.unwrap();

    let bodies = mock.bulk_bodies();
    let (last, full) = bodies.split_last().unwrap();
    assert!(!full.is_empty());
    for body in full {
        assert!(body.len() > max);
        assert!(body.len() - longest <= max);
    }
    assert!(!last.is_empty());
}

/// Blocks written under the threshold are only scheduled: no bulk request
/// completes until the chunk commits.
#[tokio::test]
async fn writes_under_threshold_do_not_commit() {
    let mock = MockBulk::start().await;
    let writer = StreamingBulkWriter::new(mock.url()).max_chunk_size(1 << 20);

    for i in 1..=10 {
        assert!(writer.write(block(i, 10)).await.unwrap().is_none());
    }
    assert!(mock.bulk_bodies().is_empty());

    let report = writer.close().await.unwrap().expect("close should commit");
    assert_eq!(report.items, 10);
    assert_eq!(mock.bulk_bodies().len(), 1);
}

/// A block bigger than the whole threshold is never truncated: it goes out
/// whole and, with the chunk before it already committed, on its own.
#[tokio::test]
async fn oversized_block_goes_out_whole() {
    let mock = MockBulk::start().await;
    let small = block(1, 0);
    let big = block(2, 4096);
    let tail = block(3, 0);

    let writer = StreamingBulkWriter::new(mock.url()).max_chunk_size(small.len() - 1);
    assert!(writer.write(small.clone()).await.unwrap().is_none());

    let report = writer.write(big.clone()).await.unwrap().expect("small chunk commits");
    assert_eq!(report.items, 1);

    let report = writer.write(tail.clone()).await.unwrap().expect("big chunk commits");
    assert_eq!(report.bytes, big.len() as u64);

    writer.close().await.unwrap();
    assert_eq!(
        mock.bulk_bodies(),
        vec![small.to_vec(), big.to_vec(), tail.to_vec()]
    );
}

// ══════════════════════════════════════════════════════════════════════════════
//  Close
// ══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn close_with_nothing_buffered_sends_nothing() {
    let mock = MockBulk::start().await;
    let writer = StreamingBulkWriter::new(mock.url());

    assert!(writer.close().await.unwrap().is_none());
    assert!(writer.close().await.unwrap().is_none());

    assert!(mock.log().is_empty());
    assert_eq!(mock.flushes(), 0);
}

/// Close commits the open chunk first, then issues exactly one flush.
#[tokio::test]
async fn flush_follows_final_commit() {
    let mock = MockBulk::start().await;
    let writer = StreamingBulkWriter::new(mock.url()).max_chunk_size(64);

    for i in 1..=6 {
        writer.write(block(i, 20)).await.unwrap();
    }
    writer.close().await.unwrap().expect("final commit");

    let log = mock.log();
    assert_eq!(log.last().map(String::as_str), Some("POST /_flush"));
    assert_eq!(mock.flushes(), 1);
    assert!(log[..log.len() - 1].iter().all(|l| l == "POST /_bulk"));

    // Nothing left to commit, so a second close does not flush again.
    assert!(writer.close().await.unwrap().is_none());
    assert_eq!(mock.flushes(), 1);
}

// ══════════════════════════════════════════════════════════════════════════════
//  Generated documents end to end
// ══════════════════════════════════════════════════════════════════════════════

/// 100 one-field documents through a 1 KiB chunk limit: every document
/// lands in the index, and the commit count follows the threshold.
#[tokio::test]
async fn hundred_generated_documents_land_in_the_index() {
    let mock = MockBulk::start().await;
    let max = 1024;

    let mut generator = DocumentGenerator::new(TEST_INDEX, Some("testcase"), 1, 100);
    let writer = StreamingBulkWriter::new(mock.url()).max_chunk_size(max);

    let mut seen = 0;
    let summary = drive(&mut generator, &writer, |n| seen = n).await.unwrap();

    assert_eq!(seen, 100);
    assert_eq!(summary.blocks, 100);
    assert!(summary.failures.is_empty());

    let bodies = mock.bulk_bodies();
    assert_eq!(summary.commits, bodies.len() as u64);
    assert_eq!(summary.bytes, concat(&bodies).len() as u64);
    assert!(summary.commits as usize <= (summary.bytes as usize).div_ceil(max));
    assert!(summary.commits > 1);
    assert_eq!(mock.flushes(), 1);

    let admin = IndexAdmin::new(reqwest::Client::new(), mock.url());
    assert_eq!(admin.count(TEST_INDEX).await.unwrap(), 100);
}
