use std::collections::BTreeSet;
use std::sync::Arc;

use bulkstream_core::bulk::Action;
use bulkstream_writer::StreamingBulkWriter;

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Concurrent writes
// ══════════════════════════════════════════════════════════════════════════════

const TASKS: usize = 8;
const BLOCKS_PER_TASK: usize = 25;

/// Several tasks share one writer on a multi-thread runtime. Every chunk
/// body must still be whole action/document pairs and every document
/// must land exactly once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_keep_blocks_whole() {
    let mock = MockBulk::start().await;
    let writer = Arc::new(StreamingBulkWriter::new(mock.url()).max_chunk_size(500));

    let mut handles = Vec::new();
    for task in 0..TASKS {
        let writer = Arc::clone(&writer);
        handles.push(tokio::spawn(async move {
            for i in 0..BLOCKS_PER_TASK {
                let id = task * 1000 + i + 1;
                writer.write(block(id, (id % 5) * 30)).await.unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    writer.close().await.unwrap();

    let total = TASKS * BLOCKS_PER_TASK;
    let bodies = mock.bulk_bodies();
    assert!(bodies.len() > 1);

    let mut ids = BTreeSet::new();
    for body in &bodies {
        let lines: Vec<&[u8]> = body.split(|b| *b == b'\n').collect();
        // Trailing newline leaves one empty piece at the end.
        assert_eq!(lines.last(), Some(&&b""[..]));
        let lines = &lines[..lines.len() - 1];
        assert_eq!(lines.len() % 2, 0, "body split inside a block");

        for pair in lines.chunks(2) {
            let action: Action = serde_json::from_slice(pair[0]).expect("action line");
            let doc: serde_json::Value = serde_json::from_slice(pair[1]).expect("document line");
            let id = action.meta().id.clone().expect("action id");
            assert_eq!(doc["n"].to_string(), id);
            assert!(ids.insert(id), "document sent twice");
        }
    }
    assert_eq!(ids.len(), total);

    let stats = writer.stats().await;
    assert_eq!(stats.blocks, total as u64);
    assert_eq!(stats.commits, bodies.len() as u64);
    assert_eq!(stats.bytes, concat(&bodies).len() as u64);
    assert_eq!(mock.doc_count(TEST_INDEX), total as u64);
    assert_eq!(mock.flushes(), 1);
}
