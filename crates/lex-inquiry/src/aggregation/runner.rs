//! Generic bulk-synchronous map-reduce runner.
//!
//! Each stage maps the input partitions on scoped worker threads, waits for
//! every worker (barrier), shuffles the emitted pairs into key order, reduces
//! the key groups on worker threads and waits again. Nothing from a stage is
//! visible to the next one until the whole stage has completed, and any
//! failure discards the run.

use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, error};

use crate::aggregation::encoding::EncodedTable;
use crate::aggregation::progress::{AggregationStage, StageObserver, StageUpdate};
use crate::aggregation::stages::{AggKey, AggValue, Pair, StageDescriptor};
use crate::error::{InquiryError, Result};

pub(crate) struct BspRunner<'a> {
    table: &'a EncodedTable,
    workers: usize,
    timeout: Option<Duration>,
    observer: Option<&'a dyn StageObserver>,
}

impl<'a> BspRunner<'a> {
    pub(crate) fn new(table: &'a EncodedTable, workers: usize) -> Self {
        Self {
            table,
            workers: workers.max(1),
            timeout: None,
            observer: None,
        }
    }

    pub(crate) fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn with_observer(mut self, observer: Option<&'a dyn StageObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run every stage in order, feeding each stage's output to the next.
    pub(crate) fn run(&self, stages: &[StageDescriptor], input: Vec<Pair>) -> Result<Vec<Pair>> {
        let started = Instant::now();
        let mut pairs = input;

        for descriptor in stages {
            let stage = descriptor.stage;
            let span = debug_span!("aggregation_stage", stage = stage.display_name());
            let _guard = span.enter();

            pairs = match self.run_stage(descriptor, &pairs) {
                Ok(output) => output,
                Err(e) => {
                    error!("Aggregation stage '{}' failed: {}", stage, e);
                    self.report(StageUpdate::failed(e.to_string()));
                    return Err(e);
                }
            };

            let elapsed = started.elapsed();
            if let Some(timeout) = self.timeout
                && elapsed >= timeout
            {
                let e = InquiryError::PipelineTimeout {
                    stage: stage.display_name().to_string(),
                    elapsed_ms: elapsed.as_millis(),
                };
                error!("{}", e);
                self.report(StageUpdate::failed(e.to_string()));
                return Err(e);
            }

            debug!("{} produced {} pairs", stage, pairs.len());
            self.report(StageUpdate::finished(stage, pairs.len()));
        }

        Ok(pairs)
    }

    fn run_stage(&self, descriptor: &StageDescriptor, input: &[Pair]) -> Result<Vec<Pair>> {
        let stage = descriptor.stage;
        let map = descriptor.map;
        let reduce = descriptor.reduce;
        let table = self.table;

        // Map: one partition of the input per worker.
        let mapped: Vec<Vec<Pair>> = self.on_workers(stage, input, |chunk| {
            let mut out = Vec::with_capacity(chunk.len());
            for pair in chunk {
                map(table, pair, &mut out);
            }
            Ok(out)
        })?;

        // Shuffle: partitions are merged in order, so each key sees its values
        // in input order whatever the worker count.
        let mut groups: BTreeMap<AggKey, Vec<AggValue>> = BTreeMap::new();
        for (key, value) in mapped.into_iter().flatten() {
            groups.entry(key).or_default().push(value);
        }
        let groups: Vec<(AggKey, Vec<AggValue>)> = groups.into_iter().collect();

        // Reduce: key groups are partitioned across workers.
        let reduced: Vec<Vec<Pair>> = self.on_workers(stage, &groups, |chunk| {
            let mut out = Vec::with_capacity(chunk.len());
            for (key, values) in chunk {
                reduce(table, *key, values, &mut out)?;
            }
            Ok(out)
        })?;

        Ok(reduced.into_iter().flatten().collect())
    }

    /// Run `work` over `workers` contiguous partitions of `items` and wait for
    /// all of them. Results come back in partition order.
    fn on_workers<T, F>(&self, stage: AggregationStage, items: &[T], work: F) -> Result<Vec<Vec<Pair>>>
    where
        T: Sync,
        F: Fn(&[T]) -> std::result::Result<Vec<Pair>, String> + Sync,
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let chunk_size = items.len().div_ceil(self.workers);
        let work = &work;

        let results: Vec<thread::Result<std::result::Result<Vec<Pair>, String>>> =
            thread::scope(|scope| {
                let handles: Vec<_> = items
                    .chunks(chunk_size)
                    .map(|chunk| scope.spawn(move || work(chunk)))
                    .collect();
                handles.into_iter().map(|handle| handle.join()).collect()
            });

        results
            .into_iter()
            .map(|result| match result {
                Ok(Ok(pairs)) => Ok(pairs),
                Ok(Err(reason)) => Err(computation_failed(stage, reason)),
                Err(_) => Err(computation_failed(stage, "worker thread panicked".to_string())),
            })
            .collect()
    }

    fn report(&self, update: StageUpdate) {
        if let Some(observer) = self.observer {
            observer.report(update);
        }
    }
}

fn computation_failed(stage: AggregationStage, reason: String) -> InquiryError {
    InquiryError::ComputationFailed {
        stage: stage.display_name().to_string(),
        reason,
    }
}
