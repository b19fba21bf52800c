//! Parallel index construction from an edge stream: adjacency lists are
//! encoded on worker threads while the builder appends them strictly in
//! node order.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use crate::base::{Error, NodeId, Result};
use crate::config::Configuration;
use crate::index::{SimpleIndexBuilder, TopkIndexBuilder};
use crate::queues::{Job, JobQueue, OrderedQueue};
use crate::sequences::{Options, SequenceCodec};
use crate::utils::ProgressLogger;

use super::{EdgeSource, GroupedEdges};

/// Commit side of index construction: anything that accepts encoded
/// adjacency lists in docid order
pub trait PostingsSink {
    fn append_encoded(&mut self, docid: NodeId, encoded: &[u8], num_elements: u64) -> Result<()>;
}

impl<S: SequenceCodec> PostingsSink for SimpleIndexBuilder<S> {
    fn append_encoded(&mut self, docid: NodeId, encoded: &[u8], num_elements: u64) -> Result<()> {
        SimpleIndexBuilder::append_encoded(self, docid, encoded, num_elements)
    }
}

impl<S: SequenceCodec> PostingsSink for TopkIndexBuilder<S> {
    fn append_encoded(&mut self, docid: NodeId, encoded: &[u8], num_elements: u64) -> Result<()> {
        TopkIndexBuilder::append_encoded(self, docid, encoded, num_elements)
    }
}

struct EdgesWriteJob<C, B> {
    sink: Arc<Mutex<B>>,
    failure: Arc<Mutex<Option<Error>>>,
    opts: Options,
    node: NodeId,
    targets: Vec<NodeId>,
    encoded: Vec<u8>,
    _codec: PhantomData<fn() -> C>,
}

impl<C, B> Job for EdgesWriteJob<C, B>
where
    C: SequenceCodec,
    B: PostingsSink + Send + 'static,
{
    fn prepare(&mut self) {
        C::serialize(&mut self.encoded, &self.opts, &self.targets)
            .expect("failed to encode an adjacency list");
    }

    fn commit(&mut self) {
        let mut sink = self.sink.lock().expect("sink poisoned");
        if let Err(e) = sink.append_encoded(self.node, &self.encoded, self.targets.len() as u64) {
            let mut failure = self.failure.lock().expect("failure slot poisoned");
            if failure.is_none() {
                *failure = Some(e);
            }
        }
    }
}

/// Drains `edges` into `sink`, encoding lists with codec `C` in parallel;
/// returns the sink so the caller can commit it
pub fn serialize_graph<G, C, B>(
    edges: G,
    sink: B,
    opts: Options,
    config: &Configuration,
) -> Result<B>
where
    G: EdgeSource,
    C: SequenceCodec + 'static,
    B: PostingsSink + Send + 'static,
{
    let sink = Arc::new(Mutex::new(sink));
    let failure: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));

    let mut queue = OrderedQueue::new(config);
    let mut grouped = GroupedEdges::new(edges)?;
    let mut progress = ProgressLogger::new("serialize");

    while let Some((node, targets)) = grouped.next_group()? {
        let work = targets.len() as u64;
        queue.add_job(
            Box::new(EdgesWriteJob::<C, B> {
                sink: Arc::clone(&sink),
                failure: Arc::clone(&failure),
                opts,
                node,
                targets,
                encoded: Vec::new(),
                _codec: PhantomData,
            }),
            work,
        );
        progress.done_item();
    }

    queue.complete();
    progress.done();

    let failure = Arc::try_unwrap(failure)
        .ok()
        .expect("jobs still hold the failure slot")
        .into_inner()
        .expect("failure slot poisoned");
    if let Some(e) = failure {
        return Err(e);
    }

    Ok(Arc::try_unwrap(sink)
        .ok()
        .expect("jobs still hold the sink")
        .into_inner()
        .expect("sink poisoned"))
}
