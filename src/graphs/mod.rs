//! Edge stream ingestion: reading `source \t target` pairs and grouping
//! them into per-node adjacency lists.
//!
//! Edge streams must be sorted by source node, with each list sorted by
//! target; the grouping adaptor only coalesces consecutive edges.

pub mod serializer;

pub use serializer::{serialize_graph, PostingsSink};

use std::io::BufRead;

use crate::base::{Edge, Edges, Error, Result};

pub trait EdgeSource {
    /// The next edge of the stream, or `None` at the end
    fn next_edge(&mut self) -> Result<Option<Edge>>;
}

/// Parses tab-separated edges from any buffered reader
pub struct ReaderEdgeSource<R: BufRead> {
    reader: R,
    line: String,
    line_no: u64,
}

impl<R: BufRead> ReaderEdgeSource<R> {
    pub fn new(reader: R) -> Self {
        ReaderEdgeSource {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }

    fn parse_error(&self, detail: &str) -> Error {
        Error::Codec {
            detail: format!("edge line {}: {}", self.line_no, detail),
        }
    }
}

impl<R: BufRead> EdgeSource for ReaderEdgeSource<R> {
    fn next_edge(&mut self) -> Result<Option<Edge>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.line.trim_end();
            if line.is_empty() {
                continue;
            }

            let (source, target) = line
                .split_once('\t')
                .ok_or_else(|| self.parse_error("expected two tab separated fields"))?;
            let source = source
                .parse()
                .map_err(|_| self.parse_error("source is not an integer"))?;
            let target = target
                .parse()
                .map_err(|_| self.parse_error("target is not an integer"))?;
            return Ok(Some((source, target)));
        }
    }
}

/// Groups consecutive edges sharing a source into one [`Edges`] value
pub struct GroupedEdges<G: EdgeSource> {
    source: G,
    pending: Option<Edge>,
}

impl<G: EdgeSource> GroupedEdges<G> {
    pub fn new(mut source: G) -> Result<Self> {
        let pending = source.next_edge()?;
        Ok(GroupedEdges { source, pending })
    }

    pub fn next_group(&mut self) -> Result<Option<Edges>> {
        let Some((node, first)) = self.pending.take() else {
            return Ok(None);
        };

        let mut targets = vec![first];
        loop {
            match self.source.next_edge()? {
                Some((source, target)) if source == node => targets.push(target),
                other => {
                    self.pending = other;
                    break;
                }
            }
        }
        Ok(Some((node, targets)))
    }
}
