//! The plain graph index: postings plus the offset and cumulative degree
//! directory, without any ranking information.

use std::path::{Path, PathBuf};

use log::info;

use crate::base::{NodeId, Result};
use crate::sequences::{Options, SequenceCodec, SequenceFile, SequenceFileBuilder};

use super::{degree_of, read_directory, suffixed, DirectoryArrays, GraphIndex, NodeInfo};

pub struct SimpleIndex<S: SequenceCodec> {
    docs: Vec<NodeInfo>,
    postings: SequenceFile<S>,
}

impl<S: SequenceCodec> SimpleIndex<S> {
    pub fn open(path: &Path, in_memory: bool) -> Result<Self> {
        let postings = SequenceFile::<S>::open(&suffixed(path, ".pos"), in_memory)?;
        let docs = read_directory(path, in_memory)?;

        info!(
            "opened index {}: docs={} elements={} postings-bytes={}",
            path.display(),
            docs.len(),
            postings.num_elements(),
            postings.file_size()
        );

        Ok(SimpleIndex { docs, postings })
    }

    pub fn docs(&self) -> &[NodeInfo] {
        &self.docs
    }

    pub fn construction_time_microsec(&self) -> u64 {
        self.postings.construction_time_microsec()
    }
}

impl<S: SequenceCodec> GraphIndex for SimpleIndex<S> {
    type Enumerator<'a> = S::Enumerator<'a>
    where
        Self: 'a;

    fn get_offset(&self, docid: NodeId) -> Option<u64> {
        let info = self.docs.get(docid as usize)?;
        if self.degree(docid) > 0 {
            Some(info.offset)
        } else {
            None
        }
    }

    fn degree(&self, docid: NodeId) -> u64 {
        degree_of(&self.docs, docid)
    }

    fn sequence_at(&self, offset: u64) -> Result<Self::Enumerator<'_>> {
        self.postings.sequence_at(offset)
    }

    fn num_docs(&self) -> u64 {
        self.docs.len() as u64
    }

    fn num_elements(&self) -> u64 {
        self.postings.num_elements()
    }

    fn opts(&self) -> &Options {
        self.postings.opts()
    }
}

/// Streams adjacency lists in docid order; `commit` seals the postings
/// file, writes the directory and reopens the index.
pub struct SimpleIndexBuilder<S: SequenceCodec> {
    path: PathBuf,
    postings: SequenceFileBuilder<S>,
    arrays: DirectoryArrays,
}

impl<S: SequenceCodec> SimpleIndexBuilder<S> {
    pub fn create(path: &Path, opts: Options) -> Result<Self> {
        Ok(SimpleIndexBuilder {
            path: path.to_path_buf(),
            postings: SequenceFileBuilder::create(&suffixed(path, ".pos"), opts)?,
            arrays: DirectoryArrays::new(),
        })
    }

    pub fn opts(&self) -> &Options {
        self.postings.opts()
    }

    pub fn append(&mut self, docid: NodeId, values: &[NodeId]) -> Result<()> {
        let offset = self.postings.append(values)?;
        self.arrays.append(docid, offset, values.len() as u64);
        Ok(())
    }

    pub fn append_encoded(
        &mut self,
        docid: NodeId,
        encoded: &[u8],
        num_elements: u64,
    ) -> Result<()> {
        let offset = self.postings.append_encoded(encoded, num_elements)?;
        self.arrays.append(docid, offset, num_elements);
        Ok(())
    }

    pub fn commit(self, in_memory: bool) -> Result<SimpleIndex<S>> {
        let SimpleIndexBuilder {
            path,
            postings,
            mut arrays,
        } = self;

        arrays.pad_to(postings.opts().universe);
        postings.commit()?;
        arrays.write(&path)?;

        SimpleIndex::open(&path, in_memory)
    }
}
