use std::fs::File;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::debug;

use crate::base::{Error, NodeId, Result};
use crate::coding::{decode_fixed64, put_fixed64};
use crate::utils::buffer::{open_buffer, Buffer};

use super::{CodecParams, Options, SequenceCodec, FOOTER_SIZE};

/// Read side of a sequence file
pub struct SequenceFile<S: SequenceCodec> {
    path: PathBuf,
    buffer: Box<dyn Buffer>,
    opts: Options,
    num_sequences: u64,
    num_elements: u64,
    construction_time_micros: u64,
    payload_len: usize,
    _codec: PhantomData<S>,
}

impl<S: SequenceCodec> SequenceFile<S> {
    pub fn open(path: &Path, in_memory: bool) -> Result<Self> {
        let buffer = open_buffer(path, in_memory)?;
        let len = buffer.len();
        if len < FOOTER_SIZE {
            return Err(Error::corruption(
                path,
                format!("{} bytes is smaller than the footer", len),
            ));
        }

        let (opts, num_sequences, num_elements, construction_time_micros) = {
            let footer = buffer.slice(len - FOOTER_SIZE, len)?;
            let mut params = [0u8; 5];
            params.copy_from_slice(&footer[0..5]);
            (
                Options {
                    universe: decode_fixed64(&footer[5..]),
                    params: CodecParams(params),
                },
                decode_fixed64(&footer[13..]),
                decode_fixed64(&footer[21..]),
                decode_fixed64(&footer[29..]),
            )
        };

        debug!(
            "opened sequence file {}: universe={} sequences={} elements={}",
            path.display(),
            opts.universe,
            num_sequences,
            num_elements
        );

        Ok(SequenceFile {
            path: path.to_path_buf(),
            buffer,
            opts,
            num_sequences,
            num_elements,
            construction_time_micros,
            payload_len: len - FOOTER_SIZE,
            _codec: PhantomData,
        })
    }

    /// Decodes the sequence appended at `offset`
    pub fn sequence_at(&self, offset: u64) -> Result<S::Enumerator<'_>> {
        let data = self.buffer.slice(offset as usize, self.payload_len)?;
        S::enumerator(data, &self.opts).map_err(|e| match e {
            Error::Codec { detail } => Error::corruption(&self.path, detail),
            other => other,
        })
    }

    pub fn opts(&self) -> &Options {
        &self.opts
    }

    pub fn num_sequences(&self) -> u64 {
        self.num_sequences
    }

    pub fn num_elements(&self) -> u64 {
        self.num_elements
    }

    pub fn construction_time_microsec(&self) -> u64 {
        self.construction_time_micros
    }

    pub fn file_size(&self) -> usize {
        self.payload_len + FOOTER_SIZE
    }

    pub fn payload_size(&self) -> usize {
        self.payload_len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Append-only writer; `commit` seals the file with its footer
pub struct SequenceFileBuilder<S: SequenceCodec> {
    out: BufWriter<File>,
    opts: Options,
    written: u64,
    num_sequences: u64,
    num_elements: u64,
    started: Instant,
    _codec: PhantomData<S>,
}

impl<S: SequenceCodec> SequenceFileBuilder<S> {
    pub fn create(path: &Path, opts: Options) -> Result<Self> {
        let file = File::options()
            .write(true)
            .truncate(true)
            .create(true)
            .open(path)?;
        Ok(SequenceFileBuilder {
            out: BufWriter::new(file),
            opts,
            written: 0,
            num_sequences: 0,
            num_elements: 0,
            started: Instant::now(),
            _codec: PhantomData,
        })
    }

    pub fn opts(&self) -> &Options {
        &self.opts
    }

    /// Encodes and appends `values`, returning the offset of the sequence
    pub fn append(&mut self, values: &[NodeId]) -> Result<u64> {
        let mut encoded = Vec::new();
        S::serialize(&mut encoded, &self.opts, values)?;
        self.append_encoded(&encoded, values.len() as u64)
    }

    /// Appends an already encoded sequence of `num_elements` values
    pub fn append_encoded(&mut self, encoded: &[u8], num_elements: u64) -> Result<u64> {
        let offset = self.written;
        self.out.write_all(encoded)?;
        self.written += encoded.len() as u64;
        self.num_sequences += 1;
        self.num_elements += num_elements;
        Ok(offset)
    }

    pub fn commit(mut self) -> Result<()> {
        let elapsed = self.started.elapsed().as_micros() as u64;

        let mut footer = Vec::with_capacity(FOOTER_SIZE);
        footer.extend_from_slice(&self.opts.params.0);
        put_fixed64(&mut footer, self.opts.universe);
        put_fixed64(&mut footer, self.num_sequences);
        put_fixed64(&mut footer, self.num_elements);
        put_fixed64(&mut footer, elapsed);

        self.out.write_all(&footer)?;
        self.out.flush()?;
        Ok(())
    }
}
