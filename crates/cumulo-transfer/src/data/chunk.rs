use cumulo_http::ByteRange;

/// One contiguous sub-range of a transfer, handled as its own request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// Position in the plan (0-based)
    pub index:  u32,
    /// Absolute offset in the remote object
    pub offset: u64,
    /// Always greater than zero
    pub length: u64,
}

impl Chunk {
    /// Exclusive end offset.
    pub fn end(&self) -> u64 { self.offset + self.length }

    pub fn range(&self) -> ByteRange { ByteRange::new(self.offset, self.length) }

    /// The part of this chunk starting `done` bytes in.
    pub fn remainder(&self, done: u64) -> Option<Chunk> {
        (done < self.length).then(|| Chunk {
            index:  self.index,
            offset: self.offset + done,
            length: self.length - done,
        })
    }
}

/// Ordered, contiguous chunks covering `[start, start + length)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkPlan {
    pub start:  u64,
    pub length: u64,
    pub chunks: Vec<Chunk>,
}

impl ChunkPlan {
    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn end(&self) -> u64 { self.start + self.length }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> { self.chunks.iter() }
}

impl<'a> IntoIterator for &'a ChunkPlan {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter { self.chunks.iter() }
}
