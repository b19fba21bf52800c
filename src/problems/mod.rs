//! Query schemes: given a source node and a contiguous id range `[l, r)`,
//! find the matching nodes in its neighborhood, optionally keeping only
//! the k best ranked ones.

pub mod batch;
pub mod intersection;
pub mod topk;

pub use batch::{BatchRunner, QueryRecord};

use std::str::FromStr;

/// What a scheme needs from the index it runs against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexShape {
    Plain,
    Ranked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    AsIndex,
    Hopping,
    Coverage,
    BaselineAsIndex,
    BaselineHopping,
    FastBaselineAsIndex,
    FastBaselineHopping,
    TopkHopping,
    TopkHoppingRmq,
    TopkHoppingWand,
    TopkHoppingRmqWand,
}

impl Scheme {
    pub fn name(&self) -> &'static str {
        match self {
            Scheme::AsIndex => "asindex",
            Scheme::Hopping => "hopping",
            Scheme::Coverage => "coverage",
            Scheme::BaselineAsIndex => "baseline-asindex",
            Scheme::BaselineHopping => "baseline-hopping",
            Scheme::FastBaselineAsIndex => "fast-baseline-asindex",
            Scheme::FastBaselineHopping => "fast-baseline-hopping",
            Scheme::TopkHopping => "topk-hopping",
            Scheme::TopkHoppingRmq => "topk-hopping-rmq",
            Scheme::TopkHoppingWand => "topk-hopping-wand",
            Scheme::TopkHoppingRmqWand => "topk-hopping-rmq-wand",
        }
    }

    /// Whether the scheme returns ranked top-k results rather than the
    /// full intersection
    pub fn is_ranked(&self) -> bool {
        matches!(
            self,
            Scheme::TopkHopping
                | Scheme::TopkHoppingRmq
                | Scheme::TopkHoppingWand
                | Scheme::TopkHoppingRmqWand
        )
    }

    /// Whether the scheme needs the range-maximum side structure of a
    /// ranked index
    pub fn needs_rmq(&self) -> bool {
        matches!(self, Scheme::TopkHoppingRmq | Scheme::TopkHoppingRmqWand)
    }

    /// Whether an index of `shape` can answer this scheme; solving an
    /// unsupported pairing panics, so callers validate up front
    pub fn supported_by(&self, shape: IndexShape) -> bool {
        match shape {
            IndexShape::Ranked => true,
            IndexShape::Plain => !self.needs_rmq(),
        }
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asindex" => Ok(Scheme::AsIndex),
            "hopping" => Ok(Scheme::Hopping),
            "coverage" => Ok(Scheme::Coverage),
            "baseline-asindex" => Ok(Scheme::BaselineAsIndex),
            "baseline-hopping" => Ok(Scheme::BaselineHopping),
            "fast-baseline-asindex" => Ok(Scheme::FastBaselineAsIndex),
            "fast-baseline-hopping" => Ok(Scheme::FastBaselineHopping),
            "topk-hopping" => Ok(Scheme::TopkHopping),
            "topk-hopping-rmq" => Ok(Scheme::TopkHoppingRmq),
            "topk-hopping-wand" => Ok(Scheme::TopkHoppingWand),
            "topk-hopping-rmq-wand" => Ok(Scheme::TopkHoppingRmqWand),
            other => Err(format!("unknown scheme {:?}", other)),
        }
    }
}
