pub mod base;
pub mod coding;
pub mod config;
pub mod containers;
pub mod dicts;
pub mod graphs;
pub mod index;
pub mod problems;
pub mod queues;
pub mod rmq;
pub mod sequences;
pub mod utils;
