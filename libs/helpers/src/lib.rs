pub mod graphs;
pub mod oracle;
