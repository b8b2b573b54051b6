pub mod check;
pub mod columns;
pub mod config;
pub mod filter;
pub mod load;
pub mod pipeline;
pub mod pivot;
pub mod render;
pub mod summary;
