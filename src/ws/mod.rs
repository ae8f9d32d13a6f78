pub mod connctx;
pub mod multiplexer;
pub mod roomctx;
