pub mod chunk_frame;
pub mod fragmenter;
pub mod reassembly;
