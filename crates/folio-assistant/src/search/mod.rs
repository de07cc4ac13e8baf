pub mod retriever;
pub mod similarity;

pub use retriever::Retriever;
pub use similarity::{cosine_similarity, rank_top_k};
