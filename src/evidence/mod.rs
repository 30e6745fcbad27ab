pub mod corpus;
pub mod encyclopedia;
pub mod models;
pub mod source;
pub mod web;

pub use corpus::CorpusSource;
pub use encyclopedia::WikipediaSource;
pub use models::{EvidenceItem, Provenance};
pub use source::EvidenceSource;
pub use web::GoogleSearchSource;
