pub mod recommendation;
pub mod request;
