pub mod cache;

pub use cache::{Atom, TextInterner};
