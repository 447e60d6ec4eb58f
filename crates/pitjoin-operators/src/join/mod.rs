pub mod left;
pub mod range;

pub use left::LeftJoin;
pub use range::RangeJoin;
