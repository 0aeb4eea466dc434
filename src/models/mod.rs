pub mod period;
pub mod rate;
pub mod series;

pub use period::*;
pub use rate::*;
pub use series::*;
