pub mod claude;
pub mod flexible;
pub mod mock;

pub use claude::*;
pub use flexible::*;
pub use mock::*;
