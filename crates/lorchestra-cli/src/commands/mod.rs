pub mod callables;
pub mod dispatch;
pub mod key;
pub mod plan;
pub mod run;
