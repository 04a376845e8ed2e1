pub mod fin_observer;
pub mod frame;

pub use fin_observer::FinObserver;
