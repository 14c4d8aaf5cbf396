pub mod applicationset;
pub mod gc;

pub use applicationset::ApplicationSetReconciler;
pub use applicationset::controller::ApplicationSetController;
pub use gc::OwnerGarbageCollector;
