pub mod bundle;
pub mod config;
pub mod error;
pub mod io;
pub mod paths;
pub mod store;
pub mod threshold;

pub use bundle::{Bundle, BundleStatus, BundleSummary};
pub use error::{CtxError, Result};
pub use store::BundleStore;
pub use threshold::{classify, Classification, Stage, ThresholdMonitor};
