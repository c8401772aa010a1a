pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod fields;
pub mod metrics;
pub mod models;
pub mod natural;
pub mod payload;
pub mod report;
pub mod selection;
pub mod series;
pub mod session;
pub mod view;

pub use config::Config;
pub use error::{PartialDataWarning, ValidationError};
pub use models::{AnalysisResult, Flow};
pub use payload::{parse_response, validate, Validated};
pub use selection::{SelectionEvent, SelectionState};
pub use session::Session;
pub use view::{build_view, DashboardView};
