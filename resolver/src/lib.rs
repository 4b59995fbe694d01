pub mod context;
pub mod directive;
pub mod error;
pub mod gated;
pub mod merge;
pub mod numbering;
pub mod pipeline;
pub mod reference;
pub mod registry;
pub mod target;
pub mod title;
pub mod validate;

pub use context::{BuildConfig, BuildContext};
pub use directive::Directives;
pub use error::{BuildError, BuildFailure, Diagnostic};
pub use numbering::{Numbering, SequentialNumbering};
pub use pipeline::{Build, BuildOutput, PIPELINE, Phase};
pub use registry::Registry;
pub use target::{OutputFormat, OutputTarget};
