//! The browser-side half of the rendering pipeline: tab state,
//! animation-frame scheduling, the commit protocol, chrome, and the
//! composite/raster/draw pipeline (spec.md §3/§4). Grounded on
//! `original_source/browser_ui.py`, generalized from its
//! single-threaded direct-draw loop to the two-thread commit pipeline
//! spec.md §4.7/§4.8 describes.

pub mod browser;
pub mod chrome;
pub mod commit;
pub mod config;
pub mod focus;
pub mod input;
pub mod selection;
pub mod tab;
pub mod task_runner;
pub mod telemetry;
pub mod timer;

pub use browser::Browser;
pub use chrome::{Chrome, ChromeAction, ChromeFocus};
pub use commit::CommitData;
pub use config::EngineConfig;
pub use input::{InputEvent, Modifier};
pub use selection::Selection;
pub use tab::Tab;
pub use task_runner::TaskRunner;
pub use telemetry::Telemetry;
pub use timer::AnimationTimer;
