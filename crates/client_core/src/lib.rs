//! Analytics consent gate: reads the stored decision on page load and either
//! loads analytics, shows the consent banner, or stays idle.

pub mod banner;
pub mod controller;
pub mod data_layer;
pub mod host;
pub mod runtime;
pub mod settings;
pub mod virtual_page;

pub use controller::{BannerPhase, ConsentController};
pub use data_layer::{DataLayer, SharedDataLayer};
pub use host::{ElementHandle, FrameToken, Mount, PageEvent, PageHost, TimerToken};
pub use settings::{BannerCopy, ConsentSettings};
pub use virtual_page::{VirtualElement, VirtualPage};
