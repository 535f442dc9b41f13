pub mod backfill;
pub mod catalog;
pub mod config;
pub mod error;
pub mod library;
pub mod manifest;
pub mod memory;
pub mod model;
pub mod resolver;
pub mod roles;
pub mod size;
pub mod traits;

pub mod prelude {
    pub use super::backfill::*;
    pub use super::catalog::*;
    pub use super::config::*;
    pub use super::error::*;
    pub use super::library::*;
    pub use super::manifest::*;
    pub use super::model::*;
    pub use super::resolver::*;
    pub use super::roles::*;
    pub use super::size::*;
    pub use super::traits::*;
}
