//! Virtual file system.
//!
//! Virtual paths have the form `scheme://sub/path`. A [`Vfs`] maps each
//! scheme prefix to a [`Mount`], which pairs an archive or directory backend
//! with the [`Permissions`] it grants.
//!
//! ```text
//! Vfs::read("assets://ui/logo.png")
//!   └─ route "assets://" ─► Mount (READ|LIST) ─► PakMount ─► PakReader
//! ```

mod dir_mount;
mod mount;
mod pak_mount;
mod path;
mod permissions;
mod router;

pub use dir_mount::DirMount;
pub use mount::{Backend, Mount, MountBackend, ScriptExecutor};
pub use pak_mount::PakMount;
pub use path::VfsPath;
pub use permissions::{Operation, Permissions};
pub use router::{Vfs, SCHEME_SUFFIX};
