//! MAC-hook surface and control-channel dispatcher wiring `secadm-wire`'s
//! commands to `secadm-core`'s engine.

#![deny(unsafe_code)]

pub mod dispatch;
pub mod mac;
pub mod mock_host;

pub use dispatch::dispatch;
pub use mac::{prison_destroy, vnode_check_exec, vnode_check_unlink, ExecVerdict};
pub use mock_host::MockHost;
