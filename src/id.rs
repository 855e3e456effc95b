use uuid::Uuid;

use crate::job::JobId;

/// Generates job ids. Injected into the [`crate::manager::Manager`] so the
/// concrete UUID variant stays a configuration choice, not a hardcoded one
/// (`Config::uuid_version`).
pub trait IdFactory: Send + Sync {
    fn new_id(&self) -> JobId;
}

/// `uuid: 'v4'`, random ids, the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Factory;

impl IdFactory for UuidV4Factory {
    fn new_id(&self) -> JobId {
        JobId::new(Uuid::new_v4())
    }
}

/// `uuid: 'v1'`.
///
/// A true v1 id needs a node id and clock sequence the queue core has no
/// natural source for, so this substitutes `Uuid::now_v7`: also
/// time-ordered and sortable, without requiring external MAC-address-like
/// state. See the Open Questions section of `DESIGN.md`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV1Factory;

impl IdFactory for UuidV1Factory {
    fn new_id(&self) -> JobId {
        JobId::new(Uuid::now_v7())
    }
}
