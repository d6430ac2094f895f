use std::sync::Arc;

use gmp_common::{GmpError, GmpMessage, H256};

use super::{HookType, PostDispatchHook};
use crate::chain::{CallContext, Contract, Snapshot};

/// Hook that does nothing and costs nothing.
pub struct NoopHook {
    address: H256,
}

impl NoopHook {
    pub fn new(address: H256) -> Self {
        Self { address }
    }
}

impl PostDispatchHook for NoopHook {
    fn hook_type(&self) -> HookType {
        HookType::Unused
    }

    fn supports_metadata(&self, _metadata: &[u8]) -> bool {
        true
    }

    fn quote_dispatch(
        &self,
        _ctx: &CallContext<'_>,
        _metadata: &[u8],
        _message: &GmpMessage,
    ) -> Result<u128, GmpError> {
        Ok(0)
    }

    fn post_dispatch(
        &self,
        _ctx: &CallContext<'_>,
        _metadata: &[u8],
        _message: &GmpMessage,
    ) -> Result<u128, GmpError> {
        Ok(0)
    }
}

impl Contract for NoopHook {
    fn address(&self) -> H256 {
        self.address
    }

    fn snapshot(&self) -> Snapshot {
        Box::new(())
    }

    fn restore(&self, _snapshot: Snapshot) {}

    fn as_hook(self: Arc<Self>) -> Option<Arc<dyn PostDispatchHook>> {
        Some(self)
    }
}
