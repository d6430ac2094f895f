use std::sync::Arc;

use gmp_common::{GmpError, GmpMessage, H256};

use super::{InterchainSecurityModule, ModuleType};
use crate::chain::{CallContext, Contract, Snapshot};

/// Accepts every message. Only suitable for local testing.
pub struct TrustedIsm {
    address: H256,
}

impl TrustedIsm {
    pub fn new(address: H256) -> Self {
        Self { address }
    }
}

impl InterchainSecurityModule for TrustedIsm {
    fn module_type(&self) -> ModuleType {
        ModuleType::Null
    }

    fn verify(
        &self,
        _ctx: &CallContext<'_>,
        _metadata: &[u8],
        _message: &GmpMessage,
    ) -> Result<bool, GmpError> {
        Ok(true)
    }
}

impl Contract for TrustedIsm {
    fn address(&self) -> H256 {
        self.address
    }

    fn snapshot(&self) -> Snapshot {
        Box::new(())
    }

    fn restore(&self, _snapshot: Snapshot) {}

    fn as_ism(self: Arc<Self>) -> Option<Arc<dyn InterchainSecurityModule>> {
        Some(self)
    }
}
