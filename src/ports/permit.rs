// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::FlowError;
use crate::node::NodeCore;
use crate::ports::{dispatch, PortLink};

struct PermitCell {
    name: String,
    link: PortLink,
    count: Mutex<i64>,
}

impl PermitCell {
    fn release(&self, n: i64) -> Result<(), FlowError> {
        if n <= 0 {
            return Err(FlowError::protocol(
                &self.name,
                format!("release({n}) must be positive"),
            ));
        }
        let node = {
            let mut count = self.count.lock();
            let before = *count;
            *count = before
                .checked_add(n)
                .ok_or_else(|| FlowError::protocol(&self.name, "permit counter overflow"))?;
            if before <= 0 && *count > 0 {
                self.link.set_ready(true)
            } else {
                None
            }
        };
        dispatch(node);
        Ok(())
    }

    fn acquire(&self, n: i64) -> Result<(), FlowError> {
        if n <= 0 {
            return Err(FlowError::protocol(
                &self.name,
                format!("acquire({n}) must be positive"),
            ));
        }
        let node = {
            let mut count = self.count.lock();
            if n > *count {
                return Err(FlowError::protocol(
                    &self.name,
                    format!("acquire({n}) exceeds {} available permits", (*count).max(0)),
                ));
            }
            *count -= n;
            if *count <= 0 {
                self.link.set_ready(false)
            } else {
                None
            }
        };
        dispatch(node);
        Ok(())
    }
}

/// Owner side of a signed permit counter. The node is blocked while the counter
/// is zero or negative.
///
/// The counter may start negative to represent demand that must be repaid before
/// the node can fire.
pub struct PermitPort {
    cell: Arc<PermitCell>,
}

impl PermitPort {
    pub(crate) fn attach(core: &Arc<NodeCore>, name: &str, initial: i64) -> Self {
        Self {
            cell: Arc::new(PermitCell {
                link: PortLink::register(core, name, initial > 0),
                name: format!("{}.{}", core.name(), name),
                count: Mutex::new(initial),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn inlet(&self) -> PermitInlet {
        PermitInlet {
            cell: Arc::clone(&self.cell),
        }
    }

    pub fn available(&self) -> i64 {
        *self.cell.count.lock()
    }

    pub fn is_ready(&self) -> bool {
        self.available() > 0
    }

    /// Takes `n` permits. Taking more than are available is a `ProtocolViolation`.
    pub fn acquire(&self, n: i64) -> Result<(), FlowError> {
        self.cell.acquire(n)
    }

    pub fn release(&self, n: i64) -> Result<(), FlowError> {
        self.cell.release(n)
    }
}

/// Cloneable handle used by consumers to hand permits back to a producer.
#[derive(Clone)]
pub struct PermitInlet {
    cell: Arc<PermitCell>,
}

impl PermitInlet {
    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn release(&self, n: i64) -> Result<(), FlowError> {
        self.cell.release(n)
    }
}

impl fmt::Debug for PermitInlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermitInlet")
            .field("port", &self.cell.name)
            .field("available", &*self.cell.count.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DirectExecutor;
    use crate::node::{Dataflow, NodeKind};

    fn permits(initial: i64) -> PermitPort {
        let dataflow = Dataflow::with_executor(Arc::new(DirectExecutor::new()));
        let core = NodeCore::new("producer".into(), NodeKind::Actor, dataflow);
        PermitPort::attach(&core, "permits", initial)
    }

    #[test]
    fn test_readiness_flips_at_zero_boundary() {
        let port = permits(0);
        assert!(!port.is_ready());

        port.inlet().release(2).unwrap();
        assert!(port.is_ready());
        port.acquire(1).unwrap();
        assert!(port.is_ready());
        port.acquire(1).unwrap();
        assert!(!port.is_ready());
    }

    #[test]
    fn test_negative_start_needs_repayment() {
        let port = permits(-2);
        let inlet = port.inlet();
        inlet.release(2).unwrap();
        assert!(!port.is_ready());
        inlet.release(1).unwrap();
        assert_eq!(port.available(), 1);
        assert!(port.is_ready());
    }

    #[test]
    fn test_protocol_violations() {
        let port = permits(1);
        assert!(matches!(
            port.acquire(2),
            Err(FlowError::ProtocolViolation { .. })
        ));
        assert!(port.acquire(0).is_err());
        assert!(port.inlet().release(-1).is_err());
        assert_eq!(port.available(), 1);
    }
}
