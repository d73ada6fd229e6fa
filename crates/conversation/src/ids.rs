use std::fmt;

// Sequence ids share one shape, so one macro keeps them aligned.
macro_rules! define_sequence_id {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}-{}", $label, self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self::new(value)
            }
        }
    };
}

define_sequence_id!(EntryId, "entry");
define_sequence_id!(ExchangeId, "exchange");

/// Hands out strictly increasing ids so map order equals append order.
#[derive(Debug, Clone)]
pub(crate) struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub(crate) const fn new() -> Self {
        Self { next: 1 }
    }

    fn bump(&mut self) -> u64 {
        let raw = self.next;
        self.next = self.next.saturating_add(1);
        raw
    }

    pub(crate) fn next_entry(&mut self) -> EntryId {
        EntryId::new(self.bump())
    }

    pub(crate) fn next_exchange(&mut self) -> ExchangeId {
        ExchangeId::new(self.bump())
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
