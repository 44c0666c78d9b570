use super::*;

fn advance(counter: &AtomicU64, step: impl Fn(u64) -> u64) -> u64 {
    let previous = match counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(step(n)))
    {
        Ok(n) | Err(n) => n,
    };

    step(previous)
}

/// Issues extranonce1 values. Never yields zero; wraps from `u64::MAX` back to one.
#[derive(Debug, Default)]
pub(crate) struct ExtraNonceCounter(AtomicU64);

impl ExtraNonceCounter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn starting_at(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    pub(crate) fn next(&self) -> Extranonce {
        Extranonce::from(advance(&self.0, |n| {
            if n == u64::MAX { 1 } else { n + 1 }
        }))
    }
}

#[derive(Debug, Default)]
pub(crate) struct SubscriptionCounter(AtomicU64);

impl SubscriptionCounter {
    const PREFIX: &'static str = "deadbeefcafebabe";
    const LIMIT: u64 = 0xFFF_FFFF;

    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Display hex of the next subscription id.
    pub(crate) fn next(&self) -> String {
        let count = advance(&self.0, |n| if n + 1 >= Self::LIMIT { 0 } else { n + 1 });
        format!("{}{}", Self::PREFIX, hex::encode(count.to_le_bytes()))
    }
}

/// Issues job ids starting at 1. Resets to 1 when the counter reaches `u32::MAX`.
#[derive(Debug, Default)]
pub(crate) struct JobCounter(AtomicU64);

impl JobCounter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn step(n: u64) -> u64 {
        let next = n + 1;
        if next % u64::from(u32::MAX) == 0 { 1 } else { next }
    }

    /// The id `next` would issue, without issuing it.
    pub(crate) fn peek(&self) -> JobId {
        JobId::new(Self::step(self.0.load(Ordering::Acquire)) as u32)
    }

    pub(crate) fn next(&self) -> JobId {
        JobId::new(advance(&self.0, Self::step) as u32)
    }
}
