/// Founder reward outputs every coinbase must carry, keyed by network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Founders {
    pub(crate) addresses: [&'static str; 5],
    pub(crate) rewards: [u64; 5],
}

impl Founders {
    const REWARDS: [u64; 5] = [
        100_000_000 / 2,
        100_000_000 / 2,
        100_000_000 / 2,
        300_000_000 / 2,
        100_000_000 / 2,
    ];

    pub(crate) const MAINNET: Self = Self {
        addresses: [
            "aCAgTPgtYcA4EysU4UKC86EQd5cTtHtCcr",
            "aHu897ivzmeFuLNB6956X6gyGeVNHUBRgD",
            "aQ18FBVFtnueucZKeVg4srhmzbpAeb1KoN",
            "a1HwTdCmQV3NspP2QqCGpehoFpi8NY4Zg3",
            "a1kCCGddf5pMXSipLVD9hBG2MGGVNaJ15U",
        ],
        rewards: Self::REWARDS,
    };

    pub(crate) const TESTNET: Self = Self {
        addresses: [
            "TDk19wPKYq91i18qmY6U9FeTdTxwPeSveo",
            "TWZZcDGkNixTAMtRBqzZkkMHbq1G6vUTk5",
            "TRZTFdNCKCKbLMQV8cZDkQN9Vwuuq4gDzT",
            "TG2ruj59E5b1u9G3F7HQVs6pCcVDBxrQve",
            "TCsTzQZKVn4fao8jDmB9zQBk9YQNEZ3XfS",
        ],
        rewards: Self::REWARDS,
    };

    pub(crate) fn for_network(testnet: bool) -> Self {
        if testnet {
            Self::TESTNET
        } else {
            Self::MAINNET
        }
    }

    pub(crate) fn outputs(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.addresses.iter().copied().zip(self.rewards.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_schedule() {
        assert_eq!(
            Founders::MAINNET.rewards,
            [50_000_000, 50_000_000, 50_000_000, 150_000_000, 50_000_000]
        );
        assert_eq!(Founders::TESTNET.rewards, Founders::MAINNET.rewards);
    }

    #[test]
    fn network_selection() {
        assert_eq!(Founders::for_network(true), Founders::TESTNET);
        assert_eq!(Founders::for_network(false), Founders::MAINNET);
        assert!(
            Founders::for_network(true)
                .outputs()
                .all(|(address, _)| address.starts_with('T'))
        );
    }
}
