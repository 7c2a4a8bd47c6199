//! ABI bindings for the DeMine contracts the tasks talk to.
//!
//! Each facet lives in its own module since several of them expose an
//! `init` with different arguments.

/// Diamond base contract: the clone factory every proxy is created from.
pub mod diamond {
    alloy_sol_types::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct FacetCut {
            address target;
            uint8 action;
            bytes4[] selectors;
        }

        function clone(
            address owner,
            FacetCut[] facetCuts,
            address fallbackAddress,
            bytes fallbackInitData
        ) external returns (address);

        event Cloned(address indexed source, address indexed target);
    }
}

/// ERC1155 NFT facet
pub mod nft {
    alloy_sol_types::sol! {
        function init(address royaltyRecipient, uint16 royaltyBps, string uri) external;

        /// Start of the latest finalized day, 0 before the first finalize.
        function finalized() external view returns (uint256);

        /// First finalize, pinning the genesis day.
        function initFinalize(uint256 timestamp) external;

        /// Finalize the day after the current watermark.
        function finalize() external;
    }
}

/// Wrapped currency (ERC20) facet
pub mod wrapped {
    alloy_sol_types::sol! {
        function init(string name, string symbol, uint8 decimals) external;

        function decimals() external view returns (uint8);
    }
}

/// Mortgage agent facet
pub mod mortgage {
    alloy_sol_types::sol! {
        function init(
            address nft,
            address paymentToken,
            address custodian,
            uint256 tokenCost,
            address[] pricingStrategies,
            address[] allowanceStrategies
        ) external;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes};
    use alloy_sol_types::{SolCall, SolEvent};

    #[test]
    fn test_selectors_are_distinct() {
        let selectors = [
            diamond::cloneCall::SELECTOR,
            nft::initCall::SELECTOR,
            nft::finalizedCall::SELECTOR,
            nft::initFinalizeCall::SELECTOR,
            nft::finalizeCall::SELECTOR,
            wrapped::initCall::SELECTOR,
            wrapped::decimalsCall::SELECTOR,
            mortgage::initCall::SELECTOR,
        ];
        for (i, a) in selectors.iter().enumerate() {
            for b in &selectors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_standard_signatures() {
        assert_eq!(wrapped::decimalsCall::SIGNATURE, "decimals()");
        assert_eq!(wrapped::decimalsCall::SELECTOR, [0x31, 0x3c, 0xe5, 0x67]);
        assert_eq!(nft::finalizeCall::SIGNATURE, "finalize()");
        assert_eq!(
            diamond::Cloned::SIGNATURE,
            "Cloned(address,address)"
        );
    }

    #[test]
    fn test_clone_call_decodes_back() {
        let call = diamond::cloneCall {
            owner: Address::repeat_byte(0xaa),
            facetCuts: vec![],
            fallbackAddress: Address::repeat_byte(0xbb),
            fallbackInitData: Bytes::from(vec![1, 2, 3]),
        };
        let decoded = diamond::cloneCall::abi_decode(&call.abi_encode(), true).unwrap();
        assert_eq!(decoded.owner, call.owner);
        assert_eq!(decoded.fallbackAddress, call.fallbackAddress);
        assert_eq!(decoded.fallbackInitData, call.fallbackInitData);
    }
}
