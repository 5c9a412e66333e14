//! Contract interfaces for the ENS registration pipeline.
//!
//! Only the calls and events the indexer actually consumes are declared:
//! the registration event on the controller, expiry lookup on the base
//! registrar, resolver lookup on the registry and the record getters on
//! the public resolver.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IETHRegistrarController {
        event NameRegistered(
            string name,
            bytes32 indexed label,
            address indexed owner,
            uint256 cost,
            uint256 expires
        );
    }

    #[sol(rpc)]
    interface IBaseRegistrar {
        function nameExpires(uint256 id) external view returns (uint256);
    }

    #[sol(rpc)]
    interface IENSRegistry {
        function resolver(bytes32 node) external view returns (address);
    }

    #[sol(rpc)]
    interface IAddrResolver {
        function addr(bytes32 node) external view returns (address);
    }

    #[sol(rpc)]
    interface IMulticoinResolver {
        function addr(bytes32 node, uint256 coinType) external view returns (bytes);
    }

    #[sol(rpc)]
    interface ITextResolver {
        function text(bytes32 node, string key) external view returns (string);
    }

    #[sol(rpc)]
    interface IContentHashResolver {
        function contenthash(bytes32 node) external view returns (bytes);
    }
}

/// ETHRegistrarController on mainnet, emitter of `NameRegistered`.
pub const ETH_REGISTRAR_CONTROLLER: &str = "0x283af0b28c62c092c9727f1ee09c02ca627eb7f5";

/// BaseRegistrar on mainnet, tracks name expiry.
pub const BASE_REGISTRAR: &str = "0x57f1887a8bf19b14fc0df6fd9b2acc9af147ea85";

/// The ENS registry on mainnet, maps namehash -> resolver.
pub const ENS_REGISTRY: &str = "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e";

/// Block at which the ETHRegistrarController was deployed.
/// Full backfills start here.
pub const REGISTRAR_DEPLOY_BLOCK: u64 = 9_380_471;
