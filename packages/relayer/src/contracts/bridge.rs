//! Message bridge contract ABI definition
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the bridge contract.

use alloy::sol;

sol! {
    /// Bridge contract deployed on each side of the pair
    #[sol(rpc)]
    contract MessageBridge {
        /// Emitted on the source chain when a message leaves it
        event MessageSent(
            bytes32 indexed messageId,
            address indexed sender,
            address indexed target,
            bytes data,
            uint256 nonce
        );

        /// Emitted on the destination chain after delivery (not consumed by the relayer)
        event MessageReceived(
            bytes32 indexed messageId,
            address indexed sender,
            address indexed target,
            bytes data,
            uint256 nonce
        );

        /// Inbound delivery entry point. `sender` is the source chain's bridge address.
        function receiveMessage(
            bytes32 messageId,
            address sender,
            address target,
            bytes calldata data
        ) external;

        /// Idempotency predicate
        function isMessageProcessed(bytes32 messageId) external view returns (bool);
    }
}
