//! Contract bindings.

use alloy::sol;

sol! {
    /// Loop executor deployed on HyperEVM.
    ///
    /// Prices and sizes are integers scaled by 1e8; USDC notionals by 1e6.
    #[sol(rpc)]
    interface IDelphoExecutor {
        function swapUSDT2USDC(bool isBuy, uint64 limitPx, uint64 sz) external;
        function transferUSDCFromSpotToPerp(uint64 ntl, bool toPerp) external;
        function openHypeShort(bool isLong, uint64 limitPx, uint64 sz) external;
        function closeHypeShort(uint64 limitPx, uint64 sz) external;
        function transferUSDT2Core(uint64 amount) external;
        function executeFullEvmFlow(
            uint256 minAmountOut,
            uint256 minInitialAmountOut,
            uint256 targetLoopValue
        ) external;
    }

    /// System relay forwarding encoded actions from HyperEVM to HyperCore.
    #[sol(rpc)]
    interface ICoreWriter {
        function sendRawAction(bytes calldata action) external;
    }
}
