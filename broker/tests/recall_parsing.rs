//! Tests for Recall API response parsing: no live connection needed.

#[cfg(feature = "recall")]
mod recall_tests {
    use ballast::Symbol;
    use ballast_broker::recall::types::{
        BalancesResponse, ExecuteRequest, ExecuteResponse, ProfileResponse,
    };
    use ballast_broker::recall::{parse_balances, parse_receipt};

    // ========================================================================
    // Balances
    // ========================================================================

    #[test]
    fn parse_balances_numbers_and_strings() {
        let json = r#"{
            "success": true,
            "balances": [
                { "symbol": "USDC", "amount": 1000.5, "tokenAddress": "0xA0b8", "chain": "evm" },
                { "symbol": "WETH", "amount": "0.25" }
            ]
        }"#;

        let resp: BalancesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.balances[0].chain.as_deref(), Some("evm"));

        let balances = parse_balances(resp);
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].symbol, Symbol::new("USDC"));
        assert_eq!(balances[0].amount, 1000.5);
        assert_eq!(balances[1].amount, 0.25);
    }

    #[test]
    fn parse_balances_skips_unusable_entries() {
        let json = r#"{
            "balances": [
                { "amount": 5 },
                { "symbol": "AVERYLONGTOKEN", "amount": 1 },
                { "symbol": "SOL" }
            ]
        }"#;

        let balances = parse_balances(serde_json::from_str(json).unwrap());
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].symbol, Symbol::new("SOL"));
        assert_eq!(balances[0].amount, 0.0);
    }

    #[test]
    fn parse_balances_missing_list() {
        let resp: BalancesResponse = serde_json::from_str(r#"{ "success": true }"#).unwrap();
        assert!(parse_balances(resp).is_empty());
    }

    // ========================================================================
    // Profile
    // ========================================================================

    #[test]
    fn parse_profile() {
        let json = r#"{
            "success": true,
            "agent": { "id": "a1b2", "name": "ballast", "status": "active", "walletAddress": "0x1" }
        }"#;
        let resp: ProfileResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.agent.id, "a1b2");
        assert_eq!(resp.agent.status, "active");
    }

    // ========================================================================
    // Trade execution
    // ========================================================================

    #[test]
    fn execute_request_shape() {
        let body = ExecuteRequest {
            from_token: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            to_token: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
            amount: "600000000".into(),
            reason: "rebalance",
            slippage_tolerance: "0.5",
        };
        let json: serde_json::Value = serde_json::to_value(&body).unwrap();
        assert_eq!(json["fromToken"], "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
        assert_eq!(json["amount"], "600000000");
        assert_eq!(json["slippageTolerance"], "0.5");
    }

    #[test]
    fn parse_successful_trade() {
        let json = r#"{
            "success": true,
            "transaction": { "id": "tx-9", "fromAmount": 600, "toAmount": "0.2994" }
        }"#;
        let receipt = parse_receipt(serde_json::from_str::<ExecuteResponse>(json).unwrap());
        assert!(receipt.success);
        assert_eq!(receipt.transaction_id.as_deref(), Some("tx-9"));
        assert_eq!(receipt.from_amount, Some(600.0));
        assert_eq!(receipt.to_amount, Some(0.2994));
    }

    #[test]
    fn parse_failed_trade() {
        let json = r#"{ "success": false, "error": "Insufficient balance" }"#;
        let receipt = parse_receipt(serde_json::from_str::<ExecuteResponse>(json).unwrap());
        assert!(!receipt.success);
        assert_eq!(receipt.message.as_deref(), Some("Insufficient balance"));
        assert!(receipt.transaction_id.is_none());
    }

    #[test]
    fn reject_malformed_json() {
        assert!(serde_json::from_str::<ExecuteResponse>("not json").is_err());
    }
}
